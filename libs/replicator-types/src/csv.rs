//! A tiny single-row CSV codec with minimal quoting, matching the semantics of
//! Python's `csv.writer(..., quoting=csv.QUOTE_MINIMAL)` / `csv.reader` that the
//! original replicator used for its `data_sources` columns and résumé hash (spec
//! §4.3). Only a single row is ever encoded; no line terminator is written.

#[must_use]
pub fn write_row<S: AsRef<str>>(fields: &[S]) -> String {
    let mut out = String::new();
    for (index, field) in fields.iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        let field = field.as_ref();
        if field.contains([',', '"', '\n', '\r']) {
            out.push('"');
            for ch in field.chars() {
                if ch == '"' {
                    out.push('"');
                }
                out.push(ch);
            }
            out.push('"');
        } else {
            out.push_str(field);
        }
    }
    out
}

#[must_use]
pub fn parse_row(row: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut chars = row.chars().peekable();
    let mut current = String::new();
    let mut in_quotes = false;

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(ch);
            }
        } else if ch == '"' && current.is_empty() {
            in_quotes = true;
        } else if ch == ',' {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }
    fields.push(current);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_plain_fields() {
        let fields = vec!["CUSTOMER".to_owned(), "WATCHLIST".to_owned()];
        let row = write_row(&fields);
        assert_eq!(row, "CUSTOMER,WATCHLIST");
        assert_eq!(parse_row(&row), fields);
    }

    #[test]
    fn quotes_fields_containing_commas() {
        let fields = vec!["A,B".to_owned(), "plain".to_owned()];
        let row = write_row(&fields);
        assert_eq!(row, "\"A,B\",plain");
        assert_eq!(parse_row(&row), fields);
    }

    #[test]
    fn escapes_embedded_quotes() {
        let fields = vec!["say \"hi\"".to_owned()];
        let row = write_row(&fields);
        assert_eq!(parse_row(&row), fields);
    }
}
