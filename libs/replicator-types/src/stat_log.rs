use std::collections::BTreeMap;

/// Additive `(category, subcategory) -> count` sink (spec §7). Unlike the
/// original's module-global dictionary, this is passed by reference through
/// every component so a notification's statistics can be read back by its caller.
#[derive(Debug, Clone, Default)]
pub struct StatLog {
    counts: BTreeMap<(String, String), u64>,
    /// Free-form reference notes, kept only for the most recent occurrence of a
    /// category/subcategory pair — mirrors the original's debug line, useful for
    /// `--debug` dumps without inflating the counters themselves.
    last_reference: BTreeMap<(String, String), String>,
}

impl StatLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, category: impl Into<String>, subcategory: impl Into<String>) {
        self.record_with_reference(category, subcategory, String::new());
    }

    pub fn record_with_reference(
        &mut self,
        category: impl Into<String>,
        subcategory: impl Into<String>,
        reference: impl Into<String>,
    ) {
        let key = (category.into(), subcategory.into());
        *self.counts.entry(key.clone()).or_insert(0) += 1;
        let reference = reference.into();
        if !reference.is_empty() {
            self.last_reference.insert(key, reference);
        }
    }

    /// Merges another notification's stats into this one (the Orchestrator
    /// accumulates per-entity engine stats into a single notification-level log).
    pub fn merge(&mut self, other: Self) {
        for (key, count) in other.counts {
            *self.counts.entry(key).or_insert(0) += count;
        }
        self.last_reference.extend(other.last_reference);
    }

    #[must_use]
    pub fn count(&self, category: &str, subcategory: &str) -> u64 {
        self.counts
            .get(&(category.to_owned(), subcategory.to_owned()))
            .copied()
            .unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, u64)> {
        self.counts
            .iter()
            .map(|((category, subcategory), count)| (category.as_str(), subcategory.as_str(), *count))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl core::fmt::Display for StatLog {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for (category, subcategory, count) in self.iter() {
            writeln!(fmt, "{category}/{subcategory}: {count}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_repeated_keys() {
        let mut log = StatLog::new();
        log.record("record", "insert");
        log.record("record", "insert");
        log.record("record", "update");
        assert_eq!(log.count("record", "insert"), 2);
        assert_eq!(log.count("record", "update"), 1);
        assert_eq!(log.count("record", "missing"), 0);
    }

    #[test]
    fn merge_combines_independent_logs() {
        let mut a = StatLog::new();
        a.record("sync_type", "no_change");
        let mut b = StatLog::new();
        b.record("sync_type", "no_change");
        b.record("relation", "add");
        a.merge(b);
        assert_eq!(a.count("sync_type", "no_change"), 2);
        assert_eq!(a.count("relation", "add"), 1);
    }
}
