//! Résumé hash encode/decode (spec §4.3).
//!
//! Three forms, smallest-first: a verbatim sorted-CSV token string ("plain
//! form"), the same bytes deflate-compressed ("zip form"), and — only when
//! even that overflows the column budget — a one-way SHA-256 digest ("sha
//! form") that forces the next diff to rebuild the résumé body from the
//! Record/Relation tables instead of decoding it.

use std::fmt::Write as _;
use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use replicator_types::category::MatchCategory;
use replicator_types::csv::{parse_row, write_row};
use replicator_types::resume::{RelationSummary, Resume, ResumeBody, ResumeHash};
use sha2::{Digest, Sha256};

/// Default fixed-width column budget (spec §4.3).
pub const MAX_RESUME_HASH_LEN: usize = 250;

const DATA_SOURCE_MARKER: &str = "~d~";
const RELATION_MARKER: &str = "~r~";
const SHA_MARKER: &[u8] = b"~sha~";

/// Result of decoding a stored résumé hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// The hash decoded straight back to a résumé body.
    Body(ResumeBody),
    /// The hash is a one-way SHA digest; the caller must rebuild from tables
    /// (spec §4.2 step 4).
    NeedsRebuild,
}

/// Encodes a résumé's record and relation summaries into the compact form
/// stored in `DM_ENTITY.resume_hash`.
#[must_use]
pub fn encode(body: &ResumeBody) -> ResumeHash {
    let tokens = build_tokens(body);
    let raw = write_row(&tokens);
    let raw_bytes = raw.into_bytes();

    if raw_bytes.len() <= MAX_RESUME_HASH_LEN {
        return ResumeHash(raw_bytes);
    }

    let compressed = deflate(&raw_bytes);
    if compressed.len() <= MAX_RESUME_HASH_LEN {
        return ResumeHash(compressed);
    }

    ResumeHash(sha_form(&raw_bytes))
}

/// Which of the three encoded forms a hash is in, for the `hash_encode` /
/// `hash_decode` stats (spec §7).
#[must_use]
pub fn form(hash: &ResumeHash) -> &'static str {
    let bytes = hash.as_bytes();
    if bytes.is_empty() {
        "empty"
    } else if hash.starts_with_sha_marker() {
        "sha"
    } else if bytes.first() == Some(&b'~') {
        "str"
    } else {
        "zip"
    }
}

/// Decodes a stored résumé hash, or reports that it is a one-way digest.
#[must_use]
pub fn decode(hash: &ResumeHash) -> Decoded {
    let bytes = hash.as_bytes();

    if bytes.is_empty() {
        return Decoded::Body(ResumeBody::default());
    }
    if hash.starts_with_sha_marker() {
        return Decoded::NeedsRebuild;
    }

    let raw = if bytes.first() == Some(&b'~') {
        String::from_utf8_lossy(bytes).into_owned()
    } else {
        String::from_utf8_lossy(&inflate(bytes)).into_owned()
    };

    Decoded::Body(parse_tokens(&parse_row(&raw)))
}

fn build_tokens(body: &ResumeBody) -> Vec<String> {
    let mut tokens = Vec::new();

    for (data_source, record_ids) in &body.record_summary {
        tokens.push(DATA_SOURCE_MARKER.to_owned());
        tokens.push(data_source.clone());
        tokens.extend(record_ids.iter().cloned());
    }

    for (related_id, relation) in &body.relation_summary {
        tokens.push(RELATION_MARKER.to_owned());
        tokens.push(related_id.to_string());
        tokens.push(relation.match_level.to_string());
        tokens.push(relation.match_key.clone());
        tokens.push(relation.match_category.as_str().to_owned());
        tokens.extend(relation.data_sources.iter().cloned());
    }

    tokens
}

fn is_section_marker(token: &str) -> bool {
    token.len() == 3 && token.starts_with('~') && token.ends_with('~')
}

fn parse_tokens(tokens: &[String]) -> ResumeBody {
    let mut body = ResumeBody::default();
    let mut index = 0;

    while index < tokens.len() {
        match tokens[index].as_str() {
            DATA_SOURCE_MARKER => {
                index += 1;
                let Some(data_source) = tokens.get(index).cloned() else {
                    break;
                };
                index += 1;
                let mut record_ids = Vec::new();
                while index < tokens.len() && !is_section_marker(&tokens[index]) {
                    record_ids.push(tokens[index].clone());
                    index += 1;
                }
                body.record_summary.insert(data_source, record_ids);
            }
            RELATION_MARKER => {
                index += 1;
                let Some(related_id) = tokens.get(index).and_then(|token| token.parse::<i64>().ok()) else {
                    break;
                };
                index += 1;
                let Some(match_level) = tokens.get(index).and_then(|token| token.parse::<i32>().ok()) else {
                    break;
                };
                index += 1;
                let Some(match_key) = tokens.get(index).cloned() else {
                    break;
                };
                index += 1;
                let Ok(match_category) = tokens.get(index).map_or("", String::as_str).parse::<MatchCategory>() else {
                    break;
                };
                index += 1;
                let mut data_sources = Vec::new();
                while index < tokens.len() && !is_section_marker(&tokens[index]) {
                    data_sources.push(tokens[index].clone());
                    index += 1;
                }
                body.relation_summary
                    .insert(related_id, RelationSummary::new(match_level, match_key, match_category, data_sources));
            }
            _ => index += 1,
        }
    }

    body
}

fn deflate(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(bytes).expect("writing to an in-memory buffer cannot fail");
    encoder.finish().expect("flushing an in-memory buffer cannot fail")
}

fn inflate(bytes: &[u8]) -> Vec<u8> {
    let mut decoder = ZlibDecoder::new(bytes);
    let mut out = Vec::new();
    // A corrupt stored blob would mean prior data corruption, not a condition
    // this codec can recover from; an empty result degrades to an empty résumé.
    let _ = decoder.read_to_end(&mut out);
    out
}

fn sha_form(raw_bytes: &[u8]) -> Vec<u8> {
    let digest = Sha256::digest(raw_bytes);
    let mut encoded = String::with_capacity(SHA_MARKER.len() + digest.len() * 2);
    encoded.push_str("~sha~");
    for byte in digest {
        let _ = write!(encoded, "{byte:02x}");
    }
    encoded.into_bytes()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use replicator_types::category::MatchCategory;

    use super::*;

    fn small_body() -> ResumeBody {
        let mut body = ResumeBody::default();
        body.insert_record("CUSTOMER", "1001");
        body.insert_record("CUSTOMER", "1002");
        body.relation_summary.insert(
            2001,
            RelationSummary::new(2, "+NAME+ADDRESS", MatchCategory::Pm, vec!["WATCHLIST".to_owned()]),
        );
        body
    }

    #[test]
    fn plain_form_round_trips() {
        let body = small_body();
        let hash = encode(&body);
        assert!(!hash.starts_with_sha_marker());
        assert!(std::str::from_utf8(hash.as_bytes()).unwrap().starts_with('~'));
        match decode(&hash) {
            Decoded::Body(decoded) => assert_eq!(decoded, body),
            Decoded::NeedsRebuild => panic!("plain form must not request a rebuild"),
        }
    }

    #[test]
    fn empty_body_round_trips_to_empty_hash() {
        let body = ResumeBody::default();
        let hash = encode(&body);
        assert!(hash.is_empty());
        match decode(&hash) {
            Decoded::Body(decoded) => assert_eq!(decoded, body),
            Decoded::NeedsRebuild => panic!("empty résumé must not request a rebuild"),
        }
    }

    #[test]
    fn oversize_plain_form_falls_back_to_zip_form() {
        let mut body = ResumeBody::default();
        for index in 0..40 {
            body.insert_record("CUSTOMER", format!("{index:08}"));
        }
        let hash = encode(&body);
        assert!(hash.as_bytes().len() <= MAX_RESUME_HASH_LEN);
        assert_ne!(hash.as_bytes().first(), Some(&b'~'));
        match decode(&hash) {
            Decoded::Body(decoded) => assert_eq!(decoded, body),
            Decoded::NeedsRebuild => panic!("zip form must not request a rebuild"),
        }
    }

    #[test]
    fn incompressible_oversize_resume_falls_back_to_sha_form() {
        // High-entropy ids (digest output rather than sequential text) defeat
        // deflate, exercising the final sha-form tier.
        let mut body = ResumeBody::default();
        for index in 0..40_u32 {
            let digest = Sha256::digest(index.to_le_bytes());
            let id = digest.iter().map(|byte| format!("{byte:02x}")).collect::<String>();
            body.insert_record(format!("SOURCE_{id}"), id);
        }
        let hash = encode(&body);
        assert!(hash.starts_with_sha_marker());
        let bytes = hash.as_bytes();
        assert_eq!(bytes.len(), "~sha~".len() + 64);
        assert!(bytes[5..].iter().all(u8::is_ascii_hexdigit));
        assert!(matches!(decode(&hash), Decoded::NeedsRebuild));
    }

    #[test]
    fn encoding_is_deterministic() {
        let body = small_body();
        assert_eq!(encode(&body), encode(&body));
    }
}
