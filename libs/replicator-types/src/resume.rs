use std::collections::BTreeMap;

use crate::category::MatchCategory;

/// One outgoing relation from an entity's point of view, as seen in a résumé.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationSummary {
    pub match_level: i32,
    pub match_key: String,
    pub match_category: MatchCategory,
    /// Data sources of the related entity, as observed from this side. Kept sorted
    /// and de-duplicated so that the résumé hash (§4.3) is deterministic.
    pub data_sources: Vec<String>,
}

impl RelationSummary {
    #[must_use]
    pub fn new(
        match_level: i32,
        match_key: impl Into<String>,
        match_category: MatchCategory,
        mut data_sources: Vec<String>,
    ) -> Self {
        data_sources.sort_unstable();
        data_sources.dedup();
        Self {
            match_level,
            match_key: match_key.into(),
            match_category,
            data_sources,
        }
    }

    /// The `data_sources` list rendered as the stable CSV stored on `DM_RELATION`.
    #[must_use]
    pub fn data_sources_csv(&self) -> String {
        crate::csv::write_row(&self.data_sources)
    }
}

/// The record and relation membership of an entity, diff-friendly by construction:
/// `record_summary` and `relation_summary` are sorted maps (spec §3 "Résumé").
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResumeBody {
    pub record_summary: BTreeMap<String, Vec<String>>,
    pub relation_summary: BTreeMap<i64, RelationSummary>,
}

impl ResumeBody {
    pub fn insert_record(&mut self, data_source: impl Into<String>, record_id: impl Into<String>) {
        let records = self.record_summary.entry(data_source.into()).or_default();
        records.push(record_id.into());
        records.sort_unstable();
        records.dedup();
    }

    #[must_use]
    pub fn record_count(&self) -> i64 {
        self.record_summary.values().map(|ids| ids.len() as i64).sum()
    }

    #[must_use]
    pub fn data_sources(&self) -> std::collections::BTreeSet<&str> {
        self.record_summary.keys().map(String::as_str).collect()
    }
}

/// The encoded form of a résumé stored in `DM_ENTITY.resume_hash` (spec §4.3).
/// Opaque on purpose: only the codec knows how to interpret the bytes (plain
/// CSV, deflate-compressed CSV, or a one-way `~sha~` digest).
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash)]
pub struct ResumeHash(pub Vec<u8>);

impl ResumeHash {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn starts_with_sha_marker(&self) -> bool {
        self.0.starts_with(b"~sha~")
    }
}

impl From<Vec<u8>> for ResumeHash {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// The full snapshot of an entity the net-change engine diffs against (spec §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resume {
    pub entity_id: i64,
    pub entity_name: String,
    pub record_count: i64,
    pub relation_count: i64,
    pub body: ResumeBody,
}

impl Resume {
    /// The sentinel résumé for an entity the ER engine no longer knows about
    /// (spec §4.2 step 1: "a 'not found' response yields a sentinel résumé").
    #[must_use]
    pub fn not_found(entity_id: i64) -> Self {
        Self {
            entity_id,
            entity_name: String::new(),
            record_count: 0,
            relation_count: 0,
            body: ResumeBody::default(),
        }
    }

    #[must_use]
    pub const fn is_dissolved(&self) -> bool {
        self.record_count == 0
    }
}
