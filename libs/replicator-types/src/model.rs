use time::OffsetDateTime;

use crate::category::MatchCategory;
use crate::resume::ResumeHash;

/// `DM_ENTITY` row (spec §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRow {
    pub entity_id: i64,
    pub entity_name: String,
    pub record_count: i64,
    pub relation_count: i64,
    pub resume_hash: ResumeHash,
    pub first_seen: OffsetDateTime,
    pub last_seen: OffsetDateTime,
    /// Policy-contributed columns (spec §9 "Runtime-typed config hook points").
    pub custom_fields: Vec<(String, String)>,
}

/// The minimal prior state needed to decide whether an entity changed
/// (spec §4.2 step 2: `SELECT record_count, résumé_hash FROM Entity WHERE ...`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityStub {
    pub record_count: i64,
    pub resume_hash: ResumeHash,
}

impl EntityStub {
    #[must_use]
    pub fn not_replicated() -> Self {
        Self {
            record_count: 0,
            resume_hash: ResumeHash::default(),
        }
    }
}

/// `DM_RECORD` row (spec §3). `entity_id = -1` marks a detached record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRow {
    pub data_source: String,
    pub record_id: String,
    pub entity_id: i64,
    pub first_seen: OffsetDateTime,
    pub last_seen: OffsetDateTime,
    pub custom_fields: Vec<(String, String)>,
}

/// Sentinel `entity_id` for a detached record (spec §3).
pub const DETACHED_ENTITY_ID: i64 = -1;

/// `DM_RELATION` row (spec §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationRow {
    pub entity_id: i64,
    pub related_id: i64,
    pub match_level: i32,
    pub match_key: String,
    pub match_category: MatchCategory,
    pub data_sources: String,
    pub first_seen: OffsetDateTime,
    pub last_seen: OffsetDateTime,
}

/// `DM_REPORT` row (spec §3). Counters are additive, never recomputed from scratch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReportRow {
    pub report_key: String,
    pub report: String,
    pub statistic: String,
    pub data_source1: Option<String>,
    pub data_source2: Option<String>,
    pub entity_count: i64,
    pub record_count: i64,
    pub relation_count: i64,
}

/// `DM_REPORT_DETAIL` row (spec §3). `related_id = 0` for an entity-only key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReportDetailRow {
    pub entity_id: i64,
    pub related_id: i64,
}

/// `DM_ALERT.alert_status` (spec §3). The `Processed` transition is driven by a
/// downstream system, never written by the replicator itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertStatus {
    Pending,
    Processed,
}

impl AlertStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processed => "processed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("{_0:?} is not a recognized alert status")]
pub struct ParseAlertStatusError(#[error(ignore)] String);

impl core::str::FromStr for AlertStatus {
    type Err = ParseAlertStatusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "processed" => Ok(Self::Processed),
            other => Err(ParseAlertStatusError(other.to_owned())),
        }
    }
}

/// `DM_ALERT` row (spec §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertRow {
    pub entity_id: i64,
    pub resume_hash: ResumeHash,
    pub alert_reason: String,
    pub alert_status: AlertStatus,
    pub first_seen: OffsetDateTime,
    pub last_seen: OffsetDateTime,
}

/// A single raised alert, returned by a `ReplicationPolicy`'s alerting hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertCandidate {
    pub entity_id: i64,
    pub alert_reason: String,
    pub match_level: String,
}

/// An additive update to a `DM_REPORT` row plus its `DM_REPORT_DETAIL`
/// membership changes (spec §4.5 "Net-change update" / "Applying a delta").
#[derive(Debug, Clone, Default)]
pub struct ReportDelta {
    pub report_key: String,
    pub report: String,
    pub statistic: String,
    pub data_source1: Option<String>,
    pub data_source2: Option<String>,
    pub entity_count: i64,
    pub record_count: i64,
    pub relation_count: i64,
    /// Set when this key's detail rows are keyed by entity alone (`related_id = 0`).
    pub add_entity_id: Option<i64>,
    pub delete_entity_id: Option<i64>,
    /// The entity the `related_ids` below are relations of.
    pub entity_id: Option<i64>,
    pub add_related_ids: Vec<i64>,
    pub delete_related_ids: Vec<i64>,
}
