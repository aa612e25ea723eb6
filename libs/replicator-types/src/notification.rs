use serde::{Deserialize, Serialize};

/// The change event produced by the ER engine whenever a record is added,
/// updated, or deleted (spec §6, wire shape).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "DATA_SOURCE")]
    pub data_source: String,
    #[serde(rename = "RECORD_ID")]
    pub record_id: String,
    #[serde(rename = "AFFECTED_ENTITIES")]
    pub affected_entities: Vec<AffectedEntity>,
    #[serde(rename = "INTERESTING_ENTITIES", default)]
    pub interesting_entities: Vec<InterestingEntity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedEntity {
    #[serde(rename = "ENTITY_ID")]
    pub entity_id: i64,
    #[serde(rename = "LENS_CODE", default, skip_serializing_if = "Option::is_none")]
    pub lens_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestingEntity {
    #[serde(rename = "ENTITY_ID")]
    pub entity_id: i64,
    #[serde(rename = "DEGREES", default)]
    pub degrees: i32,
    #[serde(rename = "FLAGS", default)]
    pub flags: Vec<String>,
    #[serde(rename = "SAMPLE_RECORDS", default)]
    pub sample_records: Vec<SampleRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRecord {
    #[serde(rename = "FLAGS", default)]
    pub flags: Vec<String>,
    #[serde(rename = "DATA_SOURCE")]
    pub data_source: String,
    #[serde(rename = "RECORD_ID")]
    pub record_id: String,
}

/// ER Gateway response shape for `get_entity` (spec §6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetEntityResponse {
    #[serde(rename = "RESOLVED_ENTITY")]
    pub resolved_entity: ResolvedEntity,
    #[serde(rename = "RELATED_ENTITIES", default)]
    pub related_entities: Vec<RelatedEntity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedEntity {
    #[serde(rename = "ENTITY_ID")]
    pub entity_id: i64,
    #[serde(rename = "ENTITY_NAME")]
    pub entity_name: String,
    #[serde(rename = "RECORDS", default)]
    pub records: Vec<EntityRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    #[serde(rename = "DATA_SOURCE")]
    pub data_source: String,
    #[serde(rename = "RECORD_ID")]
    pub record_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedEntity {
    #[serde(rename = "ENTITY_ID")]
    pub entity_id: i64,
    #[serde(rename = "MATCH_LEVEL")]
    pub match_level: i32,
    #[serde(rename = "MATCH_KEY", default)]
    pub match_key: String,
    #[serde(rename = "IS_DISCLOSED", default)]
    pub is_disclosed: i32,
    #[serde(rename = "IS_AMBIGUOUS", default)]
    pub is_ambiguous: i32,
    #[serde(rename = "RECORD_SUMMARY", default)]
    pub record_summary: Vec<RelatedRecordSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedRecordSummary {
    #[serde(rename = "DATA_SOURCE")]
    pub data_source: String,
}

/// ER Gateway response shape for `get_record` (spec §6), used only when
/// custom record fields are enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRecordResponse {
    #[serde(rename = "JSON_DATA")]
    pub json_data: serde_json::Value,
}
