use error_stack::Result;
use replicator_types::{
    error::{ApiError, SqlError},
    model::{AlertRow, EntityRow, EntityStub, RecordRow, RelationRow, ReportDelta},
    notification::{GetEntityResponse, GetRecordResponse},
    resume::{ResumeBody, ResumeHash},
};

/// Number of rows a datamart statement affected. Distinguishing zero from one
/// is what lets `detach_record`'s predicate and `attach_record`'s fallback
/// (spec §4.2 step 6) work without throwing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowsAffected(pub u64);

impl RowsAffected {
    #[must_use]
    pub const fn any(self) -> bool {
        self.0 > 0
    }
}

/// Outcome of an insert attempt that can fail on a unique-key conflict without
/// that conflict being an error (spec §4.4: "try insert first ... on duplicate key").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    DuplicateKey,
}

/// Outcome of an update attempt that can affect zero rows without that being
/// an error (spec §4.4: "on other tags try update first, fall back to insert
/// on no-rows").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    NoRows,
}

/// Narrow data-access layer over the datamart tables (spec §4.4). Every
/// operation is keyed by semantic verb and returns a domain outcome rather
/// than throwing on the conditions §4.4 documents as expected (duplicate key,
/// zero rows). A genuine I/O failure is the only thing returned as `Err`, and
/// even that never escapes the Orchestrator boundary (spec §7) — callers
/// convert it into a [`NotificationStatus::SqlError`] plus a stat-log entry.
///
/// [`NotificationStatus::SqlError`]: replicator_types::status::NotificationStatus::SqlError
#[async_trait::async_trait]
pub trait DatamartGateway: Send {
    async fn fetch_entity_stub(&mut self, entity_id: i64) -> Result<EntityStub, SqlError>;

    /// Rebuilds a résumé body from `DM_RECORD`/`DM_RELATION` (spec §4.2 step 4,
    /// triggered when the stored hash is in `~sha~` form).
    async fn fetch_resume_body(&mut self, entity_id: i64) -> Result<ResumeBody, SqlError>;

    async fn insert_entity(&mut self, row: &EntityRow) -> Result<InsertOutcome, SqlError>;
    async fn update_entity(&mut self, row: &EntityRow) -> Result<UpdateOutcome, SqlError>;
    async fn delete_entity(&mut self, entity_id: i64) -> Result<RowsAffected, SqlError>;

    async fn insert_record(&mut self, row: &RecordRow) -> Result<InsertOutcome, SqlError>;
    async fn update_record(&mut self, row: &RecordRow) -> Result<UpdateOutcome, SqlError>;
    async fn delete_record(&mut self, data_source: &str, record_id: &str) -> Result<RowsAffected, SqlError>;

    /// `UPDATE Record SET entity_id = ? WHERE data_source = ? AND record_id = ?`.
    async fn attach_record(
        &mut self,
        data_source: &str,
        record_id: &str,
        entity_id: i64,
    ) -> Result<RowsAffected, SqlError>;

    /// `UPDATE Record SET entity_id = -1 WHERE data_source = ? AND record_id = ? AND entity_id = ?`
    /// — the extra predicate is what keeps this safe against a record racing onto
    /// another entity first (spec §4.2 step 6).
    async fn detach_record(
        &mut self,
        data_source: &str,
        record_id: &str,
        from_entity_id: i64,
    ) -> Result<RowsAffected, SqlError>;

    /// Insert-on-conflict-update on `(entity_id, related_id)`.
    async fn upsert_relation(&mut self, row: &RelationRow) -> Result<(), SqlError>;
    async fn delete_relation(&mut self, entity_id: i64, related_id: i64) -> Result<RowsAffected, SqlError>;

    async fn sync_report(&mut self, delta: &ReportDelta) -> Result<(), SqlError>;

    async fn fetch_alert(&mut self, entity_id: i64, alert_reason: &str) -> Result<Option<AlertRow>, SqlError>;
    async fn fetch_entity_resume_hash(&mut self, entity_id: i64) -> Result<Option<ResumeHash>, SqlError>;
    async fn insert_alert(&mut self, row: &AlertRow) -> Result<(), SqlError>;
    async fn update_alert(&mut self, row: &AlertRow) -> Result<(), SqlError>;

    /// Deletes all rows from all six datamart tables (the CLI driver's `--purge`,
    /// spec §9 design notes / SPEC_FULL §9.7).
    async fn purge_all(&mut self) -> Result<(), SqlError>;

    /// Distinct entity ids currently known to the datamart, optionally
    /// restricted to entities with at least one record from `data_source`
    /// (the CLI driver's `resync --entity-list all --data-source`, spec §6
    /// "Driver surface" / SPEC_FULL §9.5).
    async fn list_entity_ids(&mut self, data_source: Option<&str>) -> Result<Vec<i64>, SqlError>;
}

/// Fetches an entity's resolved records and related entities from the ER
/// engine, and an entity's custom JSON data when a policy opts in
/// (spec §6 "ER Gateway (consumed)").
#[async_trait::async_trait]
pub trait ErGateway: Send {
    /// Returns `Ok(None)` for a "not found" response (spec §4.2 step 1); any
    /// other failure is an `Err`.
    async fn get_entity(&mut self, entity_id: i64) -> Result<Option<GetEntityResponse>, ApiError>;

    async fn get_record(&mut self, data_source: &str, record_id: &str) -> Result<GetRecordResponse, ApiError>;
}
