//! Per-notification context (spec §9 "Status propagation via shared mutable
//! state"): replaces the original's instance-level `replication_status` /
//! `replication_dt` / `stat_log` fields with a value every component accepts
//! explicitly.

use replicator_types::stat_log::StatLog;
use replicator_types::status::NotificationStatus;
use time::OffsetDateTime;

/// Threaded through a single notification's processing. One wall-clock
/// timestamp is captured up front and reused for every `first_seen`/
/// `last_seen` write so that all mutations from one notification agree.
#[derive(Debug, Clone)]
pub struct ReplicationContext {
    pub status: NotificationStatus,
    pub timestamp: OffsetDateTime,
    pub stats: StatLog,
}

impl ReplicationContext {
    #[must_use]
    pub fn new(timestamp: OffsetDateTime) -> Self {
        Self { status: NotificationStatus::Ok, timestamp, stats: StatLog::new() }
    }

    pub fn record_api_error(&mut self) {
        self.status.escalate(NotificationStatus::ApiError);
    }

    pub fn record_sql_error(&mut self) {
        self.status.escalate(NotificationStatus::SqlError);
    }
}
