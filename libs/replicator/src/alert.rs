//! Alert Processor (spec §4.6): scans "interesting entities" on a notification
//! and maintains alert rows whose state transitions depend on résumé-hash change.

use replicator_store::gateway::DatamartGateway;
use replicator_store::gateway::ErGateway;
use replicator_store::policy::ReplicationPolicy;
use replicator_types::model::{AlertRow, AlertStatus};
use replicator_types::notification::InterestingEntity;
use replicator_types::resume::{Resume, ResumeHash};

use crate::context::ReplicationContext;
use crate::engine::resume_from_response;

/// Processes one `INTERESTING_ENTITIES` entry (spec §4.6). Never raises: every
/// failure is folded into `ctx.status`/`ctx.stats`.
pub async fn process_interesting_entity(
    interesting: &InterestingEntity,
    datamart: &mut dyn DatamartGateway,
    er: &mut dyn ErGateway,
    policy: &dyn ReplicationPolicy,
    ctx: &mut ReplicationContext,
) {
    ctx.stats.record_with_reference(
        "interesting_entity",
        interesting.flags.join(","),
        format!("entity_id: {}", interesting.entity_id),
    );

    // Extension point (spec §9 design notes): "this should be a find-path from
    // the incoming entity to the interesting entity" — currently just fetches
    // the interesting entity's own résumé, matching the source.
    let resume = match er.get_entity(interesting.entity_id).await {
        Ok(Some(response)) => resume_from_response(&response),
        Ok(None) => Resume::not_found(interesting.entity_id),
        Err(error) => {
            tracing::warn!(?error, op = "alert_get_entity", "ER engine request failed");
            ctx.record_api_error();
            ctx.stats.record("api_error", "alert_get_entity");
            return;
        }
    };

    let candidates = policy.alerts(&interesting.flags, interesting.entity_id, &resume);

    for candidate in candidates {
        let existing = match datamart.fetch_alert(candidate.entity_id, &candidate.alert_reason).await {
            Ok(alert) => alert,
            Err(error) => {
                tracing::warn!(?error, op = "fetch_alert", "datamart statement failed");
                ctx.record_sql_error();
                ctx.stats.record("sql_error", "fetch_alert");
                continue;
            }
        };

        let current_resume_hash = match datamart.fetch_entity_resume_hash(candidate.entity_id).await {
            Ok(Some(hash)) => hash,
            Ok(None) => ResumeHash::default(),
            Err(error) => {
                tracing::warn!(?error, op = "fetch_entity_resume_hash", "datamart statement failed");
                ctx.record_sql_error();
                ctx.stats.record("sql_error", "fetch_entity_resume_hash");
                continue;
            }
        };

        let action = match &existing {
            None => Action::Insert,
            Some(alert) if alert.alert_status == AlertStatus::Pending => Action::Update,
            Some(alert) if alert.resume_hash != current_resume_hash => Action::Insert,
            Some(_) => Action::None,
        };

        match action {
            Action::Insert => {
                let row = AlertRow {
                    entity_id: candidate.entity_id,
                    resume_hash: current_resume_hash,
                    alert_reason: candidate.alert_reason,
                    alert_status: AlertStatus::Pending,
                    first_seen: ctx.timestamp,
                    last_seen: ctx.timestamp,
                };
                match datamart.insert_alert(&row).await {
                    Ok(()) => ctx.stats.record("alert", "insert"),
                    Err(error) => {
                        tracing::warn!(?error, op = "insert_alert", "datamart statement failed");
                        ctx.record_sql_error();
                        ctx.stats.record("sql_error", "insert_alert");
                    }
                }
            }
            Action::Update => {
                let mut row = existing.expect("Action::Update implies an existing alert row");
                row.resume_hash = current_resume_hash;
                row.last_seen = ctx.timestamp;
                match datamart.update_alert(&row).await {
                    Ok(()) => ctx.stats.record("alert", "update"),
                    Err(error) => {
                        tracing::warn!(?error, op = "update_alert", "datamart statement failed");
                        ctx.record_sql_error();
                        ctx.stats.record("sql_error", "update_alert");
                    }
                }
            }
            Action::None => ctx.stats.record("alert", "none"),
        }
    }
}

enum Action {
    Insert,
    Update,
    None,
}
