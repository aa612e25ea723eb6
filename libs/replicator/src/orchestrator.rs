//! Replication Orchestrator (spec §4.1): top-level handler of a change
//! notification. Drives the Net-Change Engine over the notification's
//! affected entities, runs one resync cycle over the entities that fell out
//! of that, then the Alert Processor over the notification's interesting
//! entities.

use std::collections::BTreeSet;

use replicator_store::gateway::{DatamartGateway, ErGateway};
use replicator_store::policy::ReplicationPolicy;
use replicator_types::notification::Notification;
use replicator_types::stat_log::StatLog;
use replicator_types::status::NotificationStatus;
use time::OffsetDateTime;

use crate::alert::process_interesting_entity;
use crate::context::ReplicationContext;
use crate::engine::{replicate_entity, sync_record};

/// The outcome of processing one notification: the accumulated status
/// (spec §6 "highest wins") and the stat log for debug output (spec §7).
#[derive(Debug, Clone)]
pub struct ReplicationOutcome {
    pub status: NotificationStatus,
    pub stats: StatLog,
}

/// Runs the full notification pipeline described in spec §4.1.
///
/// `alerts_enabled` gates step 5 (some deployments run the replicator
/// without the alert processor wired up to any downstream consumer).
pub async fn replicate_notification(
    notification: &Notification,
    datamart: &mut dyn DatamartGateway,
    er: &mut dyn ErGateway,
    policy: &dyn ReplicationPolicy,
    alerts_enabled: bool,
    timestamp: OffsetDateTime,
) -> ReplicationOutcome {
    let mut ctx = ReplicationContext::new(timestamp);

    let named_entity_id = match notification.affected_entities.as_slice() {
        [only] => only.entity_id,
        _ => 0,
    };
    sync_record(
        &notification.data_source,
        &notification.record_id,
        named_entity_id,
        datamart,
        er,
        policy,
        &mut ctx,
    )
    .await;

    let mut resync_ids = BTreeSet::new();
    for (index, affected) in notification.affected_entities.iter().enumerate() {
        let tag = format!("affected entity {index}");
        let ids = replicate_entity(affected.entity_id, &tag, datamart, er, policy, &mut ctx).await;
        resync_ids.extend(ids);
    }

    // One resync cycle over the related entities the engine surfaced; any
    // further ids that fall out of *this* cycle are not chased — they only
    // feed the stats log (spec §4.1 step 4, SPEC_FULL §9.7 "leftover entities").
    let mut leftover_ids = BTreeSet::new();
    for related_id in resync_ids {
        let ids = replicate_entity(related_id, "related cycle 1", datamart, er, policy, &mut ctx).await;
        leftover_ids.extend(ids);
    }
    if !leftover_ids.is_empty() {
        ctx.stats.record_with_reference(
            "replicate",
            "leftover_entities",
            format!("{leftover_ids:?}"),
        );
    }

    if alerts_enabled {
        for interesting in &notification.interesting_entities {
            process_interesting_entity(interesting, datamart, er, policy, &mut ctx).await;
        }
    }

    ReplicationOutcome { status: ctx.status, stats: ctx.stats }
}
