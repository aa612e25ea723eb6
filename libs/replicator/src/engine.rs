//! Net-Change Engine (spec §4.2): the per-entity diff-and-apply core, plus
//! the `sync_entity`/`sync_record` Datamart Gateway operations (spec §4.4)
//! that only the engine and Orchestrator call.

use std::collections::{BTreeSet, HashSet};

use replicator_store::gateway::{DatamartGateway, ErGateway, InsertOutcome, UpdateOutcome};
use replicator_store::policy::ReplicationPolicy;
use replicator_types::model::{EntityRow, RecordRow, RelationRow, ReportDelta, DETACHED_ENTITY_ID};
use replicator_types::notification::GetEntityResponse;
use replicator_types::resume::{RelationSummary, Resume, ResumeBody};

use crate::codec;
use crate::context::ReplicationContext;
use crate::report::{calc_report_stats, diff_report_stats, ReportKeyOutcome, ReportSummary};

/// Builds the internal résumé shape from an ER Gateway response (spec §6
/// mapping: `IS_DISCLOSED≠0 → DR`, else `IS_AMBIGUOUS≠0 → AM`, else
/// `MATCH_LEVEL==2 → PM`, else `PR`).
#[must_use]
pub fn resume_from_response(response: &GetEntityResponse) -> Resume {
    let mut body = ResumeBody::default();

    for record in &response.resolved_entity.records {
        body.insert_record(record.data_source.clone(), record.record_id.clone());
    }

    for related in &response.related_entities {
        let category = replicator_types::category::MatchCategory::from_related_entity_flags(
            related.is_disclosed != 0,
            related.is_ambiguous != 0,
            related.match_level,
        );
        let data_sources = related.record_summary.iter().map(|summary| summary.data_source.clone()).collect();
        body.relation_summary.insert(
            related.entity_id,
            RelationSummary::new(related.match_level, related.match_key.clone(), category, data_sources),
        );
    }

    let record_count = body.record_count();
    let relation_count = body.relation_summary.len() as i64;

    Resume {
        entity_id: response.resolved_entity.entity_id,
        entity_name: response.resolved_entity.entity_name.clone(),
        record_count,
        relation_count,
        body,
    }
}

/// Runs the net-change diff for one entity and applies every resulting
/// mutation. Returns the de-duplicated set of related entity ids that must
/// also be resynced. Never raises: every failure is folded into `ctx.status`
/// and `ctx.stats` (spec §7 propagation policy).
pub async fn replicate_entity(
    entity_id: i64,
    sync_tag: &str,
    datamart: &mut dyn DatamartGateway,
    er: &mut dyn ErGateway,
    policy: &dyn ReplicationPolicy,
    ctx: &mut ReplicationContext,
) -> Vec<i64> {
    let current = match er.get_entity(entity_id).await {
        Ok(Some(response)) => resume_from_response(&response),
        Ok(None) => Resume::not_found(entity_id),
        Err(error) => {
            tracing::warn!(?error, op = "get_entity", "ER engine request failed");
            ctx.record_api_error();
            ctx.stats.record("api_error", "get_entity");
            return Vec::new();
        }
    };

    let stub = match datamart.fetch_entity_stub(entity_id).await {
        Ok(stub) => stub,
        Err(error) => {
            tracing::warn!(?error, op = "fetch_entity_stub", "datamart statement failed");
            ctx.record_sql_error();
            ctx.stats.record("sql_error", "fetch_entity_stub");
            replicator_types::model::EntityStub::not_replicated()
        }
    };

    let current_hash = codec::encode(&current.body);
    ctx.stats.record("hash_encode", codec::form(&current_hash));

    if current_hash == stub.resume_hash {
        ctx.stats.record("sync_type", "no_change");
        return Vec::new();
    }

    let prior_body = match codec::decode(&stub.resume_hash) {
        codec::Decoded::Body(body) => {
            ctx.stats.record("hash_decode", codec::form(&stub.resume_hash));
            body
        }
        codec::Decoded::NeedsRebuild => {
            ctx.stats.record("hash_decode", "hash(from db)");
            match datamart.fetch_resume_body(entity_id).await {
                Ok(body) => body,
                Err(error) => {
                    tracing::warn!(?error, op = "fetch_resume_body", "datamart statement failed");
                    ctx.record_sql_error();
                    ctx.stats.record("sql_error", "fetch_resume_body");
                    ResumeBody::default()
                }
            }
        }
    };

    sync_entity(&current, &current_hash, sync_tag, datamart, policy, ctx).await;

    let data_source_list_changed = current.body.data_sources() != prior_body.data_sources();

    for (data_source, record_ids) in &current.body.record_summary {
        let prior_ids = prior_body.record_summary.get(data_source);
        for record_id in record_ids {
            if prior_ids.is_none_or(|ids| !ids.contains(record_id)) {
                attach_or_sync_record(data_source, record_id, entity_id, datamart, er, policy, ctx).await;
            }
        }
    }

    for (data_source, record_ids) in &prior_body.record_summary {
        let current_ids = current.body.record_summary.get(data_source);
        for record_id in record_ids {
            if current_ids.is_none_or(|ids| !ids.contains(record_id)) {
                match datamart.detach_record(data_source, record_id, entity_id).await {
                    Ok(rows) if rows.any() => ctx.stats.record("record", "detach"),
                    Ok(_) => ctx.stats.record("record", "detach_raced"),
                    Err(error) => {
                        tracing::warn!(?error, op = "detach_record", "datamart statement failed");
                        ctx.record_sql_error();
                        ctx.stats.record("sql_error", "detach_record");
                    }
                }
            }
        }
    }

    let mut resync_ids = BTreeSet::new();

    for (related_id, relation) in &current.body.relation_summary {
        let unchanged = prior_body.relation_summary.get(related_id) == Some(relation);
        if !unchanged {
            let row = RelationRow {
                entity_id,
                related_id: *related_id,
                match_level: relation.match_level,
                match_key: relation.match_key.clone(),
                match_category: relation.match_category,
                data_sources: relation.data_sources_csv(),
                first_seen: ctx.timestamp,
                last_seen: ctx.timestamp,
            };
            match datamart.upsert_relation(&row).await {
                Ok(()) => ctx.stats.record("relation", "upsert"),
                Err(error) => {
                    tracing::warn!(?error, op = "upsert_relation", "datamart statement failed");
                    ctx.record_sql_error();
                    ctx.stats.record("sql_error", "upsert_relation");
                }
            }
            resync_ids.insert(*related_id);
        }
    }

    for related_id in prior_body.relation_summary.keys() {
        if !current.body.relation_summary.contains_key(related_id) {
            match datamart.delete_relation(entity_id, *related_id).await {
                Ok(_) => ctx.stats.record("relation", "delete"),
                Err(error) => {
                    tracing::warn!(?error, op = "delete_relation", "datamart statement failed");
                    ctx.record_sql_error();
                    ctx.stats.record("sql_error", "delete_relation");
                }
            }
            resync_ids.insert(*related_id);
        }
    }

    if data_source_list_changed {
        resync_ids.extend(current.body.relation_summary.keys().copied());
    }

    sync_reports(&current.body, &prior_body, entity_id, datamart, ctx).await;

    resync_ids.into_iter().collect::<HashSet<_>>().into_iter().collect()
}

async fn attach_or_sync_record(
    data_source: &str,
    record_id: &str,
    entity_id: i64,
    datamart: &mut dyn DatamartGateway,
    er: &mut dyn ErGateway,
    policy: &dyn ReplicationPolicy,
    ctx: &mut ReplicationContext,
) {
    match datamart.attach_record(data_source, record_id, entity_id).await {
        Ok(rows) if rows.any() => ctx.stats.record("record", "attach_succeeded"),
        Ok(_) => {
            ctx.stats.record("record", "missing");
            sync_record(data_source, record_id, entity_id, datamart, er, policy, ctx).await;
        }
        Err(error) => {
            tracing::warn!(?error, op = "attach_record", "datamart statement failed");
            ctx.record_sql_error();
            ctx.stats.record("sql_error", "attach_record");
        }
    }
}

/// `sync_record(ds, rid, eid)` (spec §4.4). `eid < 0` detaches; otherwise
/// insert-first with a duplicate-key fallback to update.
pub async fn sync_record(
    data_source: &str,
    record_id: &str,
    entity_id: i64,
    datamart: &mut dyn DatamartGateway,
    er: &mut dyn ErGateway,
    policy: &dyn ReplicationPolicy,
    ctx: &mut ReplicationContext,
) {
    if entity_id == DETACHED_ENTITY_ID || entity_id < 0 {
        match datamart.delete_record(data_source, record_id).await {
            Ok(rows) if rows.any() => {
                ctx.stats.record("record", "delete");
                apply_report_delta(
                    datamart,
                    &ReportDelta {
                        report_key: format!("DSS|RECORD_COUNT|{data_source}|{data_source}"),
                        report: "DSS".to_owned(),
                        statistic: "RECORD_COUNT".to_owned(),
                        data_source1: Some(data_source.to_owned()),
                        data_source2: Some(data_source.to_owned()),
                        record_count: -1,
                        ..ReportDelta::default()
                    },
                    ctx,
                )
                .await;
            }
            Ok(_) => {}
            Err(error) => {
                tracing::warn!(?error, op = "delete_record", "datamart statement failed");
                ctx.record_sql_error();
                ctx.stats.record("sql_error", "delete_record");
            }
        }
        return;
    }

    let mut custom_fields = Vec::new();
    if policy.wants_record_fields() {
        match er.get_record(data_source, record_id).await {
            Ok(response) => custom_fields = policy.record_columns(data_source, record_id, &response.json_data),
            Err(error) => {
                tracing::warn!(?error, op = "get_record", "ER engine request failed");
                ctx.record_api_error();
                ctx.stats.record("api_error", "get_record");
            }
        }
    }

    let row = RecordRow {
        data_source: data_source.to_owned(),
        record_id: record_id.to_owned(),
        entity_id,
        first_seen: ctx.timestamp,
        last_seen: ctx.timestamp,
        custom_fields,
    };

    let inserted = match datamart.insert_record(&row).await {
        Ok(InsertOutcome::Inserted) => {
            ctx.stats.record("record", "insert");
            true
        }
        Ok(InsertOutcome::DuplicateKey) => {
            match datamart.update_record(&row).await {
                Ok(_) => ctx.stats.record("record", "update"),
                Err(error) => {
                    tracing::warn!(?error, op = "update_record", "datamart statement failed");
                    ctx.record_sql_error();
                    ctx.stats.record("sql_error", "update_record");
                }
            }
            false
        }
        Err(error) => {
            tracing::warn!(?error, op = "insert_record", "datamart statement failed");
            ctx.record_sql_error();
            ctx.stats.record("sql_error", "insert_record");
            false
        }
    };

    if inserted {
        apply_report_delta(
            datamart,
            &ReportDelta {
                report_key: format!("DSS|RECORD_COUNT|{data_source}|{data_source}"),
                report: "DSS".to_owned(),
                statistic: "RECORD_COUNT".to_owned(),
                data_source1: Some(data_source.to_owned()),
                data_source2: Some(data_source.to_owned()),
                record_count: 1,
                ..ReportDelta::default()
            },
            ctx,
        )
        .await;
    }
}

/// `sync_entity(G, tag)` (spec §4.4). `tag == "affected entity 0"` tries
/// insert first (fresh notification, most likely a brand-new entity);
/// every other tag (a related-entity resync) tries update first since the
/// entity usually already exists.
async fn sync_entity(
    current: &Resume,
    current_hash: &replicator_types::resume::ResumeHash,
    sync_tag: &str,
    datamart: &mut dyn DatamartGateway,
    policy: &dyn ReplicationPolicy,
    ctx: &mut ReplicationContext,
) {
    if current.record_count == 0 {
        match datamart.delete_entity(current.entity_id).await {
            Ok(rows) if rows.any() => {
                ctx.stats.record("entity", "delete");
                apply_report_delta(
                    datamart,
                    &ReportDelta {
                        report_key: "TOTAL|ENTITY_COUNT".to_owned(),
                        report: "TOTAL".to_owned(),
                        statistic: "ENTITY_COUNT".to_owned(),
                        entity_count: -1,
                        ..ReportDelta::default()
                    },
                    ctx,
                )
                .await;
            }
            Ok(_) => {}
            Err(error) => {
                tracing::warn!(?error, op = "delete_entity", "datamart statement failed");
                ctx.record_sql_error();
                ctx.stats.record("sql_error", "delete_entity");
            }
        }
        return;
    }

    let row = EntityRow {
        entity_id: current.entity_id,
        entity_name: current.entity_name.clone(),
        record_count: current.record_count,
        relation_count: current.relation_count,
        resume_hash: current_hash.clone(),
        first_seen: ctx.timestamp,
        last_seen: ctx.timestamp,
        custom_fields: policy.entity_columns(current),
    };

    let inserted = if sync_tag == "affected entity 0" {
        match datamart.insert_entity(&row).await {
            Ok(InsertOutcome::Inserted) => {
                ctx.stats.record("entity", "insert");
                true
            }
            Ok(InsertOutcome::DuplicateKey) => {
                if let Err(error) = datamart.update_entity(&row).await {
                    tracing::warn!(?error, op = "update_entity", "datamart statement failed");
                    ctx.record_sql_error();
                    ctx.stats.record("sql_error", "update_entity");
                } else {
                    ctx.stats.record("entity", "update");
                }
                false
            }
            Err(error) => {
                tracing::warn!(?error, op = "insert_entity", "datamart statement failed");
                ctx.record_sql_error();
                ctx.stats.record("sql_error", "insert_entity");
                false
            }
        }
    } else {
        match datamart.update_entity(&row).await {
            Ok(UpdateOutcome::Updated) => {
                ctx.stats.record("entity", "update");
                false
            }
            Ok(UpdateOutcome::NoRows) => {
                if let Err(error) = datamart.insert_entity(&row).await {
                    tracing::warn!(?error, op = "insert_entity", "datamart statement failed");
                    ctx.record_sql_error();
                    ctx.stats.record("sql_error", "insert_entity");
                } else {
                    ctx.stats.record("entity", "insert");
                }
                true
            }
            Err(error) => {
                tracing::warn!(?error, op = "update_entity", "datamart statement failed");
                ctx.record_sql_error();
                ctx.stats.record("sql_error", "update_entity");
                false
            }
        }
    };

    if inserted {
        apply_report_delta(
            datamart,
            &ReportDelta {
                report_key: "TOTAL|ENTITY_COUNT".to_owned(),
                report: "TOTAL".to_owned(),
                statistic: "ENTITY_COUNT".to_owned(),
                entity_count: 1,
                ..ReportDelta::default()
            },
            ctx,
        )
        .await;
    }
}

async fn sync_reports(
    current: &ResumeBody,
    prior: &ResumeBody,
    entity_id: i64,
    datamart: &mut dyn DatamartGateway,
    ctx: &mut ReplicationContext,
) {
    let current_stats = calc_report_stats(entity_id, &ReportSummary::from_body(current));
    let prior_stats = calc_report_stats(entity_id, &ReportSummary::from_body(prior));
    let (deltas, outcomes) = diff_report_stats(&current_stats, &prior_stats);

    for (key, outcome) in outcomes {
        let subcategory = match outcome {
            ReportKeyOutcome::Same => "same",
            ReportKeyOutcome::Updated => "updated",
            ReportKeyOutcome::Deleted => "deleted",
        };
        ctx.stats.record_with_reference("report_key", subcategory, key);
    }

    for delta in &deltas {
        apply_report_delta(datamart, delta, ctx).await;
    }
}

async fn apply_report_delta(datamart: &mut dyn DatamartGateway, delta: &ReportDelta, ctx: &mut ReplicationContext) {
    match datamart.sync_report(delta).await {
        Ok(()) => ctx.stats.record("report", "sync"),
        Err(error) => {
            tracing::warn!(?error, op = "sync_report", "datamart statement failed");
            ctx.record_sql_error();
            ctx.stats.record("sql_error", "sync_report");
        }
    }
}
