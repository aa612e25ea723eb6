//! In-memory fakes of the [`DatamartGateway`]/[`ErGateway`] traits, standing
//! in for `PostgresDatamartGateway`/a real ER engine connection the way
//! `hash-graph-postgres-store`'s tests stand in a real Postgres instance
//! behind `DatabaseTestWrapper` (spec §9.6). These are deliberately dumb:
//! every operation mirrors the semantics spec §4.4 documents (duplicate-key
//! and no-rows outcomes, predicated detach) without any real I/O.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use async_trait::async_trait;
use error_stack::Result;
use replicator_store::gateway::{
    DatamartGateway, ErGateway, InsertOutcome, RowsAffected, UpdateOutcome,
};
use replicator_types::error::{ApiError, SqlError};
use replicator_types::model::{
    AlertRow, EntityRow, EntityStub, RecordRow, RelationRow, ReportDelta, ReportRow, DETACHED_ENTITY_ID,
};
use replicator_types::notification::{GetEntityResponse, GetRecordResponse};
use replicator_types::resume::{ResumeBody, ResumeHash};

#[derive(Debug, Default)]
pub struct FakeDatamart {
    pub entities: BTreeMap<i64, EntityRow>,
    pub records: BTreeMap<(String, String), RecordRow>,
    pub relations: BTreeMap<(i64, i64), RelationRow>,
    pub reports: BTreeMap<String, ReportRow>,
    pub report_details: BTreeSet<(String, i64, i64)>,
    pub alerts: BTreeMap<(i64, String), AlertRow>,
}

impl FakeDatamart {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records attached to a live entity (mirrors the `entity_id >= 0` invariant, spec §3).
    #[must_use]
    pub fn attached_record_count(&self, data_source: &str) -> usize {
        self.records
            .values()
            .filter(|row| row.data_source == data_source && row.entity_id >= 0)
            .count()
    }

    #[must_use]
    pub fn report(&self, key: &str) -> Option<&ReportRow> {
        self.reports.get(key)
    }

    #[must_use]
    pub fn detail_count(&self, key: &str) -> usize {
        self.report_details.iter().filter(|(report_key, ..)| report_key == key).count()
    }
}

#[async_trait]
impl DatamartGateway for FakeDatamart {
    async fn fetch_entity_stub(&mut self, entity_id: i64) -> Result<EntityStub, SqlError> {
        Ok(self.entities.get(&entity_id).map_or_else(EntityStub::not_replicated, |row| EntityStub {
            record_count: row.record_count,
            resume_hash: row.resume_hash.clone(),
        }))
    }

    async fn fetch_resume_body(&mut self, entity_id: i64) -> Result<ResumeBody, SqlError> {
        let mut body = ResumeBody::default();
        for ((data_source, record_id), row) in &self.records {
            if row.entity_id == entity_id {
                body.insert_record(data_source.clone(), record_id.clone());
            }
        }
        for ((owner, related_id), row) in &self.relations {
            if *owner == entity_id {
                body.relation_summary.insert(
                    *related_id,
                    replicator_types::resume::RelationSummary::new(
                        row.match_level,
                        row.match_key.clone(),
                        row.match_category,
                        replicator_types::csv::parse_row(&row.data_sources),
                    ),
                );
            }
        }
        Ok(body)
    }

    async fn insert_entity(&mut self, row: &EntityRow) -> Result<InsertOutcome, SqlError> {
        if self.entities.contains_key(&row.entity_id) {
            return Ok(InsertOutcome::DuplicateKey);
        }
        self.entities.insert(row.entity_id, row.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn update_entity(&mut self, row: &EntityRow) -> Result<UpdateOutcome, SqlError> {
        if let Some(existing) = self.entities.get_mut(&row.entity_id) {
            let first_seen = existing.first_seen;
            *existing = row.clone();
            existing.first_seen = first_seen;
            return Ok(UpdateOutcome::Updated);
        }
        Ok(UpdateOutcome::NoRows)
    }

    async fn delete_entity(&mut self, entity_id: i64) -> Result<RowsAffected, SqlError> {
        Ok(RowsAffected(u64::from(self.entities.remove(&entity_id).is_some())))
    }

    async fn insert_record(&mut self, row: &RecordRow) -> Result<InsertOutcome, SqlError> {
        let key = (row.data_source.clone(), row.record_id.clone());
        if self.records.contains_key(&key) {
            return Ok(InsertOutcome::DuplicateKey);
        }
        self.records.insert(key, row.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn update_record(&mut self, row: &RecordRow) -> Result<UpdateOutcome, SqlError> {
        let key = (row.data_source.clone(), row.record_id.clone());
        if let Some(existing) = self.records.get_mut(&key) {
            let first_seen = existing.first_seen;
            *existing = row.clone();
            existing.first_seen = first_seen;
            return Ok(UpdateOutcome::Updated);
        }
        Ok(UpdateOutcome::NoRows)
    }

    async fn delete_record(&mut self, data_source: &str, record_id: &str) -> Result<RowsAffected, SqlError> {
        let key = (data_source.to_owned(), record_id.to_owned());
        Ok(RowsAffected(u64::from(self.records.remove(&key).is_some())))
    }

    async fn attach_record(
        &mut self,
        data_source: &str,
        record_id: &str,
        entity_id: i64,
    ) -> Result<RowsAffected, SqlError> {
        let key = (data_source.to_owned(), record_id.to_owned());
        if let Some(row) = self.records.get_mut(&key) {
            row.entity_id = entity_id;
            return Ok(RowsAffected(1));
        }
        Ok(RowsAffected(0))
    }

    async fn detach_record(
        &mut self,
        data_source: &str,
        record_id: &str,
        from_entity_id: i64,
    ) -> Result<RowsAffected, SqlError> {
        let key = (data_source.to_owned(), record_id.to_owned());
        if let Some(row) = self.records.get_mut(&key) {
            if row.entity_id == from_entity_id {
                row.entity_id = DETACHED_ENTITY_ID;
                return Ok(RowsAffected(1));
            }
        }
        Ok(RowsAffected(0))
    }

    async fn upsert_relation(&mut self, row: &RelationRow) -> Result<(), SqlError> {
        let key = (row.entity_id, row.related_id);
        if let Some(existing) = self.relations.get_mut(&key) {
            let first_seen = existing.first_seen;
            *existing = row.clone();
            existing.first_seen = first_seen;
        } else {
            self.relations.insert(key, row.clone());
        }
        Ok(())
    }

    async fn delete_relation(&mut self, entity_id: i64, related_id: i64) -> Result<RowsAffected, SqlError> {
        Ok(RowsAffected(u64::from(self.relations.remove(&(entity_id, related_id)).is_some())))
    }

    async fn sync_report(&mut self, delta: &ReportDelta) -> Result<(), SqlError> {
        let row = self.reports.entry(delta.report_key.clone()).or_insert_with(|| ReportRow {
            report_key: delta.report_key.clone(),
            report: delta.report.clone(),
            statistic: delta.statistic.clone(),
            data_source1: delta.data_source1.clone(),
            data_source2: delta.data_source2.clone(),
            entity_count: 0,
            record_count: 0,
            relation_count: 0,
        });
        row.entity_count += delta.entity_count;
        row.record_count += delta.record_count;
        row.relation_count += delta.relation_count;

        if let Some(entity_id) = delta.add_entity_id {
            self.report_details.insert((delta.report_key.clone(), entity_id, 0));
        }
        if let Some(entity_id) = delta.delete_entity_id {
            self.report_details.remove(&(delta.report_key.clone(), entity_id, 0));
        }
        if let Some(entity_id) = delta.entity_id {
            for related_id in &delta.add_related_ids {
                self.report_details.insert((delta.report_key.clone(), entity_id, *related_id));
            }
            for related_id in &delta.delete_related_ids {
                self.report_details.remove(&(delta.report_key.clone(), entity_id, *related_id));
            }
        }
        Ok(())
    }

    async fn fetch_alert(&mut self, entity_id: i64, alert_reason: &str) -> Result<Option<AlertRow>, SqlError> {
        Ok(self.alerts.get(&(entity_id, alert_reason.to_owned())).cloned())
    }

    async fn fetch_entity_resume_hash(&mut self, entity_id: i64) -> Result<Option<ResumeHash>, SqlError> {
        Ok(self.entities.get(&entity_id).map(|row| row.resume_hash.clone()))
    }

    async fn insert_alert(&mut self, row: &AlertRow) -> Result<(), SqlError> {
        self.alerts.insert((row.entity_id, row.alert_reason.clone()), row.clone());
        Ok(())
    }

    async fn update_alert(&mut self, row: &AlertRow) -> Result<(), SqlError> {
        self.alerts.insert((row.entity_id, row.alert_reason.clone()), row.clone());
        Ok(())
    }

    async fn purge_all(&mut self) -> Result<(), SqlError> {
        self.entities.clear();
        self.records.clear();
        self.relations.clear();
        self.reports.clear();
        self.report_details.clear();
        self.alerts.clear();
        Ok(())
    }

    async fn list_entity_ids(&mut self, data_source: Option<&str>) -> Result<Vec<i64>, SqlError> {
        Ok(match data_source {
            Some(data_source) => self
                .records
                .values()
                .filter(|row| row.data_source == data_source && row.entity_id >= 0)
                .map(|row| row.entity_id)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
            None => self.entities.keys().copied().collect(),
        })
    }
}

#[derive(Debug, Default)]
pub struct FakeEr {
    pub entities: BTreeMap<i64, GetEntityResponse>,
}

impl FakeEr {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ErGateway for FakeEr {
    async fn get_entity(&mut self, entity_id: i64) -> Result<Option<GetEntityResponse>, ApiError> {
        Ok(self.entities.get(&entity_id).cloned())
    }

    async fn get_record(&mut self, _data_source: &str, _record_id: &str) -> Result<GetRecordResponse, ApiError> {
        Ok(GetRecordResponse { json_data: serde_json::Value::Null })
    }
}

/// One relation to splice into a test entity response, mirroring the ER
/// Gateway's `RELATED_ENTITIES` shape (spec §6).
pub struct RelatedEntitySpec {
    pub entity_id: i64,
    pub match_level: i32,
    pub match_key: &'static str,
    pub is_disclosed: bool,
    pub is_ambiguous: bool,
    pub data_sources: &'static [&'static str],
}

/// Builds a `GetEntityResponse` the way the ER engine would for a resolved
/// entity with the given records and relations (spec §6).
#[must_use]
pub fn entity_response(
    entity_id: i64,
    entity_name: &str,
    records: &[(&str, &str)],
    relations: &[RelatedEntitySpec],
) -> GetEntityResponse {
    use replicator_types::notification::{EntityRecord, RelatedEntity, RelatedRecordSummary, ResolvedEntity};

    GetEntityResponse {
        resolved_entity: ResolvedEntity {
            entity_id,
            entity_name: entity_name.to_owned(),
            records: records
                .iter()
                .map(|(data_source, record_id)| EntityRecord {
                    data_source: (*data_source).to_owned(),
                    record_id: (*record_id).to_owned(),
                })
                .collect(),
        },
        related_entities: relations
            .iter()
            .map(|relation| RelatedEntity {
                entity_id: relation.entity_id,
                match_level: relation.match_level,
                match_key: relation.match_key.to_owned(),
                is_disclosed: i32::from(relation.is_disclosed),
                is_ambiguous: i32::from(relation.is_ambiguous),
                record_summary: relation
                    .data_sources
                    .iter()
                    .map(|data_source| RelatedRecordSummary { data_source: (*data_source).to_owned() })
                    .collect(),
            })
            .collect(),
    }
}
