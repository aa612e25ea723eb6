//! Postgres-backed [`DatamartGateway`] (spec §4.4), grounded on the shape of
//! the teacher's `store/postgres/mod.rs`/`knowledge` modules: plain
//! `tokio_postgres` statements routed through a single [`GenericClient`], unique-
//! violation outcomes mapped to the domain `InsertOutcome`/`UpdateOutcome`
//! rather than raised, and `error_stack::Report` wrapping anything else.

use error_stack::{Report, Result, ResultExt as _};
use postgres_types::Json;
use replicator_store::gateway::{DatamartGateway, InsertOutcome, RowsAffected, UpdateOutcome};
use replicator_types::category::MatchCategory;
use replicator_types::csv;
use replicator_types::error::SqlError;
use replicator_types::model::{
    AlertRow, AlertStatus, EntityRow, EntityStub, RecordRow, RelationRow, ReportDelta,
};
use replicator_types::resume::{RelationSummary, ResumeBody, ResumeHash};
use tokio_postgres::error::SqlState;
use tokio_postgres::GenericClient;

/// Wraps any `tokio_postgres` client handle (a pooled `Object`, a bare
/// `Client`, or a `Transaction`) the way the teacher's `PostgresStore` wraps
/// `C: AsClient`.
pub struct PostgresDatamartGateway<C> {
    client: C,
}

impl<C> PostgresDatamartGateway<C> {
    pub const fn new(client: C) -> Self {
        Self { client }
    }
}

fn custom_fields_to_json(fields: &[(String, String)]) -> serde_json::Value {
    serde_json::Value::Object(fields.iter().map(|(key, value)| (key.clone(), value.clone().into())).collect())
}

fn is_unique_violation(err: &tokio_postgres::Error) -> bool {
    err.code() == Some(&SqlState::UNIQUE_VIOLATION)
}

#[async_trait::async_trait]
impl<C> DatamartGateway for PostgresDatamartGateway<C>
where
    C: GenericClient + Send + Sync,
{
    #[tracing::instrument(skip(self))]
    async fn fetch_entity_stub(&mut self, entity_id: i64) -> Result<EntityStub, SqlError> {
        let row = self
            .client
            .query_opt(
                r#"SELECT record_count, resume_hash FROM "DM_ENTITY" WHERE entity_id = $1"#,
                &[&entity_id],
            )
            .await
            .change_context(SqlError)?;

        Ok(row.map_or_else(EntityStub::not_replicated, |row| EntityStub {
            record_count: row.get(0),
            resume_hash: ResumeHash(row.get(1)),
        }))
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_resume_body(&mut self, entity_id: i64) -> Result<ResumeBody, SqlError> {
        let mut body = ResumeBody::default();

        let records = self
            .client
            .query(
                r#"SELECT data_source, record_id FROM "DM_RECORD" WHERE entity_id = $1"#,
                &[&entity_id],
            )
            .await
            .change_context(SqlError)?;
        for row in records {
            body.insert_record(row.get::<_, String>(0), row.get::<_, String>(1));
        }

        let relations = self
            .client
            .query(
                r#"SELECT related_id, match_level, match_key, match_category, data_sources
                   FROM "DM_RELATION" WHERE entity_id = $1"#,
                &[&entity_id],
            )
            .await
            .change_context(SqlError)?;
        for row in relations {
            let related_id: i64 = row.get(0);
            let match_category: String = row.get(3);
            body.relation_summary.insert(
                related_id,
                RelationSummary::new(
                    row.get(1),
                    row.get::<_, String>(2),
                    match_category.parse::<MatchCategory>().unwrap_or(MatchCategory::Pr),
                    csv::parse_row(&row.get::<_, String>(4)),
                ),
            );
        }

        Ok(body)
    }

    #[tracing::instrument(skip(self, row))]
    async fn insert_entity(&mut self, row: &EntityRow) -> Result<InsertOutcome, SqlError> {
        let custom_fields = Json(custom_fields_to_json(&row.custom_fields));
        match self
            .client
            .execute(
                r#"INSERT INTO "DM_ENTITY"
                   (entity_id, entity_name, record_count, relation_count, resume_hash,
                    first_seen, last_seen, custom_fields)
                   VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
                &[
                    &row.entity_id,
                    &row.entity_name,
                    &row.record_count,
                    &row.relation_count,
                    &row.resume_hash.as_bytes(),
                    &row.first_seen,
                    &row.last_seen,
                    &custom_fields,
                ],
            )
            .await
        {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::DuplicateKey),
            Err(err) => Err(Report::new(err).change_context(SqlError)),
        }
    }

    #[tracing::instrument(skip(self, row))]
    async fn update_entity(&mut self, row: &EntityRow) -> Result<UpdateOutcome, SqlError> {
        let custom_fields = Json(custom_fields_to_json(&row.custom_fields));
        let rows = self
            .client
            .execute(
                r#"UPDATE "DM_ENTITY" SET
                     entity_name = $2, record_count = $3, relation_count = $4,
                     resume_hash = $5, last_seen = $6, custom_fields = $7
                   WHERE entity_id = $1"#,
                &[
                    &row.entity_id,
                    &row.entity_name,
                    &row.record_count,
                    &row.relation_count,
                    &row.resume_hash.as_bytes(),
                    &row.last_seen,
                    &custom_fields,
                ],
            )
            .await
            .change_context(SqlError)?;

        Ok(if rows == 0 { UpdateOutcome::NoRows } else { UpdateOutcome::Updated })
    }

    #[tracing::instrument(skip(self))]
    async fn delete_entity(&mut self, entity_id: i64) -> Result<RowsAffected, SqlError> {
        let rows = self
            .client
            .execute(r#"DELETE FROM "DM_ENTITY" WHERE entity_id = $1"#, &[&entity_id])
            .await
            .change_context(SqlError)?;
        Ok(RowsAffected(rows))
    }

    #[tracing::instrument(skip(self, row))]
    async fn insert_record(&mut self, row: &RecordRow) -> Result<InsertOutcome, SqlError> {
        let custom_fields = Json(custom_fields_to_json(&row.custom_fields));
        match self
            .client
            .execute(
                r#"INSERT INTO "DM_RECORD"
                   (data_source, record_id, entity_id, first_seen, last_seen, custom_fields)
                   VALUES ($1, $2, $3, $4, $5, $6)"#,
                &[
                    &row.data_source,
                    &row.record_id,
                    &row.entity_id,
                    &row.first_seen,
                    &row.last_seen,
                    &custom_fields,
                ],
            )
            .await
        {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::DuplicateKey),
            Err(err) => Err(Report::new(err).change_context(SqlError)),
        }
    }

    #[tracing::instrument(skip(self, row))]
    async fn update_record(&mut self, row: &RecordRow) -> Result<UpdateOutcome, SqlError> {
        let custom_fields = Json(custom_fields_to_json(&row.custom_fields));
        let rows = self
            .client
            .execute(
                r#"UPDATE "DM_RECORD" SET entity_id = $3, last_seen = $4, custom_fields = $5
                   WHERE data_source = $1 AND record_id = $2"#,
                &[&row.data_source, &row.record_id, &row.entity_id, &row.last_seen, &custom_fields],
            )
            .await
            .change_context(SqlError)?;

        Ok(if rows == 0 { UpdateOutcome::NoRows } else { UpdateOutcome::Updated })
    }

    #[tracing::instrument(skip(self))]
    async fn delete_record(&mut self, data_source: &str, record_id: &str) -> Result<RowsAffected, SqlError> {
        let rows = self
            .client
            .execute(
                r#"DELETE FROM "DM_RECORD" WHERE data_source = $1 AND record_id = $2"#,
                &[&data_source, &record_id],
            )
            .await
            .change_context(SqlError)?;
        Ok(RowsAffected(rows))
    }

    #[tracing::instrument(skip(self))]
    async fn attach_record(
        &mut self,
        data_source: &str,
        record_id: &str,
        entity_id: i64,
    ) -> Result<RowsAffected, SqlError> {
        let rows = self
            .client
            .execute(
                r#"UPDATE "DM_RECORD" SET entity_id = $3 WHERE data_source = $1 AND record_id = $2"#,
                &[&data_source, &record_id, &entity_id],
            )
            .await
            .change_context(SqlError)?;
        Ok(RowsAffected(rows))
    }

    #[tracing::instrument(skip(self))]
    async fn detach_record(
        &mut self,
        data_source: &str,
        record_id: &str,
        from_entity_id: i64,
    ) -> Result<RowsAffected, SqlError> {
        let rows = self
            .client
            .execute(
                r#"UPDATE "DM_RECORD" SET entity_id = -1
                   WHERE data_source = $1 AND record_id = $2 AND entity_id = $3"#,
                &[&data_source, &record_id, &from_entity_id],
            )
            .await
            .change_context(SqlError)?;
        Ok(RowsAffected(rows))
    }

    #[tracing::instrument(skip(self, row))]
    async fn upsert_relation(&mut self, row: &RelationRow) -> Result<(), SqlError> {
        self.client
            .execute(
                r#"INSERT INTO "DM_RELATION"
                   (entity_id, related_id, match_level, match_key, match_category,
                    data_sources, first_seen, last_seen)
                   VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                   ON CONFLICT (entity_id, related_id) DO UPDATE SET
                     match_level = EXCLUDED.match_level,
                     match_key = EXCLUDED.match_key,
                     match_category = EXCLUDED.match_category,
                     data_sources = EXCLUDED.data_sources,
                     last_seen = EXCLUDED.last_seen"#,
                &[
                    &row.entity_id,
                    &row.related_id,
                    &row.match_level,
                    &row.match_key,
                    &row.match_category.as_str(),
                    &row.data_sources,
                    &row.first_seen,
                    &row.last_seen,
                ],
            )
            .await
            .change_context(SqlError)?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn delete_relation(&mut self, entity_id: i64, related_id: i64) -> Result<RowsAffected, SqlError> {
        let rows = self
            .client
            .execute(
                r#"DELETE FROM "DM_RELATION" WHERE entity_id = $1 AND related_id = $2"#,
                &[&entity_id, &related_id],
            )
            .await
            .change_context(SqlError)?;
        Ok(RowsAffected(rows))
    }

    #[tracing::instrument(skip(self, delta))]
    async fn sync_report(&mut self, delta: &ReportDelta) -> Result<(), SqlError> {
        let updated = self
            .client
            .execute(
                r#"UPDATE "DM_REPORT" SET
                     entity_count = entity_count + $2,
                     record_count = record_count + $3,
                     relation_count = relation_count + $4
                   WHERE report_key = $1"#,
                &[&delta.report_key, &delta.entity_count, &delta.record_count, &delta.relation_count],
            )
            .await
            .change_context(SqlError)?;

        if updated == 0 {
            self.client
                .execute(
                    r#"INSERT INTO "DM_REPORT"
                       (report_key, report, statistic, data_source1, data_source2,
                        entity_count, record_count, relation_count)
                       VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                       ON CONFLICT (report_key) DO UPDATE SET
                         entity_count = "DM_REPORT".entity_count + EXCLUDED.entity_count,
                         record_count = "DM_REPORT".record_count + EXCLUDED.record_count,
                         relation_count = "DM_REPORT".relation_count + EXCLUDED.relation_count"#,
                    &[
                        &delta.report_key,
                        &delta.report,
                        &delta.statistic,
                        &delta.data_source1,
                        &delta.data_source2,
                        &delta.entity_count,
                        &delta.record_count,
                        &delta.relation_count,
                    ],
                )
                .await
                .change_context(SqlError)?;
        }

        if let Some(entity_id) = delta.add_entity_id {
            self.client
                .execute(
                    r#"INSERT INTO "DM_REPORT_DETAIL" (report_key, entity_id, related_id)
                       VALUES ($1, $2, 0) ON CONFLICT DO NOTHING"#,
                    &[&delta.report_key, &entity_id],
                )
                .await
                .change_context(SqlError)?;
        }
        if let Some(entity_id) = delta.delete_entity_id {
            self.client
                .execute(
                    r#"DELETE FROM "DM_REPORT_DETAIL" WHERE report_key = $1 AND entity_id = $2 AND related_id = 0"#,
                    &[&delta.report_key, &entity_id],
                )
                .await
                .change_context(SqlError)?;
        }
        if let Some(entity_id) = delta.entity_id {
            for related_id in &delta.add_related_ids {
                self.client
                    .execute(
                        r#"INSERT INTO "DM_REPORT_DETAIL" (report_key, entity_id, related_id)
                           VALUES ($1, $2, $3) ON CONFLICT DO NOTHING"#,
                        &[&delta.report_key, &entity_id, related_id],
                    )
                    .await
                    .change_context(SqlError)?;
            }
            for related_id in &delta.delete_related_ids {
                self.client
                    .execute(
                        r#"DELETE FROM "DM_REPORT_DETAIL"
                           WHERE report_key = $1 AND entity_id = $2 AND related_id = $3"#,
                        &[&delta.report_key, &entity_id, related_id],
                    )
                    .await
                    .change_context(SqlError)?;
            }
        }

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_alert(&mut self, entity_id: i64, alert_reason: &str) -> Result<Option<AlertRow>, SqlError> {
        let row = self
            .client
            .query_opt(
                r#"SELECT resume_hash, alert_status, first_seen, last_seen
                   FROM "DM_ALERT" WHERE entity_id = $1 AND alert_reason = $2"#,
                &[&entity_id, &alert_reason],
            )
            .await
            .change_context(SqlError)?;

        Ok(row.map(|row| {
            let alert_status: String = row.get(1);
            AlertRow {
                entity_id,
                resume_hash: ResumeHash(row.get(0)),
                alert_reason: alert_reason.to_owned(),
                alert_status: alert_status.parse().unwrap_or(AlertStatus::Pending),
                first_seen: row.get(2),
                last_seen: row.get(3),
            }
        }))
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_entity_resume_hash(&mut self, entity_id: i64) -> Result<Option<ResumeHash>, SqlError> {
        let row = self
            .client
            .query_opt(r#"SELECT resume_hash FROM "DM_ENTITY" WHERE entity_id = $1"#, &[&entity_id])
            .await
            .change_context(SqlError)?;
        Ok(row.map(|row| ResumeHash(row.get(0))))
    }

    #[tracing::instrument(skip(self, row))]
    async fn insert_alert(&mut self, row: &AlertRow) -> Result<(), SqlError> {
        self.client
            .execute(
                r#"INSERT INTO "DM_ALERT" (entity_id, alert_reason, resume_hash, alert_status, first_seen, last_seen)
                   VALUES ($1, $2, $3, $4, $5, $6)
                   ON CONFLICT (entity_id, alert_reason) DO UPDATE SET
                     resume_hash = EXCLUDED.resume_hash,
                     alert_status = EXCLUDED.alert_status,
                     first_seen = EXCLUDED.first_seen,
                     last_seen = EXCLUDED.last_seen"#,
                &[
                    &row.entity_id,
                    &row.alert_reason,
                    &row.resume_hash.as_bytes(),
                    &row.alert_status.as_str(),
                    &row.first_seen,
                    &row.last_seen,
                ],
            )
            .await
            .change_context(SqlError)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, row))]
    async fn update_alert(&mut self, row: &AlertRow) -> Result<(), SqlError> {
        self.client
            .execute(
                r#"UPDATE "DM_ALERT" SET resume_hash = $3, last_seen = $4
                   WHERE entity_id = $1 AND alert_reason = $2"#,
                &[&row.entity_id, &row.alert_reason, &row.resume_hash.as_bytes(), &row.last_seen],
            )
            .await
            .change_context(SqlError)?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn purge_all(&mut self) -> Result<(), SqlError> {
        self.client
            .execute(
                r#"TRUNCATE "DM_ENTITY", "DM_RECORD", "DM_RELATION", "DM_REPORT", "DM_REPORT_DETAIL", "DM_ALERT""#,
                &[],
            )
            .await
            .change_context(SqlError)?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn list_entity_ids(&mut self, data_source: Option<&str>) -> Result<Vec<i64>, SqlError> {
        let rows = match data_source {
            Some(data_source) => {
                self.client
                    .query(
                        r#"SELECT DISTINCT entity_id FROM "DM_RECORD" WHERE data_source = $1 AND entity_id >= 0
                           ORDER BY entity_id"#,
                        &[&data_source],
                    )
                    .await
            }
            None => self.client.query(r#"SELECT entity_id FROM "DM_ENTITY" ORDER BY entity_id"#, &[]).await,
        }
        .change_context(SqlError)?;

        Ok(rows.iter().map(|row| row.get(0)).collect())
    }
}
