use replicator_types::{model::AlertCandidate, resume::Resume};

/// Generalizes the original's subclass-override hook points
/// (`custom_entity_fields`, `custom_record_fields`, `custom_alert_processor`,
/// spec §9 "Runtime-typed config hook points") into a capability set the
/// engine is polymorphic over. The default is a no-op on every hook.
pub trait ReplicationPolicy: Send + Sync {
    /// Extra `DM_ENTITY` columns derived from the current résumé.
    fn entity_columns(&self, _resume: &Resume) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Whether `sync_record` should fetch the record's JSON data from the ER
    /// engine so [`record_columns`] can be called (spec §6 `get_record`,
    /// SPEC_FULL §9.7). Gated to avoid the extra round trip when unused.
    ///
    /// [`record_columns`]: Self::record_columns
    fn wants_record_fields(&self) -> bool {
        false
    }

    /// Extra `DM_RECORD` columns (and any custom side-table upserts) derived
    /// from a record's JSON data.
    fn record_columns(
        &self,
        _data_source: &str,
        _record_id: &str,
        _json_data: &serde_json::Value,
    ) -> Vec<(String, String)> {
        Vec::new()
    }

    /// The only place with domain knowledge (spec §4.6 step 2): given an
    /// interesting entity's flags and current résumé, decides what alerts to raise.
    fn alerts(&self, _flags: &[String], _entity_id: i64, _resume: &Resume) -> Vec<AlertCandidate> {
        Vec::new()
    }
}

/// The default policy: no custom columns, no alerts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPolicy;

impl ReplicationPolicy for NoopPolicy {}

/// Mirrors `MyReplicator.py`'s watchlist cross-join rule (SPEC_FULL §9.7):
/// whenever an interesting entity carries a `WATCHLIST_CONNECTION` flag, alert
/// every non-watchlist data source on the entity itself, and — if the entity
/// is itself on the watchlist — every non-watchlist data source reachable
/// through one of its relations.
#[derive(Debug, Clone, Copy, Default)]
pub struct WatchlistPolicy;

impl WatchlistPolicy {
    const WATCHLIST_SOURCE: &'static str = "WATCHLIST";
    const WATCHLIST_FLAG: &'static str = "WATCHLIST_CONNECTION";
}

impl ReplicationPolicy for WatchlistPolicy {
    fn entity_columns(&self, resume: &Resume) -> Vec<(String, String)> {
        let mut columns = Vec::new();
        if let Some(ids) = resume.body.record_summary.get("CUSTOMER") {
            columns.push(("CUSTOMER_COUNT".to_owned(), ids.len().to_string()));
        }
        if let Some(ids) = resume.body.record_summary.get(Self::WATCHLIST_SOURCE) {
            columns.push(("WATCHLIST_COUNT".to_owned(), ids.len().to_string()));
        }
        columns
    }

    fn alerts(&self, flags: &[String], entity_id: i64, resume: &Resume) -> Vec<AlertCandidate> {
        if !flags.iter().any(|flag| flag == Self::WATCHLIST_FLAG) {
            return Vec::new();
        }

        let mut alerts = Vec::new();
        let entity_on_watchlist = resume.body.record_summary.contains_key(Self::WATCHLIST_SOURCE);

        for data_source in resume.body.record_summary.keys() {
            if data_source != Self::WATCHLIST_SOURCE {
                alerts.push(AlertCandidate {
                    entity_id,
                    alert_reason: format!("WATCHLIST|{data_source}"),
                    match_level: "IS".to_owned(),
                });
            }
        }

        if entity_on_watchlist {
            for (related_id, relation) in &resume.body.relation_summary {
                for data_source in &relation.data_sources {
                    if data_source != Self::WATCHLIST_SOURCE {
                        alerts.push(AlertCandidate {
                            entity_id: *related_id,
                            alert_reason: format!("WATCHLIST|{data_source}"),
                            match_level: relation.match_category.as_str().to_owned(),
                        });
                    }
                }
            }
        }

        alerts
    }
}

#[cfg(test)]
mod tests {
    use replicator_types::{category::MatchCategory, resume::RelationSummary};

    use super::*;

    fn resume_with(data_sources: &[&str]) -> Resume {
        let mut resume = Resume {
            entity_id: 1,
            entity_name: "test".to_owned(),
            record_count: 0,
            relation_count: 0,
            body: Default::default(),
        };
        for data_source in data_sources {
            resume.body.insert_record(*data_source, "1");
        }
        resume
    }

    #[test]
    fn alerts_non_watchlist_sources_on_the_entity_itself() {
        let resume = resume_with(&["CUSTOMER", "WATCHLIST"]);
        let flags = vec!["WATCHLIST_CONNECTION".to_owned()];
        let alerts = WatchlistPolicy.alerts(&flags, 1, &resume);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].entity_id, 1);
        assert_eq!(alerts[0].alert_reason, "WATCHLIST|CUSTOMER");
    }

    #[test]
    fn alerts_related_entities_when_on_watchlist() {
        let mut resume = resume_with(&["WATCHLIST"]);
        resume.body.relation_summary.insert(
            2,
            RelationSummary::new(3, "key", MatchCategory::Pr, vec!["CUSTOMER".to_owned()]),
        );
        let flags = vec!["WATCHLIST_CONNECTION".to_owned()];
        let alerts = WatchlistPolicy.alerts(&flags, 1, &resume);
        assert!(alerts.iter().any(|alert| alert.entity_id == 2 && alert.alert_reason == "WATCHLIST|CUSTOMER"));
    }

    #[test]
    fn no_flag_means_no_alerts() {
        let resume = resume_with(&["WATCHLIST"]);
        assert!(WatchlistPolicy.alerts(&[], 1, &resume).is_empty());
    }
}
