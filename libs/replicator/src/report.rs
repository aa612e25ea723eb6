//! Report Aggregator (spec §4.5): turns a résumé into a set of report rows
//! keyed by `calc_report_key`, then diffs two such sets into additive deltas.

use std::collections::{BTreeMap, BTreeSet};

use replicator_types::category::MatchCategory;
use replicator_types::model::ReportDelta;
use replicator_types::resume::ResumeBody;

/// A résumé's contribution to reports, grouped the way §4.5 iterates it:
/// the entity's own records under `RESOLVED`, then its outgoing relations
/// under their match category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub resolved: BTreeMap<String, Vec<String>>,
    pub relations: BTreeMap<MatchCategory, BTreeMap<String, Vec<i64>>>,
}

impl ReportSummary {
    #[must_use]
    pub fn from_body(body: &ResumeBody) -> Self {
        let resolved = body.record_summary.clone();
        let mut relations: BTreeMap<MatchCategory, BTreeMap<String, Vec<i64>>> = BTreeMap::new();

        for (related_id, relation) in &body.relation_summary {
            let by_source = relations.entry(relation.match_category).or_default();
            for data_source in &relation.data_sources {
                by_source.entry(data_source.clone()).or_default().push(*related_id);
            }
        }

        Self { resolved, relations }
    }
}

/// One derived report row, before it is turned into a [`ReportDelta`]. Mirrors
/// the original's per-key `report_data` dict closely enough that equality
/// between a current and a prior stat means "nothing changed".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportStat {
    pub report: String,
    pub statistic: String,
    pub data_source1: Option<String>,
    pub data_source2: Option<String>,
    pub entity_count: i64,
    pub record_count: i64,
    pub relation_count: i64,
    /// Set when this key's membership is the entity alone (SINGLE/DUPLICATE
    /// counts once `record_count > 1`, `MATCHED_COUNT`, `ESB`).
    pub entity_id: Option<i64>,
    /// Set when this key's membership is a list of related entity ids.
    pub related_ids: Option<Vec<i64>>,
}

impl ReportStat {
    #[must_use]
    pub fn report_key(&self) -> String {
        let mut key = format!("{}|{}", self.report, self.statistic);
        if let Some(ds1) = &self.data_source1 {
            key.push('|');
            key.push_str(ds1);
        }
        if let Some(ds2) = &self.data_source2 {
            key.push('|');
            key.push_str(ds2);
        }
        key
    }
}

/// Derives every report row a résumé contributes (spec §4.5). `entity_id` is
/// the résumé's own entity id; stats for relations reference the *related*
/// entity only as a membership id, never as the row's owning entity.
#[must_use]
pub fn calc_report_stats(entity_id: i64, summary: &ReportSummary) -> BTreeMap<String, ReportStat> {
    let mut stats = BTreeMap::new();
    let mut total_record_count = 0_i64;

    for (data_source1, record_ids) in &summary.resolved {
        let record_count = record_ids.len() as i64;
        total_record_count += record_count;

        insert_stat(
            &mut stats,
            ReportStat {
                report: "DSS".to_owned(),
                statistic: "ENTITY_COUNT".to_owned(),
                data_source1: Some(data_source1.clone()),
                data_source2: Some(data_source1.clone()),
                entity_count: 1,
                record_count: 0,
                relation_count: 0,
                entity_id: None,
                related_ids: None,
            },
        );

        insert_stat(
            &mut stats,
            ReportStat {
                report: "DSS".to_owned(),
                statistic: if record_count == 1 { "SINGLE_COUNT".to_owned() } else { "DUPLICATE_COUNT".to_owned() },
                data_source1: Some(data_source1.clone()),
                data_source2: Some(data_source1.clone()),
                entity_count: 1,
                record_count,
                relation_count: 0,
                entity_id: if record_count > 1 { Some(entity_id) } else { None },
                related_ids: None,
            },
        );

        for data_source2 in summary.resolved.keys() {
            if data_source2 == data_source1 {
                continue;
            }
            insert_stat(
                &mut stats,
                ReportStat {
                    report: "CSS".to_owned(),
                    statistic: "MATCHED_COUNT".to_owned(),
                    data_source1: Some(data_source1.clone()),
                    data_source2: Some(data_source2.clone()),
                    entity_count: 1,
                    record_count,
                    relation_count: 0,
                    entity_id: Some(entity_id),
                    related_ids: None,
                },
            );
        }

        for (category, by_source) in &summary.relations {
            for (data_source2, related_ids) in by_source {
                let report = if data_source2 == data_source1 { "DSS" } else { "CSS" };
                insert_stat(
                    &mut stats,
                    ReportStat {
                        report: report.to_owned(),
                        statistic: format!("{}_COUNT", category.description()),
                        data_source1: Some(data_source1.clone()),
                        data_source2: Some(data_source2.clone()),
                        entity_count: 1,
                        record_count: 0,
                        relation_count: related_ids.len() as i64,
                        entity_id: Some(entity_id),
                        related_ids: Some(related_ids.clone()),
                    },
                );
            }
        }
    }

    if total_record_count > 0 {
        insert_stat(
            &mut stats,
            ReportStat {
                report: "ESB".to_owned(),
                statistic: total_record_count.to_string(),
                data_source1: Some("n/a".to_owned()),
                data_source2: Some("n/a".to_owned()),
                entity_count: 1,
                record_count: 0,
                relation_count: 0,
                entity_id: Some(entity_id),
                related_ids: None,
            },
        );
    }

    stats
}

fn insert_stat(stats: &mut BTreeMap<String, ReportStat>, stat: ReportStat) {
    stats.insert(stat.report_key(), stat);
}

/// Outcome of comparing one report key between the current (`G`) and prior
/// (`D`) stat sets — drives the `report_key / same|updated|deleted` stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKeyOutcome {
    Same,
    Updated,
    Deleted,
}

/// Diffs two report-row sets into the additive deltas the Datamart Gateway
/// applies (spec §4.5 "Net-change update"). Also returns, per key, which of
/// `same | updated | deleted` happened, for the caller's stat log — a newly
/// appearing key counts as `updated`, matching the three-way split spec §7
/// documents for `report_key`.
pub fn diff_report_stats(
    current: &BTreeMap<String, ReportStat>,
    prior: &BTreeMap<String, ReportStat>,
) -> (Vec<ReportDelta>, Vec<(String, ReportKeyOutcome)>) {
    let mut deltas = Vec::new();
    let mut outcomes = Vec::new();

    for (key, g) in current {
        match prior.get(key) {
            Some(d) if d == g => outcomes.push((key.clone(), ReportKeyOutcome::Same)),
            Some(d) => {
                deltas.push(updated_delta(key, g, d));
                outcomes.push((key.clone(), ReportKeyOutcome::Updated));
            }
            None => {
                deltas.push(new_delta(key, g));
                outcomes.push((key.clone(), ReportKeyOutcome::Updated));
            }
        }
    }

    for (key, d) in prior {
        if !current.contains_key(key) {
            deltas.push(removed_delta(key, d));
            outcomes.push((key.clone(), ReportKeyOutcome::Deleted));
        }
    }

    (deltas, outcomes)
}

fn base_delta(key: &str, stat: &ReportStat) -> ReportDelta {
    ReportDelta {
        report_key: key.to_owned(),
        report: stat.report.clone(),
        statistic: stat.statistic.clone(),
        data_source1: stat.data_source1.clone(),
        data_source2: stat.data_source2.clone(),
        ..ReportDelta::default()
    }
}

fn updated_delta(key: &str, current: &ReportStat, prior: &ReportStat) -> ReportDelta {
    let mut delta = base_delta(key, current);
    delta.entity_count = current.entity_count - prior.entity_count;
    delta.record_count = current.record_count - prior.record_count;
    delta.relation_count = current.relation_count - prior.relation_count;

    match (&current.related_ids, &prior.related_ids) {
        (Some(current_ids), Some(prior_ids)) => {
            let prior_set: BTreeSet<_> = prior_ids.iter().collect();
            let current_set: BTreeSet<_> = current_ids.iter().collect();
            delta.entity_id = current.entity_id;
            delta.add_related_ids = current_ids.iter().filter(|id| !prior_set.contains(id)).copied().collect();
            delta.delete_related_ids = prior_ids.iter().filter(|id| !current_set.contains(id)).copied().collect();
        }
        _ => delta.entity_id = current.entity_id,
    }

    delta
}

fn new_delta(key: &str, current: &ReportStat) -> ReportDelta {
    let mut delta = base_delta(key, current);
    delta.entity_count = current.entity_count;
    delta.record_count = current.record_count;
    delta.relation_count = current.relation_count;

    if let Some(ids) = &current.related_ids {
        delta.entity_id = current.entity_id;
        delta.add_related_ids = ids.clone();
    } else if let Some(entity_id) = current.entity_id {
        delta.add_entity_id = Some(entity_id);
    }

    delta
}

fn removed_delta(key: &str, prior: &ReportStat) -> ReportDelta {
    let mut delta = base_delta(key, prior);
    delta.entity_count = -prior.entity_count;
    delta.record_count = -prior.record_count;
    delta.relation_count = -prior.relation_count;

    if let Some(ids) = &prior.related_ids {
        delta.entity_id = prior.entity_id;
        delta.delete_related_ids = ids.clone();
    } else if let Some(entity_id) = prior.entity_id {
        delta.delete_entity_id = Some(entity_id);
    }

    delta
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use replicator_types::resume::RelationSummary;

    use super::*;

    fn body_with_records(records: &[(&str, &str)]) -> ResumeBody {
        let mut body = ResumeBody::default();
        for (data_source, record_id) in records {
            body.insert_record(*data_source, *record_id);
        }
        body
    }

    #[test]
    fn single_record_single_source_yields_single_count_and_esb() {
        let body = body_with_records(&[("CUSTOMER", "1001")]);
        let summary = ReportSummary::from_body(&body);
        let stats = calc_report_stats(1, &summary);

        let single = &stats["DSS|SINGLE_COUNT|CUSTOMER|CUSTOMER"];
        assert_eq!(single.entity_count, 1);
        assert_eq!(single.record_count, 1);
        assert_eq!(single.entity_id, None);

        let esb = &stats["ESB|1|n/a|n/a"];
        assert_eq!(esb.entity_id, Some(1));
    }

    #[test]
    fn two_records_same_source_yields_duplicate_count_with_entity_id() {
        let body = body_with_records(&[("CUSTOMER", "1001"), ("CUSTOMER", "1002")]);
        let summary = ReportSummary::from_body(&body);
        let stats = calc_report_stats(1, &summary);

        let duplicate = &stats["DSS|DUPLICATE_COUNT|CUSTOMER|CUSTOMER"];
        assert_eq!(duplicate.record_count, 2);
        assert_eq!(duplicate.entity_id, Some(1));
        assert!(!stats.contains_key("DSS|SINGLE_COUNT|CUSTOMER|CUSTOMER"));
    }

    #[test]
    fn relation_produces_cross_source_count_with_related_ids() {
        let mut body = body_with_records(&[("CUSTOMER", "1001")]);
        body.relation_summary.insert(
            2,
            RelationSummary::new(2, "+NAME", MatchCategory::Am, vec!["WATCHLIST".to_owned()]),
        );
        let summary = ReportSummary::from_body(&body);
        let stats = calc_report_stats(1, &summary);

        let css = &stats["CSS|AMBIGUOUS_MATCH_COUNT|CUSTOMER|WATCHLIST"];
        assert_eq!(css.relation_count, 1);
        assert_eq!(css.related_ids.as_deref(), Some(&[2][..]));
    }

    #[test]
    fn diff_flags_single_to_duplicate_transition_as_new_and_deleted_keys() {
        let before = body_with_records(&[("CUSTOMER", "1001")]);
        let after = body_with_records(&[("CUSTOMER", "1001"), ("CUSTOMER", "1002")]);
        let prior_stats = calc_report_stats(1, &ReportSummary::from_body(&before));
        let current_stats = calc_report_stats(1, &ReportSummary::from_body(&after));

        let (deltas, outcomes) = diff_report_stats(&current_stats, &prior_stats);
        assert!(outcomes.contains(&("DSS|DUPLICATE_COUNT|CUSTOMER|CUSTOMER".to_owned(), ReportKeyOutcome::Updated)));
        assert!(outcomes.contains(&("DSS|SINGLE_COUNT|CUSTOMER|CUSTOMER".to_owned(), ReportKeyOutcome::Deleted)));
        assert!(outcomes.iter().any(|(key, outcome)| key == "DSS|ENTITY_COUNT|CUSTOMER|CUSTOMER" && *outcome == ReportKeyOutcome::Same));

        let duplicate_delta = deltas.iter().find(|delta| delta.report_key == "DSS|DUPLICATE_COUNT|CUSTOMER|CUSTOMER").unwrap();
        assert_eq!(duplicate_delta.entity_count, 1);
        assert_eq!(duplicate_delta.record_count, 2);
        assert_eq!(duplicate_delta.add_entity_id, Some(1));
    }

    #[test]
    fn diff_no_change_yields_only_same_outcomes() {
        let body = body_with_records(&[("CUSTOMER", "1001")]);
        let stats = calc_report_stats(1, &ReportSummary::from_body(&body));
        let (deltas, outcomes) = diff_report_stats(&stats, &stats);
        assert!(deltas.is_empty());
        assert!(outcomes.iter().all(|(_, outcome)| *outcome == ReportKeyOutcome::Same));
    }
}
