use crate::aggregate::{aggregate, BucketTable};
use crate::classify::classify;
use crate::filter::FilterState;
use crate::types::{DetailRow, Filterable, RollupReport, RollupRow, SummaryStats};
use crate::util::{average, format_reading};
use std::cmp::Ordering;
use std::collections::HashMap;

fn latest_of<R: Filterable + ?Sized>(record: &R, table: &BucketTable) -> Option<f64> {
    record.series(table.metric).and_then(|s| s.latest())
}

/// Detail table rows for the records behind the current view.
pub fn detail_rows<R: Filterable>(records: &[&R], table: &BucketTable) -> Vec<DetailRow> {
    records
        .iter()
        .map(|r| {
            let reading = r.series(table.metric).and_then(|s| s.latest_reading());
            let value = reading.map(|(v, _)| v);
            let geo = r.geo();
            DetailRow {
                id: r.id().to_string(),
                name: r.name().to_string(),
                region: geo.region.clone(),
                division: geo.division.clone(),
                sub_division: geo.sub_division.clone(),
                circle: geo.circle.clone(),
                block: geo.block.clone(),
                village: geo.village.clone(),
                latest_value: format_reading(value, 2),
                latest_date: reading
                    .and_then(|(_, d)| d)
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "-".to_string()),
                status: classify(value, &table.thresholds).label,
            }
        })
        .collect()
}

/// Level the rollup groups by: one finer than the current selection, or
/// the current level when nothing finer exists or nothing is selected.
fn rollup_level(filter: &FilterState) -> String {
    let levels = filter.hierarchy().levels();
    match filter.active_levels().last() {
        None => filter.current_level().to_string(),
        Some((current, _)) => {
            let idx = filter.level_index(current).unwrap_or(0);
            levels
                .get(idx + 1)
                .cloned()
                .unwrap_or_else(|| current.to_string())
        }
    }
}

/// Regional rollup of the filtered records, one row per child scope.
///
/// Rows are sorted by record count (descending), then scope name.
pub fn rollup<R: Filterable>(records: &[&R], filter: &FilterState, table: &BucketTable) -> RollupReport {
    let level = rollup_level(filter);

    let mut groups: HashMap<String, Vec<&R>> = HashMap::new();
    for r in records {
        let scope = r.geo().get(&level).unwrap_or("Unknown").to_string();
        groups.entry(scope).or_default().push(*r);
    }

    let buckets: Vec<String> = table.thresholds.buckets().into_iter().map(|b| b.bucket).collect();
    let mut rows: Vec<RollupRow> = groups
        .into_iter()
        .map(|(scope, members)| {
            let cards = aggregate(members.iter().copied(), table);
            let latest: Vec<f64> = members
                .iter()
                .filter_map(|r| latest_of(*r, table))
                .collect();
            RollupRow {
                scope,
                total: members.len(),
                avg_latest: (!latest.is_empty()).then(|| average(&latest)),
                counts: cards.point.iter().map(|c| c.count).collect(),
            }
        })
        .collect();

    rows.sort_by(|a, b| match b.total.cmp(&a.total) {
        Ordering::Equal => a.scope.cmp(&b.scope),
        other => other,
    });

    RollupReport {
        level,
        metric: table.metric,
        buckets,
        rows,
    }
}

pub fn summary<R: Filterable>(
    total_records: usize,
    filtered: &[&R],
    filter: &FilterState,
    table: &BucketTable,
) -> SummaryStats {
    let cards = aggregate(filtered.iter().copied(), table);
    let latest: Vec<f64> = filtered
        .iter()
        .filter_map(|r| latest_of(*r, table))
        .collect();
    let mut filters: std::collections::BTreeMap<String, String> = filter
        .active_levels()
        .map(|(l, v)| (l.to_string(), v.to_string()))
        .collect();
    filters.extend(filter.status_filters().clone());

    SummaryStats {
        metric: table.metric,
        total_records,
        filtered_records: filtered.len(),
        current_level: filter.current_level().to_string(),
        filters,
        selected_bucket: filter.selected_bucket().map(str::to_string),
        cards: cards.to_map(),
        consistency_cards: cards.consistency_map(),
        avg_latest: (!latest.is_empty()).then(|| average(&latest)),
    }
}
