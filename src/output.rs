use crate::aggregate::Cards;
use crate::error::Result;
use crate::types::RollupReport;
use crate::util::{format_int, format_reading};
use serde::Serialize;
use std::path::Path;
use tabled::{builder::Builder, settings::Style, Table, Tabled};
use tracing::info;

pub fn write_csv<T: Serialize>(path: impl AsRef<Path>, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path.as_ref())?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    info!(path = %path.as_ref().display(), rows = rows.len(), "wrote csv");
    Ok(())
}

pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path.as_ref(), s)?;
    info!(path = %path.as_ref().display(), "wrote json");
    Ok(())
}

fn rollup_header(report: &RollupReport) -> Vec<String> {
    let mut header = vec![
        report.level.clone(),
        "Total".to_string(),
        format!("Avg {}", report.metric),
    ];
    header.extend(report.buckets.iter().cloned());
    header
}

fn rollup_cells(report: &RollupReport) -> impl Iterator<Item = Vec<String>> + '_ {
    report.rows.iter().map(|row| {
        let mut cells = vec![
            row.scope.clone(),
            row.total.to_string(),
            format_reading(row.avg_latest, 2),
        ];
        cells.extend(row.counts.iter().map(|c| c.to_string()));
        cells
    })
}

/// Rollup columns depend on the bucket table, so rows are written as raw
/// records instead of through serde.
pub fn write_rollup_csv(path: impl AsRef<Path>, report: &RollupReport) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path.as_ref())?;
    wtr.write_record(rollup_header(report))?;
    for cells in rollup_cells(report) {
        wtr.write_record(cells)?;
    }
    wtr.flush()?;
    info!(path = %path.as_ref().display(), rows = report.rows.len(), "wrote rollup csv");
    Ok(())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

pub fn render_rollup(report: &RollupReport, max_rows: usize) -> String {
    let mut builder = Builder::default();
    builder.push_record(rollup_header(report));
    for cells in rollup_cells(report).take(max_rows) {
        builder.push_record(cells);
    }
    builder.build().with(Style::markdown()).to_string()
}

pub fn preview_rollup(report: &RollupReport, max_rows: usize) {
    if report.rows.is_empty() {
        println!("(no rows)\n");
        return;
    }
    println!("{}\n", render_rollup(report, max_rows));
}

pub fn render_cards(cards: &Cards) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Card", "Count"]);
    for card in cards.point.iter().chain(&cards.consistency) {
        builder.push_record([card.label.clone(), format_int(card.count)]);
    }
    builder.build().with(Style::markdown()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Card;
    use crate::types::{Metric, RollupRow};

    fn report() -> RollupReport {
        RollupReport {
            level: "division".to_string(),
            metric: Metric::Chlorine,
            buckets: vec!["below_range".to_string(), "optimal".to_string()],
            rows: vec![RollupRow {
                scope: "Wardha".to_string(),
                total: 3,
                avg_latest: Some(0.333),
                counts: vec![1, 2],
            }],
        }
    }

    #[test]
    fn rollup_renders_dynamic_columns() {
        let text = render_rollup(&report(), 10);
        assert!(text.contains("Avg Chlorine"));
        assert!(text.contains("optimal"));
        assert!(text.contains("Wardha"));
        assert!(text.contains("0.33"));
    }

    #[test]
    fn rollup_csv_has_header_and_rows() {
        let path = std::env::temp_dir().join(format!("rollup-{}.csv", std::process::id()));
        write_rollup_csv(&path, &report()).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        let mut lines = written.lines();
        assert_eq!(lines.next(), Some("division,Total,Avg Chlorine,below_range,optimal"));
        assert_eq!(lines.next(), Some("Wardha,3,0.33,1,2"));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn cards_render_with_labels() {
        let cards = Cards {
            point: vec![Card {
                bucket: "optimal".to_string(),
                label: "0.2 - 0.5 mg/L".to_string(),
                count: 1200,
            }],
            consistency: Vec::new(),
        };
        let text = render_cards(&cards);
        assert!(text.contains("0.2 - 0.5 mg/L"));
        assert!(text.contains("1,200"));
    }
}
