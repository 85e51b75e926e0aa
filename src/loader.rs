use crate::error::{DashboardError, Result};
use crate::series::{Series, SERIES_LEN};
use crate::types::{
    EsrRecord, GeoScope, Metric, Record, RecordKind, SchemeRecord, StatusFields, VillageRecord,
};
use crate::util::{clean_text, non_blank, parse_u64_safe};
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub parse_errors: usize,
    /// Rows whose reading windows were entirely blank.
    pub empty_series: usize,
}

/// Header lookup for one export; cells are fetched by column name.
struct Columns {
    index: HashMap<String, usize>,
}

impl Columns {
    fn new(headers: &StringRecord) -> Self {
        let index = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_ascii_lowercase(), i))
            .collect();
        Self { index }
    }

    fn has(&self, name: &str) -> bool {
        self.index.contains_key(&name.trim().to_ascii_lowercase())
    }

    /// Headers are matched case-insensitively, so configured column names
    /// such as `Commissioned` find a `commissioned` header.
    fn get<'r>(&self, row: &'r StringRecord, name: &str) -> Option<&'r str> {
        self.index
            .get(&name.trim().to_ascii_lowercase())
            .and_then(|&i| row.get(i))
    }

    fn geo(&self, row: &StringRecord) -> GeoScope {
        let cell = |name: &str| clean_text(self.get(row, name), "Unknown");
        GeoScope {
            region: cell("region"),
            division: cell("division"),
            sub_division: cell("sub_division"),
            circle: cell("circle"),
            block: cell("block"),
            village: cell("village"),
        }
    }

    fn status(&self, row: &StringRecord, status_columns: &[String]) -> StatusFields {
        status_columns
            .iter()
            .filter_map(|c| non_blank(self.get(row, c)).map(|v| (c.clone(), v)))
            .collect()
    }

    fn series(&self, row: &StringRecord, metric: Metric) -> Series {
        let prefix = metric.column_prefix();
        let values: Vec<Option<&str>> = (1..=SERIES_LEN)
            .map(|n| self.get(row, &format!("{}_value_{}", prefix, n)))
            .collect();
        let dates: Vec<Option<&str>> = (1..=SERIES_LEN)
            .map(|n| self.get(row, &format!("{}_date_{}", prefix, n)))
            .collect();
        Series::from_raw(&values, &dates)
    }
}

fn id_column(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Scheme => "scheme_id",
        RecordKind::Village => "village_id",
        RecordKind::Esr => "esr_id",
    }
}

fn build_record(
    cols: &Columns,
    row: &StringRecord,
    kind: RecordKind,
    status_columns: &[String],
) -> Option<Record> {
    let id = non_blank(cols.get(row, id_column(kind)))?;
    let geo = cols.geo(row);
    let status = cols.status(row, status_columns);
    let scheme_id = non_blank(cols.get(row, "scheme_id"));

    let record = match kind {
        RecordKind::Scheme => Record::Scheme(SchemeRecord {
            scheme_name: clean_text(cols.get(row, "scheme_name"), &id),
            scheme_id: id,
            geo,
            status,
        }),
        RecordKind::Village => Record::Village(VillageRecord {
            village_name: clean_text(cols.get(row, "village_name"), &geo.village),
            village_id: id,
            scheme_id,
            population: parse_u64_safe(cols.get(row, "population")),
            geo,
            status,
            lpcd: cols.series(row, Metric::Lpcd),
        }),
        RecordKind::Esr => Record::Esr(EsrRecord {
            esr_name: clean_text(cols.get(row, "esr_name"), &id),
            esr_id: id,
            scheme_id,
            geo,
            status,
            chlorine: cols.series(row, Metric::Chlorine),
            pressure: cols.series(row, Metric::Pressure),
        }),
    };
    Some(record)
}

fn is_series_empty(record: &Record) -> bool {
    match record {
        Record::Scheme(_) => false,
        Record::Village(v) => v.lpcd.is_empty(),
        Record::Esr(e) => e.chlorine.is_empty() && e.pressure.is_empty(),
    }
}

/// Read an export of `kind` rows into typed records.
///
/// Rows that cannot be read, or lack their id, are skipped and counted in
/// the report. A file without the id column at all is rejected.
pub fn load_records_from<R: Read>(
    reader: R,
    kind: RecordKind,
    status_columns: &[String],
) -> Result<(Vec<Record>, LoadReport)> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let cols = Columns::new(rdr.headers()?);
    if !cols.has(id_column(kind)) {
        return Err(DashboardError::missing_column(id_column(kind)));
    }

    let mut report = LoadReport::default();
    let mut records = Vec::new();
    for result in rdr.records() {
        report.total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(row = report.total_rows, error = %e, "skipping unreadable row");
                report.parse_errors += 1;
                continue;
            }
        };
        let Some(record) = build_record(&cols, &row, kind, status_columns) else {
            report.parse_errors += 1;
            continue;
        };
        if is_series_empty(&record) {
            report.empty_series += 1;
        }
        records.push(record);
    }

    report.loaded_rows = records.len();
    Ok((records, report))
}

pub fn load_records(
    path: impl AsRef<Path>,
    kind: RecordKind,
    status_columns: &[String],
) -> Result<(Vec<Record>, LoadReport)> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let (records, report) = load_records_from(file, kind, status_columns)?;
    info!(
        path = %path.display(),
        total = report.total_rows,
        loaded = report.loaded_rows,
        errors = report.parse_errors,
        "loaded records"
    );
    Ok((records, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Filterable;

    fn status_columns() -> Vec<String> {
        vec!["commissioned".to_string(), "completion_status".to_string()]
    }

    #[test]
    fn loads_esr_rows_with_readings() {
        let csv = "\
region,division,block,village,esr_id,esr_name,commissioned,chlorine_value_1,chlorine_value_7,chlorine_date_7,pressure_value_2
Nagpur,Nagpur,Kamptee,Khapa,E1,Khapa ESR,Yes,0.4,0.25,2024-06-07,0.5
 Nagpur ,Nagpur,Kamptee,Mauda,E2,,,,NA,,
,,,,,,,,,,
";
        let (records, report) =
            load_records_from(csv.as_bytes(), RecordKind::Esr, &status_columns()).unwrap();
        assert_eq!(report.total_rows, 3);
        assert_eq!(report.loaded_rows, 2);
        assert_eq!(report.parse_errors, 1);
        assert_eq!(report.empty_series, 1);

        let first = &records[0];
        assert_eq!(first.geo().region, "Nagpur");
        assert_eq!(first.geo().sub_division, "Unknown");
        assert_eq!(first.status("commissioned"), Some("Yes"));
        assert_eq!(first.series(Metric::Chlorine).unwrap().latest(), Some(0.25));
        assert_eq!(first.series(Metric::Pressure).unwrap().latest(), Some(0.5));

        let second = &records[1];
        assert_eq!(second.geo().region, "Nagpur");
        assert_eq!(second.name(), "E2");
        assert_eq!(second.status("commissioned"), None);
        assert_eq!(second.series(Metric::Chlorine).unwrap().latest(), None);
    }

    #[test]
    fn loads_villages_and_schemes() {
        let csv = "village_id,village_name,village,population,lpcd_value_6,lpcd_value_7\nV1,,Khapa,\"1,200\",60,\n";
        let (records, _) =
            load_records_from(csv.as_bytes(), RecordKind::Village, &status_columns()).unwrap();
        match &records[0] {
            Record::Village(v) => {
                assert_eq!(v.village_name, "Khapa");
                assert_eq!(v.population, Some(1200));
                assert_eq!(v.lpcd.latest(), Some(60.0));
            }
            other => panic!("expected village, got {:?}", other.kind()),
        }

        let csv = "Scheme_ID,scheme_name,completion_status\nS1,Khapa RRWSS,Fully Completed\n";
        let (records, _) =
            load_records_from(csv.as_bytes(), RecordKind::Scheme, &status_columns()).unwrap();
        assert_eq!(records[0].kind(), RecordKind::Scheme);
        assert_eq!(records[0].status("completion_status"), Some("Fully Completed"));
    }

    #[test]
    fn status_columns_match_headers_in_any_case() {
        let csv = "esr_id,COMMISSIONED,Completion_Status\nE1,Yes,Partial\n";
        let configured = vec!["Commissioned".to_string(), "completion_status".to_string()];
        let (records, _) =
            load_records_from(csv.as_bytes(), RecordKind::Esr, &configured).unwrap();
        assert_eq!(records[0].status("Commissioned"), Some("Yes"));
        assert_eq!(records[0].status("completion_status"), Some("Partial"));

        let mut filter = crate::filter::FilterState::default();
        filter.set_status_filter("Commissioned", "Yes");
        assert_eq!(filter.apply(&records).len(), 1);
    }

    #[test]
    fn missing_id_column_is_rejected() {
        let csv = "region,village\nNagpur,Khapa\n";
        let err = load_records_from(csv.as_bytes(), RecordKind::Esr, &status_columns()).unwrap_err();
        assert!(matches!(err, DashboardError::MissingColumn { .. }));
    }
}
