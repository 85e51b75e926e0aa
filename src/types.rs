use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tabled::Tabled;

use crate::series::Series;

/// Geographic level names understood by [`GeoScope::get`], coarsest first.
pub const GEO_LEVELS: [&str; 6] = [
    "region",
    "division",
    "sub_division",
    "circle",
    "block",
    "village",
];

/// Which reading window a dashboard looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Chlorine,
    Pressure,
    Lpcd,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Chlorine, Metric::Pressure, Metric::Lpcd];

    /// Column prefix used in exports, e.g. `chlorine_value_3`.
    pub fn column_prefix(self) -> &'static str {
        match self {
            Metric::Chlorine => "chlorine",
            Metric::Pressure => "pressure",
            Metric::Lpcd => "lpcd",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::Chlorine => "Chlorine",
            Metric::Pressure => "Pressure",
            Metric::Lpcd => "LPCD",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Scheme,
    Village,
    Esr,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GeoScope {
    pub region: String,
    pub division: String,
    pub sub_division: String,
    pub circle: String,
    pub block: String,
    pub village: String,
}

impl GeoScope {
    pub fn get(&self, level: &str) -> Option<&str> {
        let v = match level {
            "region" => &self.region,
            "division" => &self.division,
            "sub_division" => &self.sub_division,
            "circle" => &self.circle,
            "block" => &self.block,
            "village" => &self.village,
            _ => return None,
        };
        Some(v.as_str())
    }
}

/// Status attributes such as `commissioned` or `completion_status`.
pub type StatusFields = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemeRecord {
    pub scheme_id: String,
    pub scheme_name: String,
    pub geo: GeoScope,
    pub status: StatusFields,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VillageRecord {
    pub village_id: String,
    pub village_name: String,
    pub scheme_id: Option<String>,
    pub population: Option<u64>,
    pub geo: GeoScope,
    pub status: StatusFields,
    pub lpcd: Series,
}

/// One elevated storage reservoir with its residual chlorine and pressure
/// readings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EsrRecord {
    pub esr_id: String,
    pub esr_name: String,
    pub scheme_id: Option<String>,
    pub geo: GeoScope,
    pub status: StatusFields,
    pub chlorine: Series,
    pub pressure: Series,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Scheme(SchemeRecord),
    Village(VillageRecord),
    Esr(EsrRecord),
}

/// What the filter, aggregator and reports need to know about a row.
pub trait Filterable {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn geo(&self) -> &GeoScope;
    fn status(&self, field: &str) -> Option<&str>;
    fn series(&self, metric: Metric) -> Option<&Series>;
}

impl Filterable for SchemeRecord {
    fn id(&self) -> &str {
        &self.scheme_id
    }
    fn name(&self) -> &str {
        &self.scheme_name
    }
    fn geo(&self) -> &GeoScope {
        &self.geo
    }
    fn status(&self, field: &str) -> Option<&str> {
        self.status.get(field).map(String::as_str)
    }
    fn series(&self, _metric: Metric) -> Option<&Series> {
        None
    }
}

impl Filterable for VillageRecord {
    fn id(&self) -> &str {
        &self.village_id
    }
    fn name(&self) -> &str {
        &self.village_name
    }
    fn geo(&self) -> &GeoScope {
        &self.geo
    }
    fn status(&self, field: &str) -> Option<&str> {
        self.status.get(field).map(String::as_str)
    }
    fn series(&self, metric: Metric) -> Option<&Series> {
        match metric {
            Metric::Lpcd => Some(&self.lpcd),
            _ => None,
        }
    }
}

impl Filterable for EsrRecord {
    fn id(&self) -> &str {
        &self.esr_id
    }
    fn name(&self) -> &str {
        &self.esr_name
    }
    fn geo(&self) -> &GeoScope {
        &self.geo
    }
    fn status(&self, field: &str) -> Option<&str> {
        self.status.get(field).map(String::as_str)
    }
    fn series(&self, metric: Metric) -> Option<&Series> {
        match metric {
            Metric::Chlorine => Some(&self.chlorine),
            Metric::Pressure => Some(&self.pressure),
            Metric::Lpcd => None,
        }
    }
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Scheme(_) => RecordKind::Scheme,
            Record::Village(_) => RecordKind::Village,
            Record::Esr(_) => RecordKind::Esr,
        }
    }

    fn inner(&self) -> &dyn Filterable {
        match self {
            Record::Scheme(r) => r,
            Record::Village(r) => r,
            Record::Esr(r) => r,
        }
    }
}

impl Filterable for Record {
    fn id(&self) -> &str {
        self.inner().id()
    }
    fn name(&self) -> &str {
        self.inner().name()
    }
    fn geo(&self) -> &GeoScope {
        self.inner().geo()
    }
    fn status(&self, field: &str) -> Option<&str> {
        self.inner().status(field)
    }
    fn series(&self, metric: Metric) -> Option<&Series> {
        self.inner().series(metric)
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DetailRow {
    #[serde(rename = "Id")]
    #[tabled(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name")]
    #[tabled(rename = "Name")]
    pub name: String,
    #[serde(rename = "Region")]
    #[tabled(rename = "Region")]
    pub region: String,
    #[serde(rename = "Division")]
    #[tabled(rename = "Division")]
    pub division: String,
    #[serde(rename = "SubDivision")]
    #[tabled(rename = "SubDivision")]
    pub sub_division: String,
    #[serde(rename = "Circle")]
    #[tabled(rename = "Circle")]
    pub circle: String,
    #[serde(rename = "Block")]
    #[tabled(rename = "Block")]
    pub block: String,
    #[serde(rename = "Village")]
    #[tabled(rename = "Village")]
    pub village: String,
    #[serde(rename = "LatestValue")]
    #[tabled(rename = "LatestValue")]
    pub latest_value: String,
    #[serde(rename = "LatestDate")]
    #[tabled(rename = "LatestDate")]
    pub latest_date: String,
    #[serde(rename = "Status")]
    #[tabled(rename = "Status")]
    pub status: String,
}

/// One line of a regional rollup; `counts` follows `RollupReport::buckets`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollupRow {
    pub scope: String,
    pub total: usize,
    pub avg_latest: Option<f64>,
    pub counts: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollupReport {
    pub level: String,
    pub metric: Metric,
    pub buckets: Vec<String>,
    pub rows: Vec<RollupRow>,
}

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub metric: Metric,
    pub total_records: usize,
    pub filtered_records: usize,
    pub current_level: String,
    pub filters: BTreeMap<String, String>,
    pub selected_bucket: Option<String>,
    pub cards: BTreeMap<String, usize>,
    pub consistency_cards: BTreeMap<String, usize>,
    pub avg_latest: Option<f64>,
}
