use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::aggregate::BucketTable;
use crate::classify::{Predicate, Threshold, ThresholdTable};
use crate::error::{DashboardError, Result};
use crate::filter::{Constraint, FilterState, Hierarchy};
use crate::types::{Metric, RecordKind, GEO_LEVELS};

/// Optional config file, any format the `config` crate recognises.
pub const CONFIG_FILE: &str = "config/dashboard";
pub const ENV_PREFIX: &str = "WATER_DASHBOARD";

static DEFAULT_DASHBOARDS: Lazy<Vec<BucketTable>> =
    Lazy::new(|| vec![chlorine_table(), pressure_table(), lpcd_table()]);

fn chlorine_table() -> BucketTable {
    BucketTable {
        metric: Metric::Chlorine,
        title: "Residual Chlorine".to_string(),
        unit: "mg/L".to_string(),
        thresholds: ThresholdTable::new(vec![
            Threshold::new("below_range", "Below 0.2 mg/L", Predicate::below(0.2)),
            Threshold::new("optimal", "0.2 - 0.5 mg/L", Predicate::between(0.2, 0.5)),
            Threshold::new("above_range", "Above 0.5 mg/L", Predicate::above(0.5)),
        ]),
        consistency: vec![
            Threshold::new("consistent_zero", "Zero for 7 days", Predicate::equals(0.0)),
            Threshold::new(
                "consistent_below",
                "Below 0.2 mg/L for 7 days",
                Predicate::Between {
                    min: 0.0,
                    max: 0.2,
                    min_inclusive: false,
                    max_inclusive: false,
                },
            ),
            Threshold::new(
                "consistent_optimal",
                "0.2 - 0.5 mg/L for 7 days",
                Predicate::between(0.2, 0.5),
            ),
            Threshold::new(
                "consistent_above",
                "Above 0.5 mg/L for 7 days",
                Predicate::above(0.5),
            ),
        ],
    }
}

fn pressure_table() -> BucketTable {
    BucketTable {
        metric: Metric::Pressure,
        title: "Pressure".to_string(),
        unit: "bar".to_string(),
        thresholds: ThresholdTable::new(vec![
            Threshold::new("below_range", "Below 0.2 bar", Predicate::below(0.2)),
            Threshold::new("optimal", "0.2 - 0.7 bar", Predicate::between(0.2, 0.7)),
            Threshold::new("above_range", "Above 0.7 bar", Predicate::above(0.7)),
        ]),
        consistency: vec![
            Threshold::new("consistent_zero", "Zero for 7 days", Predicate::equals(0.0)),
            Threshold::new(
                "consistent_below",
                "Below 0.2 bar for 7 days",
                Predicate::Between {
                    min: 0.0,
                    max: 0.2,
                    min_inclusive: false,
                    max_inclusive: false,
                },
            ),
            Threshold::new(
                "consistent_optimal",
                "0.2 - 0.7 bar for 7 days",
                Predicate::between(0.2, 0.7),
            ),
            Threshold::new(
                "consistent_above",
                "Above 0.7 bar for 7 days",
                Predicate::above(0.7),
            ),
        ],
    }
}

fn lpcd_table() -> BucketTable {
    BucketTable {
        metric: Metric::Lpcd,
        title: "Water Supply (LPCD)".to_string(),
        unit: "L/capita/day".to_string(),
        thresholds: ThresholdTable::new(vec![
            Threshold::new("zero_supply", "No Supply", Predicate::equals(0.0)),
            Threshold::new("below_40", "Below 40 LPCD", Predicate::below(40.0)),
            Threshold::new("between_40_55", "40 - 55 LPCD", Predicate::between(40.0, 55.0)),
            Threshold::new("above_55", "Above 55 LPCD", Predicate::above(55.0)),
        ]),
        consistency: vec![
            Threshold::new("consistent_zero", "No supply for 7 days", Predicate::equals(0.0)),
            Threshold::new(
                "consistent_below_55",
                "Below 55 LPCD for 7 days",
                Predicate::below(55.0),
            ),
            Threshold::new(
                "consistent_above_55",
                "55 LPCD or more for 7 days",
                Predicate::Above {
                    min: 55.0,
                    inclusive: true,
                },
            ),
        ],
    }
}

fn default_data_path() -> String {
    "esr_readings.csv".to_string()
}

fn default_record_kind() -> RecordKind {
    RecordKind::Esr
}

fn default_status_columns() -> Vec<String> {
    vec!["commissioned".to_string(), "completion_status".to_string()]
}

fn default_page_size() -> usize {
    10
}

fn default_constraints() -> Vec<Constraint> {
    vec![Constraint::completed_implies_commissioned()]
}

fn default_dashboards() -> Vec<BucketTable> {
    DEFAULT_DASHBOARDS.clone()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_data_path")]
    pub data_path: String,
    #[serde(default = "default_record_kind")]
    pub record_kind: RecordKind,
    #[serde(default)]
    pub hierarchy: Hierarchy,
    #[serde(default = "default_status_columns")]
    pub status_columns: Vec<String>,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_constraints")]
    pub constraints: Vec<Constraint>,
    #[serde(default = "default_dashboards")]
    pub dashboards: Vec<BucketTable>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            record_kind: default_record_kind(),
            hierarchy: Hierarchy::default(),
            status_columns: default_status_columns(),
            page_size: default_page_size(),
            constraints: default_constraints(),
            dashboards: default_dashboards(),
        }
    }
}

impl DashboardConfig {
    pub fn validate(&self) -> Result<()> {
        if self.hierarchy.is_empty() {
            return Err(DashboardError::invalid_config("hierarchy has no levels"));
        }
        for level in self.hierarchy.levels() {
            if !GEO_LEVELS.contains(&level.as_str()) {
                return Err(DashboardError::invalid_config(format!(
                    "unknown level `{}` in hierarchy (expected one of {:?})",
                    level, GEO_LEVELS
                )));
            }
        }
        if self.page_size == 0 {
            return Err(DashboardError::invalid_config("page_size must be at least 1"));
        }
        for d in &self.dashboards {
            if d.thresholds.thresholds.is_empty() {
                return Err(DashboardError::invalid_config(format!(
                    "dashboard `{}` has no thresholds",
                    d.title
                )));
            }
            // A consistency card is looked up by name, so it must not share
            // a name with another consistency card or a point-in-time card.
            let mut names = BTreeSet::new();
            for c in &d.consistency {
                if d.thresholds.contains(&c.bucket) || !names.insert(c.bucket.as_str()) {
                    return Err(DashboardError::invalid_config(format!(
                        "dashboard `{}` reuses bucket name `{}` for a consistency card",
                        d.title, c.bucket
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn dashboard(&self, metric: Metric) -> Option<&BucketTable> {
        self.dashboards.iter().find(|d| d.metric == metric)
    }

    /// A fresh filter wired with this configuration's levels and rules.
    pub fn filter_state(&self) -> FilterState {
        FilterState::new(self.hierarchy.clone()).with_constraints(self.constraints.clone())
    }
}

/// Load configuration from [`CONFIG_FILE`] (optional) and `WATER_DASHBOARD_*`
/// environment variables, then validate it.
pub fn load_config() -> Result<DashboardConfig> {
    load_config_from(CONFIG_FILE)
}

pub fn load_config_from(file: &str) -> Result<DashboardConfig> {
    let settings = ::config::Config::builder()
        .add_source(::config::File::with_name(file).required(false))
        .add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let cfg: DashboardConfig = settings.try_deserialize()?;
    cfg.validate()?;
    Ok(cfg)
}
