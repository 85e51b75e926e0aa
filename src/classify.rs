//! Range classification of readings into dashboard buckets.
//!
//! Threshold tables are ordered: the first predicate that matches wins, so
//! boundary values such as `0.2` land in exactly one bucket regardless of
//! how the neighbouring ranges are written.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::series::{Series, SERIES_LEN};

/// A test on a single reading. Tagged so tables can live in config files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    Below {
        max: f64,
        #[serde(default)]
        inclusive: bool,
    },
    Above {
        min: f64,
        #[serde(default)]
        inclusive: bool,
    },
    Between {
        min: f64,
        max: f64,
        #[serde(default = "default_true")]
        min_inclusive: bool,
        #[serde(default = "default_true")]
        max_inclusive: bool,
    },
    Equals {
        value: f64,
    },
    Any,
}

fn default_true() -> bool {
    true
}

impl Predicate {
    pub fn below(max: f64) -> Self {
        Self::Below {
            max,
            inclusive: false,
        }
    }

    pub fn above(min: f64) -> Self {
        Self::Above {
            min,
            inclusive: false,
        }
    }

    /// Closed range `min..=max`.
    pub fn between(min: f64, max: f64) -> Self {
        Self::Between {
            min,
            max,
            min_inclusive: true,
            max_inclusive: true,
        }
    }

    pub fn equals(value: f64) -> Self {
        Self::Equals { value }
    }

    pub fn matches(&self, v: f64) -> bool {
        if !v.is_finite() {
            return false;
        }
        match *self {
            Predicate::Below { max, inclusive } => v < max || (inclusive && v == max),
            Predicate::Above { min, inclusive } => v > min || (inclusive && v == min),
            Predicate::Between {
                min,
                max,
                min_inclusive,
                max_inclusive,
            } => {
                let lower = v > min || (min_inclusive && v == min);
                let upper = v < max || (max_inclusive && v == max);
                lower && upper
            }
            Predicate::Equals { value } => v == value,
            Predicate::Any => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub bucket: String,
    pub label: String,
    pub predicate: Predicate,
}

impl Threshold {
    pub fn new(bucket: impl Into<String>, label: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            bucket: bucket.into(),
            label: label.into(),
            predicate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketLabel {
    pub bucket: String,
    pub label: String,
}

impl BucketLabel {
    pub fn new(bucket: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            label: label.into(),
        }
    }
}

fn default_no_data() -> BucketLabel {
    BucketLabel::new("no_data", "No Data")
}

fn default_out_of_range() -> BucketLabel {
    BucketLabel::new("out_of_range", "Out of Range")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdTable {
    pub thresholds: Vec<Threshold>,
    #[serde(default = "default_no_data")]
    pub no_data: BucketLabel,
    /// Catches finite values that no threshold claims.
    #[serde(default = "default_out_of_range")]
    pub out_of_range: BucketLabel,
}

impl ThresholdTable {
    pub fn new(thresholds: Vec<Threshold>) -> Self {
        Self {
            thresholds,
            no_data: default_no_data(),
            out_of_range: default_out_of_range(),
        }
    }

    /// Every bucket `classify` can return, in evaluation order. A name
    /// used by several thresholds (e.g. "out" on both sides of a range)
    /// appears once, with the label of its first use.
    pub fn buckets(&self) -> Vec<BucketLabel> {
        let mut seen = BTreeSet::new();
        self.thresholds
            .iter()
            .map(|t| BucketLabel::new(t.bucket.clone(), t.label.clone()))
            .chain([self.no_data.clone(), self.out_of_range.clone()])
            .filter(|b| seen.insert(b.bucket.clone()))
            .collect()
    }

    pub fn contains(&self, bucket: &str) -> bool {
        self.buckets().iter().any(|b| b.bucket == bucket)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub bucket: String,
    pub label: String,
}

impl From<&BucketLabel> for Classification {
    fn from(b: &BucketLabel) -> Self {
        Self {
            bucket: b.bucket.clone(),
            label: b.label.clone(),
        }
    }
}

/// Map a reading to its bucket. Total: a missing or non-finite value is
/// always `no_data`, and a value nothing matches is `out_of_range`.
pub fn classify(value: Option<f64>, table: &ThresholdTable) -> Classification {
    let Some(v) = value.filter(|v| v.is_finite()) else {
        return Classification::from(&table.no_data);
    };
    table
        .thresholds
        .iter()
        .find(|t| t.predicate.matches(v))
        .map(|t| Classification {
            bucket: t.bucket.clone(),
            label: t.label.clone(),
        })
        .unwrap_or_else(|| Classification::from(&table.out_of_range))
}

/// True only for a full window: all seven slots hold a reading and every
/// reading satisfies `predicate`.
pub fn classify_consistency(series: &Series, predicate: &Predicate) -> bool {
    series.defined_count() == SERIES_LEN
        && series
            .values()
            .iter()
            .flatten()
            .all(|v| predicate.matches(*v))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chlorine() -> ThresholdTable {
        ThresholdTable::new(vec![
            Threshold::new("below", "Below 0.2 mg/L", Predicate::below(0.2)),
            Threshold::new("optimal", "0.2 - 0.5 mg/L", Predicate::between(0.2, 0.5)),
            Threshold::new("above", "Above 0.5 mg/L", Predicate::above(0.5)),
        ])
    }

    #[test]
    fn boundaries_follow_table_order() {
        let table = chlorine();
        assert_eq!(classify(Some(0.19), &table).bucket, "below");
        assert_eq!(classify(Some(0.2), &table).bucket, "optimal");
        assert_eq!(classify(Some(0.5), &table).bucket, "optimal");
        assert_eq!(classify(Some(0.51), &table).bucket, "above");
    }

    #[test]
    fn first_match_wins_on_overlap() {
        let table = ThresholdTable::new(vec![
            Threshold::new("zero", "No supply", Predicate::equals(0.0)),
            Threshold::new("low", "Below 40", Predicate::below(40.0)),
        ]);
        assert_eq!(classify(Some(0.0), &table).bucket, "zero");
        assert_eq!(classify(Some(12.0), &table).bucket, "low");
    }

    #[test]
    fn missing_value_is_no_data() {
        let table = chlorine();
        let c = classify(None, &table);
        assert_eq!(c.bucket, "no_data");
        assert_eq!(c.label, "No Data");
        assert_eq!(classify(Some(f64::NAN), &table).bucket, "no_data");
    }

    #[test]
    fn unmatched_value_is_out_of_range() {
        let table = ThresholdTable::new(vec![Threshold::new(
            "optimal",
            "Optimal",
            Predicate::between(0.2, 0.5),
        )]);
        assert_eq!(classify(Some(3.0), &table).bucket, "out_of_range");
    }

    #[test]
    fn shared_bucket_names_list_once() {
        let table = ThresholdTable::new(vec![
            Threshold::new("out", "Out of band", Predicate::below(0.2)),
            Threshold::new("ok", "In band", Predicate::between(0.2, 0.5)),
            Threshold::new("out", "Out of band (high)", Predicate::above(0.5)),
        ]);
        let names: Vec<String> = table.buckets().into_iter().map(|b| b.bucket).collect();
        assert_eq!(names, vec!["out", "ok", "no_data", "out_of_range"]);
        assert_eq!(classify(Some(0.9), &table).bucket, "out");
    }

    #[test]
    fn consistency_needs_a_full_window() {
        let full = Series::from_values(&[Some(0.3); SERIES_LEN]);
        let optimal = Predicate::between(0.2, 0.5);
        assert!(classify_consistency(&full, &optimal));

        let mut partial = [Some(0.3); SERIES_LEN];
        partial[2] = None;
        assert!(!classify_consistency(&Series::from_values(&partial), &optimal));

        let mut one_off = [Some(0.3); SERIES_LEN];
        one_off[6] = Some(0.9);
        assert!(!classify_consistency(&Series::from_values(&one_off), &optimal));
    }

    #[test]
    fn predicates_deserialize_from_tagged_form() {
        let p: Predicate =
            serde_json::from_str(r#"{"kind":"below","max":0.2,"inclusive":true}"#).unwrap();
        assert!(p.matches(0.2));
        let p: Predicate = serde_json::from_str(r#"{"kind":"between","min":40,"max":55}"#).unwrap();
        assert_eq!(p, Predicate::between(40.0, 55.0));
    }
}
