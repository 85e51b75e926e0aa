//! Seven-day reading windows and latest-value extraction.
//!
//! Dashboards receive readings as `day1..day7` columns where `day7` is the
//! most recent day. Any slot may be blank or hold junk; those slots are
//! simply absent.

use chrono::NaiveDate;
use serde::Serialize;

use crate::util::{parse_date_safe, parse_f64_safe};

/// Number of daily slots in a reading window.
pub const SERIES_LEN: usize = 7;

/// Return the most recent usable value, scanning from the last slot down.
///
/// Non-finite values count as absent.
pub fn latest(values: &[Option<f64>]) -> Option<f64> {
    values
        .iter()
        .rev()
        .find_map(|v| v.filter(|n| n.is_finite()))
}

/// Same as [`latest`], over raw cell text. Blank and non-numeric cells are
/// skipped rather than reported.
pub fn latest_raw(values: &[Option<&str>]) -> Option<f64> {
    values.iter().rev().find_map(|v| parse_f64_safe(*v))
}

/// One metric's sliding window of daily readings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Series {
    values: [Option<f64>; SERIES_LEN],
    dates: [Option<NaiveDate>; SERIES_LEN],
}

impl Series {
    /// Build a series from already-typed slots. Slots beyond
    /// [`SERIES_LEN`] are ignored; missing slots stay empty.
    pub fn new(values: &[Option<f64>], dates: &[Option<NaiveDate>]) -> Self {
        let mut series = Self::default();
        for (slot, v) in series.values.iter_mut().zip(values) {
            *slot = v.filter(|n| n.is_finite());
        }
        for (slot, d) in series.dates.iter_mut().zip(dates) {
            *slot = *d;
        }
        series
    }

    /// Build a series from raw cell text as found in an export.
    pub fn from_raw(values: &[Option<&str>], dates: &[Option<&str>]) -> Self {
        let values: Vec<Option<f64>> = values.iter().map(|v| parse_f64_safe(*v)).collect();
        let dates: Vec<Option<NaiveDate>> = dates.iter().map(|d| parse_date_safe(*d)).collect();
        Self::new(&values, &dates)
    }

    pub fn from_values(values: &[Option<f64>]) -> Self {
        Self::new(values, &[])
    }

    pub fn values(&self) -> &[Option<f64>; SERIES_LEN] {
        &self.values
    }

    pub fn dates(&self) -> &[Option<NaiveDate>; SERIES_LEN] {
        &self.dates
    }

    pub fn latest(&self) -> Option<f64> {
        latest(&self.values)
    }

    /// Latest value together with the date recorded in the same slot.
    pub fn latest_reading(&self) -> Option<(f64, Option<NaiveDate>)> {
        (0..SERIES_LEN)
            .rev()
            .find_map(|i| self.values[i].map(|v| (v, self.dates[i])))
    }

    pub fn defined_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.defined_count() == 0
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn latest_is_highest_defined_slot(slots in prop::collection::vec(prop::option::of(-10.0_f64..10.0), 0..=SERIES_LEN)) {
            let expected = slots.iter().rposition(|v| v.is_some()).and_then(|i| slots[i]);
            prop_assert_eq!(latest(&slots), expected);
            prop_assert_eq!(Series::from_values(&slots).latest(), expected);
        }
    }
}
