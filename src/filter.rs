//! Cascading geographic and status filters.
//!
//! The geographic levels form a strict hierarchy: choosing a value at one
//! level always resets every finer level, so a stale village selection can
//! never survive a region change.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::debug;

use crate::types::{Filterable, GEO_LEVELS};

/// Sentinel meaning "no selection" for a level or status field.
pub const ALL: &str = "all";

/// Ordered geographic level names, coarsest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hierarchy {
    levels: Vec<String>,
}

impl Default for Hierarchy {
    fn default() -> Self {
        Self::new(GEO_LEVELS.iter().map(|l| l.to_string()).collect())
    }
}

impl Hierarchy {
    pub fn new(levels: Vec<String>) -> Self {
        Self { levels }
    }

    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    pub fn index_of(&self, level: &str) -> Option<usize> {
        self.levels.iter().position(|l| l == level)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

/// Cross-field rule: `when_field == when_value` forces `force_field`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    pub when_field: String,
    pub when_value: String,
    pub force_field: String,
    pub force_value: String,
}

impl Constraint {
    pub fn new(
        when_field: impl Into<String>,
        when_value: impl Into<String>,
        force_field: impl Into<String>,
        force_value: impl Into<String>,
    ) -> Self {
        Self {
            when_field: when_field.into(),
            when_value: when_value.into(),
            force_field: force_field.into(),
            force_value: force_value.into(),
        }
    }

    /// A fully completed scheme has necessarily been commissioned.
    pub fn completed_implies_commissioned() -> Self {
        Self::new("completion_status", "Fully Completed", "commissioned", "Yes")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    hierarchy: Hierarchy,
    levels: Vec<String>,
    status: BTreeMap<String, String>,
    bucket: Option<String>,
    constraints: Vec<Constraint>,
}

impl Default for FilterState {
    fn default() -> Self {
        Self::new(Hierarchy::default())
    }
}

impl FilterState {
    pub fn new(hierarchy: Hierarchy) -> Self {
        let levels = vec![ALL.to_string(); hierarchy.len()];
        Self {
            hierarchy,
            levels,
            status: BTreeMap::new(),
            bucket: None,
            constraints: Vec::new(),
        }
    }

    pub fn with_constraints(mut self, constraints: Vec<Constraint>) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn level_index(&self, level: &str) -> Option<usize> {
        self.hierarchy.index_of(level)
    }

    /// Select `value` at `level` and reset every finer level to [`ALL`].
    ///
    /// # Panics
    ///
    /// Panics if `level` is not part of the hierarchy; that is a mismatch
    /// between the caller's configuration and this filter.
    pub fn set_level(&mut self, level: &str, value: impl Into<String>) {
        let Some(idx) = self.hierarchy.index_of(level) else {
            panic!(
                "unknown filter level `{}` (known: {:?})",
                level,
                self.hierarchy.levels()
            );
        };
        let value = value.into();
        debug!(filter_level = level, value = %value, "set filter level");
        self.levels[idx] = value;
        for finer in &mut self.levels[idx + 1..] {
            *finer = ALL.to_string();
        }
    }

    /// Current selection at `level`, or [`ALL`] for a name not in the
    /// hierarchy.
    pub fn level(&self, level: &str) -> &str {
        self.hierarchy
            .index_of(level)
            .map(|i| self.levels[i].as_str())
            .unwrap_or(ALL)
    }

    /// Finest level with a selection, or the top level when nothing is
    /// selected.
    pub fn current_level(&self) -> &str {
        let idx = self.levels.iter().rposition(|v| v != ALL).unwrap_or(0);
        self.hierarchy
            .levels
            .get(idx)
            .map(String::as_str)
            .unwrap_or(ALL)
    }

    /// Selected levels in hierarchy order.
    pub fn active_levels(&self) -> impl Iterator<Item = (&str, &str)> {
        self.hierarchy
            .levels
            .iter()
            .zip(&self.levels)
            .filter(|(_, v)| v.as_str() != ALL)
            .map(|(l, v)| (l.as_str(), v.as_str()))
    }

    pub fn set_status_filter(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        debug!(field = name, value = %value, "set status filter");
        if value == ALL {
            self.status.remove(name);
        } else {
            self.status.insert(name.to_string(), value);
        }
    }

    pub fn status_filter(&self, name: &str) -> &str {
        self.status.get(name).map(String::as_str).unwrap_or(ALL)
    }

    pub fn status_filters(&self) -> &BTreeMap<String, String> {
        &self.status
    }

    /// Changes forced on other status fields when `changed_field` becomes
    /// `new_value`. Pure; nothing is applied.
    pub fn apply_constraint(&self, changed_field: &str, new_value: &str) -> Vec<(String, String)> {
        self.constraints
            .iter()
            .filter(|c| c.when_field == changed_field && c.when_value == new_value)
            .map(|c| (c.force_field.clone(), c.force_value.clone()))
            .collect()
    }

    /// Set a status filter together with whatever the constraints force,
    /// following chains (a forced value may force another) until nothing
    /// changes. Each field is forced at most once and the field the caller
    /// set is never overridden, so cyclic rules still terminate. Returns
    /// the forced changes in the order they were applied.
    pub fn set_status_filter_constrained(
        &mut self,
        name: &str,
        value: impl Into<String>,
    ) -> Vec<(String, String)> {
        let value = value.into();
        let mut settled = BTreeSet::from([name.to_string()]);
        let mut pending: VecDeque<(String, String)> = self.apply_constraint(name, &value).into();
        self.set_status_filter(name, value);

        let mut forced = Vec::new();
        while let Some((field, forced_value)) = pending.pop_front() {
            if !settled.insert(field.clone()) {
                continue;
            }
            pending.extend(self.apply_constraint(&field, &forced_value));
            self.set_status_filter(&field, forced_value.clone());
            forced.push((field, forced_value));
        }
        forced
    }

    pub fn select_bucket(&mut self, bucket: Option<String>) {
        self.bucket = bucket;
    }

    pub fn selected_bucket(&self) -> Option<&str> {
        self.bucket.as_deref()
    }

    /// Reset every level, status filter and the bucket selection.
    pub fn clear(&mut self) {
        for v in &mut self.levels {
            *v = ALL.to_string();
        }
        self.status.clear();
        self.bucket = None;
    }

    pub fn matches<R: Filterable + ?Sized>(&self, record: &R) -> bool {
        self.matches_levels(record, self.levels.len()) && self.matches_status(record)
    }

    fn matches_levels<R: Filterable + ?Sized>(&self, record: &R, upto: usize) -> bool {
        let geo = record.geo();
        self.hierarchy.levels[..upto]
            .iter()
            .zip(&self.levels[..upto])
            .filter(|(_, v)| v.as_str() != ALL)
            .all(|(level, v)| geo.get(level) == Some(v.as_str()))
    }

    fn matches_status<R: Filterable + ?Sized>(&self, record: &R) -> bool {
        self.status
            .iter()
            .all(|(field, v)| record.status(field) == Some(v.as_str()))
    }

    /// Records passing every active predicate, in input order.
    pub fn apply<'a, R: Filterable>(&self, records: &'a [R]) -> Vec<&'a R> {
        records.iter().filter(|r| self.matches(*r)).collect()
    }

    /// Distinct values available at `level` given the coarser selections.
    /// Finer selections and status filters are not applied.
    pub fn options<R: Filterable>(&self, records: &[R], level: &str) -> Vec<String> {
        let Some(idx) = self.hierarchy.index_of(level) else {
            return Vec::new();
        };
        records
            .iter()
            .filter(|r| self.matches_levels(*r, idx))
            .filter_map(|r| r.geo().get(level).map(str::to_string))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GeoScope, SchemeRecord, StatusFields};

    fn scheme(id: &str, region: &str, village: &str, status: &[(&str, &str)]) -> SchemeRecord {
        SchemeRecord {
            scheme_id: id.to_string(),
            scheme_name: format!("Scheme {}", id),
            geo: GeoScope {
                region: region.to_string(),
                division: format!("{} Division", region),
                village: village.to_string(),
                ..GeoScope::default()
            },
            status: status
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<StatusFields>(),
        }
    }

    fn sample() -> Vec<SchemeRecord> {
        let mut records = vec![
            scheme("1", "Nagpur", "X", &[("commissioned", "Yes")]),
            scheme("2", "Nagpur", "X", &[("commissioned", "No")]),
            scheme("3", "Nagpur", "X", &[]),
            scheme("4", "Nagpur", "Y", &[("commissioned", "Yes")]),
            scheme("5", "Pune", "Z", &[("commissioned", "Yes")]),
            scheme("6", "Pune", "X", &[("commissioned", "No")]),
        ];
        for i in 7..=10 {
            records.push(scheme(&i.to_string(), "Amravati", "W", &[]));
        }
        records
    }

    fn ids(records: &[&SchemeRecord]) -> Vec<String> {
        records.iter().map(|r| r.scheme_id.clone()).collect()
    }

    #[test]
    fn region_then_village_then_region_again() {
        let records = sample();
        let mut filter = FilterState::default();

        filter.set_level("region", "Nagpur");
        assert_eq!(filter.apply(&records).len(), 4);

        filter.set_level("village", "X");
        assert_eq!(filter.apply(&records).len(), 3);
        assert_eq!(filter.current_level(), "village");

        filter.set_level("region", "Pune");
        assert_eq!(filter.level("village"), ALL);
        assert_eq!(ids(&filter.apply(&records)), vec!["5", "6"]);
        assert_eq!(filter.current_level(), "region");
    }

    #[test]
    fn setting_a_middle_level_resets_only_finer_levels() {
        let mut filter = FilterState::default();
        filter.set_level("region", "Nagpur");
        filter.set_level("division", "Nagpur Division");
        filter.set_level("block", "Kamptee");
        filter.set_level("village", "X");

        filter.set_level("circle", "Circle 2");
        assert_eq!(filter.level("region"), "Nagpur");
        assert_eq!(filter.level("division"), "Nagpur Division");
        assert_eq!(filter.level("block"), ALL);
        assert_eq!(filter.level("village"), ALL);

        filter.set_level("division", ALL);
        assert_eq!(filter.level("circle"), ALL);
        assert_eq!(filter.current_level(), "region");
    }

    #[test]
    #[should_panic(expected = "unknown filter level")]
    fn unknown_level_fails_fast() {
        FilterState::default().set_level("district", "Nagpur");
    }

    #[test]
    fn current_level_defaults_to_top() {
        assert_eq!(FilterState::default().current_level(), "region");
    }

    #[test]
    fn missing_status_field_excludes_record() {
        let records = sample();
        let mut filter = FilterState::default();
        filter.set_level("region", "Nagpur");
        filter.set_status_filter("commissioned", "Yes");
        assert_eq!(ids(&filter.apply(&records)), vec!["1", "4"]);

        filter.set_status_filter("commissioned", ALL);
        assert_eq!(filter.apply(&records).len(), 4);
    }

    #[test]
    fn clear_restores_full_set_in_order() {
        let records = sample();
        let mut filter = FilterState::default();
        filter.set_level("region", "Pune");
        filter.set_status_filter("commissioned", "No");
        filter.select_bucket(Some("optimal".into()));
        filter.clear();

        let all: Vec<&SchemeRecord> = records.iter().collect();
        assert_eq!(filter.apply(&records), all);
        assert_eq!(filter.selected_bucket(), None);
    }

    #[test]
    fn completion_forces_commissioned() {
        let mut filter = FilterState::default()
            .with_constraints(vec![Constraint::completed_implies_commissioned()]);

        assert_eq!(
            filter.apply_constraint("completion_status", "Fully Completed"),
            vec![("commissioned".to_string(), "Yes".to_string())]
        );
        assert!(filter.apply_constraint("completion_status", "In Progress").is_empty());

        let forced = filter.set_status_filter_constrained("completion_status", "Fully Completed");
        assert_eq!(forced.len(), 1);
        assert_eq!(filter.status_filter("commissioned"), "Yes");
        assert_eq!(filter.status_filter("completion_status"), "Fully Completed");
    }

    #[test]
    fn chained_constraints_follow_through() {
        let mut filter = FilterState::default().with_constraints(vec![
            Constraint::new("commissioned", "Yes", "power_connected", "Yes"),
            Constraint::completed_implies_commissioned(),
        ]);
        let forced = filter.set_status_filter_constrained("completion_status", "Fully Completed");
        assert_eq!(
            forced,
            vec![
                ("commissioned".to_string(), "Yes".to_string()),
                ("power_connected".to_string(), "Yes".to_string()),
            ]
        );
        assert_eq!(filter.status_filter("power_connected"), "Yes");
    }

    #[test]
    fn cyclic_constraints_keep_the_chosen_value() {
        let mut filter = FilterState::default().with_constraints(vec![
            Constraint::new("a", "1", "b", "1"),
            Constraint::new("b", "1", "a", "2"),
        ]);
        let forced = filter.set_status_filter_constrained("a", "1");
        assert_eq!(forced, vec![("b".to_string(), "1".to_string())]);
        assert_eq!(filter.status_filter("a"), "1");
        assert_eq!(filter.status_filter("b"), "1");
    }

    #[test]
    fn options_cascade_from_coarser_levels() {
        let records = sample();
        let mut filter = FilterState::default();
        assert_eq!(
            filter.options(&records, "region"),
            vec!["Amravati", "Nagpur", "Pune"]
        );

        filter.set_level("region", "Nagpur");
        assert_eq!(filter.options(&records, "village"), vec!["X", "Y"]);
        assert!(filter.options(&records, "district").is_empty());
    }

    #[test]
    fn custom_hierarchy_orders_levels() {
        let hierarchy = Hierarchy::new(vec!["region".into(), "block".into()]);
        let mut filter = FilterState::new(hierarchy);
        filter.set_level("region", "Nagpur");
        filter.set_level("block", "Kamptee");
        filter.set_level("region", "Pune");
        assert_eq!(filter.level("block"), ALL);
        assert_eq!(filter.active_levels().collect::<Vec<_>>(), vec![("region", "Pune")]);
    }
}
