//! Dashboard card counts over a filtered record set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::classify::{classify, classify_consistency, Threshold, ThresholdTable};
use crate::types::{Filterable, Metric};

/// Everything one dashboard needs to turn readings into cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketTable {
    pub metric: Metric,
    pub title: String,
    #[serde(default)]
    pub unit: String,
    pub thresholds: ThresholdTable,
    /// "Consistent for 7 days" cards; counted independently of the
    /// point-in-time buckets.
    #[serde(default)]
    pub consistency: Vec<Threshold>,
}

impl BucketTable {
    fn latest_of<R: Filterable + ?Sized>(&self, record: &R) -> Option<f64> {
        record.series(self.metric).and_then(|s| s.latest())
    }

    fn is_consistent<R: Filterable + ?Sized>(&self, record: &R, rule: &Threshold) -> bool {
        record
            .series(self.metric)
            .is_some_and(|s| classify_consistency(s, &rule.predicate))
    }

    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.thresholds.contains(bucket) || self.consistency.iter().any(|c| c.bucket == bucket)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    pub bucket: String,
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Cards {
    /// Point-in-time buckets in table order, then no-data and out-of-range.
    pub point: Vec<Card>,
    pub consistency: Vec<Card>,
}

impl Cards {
    pub fn count(&self, bucket: &str) -> Option<usize> {
        self.point
            .iter()
            .chain(&self.consistency)
            .find(|c| c.bucket == bucket)
            .map(|c| c.count)
    }

    pub fn total(&self) -> usize {
        self.point.iter().map(|c| c.count).sum()
    }

    pub fn to_map(&self) -> BTreeMap<String, usize> {
        self.point
            .iter()
            .map(|c| (c.bucket.clone(), c.count))
            .collect()
    }

    pub fn consistency_map(&self) -> BTreeMap<String, usize> {
        self.consistency
            .iter()
            .map(|c| (c.bucket.clone(), c.count))
            .collect()
    }
}

/// Count records per bucket. Each record is classified once for the
/// point-in-time cards; each consistency card is a separate pass.
pub fn aggregate<'a, R, I>(records: I, table: &BucketTable) -> Cards
where
    R: Filterable + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let records: Vec<&R> = records.into_iter().collect();

    let mut point: Vec<Card> = table
        .thresholds
        .buckets()
        .into_iter()
        .map(|b| Card {
            bucket: b.bucket,
            label: b.label,
            count: 0,
        })
        .collect();
    let index: BTreeMap<String, usize> = point
        .iter()
        .enumerate()
        .map(|(i, c)| (c.bucket.clone(), i))
        .collect();

    for r in &records {
        let class = classify(table.latest_of(*r), &table.thresholds);
        if let Some(&i) = index.get(&class.bucket) {
            point[i].count += 1;
        }
    }

    let consistency = table
        .consistency
        .iter()
        .map(|rule| Card {
            bucket: rule.bucket.clone(),
            label: rule.label.clone(),
            count: records.iter().filter(|r| table.is_consistent(**r, rule)).count(),
        })
        .collect();

    tracing::trace!(records = records.len(), metric = %table.metric, "aggregated cards");
    Cards { point, consistency }
}

/// Records behind one card: matched by point-in-time classification for a
/// threshold bucket, or by a full consistent window for a consistency
/// bucket. An unknown bucket selects nothing.
pub fn in_bucket<'a, R, I>(records: I, table: &BucketTable, bucket: &str) -> Vec<&'a R>
where
    R: Filterable + 'a,
    I: IntoIterator<Item = &'a R>,
{
    if let Some(rule) = table.consistency.iter().find(|c| c.bucket == bucket) {
        return records
            .into_iter()
            .filter(|r| table.is_consistent(*r, rule))
            .collect();
    }
    if !table.thresholds.contains(bucket) {
        return Vec::new();
    }
    records
        .into_iter()
        .filter(|r| classify(table.latest_of(*r), &table.thresholds).bucket == bucket)
        .collect()
}
