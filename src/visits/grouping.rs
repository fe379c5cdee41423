//! Bucketing of visits by step

use chrono::NaiveDateTime;
use chrono_tz::Tz;
use std::collections::HashMap;

use super::step::Step;
use crate::models::Visit;

/// Visit counts per bucket key, remembering the order keys were first seen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupedSeries {
    entries: Vec<(String, u64)>,
    index: HashMap<String, usize>,
}

impl GroupedSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one visit to the bucket identified by `key`
    pub fn increment(&mut self, key: String) {
        match self.index.get(&key) {
            Some(&position) => self.entries[position].1 += 1,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, 1));
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<u64> {
        self.index.get(key).map(|&position| self.entries[position].1)
    }

    /// Keys in first-seen order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// Counts in first-seen order
    pub fn counts(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries.iter().map(|(_, count)| *count)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(key, count)| (key.as_str(), *count))
    }

    /// Sum of all bucket counts
    pub fn total(&self) -> u64 {
        self.counts().sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Wall-clock dates of `visits` in `tz`, oldest first
pub(crate) fn chronological_dates(visits: &[Visit], tz: &Tz) -> Vec<NaiveDateTime> {
    let mut dates: Vec<NaiveDateTime> = visits.iter().map(|v| v.local_date(tz)).collect();
    dates.sort();
    dates
}

/// Count visits per bucket, processing them oldest first
pub fn group_by_step(step: Step, visits: &[Visit], tz: &Tz) -> GroupedSeries {
    let mut grouped = GroupedSeries::new();
    for date in chronological_dates(visits, tz) {
        grouped.increment(step.format_key(date));
    }
    grouped
}

/// The visits composing each bucket, used to map chart clicks back to visits
pub fn visits_by_bucket(
    step: Step,
    visits: &[Visit],
    tz: &Tz,
) -> HashMap<String, Vec<Visit>> {
    let mut buckets: HashMap<String, Vec<Visit>> = HashMap::new();
    for visit in visits {
        buckets
            .entry(step.format_key(visit.local_date(tz)))
            .or_default()
            .push(visit.clone());
    }
    buckets
}

/// Reindex a grouped series onto `labels`, using zero for missing buckets
pub fn fill_gaps(grouped: &GroupedSeries, labels: &[String]) -> Vec<u64> {
    labels
        .iter()
        .map(|label| grouped.get(label).unwrap_or(0))
        .collect()
}
