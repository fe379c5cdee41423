//! Label and count generation for line charts

use chrono::NaiveDateTime;
use chrono_tz::Tz;

use super::grouping::{chronological_dates, fill_gaps, group_by_step, GroupedSeries};
use super::step::Step;
use crate::models::Visit;

/// Labels and counts of a chart series, aligned by position
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Series {
    pub labels: Vec<String>,
    pub counts: Vec<u64>,
}

/// Every bucket label from the oldest to the newest date, inclusive
///
/// Iteration starts at the start of the oldest bucket, so the amount of
/// labels is the whole-step difference between both bucket starts plus one.
pub fn generate_labels(step: Step, oldest: NaiveDateTime, newest: NaiveDateTime) -> Vec<String> {
    let first = step.bucket_start(oldest);
    let last = step.bucket_start(newest);
    let size = u32::try_from(step.diff(last, first)).unwrap_or(0);

    (0..=size)
        .filter_map(|amount| step.advance(first, amount))
        .map(|date| step.format_key(date))
        .collect()
}

/// Build the primary series of a chart
///
/// With `skip_empty` only buckets that have visits are returned, in the
/// order they were first produced. Otherwise the time axis is continuous and
/// empty buckets count zero.
pub fn build_series(visits: &[Visit], step: Step, skip_empty: bool, tz: &Tz) -> Series {
    let grouped = group_by_step(step, visits, tz);
    series_from_grouped(&grouped, visits, step, skip_empty, tz)
}

pub(crate) fn series_from_grouped(
    grouped: &GroupedSeries,
    visits: &[Visit],
    step: Step,
    skip_empty: bool,
    tz: &Tz,
) -> Series {
    if skip_empty {
        return Series {
            labels: grouped.keys().map(str::to_string).collect(),
            counts: grouped.counts().collect(),
        };
    }

    let dates = chronological_dates(visits, tz);
    let (Some(&oldest), Some(&newest)) = (dates.first(), dates.last()) else {
        return Series::default();
    };

    let labels = generate_labels(step, oldest, newest);
    let counts = fill_gaps(grouped, &labels);
    Series { labels, counts }
}
