//! Line chart state: active step, gap filling, highlight overlay and point selection

use chrono::{NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::grouping::{chronological_dates, fill_gaps, group_by_step, visits_by_bucket};
use super::series::{series_from_grouped, Series};
use super::step::{infer_step, Step};
use crate::models::Visit;

pub const MAIN_COLOR: &str = "#4696e5";
pub const HIGHLIGHTED_COLOR: &str = "#f77f28";
pub const DEFAULT_HIGHLIGHTED_LABEL: &str = "Selected";

/// One line of the chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartDataset {
    pub label: String,
    pub data: Vec<u64>,
    pub color: &'static str,
    pub fill: bool,
    pub tension: f32,
}

impl ChartDataset {
    fn new(data: Vec<u64>, label: &str, color: &'static str) -> Self {
        Self {
            label: label.to_string(),
            data,
            color,
            fill: false,
            tension: 0.2,
        }
    }
}

/// Everything a rendering surface needs to draw the chart
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
    pub axis_title: &'static str,
}

/// Per-instance state of a visits line chart
///
/// Derived data is recomputed from scratch whenever the step, the
/// skip-empty flag or any of the visit lists change.
#[derive(Debug, Clone)]
pub struct VisitsChart {
    tz: Tz,
    step: Step,
    skip_empty: bool,
    visits: Arc<[Visit]>,
    highlighted: Arc<[Visit]>,
    highlighted_label: String,
    selected_label: Option<String>,

    series: Series,
    highlighted_counts: Vec<u64>,
    buckets: HashMap<String, Vec<Visit>>,
}

impl VisitsChart {
    /// Create a chart whose step is inferred from the age of the oldest visit
    pub fn new(visits: impl Into<Arc<[Visit]>>, tz: Tz) -> Self {
        let now = Utc::now().with_timezone(&tz).naive_local();
        Self::new_at(visits, tz, now)
    }

    /// Same as [`VisitsChart::new`] with an explicit current time
    pub fn new_at(visits: impl Into<Arc<[Visit]>>, tz: Tz, now: NaiveDateTime) -> Self {
        let visits = visits.into();
        let step = chronological_dates(&visits, &tz)
            .first()
            .map(|oldest| infer_step(*oldest, now))
            .unwrap_or(Step::Monthly);

        let mut chart = Self {
            tz,
            step,
            skip_empty: true,
            visits,
            highlighted: Vec::<Visit>::new().into(),
            highlighted_label: DEFAULT_HIGHLIGHTED_LABEL.to_string(),
            selected_label: None,
            series: Series::default(),
            highlighted_counts: Vec::new(),
            buckets: HashMap::new(),
        };
        chart.recompute();
        chart
    }

    pub fn with_skip_empty(mut self, skip_empty: bool) -> Self {
        self.set_skip_empty(skip_empty);
        self
    }

    pub fn with_highlighted_label(mut self, label: impl Into<String>) -> Self {
        self.highlighted_label = label.into();
        self
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn skip_empty(&self) -> bool {
        self.skip_empty
    }

    pub fn visits(&self) -> &[Visit] {
        &self.visits
    }

    pub fn highlighted_visits(&self) -> &[Visit] {
        &self.highlighted
    }

    pub fn selected_label(&self) -> Option<&str> {
        self.selected_label.as_deref()
    }

    pub fn labels(&self) -> &[String] {
        &self.series.labels
    }

    pub fn counts(&self) -> &[u64] {
        &self.series.counts
    }

    /// Highlighted counts, positionally aligned with [`VisitsChart::labels`]
    pub fn highlighted_counts(&self) -> &[u64] {
        &self.highlighted_counts
    }

    pub fn set_step(&mut self, step: Step) {
        self.step = step;
        self.recompute();
    }

    pub fn set_skip_empty(&mut self, skip_empty: bool) {
        self.skip_empty = skip_empty;
        self.recompute();
    }

    pub fn toggle_skip_empty(&mut self) {
        self.set_skip_empty(!self.skip_empty);
    }

    pub fn set_visits(&mut self, visits: impl Into<Arc<[Visit]>>) {
        self.visits = visits.into();
        self.recompute();
    }

    pub fn set_highlighted_visits(&mut self, highlighted: impl Into<Arc<[Visit]>>) {
        self.highlighted = highlighted.into();
        self.recompute();
    }

    fn recompute(&mut self) {
        let grouped = group_by_step(self.step, &self.visits, &self.tz);
        self.series = series_from_grouped(
            &grouped,
            &self.visits,
            self.step,
            self.skip_empty,
            &self.tz,
        );
        self.buckets = visits_by_bucket(self.step, &self.visits, &self.tz);

        let highlighted = group_by_step(self.step, &self.highlighted, &self.tz);
        self.highlighted_counts = fill_gaps(&highlighted, &self.series.labels);

        debug!(
            step = %self.step,
            skip_empty = self.skip_empty,
            visits = self.visits.len(),
            highlighted = self.highlighted.len(),
            labels = self.series.labels.len(),
            "Recomputed visits chart"
        );
    }

    /// Chart labels and datasets; the highlighted line is only present
    /// when there are highlighted visits
    pub fn chart_data(&self) -> ChartData {
        let mut datasets = vec![ChartDataset::new(
            self.series.counts.clone(),
            "Visits",
            MAIN_COLOR,
        )];

        if !self.highlighted.is_empty() {
            datasets.push(ChartDataset::new(
                self.highlighted_counts.clone(),
                &self.highlighted_label,
                HIGHLIGHTED_COLOR,
            ));
        }

        ChartData {
            labels: self.series.labels.clone(),
            datasets,
            axis_title: self.step.display_name(),
        }
    }

    /// Handle a click on the point at `index`
    ///
    /// Returns the visits of the clicked bucket. Clicking the already
    /// selected point clears the selection and returns nothing.
    pub fn select_point(&mut self, index: usize) -> Vec<Visit> {
        let label = self.series.labels.get(index).cloned();

        if label.is_some() && label == self.selected_label {
            self.selected_label = None;
            return Vec::new();
        }

        let selected = label
            .as_ref()
            .and_then(|l| self.buckets.get(l))
            .cloned()
            .unwrap_or_default();
        self.selected_label = label;
        selected
    }

    /// Forget the selected point
    pub fn clear_selection(&mut self) {
        self.selected_label = None;
    }
}
