//! Visit aggregation engine
//!
//! Buckets timestamped visits into hourly, daily, weekly or monthly steps,
//! fills the gaps of the time axis and produces the series of a line chart,
//! optionally overlaid with a highlighted subset of the visits.

pub mod chart;
pub mod grouping;
pub mod series;
pub mod step;

pub use chart::{ChartData, ChartDataset, VisitsChart, HIGHLIGHTED_COLOR, MAIN_COLOR};
pub use grouping::{fill_gaps, group_by_step, visits_by_bucket, GroupedSeries};
pub use series::{build_series, generate_labels, Series};
pub use step::{infer_step, Step, STANDARD_DATE_FORMAT};
