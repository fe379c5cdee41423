use chrono::{DateTime, FixedOffset, NaiveDateTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// A single recorded access to a short URL.
///
/// Only `date` is processed by the aggregation engine. The remaining fields
/// are carried along so selected buckets can be shown in detail tables.
/// Visits coming from the API are normalized into this shape when loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    pub date: DateTime<FixedOffset>,
    #[serde(default)]
    pub referer: Option<String>,
    #[serde(default)]
    pub browser: Option<String>,
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub potential_bot: bool,
}

impl Visit {
    pub fn new(date: DateTime<FixedOffset>) -> Self {
        Self {
            date,
            referer: None,
            browser: None,
            os: None,
            country: None,
            city: None,
            potential_bot: false,
        }
    }

    /// Wall-clock time of the visit in `tz`, daylight saving time included
    pub fn local_date(&self, tz: &Tz) -> NaiveDateTime {
        self.date.with_timezone(tz).naive_local()
    }
}

/// Parameters of a visits load, remembered so a reload can repeat it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitsParams {
    pub start_date: Option<DateTime<FixedOffset>>,
    pub end_date: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub exclude_bots: bool,
}

impl VisitsParams {
    /// Whether a visit falls inside the requested range and bot policy
    pub fn matches(&self, visit: &Visit) -> bool {
        if self.exclude_bots && visit.potential_bot {
            return false;
        }
        if let Some(start) = self.start_date {
            if visit.date < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if visit.date > end {
                return false;
            }
        }
        true
    }
}
