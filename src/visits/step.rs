//! Aggregation steps and the calendar arithmetic behind them

use chrono::{Datelike, Duration, Months, NaiveDateTime, NaiveTime, Timelike};
use std::fmt;
use std::str::FromStr;

/// Date format shared by daily and weekly bucket keys
pub const STANDARD_DATE_FORMAT: &str = "%Y-%m-%d";

/// Granularity used to bucket visits on the time axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Step {
    Hourly,
    Daily,
    Weekly,
    Monthly,
}

impl Step {
    /// Order in which steps are offered in the "group by" menu
    pub const ALL: [Step; 4] = [Step::Monthly, Step::Weekly, Step::Daily, Step::Hourly];

    /// Axis title for charts grouped by this step
    pub fn display_name(self) -> &'static str {
        match self {
            Step::Hourly => "Hour",
            Step::Daily => "Day",
            Step::Weekly => "Week",
            Step::Monthly => "Month",
        }
    }

    /// Start of the bucket containing `date`
    pub fn bucket_start(self, date: NaiveDateTime) -> NaiveDateTime {
        let midnight = date.date().and_time(NaiveTime::default());
        match self {
            Step::Hourly => midnight + Duration::hours(i64::from(date.hour())),
            Step::Daily => midnight,
            Step::Weekly => {
                midnight - Duration::days(i64::from(date.weekday().num_days_from_monday()))
            }
            Step::Monthly => midnight - Duration::days(i64::from(date.day0())),
        }
    }

    /// Bucket key (chart label) for the bucket containing `date`
    pub fn format_key(self, date: NaiveDateTime) -> String {
        match self {
            Step::Hourly => date.format("%Y-%m-%d %H:00").to_string(),
            Step::Daily => date.format(STANDARD_DATE_FORMAT).to_string(),
            Step::Weekly => {
                let first_week_day = Step::Weekly.bucket_start(date);
                let last_week_day = first_week_day + Duration::days(6);
                format!(
                    "{} - {}",
                    first_week_day.format(STANDARD_DATE_FORMAT),
                    last_week_day.format(STANDARD_DATE_FORMAT)
                )
            }
            Step::Monthly => date.format("%Y-%m").to_string(),
        }
    }

    /// Moves `date` forward by `amount` steps
    pub fn advance(self, date: NaiveDateTime, amount: u32) -> Option<NaiveDateTime> {
        let amount_i64 = i64::from(amount);
        match self {
            Step::Hourly => date.checked_add_signed(Duration::hours(amount_i64)),
            Step::Daily => date.checked_add_signed(Duration::days(amount_i64)),
            Step::Weekly => date.checked_add_signed(Duration::weeks(amount_i64)),
            Step::Monthly => date.checked_add_months(Months::new(amount)),
        }
    }

    /// Whole steps elapsed between `earlier` and `later`, truncated toward zero
    pub fn diff(self, later: NaiveDateTime, earlier: NaiveDateTime) -> i64 {
        match self {
            Step::Hourly => (later - earlier).num_hours(),
            Step::Daily => (later - earlier).num_days(),
            Step::Weekly => (later - earlier).num_days() / 7,
            Step::Monthly => months_between(later, earlier),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Hourly => "hourly",
            Step::Daily => "daily",
            Step::Weekly => "weekly",
            Step::Monthly => "monthly",
        };
        f.write_str(name)
    }
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hourly" | "hour" => Ok(Step::Hourly),
            "daily" | "day" => Ok(Step::Daily),
            "weekly" | "week" => Ok(Step::Weekly),
            "monthly" | "month" => Ok(Step::Monthly),
            other => Err(format!("unknown step '{other}'")),
        }
    }
}

/// Full calendar months between two instants
fn months_between(later: NaiveDateTime, earlier: NaiveDateTime) -> i64 {
    if later < earlier {
        return -months_between(earlier, later);
    }

    let mut months = i64::from(later.year() - earlier.year()) * 12
        + i64::from(later.month()) - i64::from(earlier.month());

    // The last month only counts once its day and time have been reached
    if months > 0 {
        let reached = u32::try_from(months)
            .ok()
            .and_then(|m| earlier.checked_add_months(Months::new(m)))
            .map(|anniversary| anniversary <= later)
            .unwrap_or(false);
        if !reached {
            months -= 1;
        }
    }

    months
}

/// Picks the step that best fits the age of the oldest visit
///
/// Up to two full days is hourly, up to one full month daily, up to six
/// months weekly, anything older monthly.
pub fn infer_step(oldest: NaiveDateTime, now: NaiveDateTime) -> Step {
    if Step::Daily.diff(now, oldest) <= 2 {
        Step::Hourly
    } else if Step::Monthly.diff(now, oldest) <= 1 {
        Step::Daily
    } else if Step::Monthly.diff(now, oldest) <= 6 {
        Step::Weekly
    } else {
        Step::Monthly
    }
}
