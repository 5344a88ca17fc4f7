//! Temporal aggregation resolutions.

use chrono::{Datelike, Duration, NaiveDateTime, Timelike};
use std::fmt;

/// The bucket width used when resampling a raw series.
///
/// ```
/// use agromet::Aggregation;
///
/// assert_eq!(Aggregation::Daily.to_string(), "daily");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aggregation {
    /// One bucket per clock hour.
    Hourly,
    /// One bucket per calendar day.
    Daily,
    /// One bucket per ISO week, anchored on Monday.
    Weekly,
    /// One bucket per calendar month.
    Monthly,
}

impl Aggregation {
    /// The start of the bucket containing `ts`. Observations map to a bucket
    /// by truncation; buckets with no observations are never emitted.
    pub fn bucket_start(&self, ts: NaiveDateTime) -> NaiveDateTime {
        let midnight = ts.date().and_hms_opt(0, 0, 0).expect("midnight exists");
        match self {
            Aggregation::Hourly => midnight + Duration::hours(i64::from(ts.hour())),
            Aggregation::Daily => midnight,
            Aggregation::Weekly => {
                midnight - Duration::days(i64::from(ts.weekday().num_days_from_monday()))
            }
            Aggregation::Monthly => ts
                .date()
                .with_day(1)
                .expect("first of month exists")
                .and_hms_opt(0, 0, 0)
                .expect("midnight exists"),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Aggregation::Hourly => "hourly",
            Aggregation::Daily => "daily",
            Aggregation::Weekly => "weekly",
            Aggregation::Monthly => "monthly",
        };
        write!(f, "{label}")
    }
}
