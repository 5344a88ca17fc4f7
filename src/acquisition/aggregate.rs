//! Temporal resampling of a raw series into coarser buckets.
//!
//! Aggregation semantics follow the variable category: temperature buckets
//! keep the spread (min/mean/max), precipitation accumulates, everything else
//! averages. Buckets with no valid observations are omitted, never emitted as
//! zero or null.

use crate::types::aggregation::Aggregation;
use crate::types::observation::ObservationSeries;
use crate::types::variable::VariableCategory;
use chrono::NaiveDateTime;
use polars::prelude::*;

#[derive(Debug)]
struct BucketStats {
    start: NaiveDateTime,
    count: usize,
    sum: f64,
    min: f64,
    max: f64,
}

impl BucketStats {
    fn new(start: NaiveDateTime, value: f64) -> Self {
        Self {
            start,
            count: 1,
            sum: value,
            min: value,
            max: value,
        }
    }

    fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    fn mean(&self) -> f64 {
        self.sum / self.count as f64
    }
}

/// Resamples `series` into `bucket`-sized buckets.
///
/// Output schema depends on the category: temperature yields `tiempo`,
/// `valor_mean`, `valor_min`, `valor_max`; precipitation and generic
/// variables yield `tiempo`, `valor` (sum and mean respectively).
pub fn aggregate_series(
    series: &ObservationSeries,
    category: VariableCategory,
    bucket: Aggregation,
) -> PolarsResult<DataFrame> {
    // The series is sorted, so observations of one bucket are consecutive.
    let mut buckets: Vec<BucketStats> = Vec::new();
    for obs in series.iter() {
        let Some(value) = obs.value.filter(|v| !v.is_nan()) else {
            continue;
        };
        let start = bucket.bucket_start(obs.timestamp);
        match buckets.last_mut() {
            Some(stats) if stats.start == start => stats.push(value),
            _ => buckets.push(BucketStats::new(start, value)),
        }
    }

    let tiempo = datetime_column("tiempo", buckets.iter().map(|b| b.start))?;
    match category {
        VariableCategory::Temperature => {
            let mean: Vec<f64> = buckets.iter().map(BucketStats::mean).collect();
            let min: Vec<f64> = buckets.iter().map(|b| b.min).collect();
            let max: Vec<f64> = buckets.iter().map(|b| b.max).collect();
            DataFrame::new(vec![
                tiempo,
                Column::new("valor_mean".into(), mean),
                Column::new("valor_min".into(), min),
                Column::new("valor_max".into(), max),
            ])
        }
        VariableCategory::Precipitation => {
            let sum: Vec<f64> = buckets.iter().map(|b| b.sum).collect();
            DataFrame::new(vec![tiempo, Column::new("valor".into(), sum)])
        }
        _ => {
            let mean: Vec<f64> = buckets.iter().map(BucketStats::mean).collect();
            DataFrame::new(vec![tiempo, Column::new("valor".into(), mean)])
        }
    }
}

fn datetime_column(
    name: &str,
    timestamps: impl Iterator<Item = NaiveDateTime>,
) -> PolarsResult<Column> {
    let ms: Vec<i64> = timestamps
        .map(|ts| ts.and_utc().timestamp_millis())
        .collect();
    Column::new(name.into(), ms).cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
}
