//! The in-memory time series representation: a sorted array of
//! `(timestamp, value)` observations for one (station, variable) pair.
//!
//! Values are `Option<f64>`; a `None` models a reading the service reported
//! but that could not be parsed as a number. Timestamps are strictly
//! increasing and unique, which every constructor enforces.

use crate::types::interval::Interval;
use chrono::{DateTime, NaiveDateTime};
use polars::prelude::*;

/// A single reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// Service-local timestamp of the reading.
    pub timestamp: NaiveDateTime,
    /// The measured value; `None` for missing/unparsable readings.
    pub value: Option<f64>,
}

impl Observation {
    pub fn new(timestamp: NaiveDateTime, value: Option<f64>) -> Self {
        Self { timestamp, value }
    }
}

/// An ordered, de-duplicated sequence of observations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationSeries {
    observations: Vec<Observation>,
}

impl ObservationSeries {
    /// An empty series.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a series from observations in any order.
    ///
    /// Sorts by timestamp and collapses duplicate timestamps, keeping the
    /// observation that appeared last in the input.
    pub fn from_observations(mut observations: Vec<Observation>) -> Self {
        observations.sort_by_key(|o| o.timestamp);
        let mut deduped: Vec<Observation> = Vec::with_capacity(observations.len());
        for obs in observations {
            match deduped.last_mut() {
                Some(last) if last.timestamp == obs.timestamp => *last = obs,
                _ => deduped.push(obs),
            }
        }
        Self {
            observations: deduped,
        }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.observations.iter()
    }

    /// The smallest interval containing every observation, or `None` when
    /// the series is empty. The exclusive end sits one second past the last
    /// reading.
    pub fn bounds(&self) -> Option<Interval> {
        let first = self.observations.first()?.timestamp;
        let last = self.observations.last()?.timestamp;
        Interval::new(first, last + chrono::Duration::seconds(1))
    }

    /// Observations with timestamps inside the half-open `interval`.
    pub fn slice(&self, interval: &Interval) -> Self {
        let start = self
            .observations
            .partition_point(|o| o.timestamp < interval.start);
        let end = self
            .observations
            .partition_point(|o| o.timestamp < interval.end);
        Self {
            observations: self.observations[start..end].to_vec(),
        }
    }

    /// Sorted union of two series; on a timestamp collision the observation
    /// from `newer` wins.
    pub fn merge(&self, newer: &Self) -> Self {
        let mut merged = Vec::with_capacity(self.len() + newer.len());
        let (mut i, mut j) = (0, 0);
        while i < self.observations.len() && j < newer.observations.len() {
            let (a, b) = (&self.observations[i], &newer.observations[j]);
            match a.timestamp.cmp(&b.timestamp) {
                std::cmp::Ordering::Less => {
                    merged.push(*a);
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    merged.push(*b);
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    merged.push(*b);
                    i += 1;
                    j += 1;
                }
            }
        }
        merged.extend_from_slice(&self.observations[i..]);
        merged.extend_from_slice(&newer.observations[j..]);
        Self {
            observations: merged,
        }
    }

    /// Renders the series as a two-column frame: `tiempo` (millisecond
    /// datetime) and `valor` (nullable f64).
    pub fn to_data_frame(&self) -> PolarsResult<DataFrame> {
        let ts_ms: Vec<i64> = self
            .observations
            .iter()
            .map(|o| o.timestamp.and_utc().timestamp_millis())
            .collect();
        let values: Vec<Option<f64>> = self.observations.iter().map(|o| o.value).collect();
        let tiempo = Column::new("tiempo".into(), ts_ms)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
        let valor = Column::new("valor".into(), values);
        DataFrame::new(vec![tiempo, valor])
    }

    /// Rebuilds a series from a frame produced by [`Self::to_data_frame`]
    /// (or a cached chunk with the same schema).
    pub fn from_data_frame(df: &DataFrame) -> PolarsResult<Self> {
        let tiempo = df.column("tiempo")?.datetime()?;
        let valor = df.column("valor")?.f64()?;
        let time_unit = tiempo.time_unit();
        let mut observations = Vec::with_capacity(df.height());
        for (ts_opt, value) in tiempo.into_iter().zip(valor.into_iter()) {
            let Some(raw) = ts_opt else {
                return Err(PolarsError::ComputeError(
                    "null timestamp in tiempo column".into(),
                ));
            };
            let timestamp = match time_unit {
                TimeUnit::Milliseconds => DateTime::from_timestamp_millis(raw),
                TimeUnit::Microseconds => DateTime::from_timestamp_micros(raw),
                TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(raw)),
            }
            .map(|dt| dt.naive_utc());
            let Some(timestamp) = timestamp else {
                return Err(PolarsError::ComputeError(
                    format!("timestamp {raw} out of range").into(),
                ));
            };
            observations.push(Observation::new(timestamp, value));
        }
        Ok(Self::from_observations(observations))
    }
}
