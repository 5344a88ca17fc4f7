//! Fetch-from-cache-or-network orchestration and temporal aggregation.

pub mod aggregate;
pub mod engine;

pub use aggregate::aggregate_series;
pub use engine::DataAcquisition;
