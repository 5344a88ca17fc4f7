use crate::gateway::GatewayError;
use crate::store::StoreError;
use crate::types::date_input::InvalidDate;
use crate::types::region::UnknownRegion;
use crate::types::variable::UnknownVariable;
use chrono::NaiveDateTime;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgrometError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    InvalidDate(#[from] InvalidDate),

    #[error("invalid date range: start {start} is not before end {end}")]
    InvalidDateRange {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error(transparent)]
    UnknownVariable(#[from] UnknownVariable),

    #[error(transparent)]
    UnknownRegion(#[from] UnknownRegion),

    #[error("failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("failed to determine cache directory")]
    CacheDirResolution(#[source] std::io::Error),

    #[error(transparent)]
    Polars(#[from] PolarsError),
}
