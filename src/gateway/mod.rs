//! The remote service boundary: everything the core needs from the Agromet
//! HTTP API, behind a trait so the acquisition engine can be exercised
//! against a mock.

pub mod api_client;
pub mod error;

use crate::types::interval::Interval;
use crate::types::observation::ObservationSeries;
use crate::types::station::StationRecord;
use crate::types::variable::{VariableDescriptor, VariableId};
use async_trait::async_trait;
pub use error::GatewayError;

/// Environment variable consulted for the API key when none is passed
/// explicitly.
pub const API_KEY_ENV: &str = "AGROMET_API_KEY";

/// The three operations the core consumes from the remote service.
///
/// All three are idempotent; callers may invoke them any number of times and
/// must tolerate duplicate results (the merge layer de-duplicates).
#[async_trait]
pub trait Gateway: Send + Sync {
    /// The full station catalog.
    async fn fetch_stations(&self) -> Result<Vec<StationRecord>, GatewayError>;

    /// The variable catalog of one station. `NotFound` when the station is
    /// unknown to the service.
    async fn fetch_variables(&self, station: &str)
        -> Result<Vec<VariableDescriptor>, GatewayError>;

    /// Raw observations for one (station, variable) pair inside `interval`.
    /// `NotFound` when the service holds no data for that combination.
    async fn fetch_series(
        &self,
        station: &str,
        variable: VariableId,
        interval: &Interval,
    ) -> Result<ObservationSeries, GatewayError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type SeriesFn =
        dyn Fn(&str, VariableId, &Interval) -> Result<ObservationSeries, GatewayError> + Send + Sync;

    /// In-memory gateway for tests; counts calls per endpoint.
    pub(crate) struct MockGateway {
        pub stations: Vec<StationRecord>,
        pub variables: HashMap<String, Vec<VariableDescriptor>>,
        series: Box<SeriesFn>,
        pub station_calls: AtomicUsize,
        pub variable_calls: AtomicUsize,
        pub series_calls: AtomicUsize,
    }

    impl MockGateway {
        pub(crate) fn with_series<F>(series: F) -> Self
        where
            F: Fn(&str, VariableId, &Interval) -> Result<ObservationSeries, GatewayError>
                + Send
                + Sync
                + 'static,
        {
            Self {
                stations: Vec::new(),
                variables: HashMap::new(),
                series: Box::new(series),
                station_calls: AtomicUsize::new(0),
                variable_calls: AtomicUsize::new(0),
                series_calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn series_calls(&self) -> usize {
            self.series_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Gateway for MockGateway {
        async fn fetch_stations(&self) -> Result<Vec<StationRecord>, GatewayError> {
            self.station_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.stations.clone())
        }

        async fn fetch_variables(
            &self,
            station: &str,
        ) -> Result<Vec<VariableDescriptor>, GatewayError> {
            self.variable_calls.fetch_add(1, Ordering::SeqCst);
            self.variables
                .get(station)
                .cloned()
                .ok_or_else(|| GatewayError::NotFound {
                    context: format!("station {station}"),
                })
        }

        async fn fetch_series(
            &self,
            station: &str,
            variable: VariableId,
            interval: &Interval,
        ) -> Result<ObservationSeries, GatewayError> {
            self.series_calls.fetch_add(1, Ordering::SeqCst);
            (self.series)(station, variable, interval)
        }
    }
}
