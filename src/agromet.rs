//! This module provides the main entry point for the Agromet API client.
//! It resolves station and variable metadata, downloads time series with
//! local caching, and aggregates raw readings to coarser resolutions.

use crate::acquisition::engine::DataAcquisition;
use crate::error::AgrometError;
use crate::gateway::api_client::ApiClient;
use crate::stations::catalog::StationCatalog;
use crate::store::LocalStore;
use crate::types::aggregation::Aggregation;
use crate::types::date_input::DateInput;
use crate::types::interval::Interval;
use crate::types::station::StationRecord;
use crate::types::variable::{VariableDescriptor, VariableId, VariableRef};
use crate::utils::{ensure_cache_dir_exists, get_cache_dir};
use bon::bon;
use polars::prelude::DataFrame;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for the [`Agromet`] client.
///
/// There is no process-wide state: every tunable travels in this struct and
/// is fixed at construction.
///
/// # Examples
///
/// ```
/// use agromet::AgrometConfig;
/// use std::path::PathBuf;
///
/// let config = AgrometConfig {
///     api_key: Some("my-key".to_string()),
///     cache_dir: Some(PathBuf::from("/tmp/agromet")),
///     ..AgrometConfig::default()
/// };
/// assert!(config.use_cache);
/// ```
#[derive(Debug, Clone)]
pub struct AgrometConfig {
    /// API key; when `None` the `AGROMET_API_KEY` environment variable is
    /// consulted, and construction fails fast if neither is set.
    pub api_key: Option<String>,
    /// Cache directory; when `None` a per-user default is used (e.g.
    /// `~/.cache/agromet_cache` on Linux).
    pub cache_dir: Option<PathBuf>,
    /// Disables the local store entirely when `false`.
    pub use_cache: bool,
    /// Default pause between gateway-touching pairs in bulk downloads.
    pub default_delay: f64,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
}

impl Default for AgrometConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            cache_dir: None,
            use_cache: true,
            default_delay: 0.5,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// The main client for accessing Agromet station data.
///
/// Handles station/variable catalog lookups and time series downloads, with
/// transparent local caching: repeated requests are served from disk and only
/// uncovered date ranges hit the network.
///
/// # Examples
///
/// ```no_run
/// # use agromet::{Agromet, Aggregation, AgrometError};
/// # async fn run() -> Result<(), AgrometError> {
/// let client = Agromet::with_api_key("my-key").await?;
///
/// let stations = client.get_stations().region("R16").call().await?;
/// println!("{} stations in Ñuble", stations.len());
///
/// let data = client
///     .get_data()
///     .station("INIA-47")
///     .variable(2002)
///     .start("2024-09-01")
///     .end("2024-09-30")
///     .aggregation(Aggregation::Daily)
///     .call()
///     .await?;
/// println!("{data}");
/// # Ok(())
/// # }
/// ```
pub struct Agromet {
    catalog: StationCatalog<ApiClient>,
    engine: DataAcquisition<ApiClient>,
    store: Option<Arc<LocalStore>>,
    default_delay: f64,
}

#[bon]
impl Agromet {
    /// Creates a client with defaults: key from `AGROMET_API_KEY`, caching
    /// enabled in the per-user cache directory.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GatewayError::MissingApiKey`] (wrapped) when no key
    /// is available, and cache directory errors when the store cannot be
    /// created.
    pub async fn new() -> Result<Self, AgrometError> {
        Self::with_config(AgrometConfig::default()).await
    }

    /// Creates a client with an explicit API key and default caching.
    pub async fn with_api_key(api_key: &str) -> Result<Self, AgrometError> {
        Self::with_config(AgrometConfig {
            api_key: Some(api_key.to_string()),
            ..AgrometConfig::default()
        })
        .await
    }

    /// Creates a client from an explicit [`AgrometConfig`].
    pub async fn with_config(config: AgrometConfig) -> Result<Self, AgrometError> {
        let gateway = Arc::new(ApiClient::new(
            config.api_key.as_deref(),
            config.request_timeout,
        )?);
        let store = if config.use_cache {
            let cache_dir = match config.cache_dir {
                Some(dir) => dir,
                None => get_cache_dir().map_err(AgrometError::CacheDirResolution)?,
            };
            ensure_cache_dir_exists(&cache_dir)
                .await
                .map_err(|e| AgrometError::CacheDirCreation(cache_dir.clone(), e))?;
            Some(Arc::new(LocalStore::open(cache_dir).await?))
        } else {
            None
        };
        Ok(Self {
            catalog: StationCatalog::new(Arc::clone(&gateway), store.clone()),
            engine: DataAcquisition::new(gateway, store.clone()),
            store,
            default_delay: config.default_delay,
        })
    }

    /// Lists stations, optionally filtered.
    ///
    /// This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `.region(&str)`: Optional. A region code (`"R16"`) or name
    ///   (`"Ñuble"`); unrecognized values are an error.
    /// * `.network(&str)`: Optional. Station network prefix (`"INIA"`,
    ///   `"DMC"`), matched case-insensitively.
    /// * `.force_update(bool)`: Optional. Bypasses memory and disk caches.
    ///   Defaults to `false`.
    #[builder]
    pub async fn get_stations(
        &self,
        region: Option<&str>,
        network: Option<&str>,
        force_update: Option<bool>,
    ) -> Result<Vec<StationRecord>, AgrometError> {
        self.catalog
            .get_stations(region, network, force_update.unwrap_or(false))
            .await
    }

    /// Lists the variables one station reports.
    ///
    /// This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `.station(&str)`: **Required.** Station code (e.g. `"INIA-47"`).
    /// * `.force_update(bool)`: Optional. Bypasses the disk cache. Defaults
    ///   to `false`.
    #[builder]
    pub async fn get_variables(
        &self,
        station: &str,
        force_update: Option<bool>,
    ) -> Result<Vec<VariableDescriptor>, AgrometError> {
        self.catalog
            .get_variables(station, force_update.unwrap_or(false))
            .await
    }

    /// Downloads the time series for one (station, variable) pair.
    ///
    /// Cached ranges are served from disk; only uncovered sub-ranges are
    /// fetched, merged, and written back. The result is sliced to exactly
    /// the requested range.
    ///
    /// This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `.station(&str)`: **Required.** Station code.
    /// * `.variable(impl Into<VariableRef>)`: **Required.** Variable id
    ///   (`2002`) or display name (`"temperatura"`); both resolve to the
    ///   same id and yield identical results.
    /// * `.start(impl Into<DateInput>)` / `.end(impl Into<DateInput>)`:
    ///   **Required.** `YYYY-MM-DD` strings or chrono values; the end is
    ///   exclusive at midnight.
    /// * `.aggregation(Aggregation)`: Optional. Resample to
    ///   hourly/daily/weekly/monthly buckets; temperature variables keep
    ///   min/mean/max, precipitation accumulates, everything else averages.
    /// * `.use_cache(bool)`: Optional. Defaults to `true`.
    ///
    /// # Returns
    ///
    /// A `DataFrame` with `tiempo`/`valor` columns (raw), or the
    /// aggregation schema described above.
    #[builder]
    pub async fn get_data(
        &self,
        station: &str,
        #[builder(into)] variable: VariableRef,
        #[builder(into)] start: DateInput,
        #[builder(into)] end: DateInput,
        aggregation: Option<Aggregation>,
        use_cache: Option<bool>,
    ) -> Result<DataFrame, AgrometError> {
        let interval = resolve_interval(&start, &end)?;
        self.engine
            .get_data(
                station,
                &variable,
                interval,
                aggregation,
                use_cache.unwrap_or(true),
            )
            .await
    }

    /// Downloads every (station, variable) pair of a cross product.
    ///
    /// Pairs fail independently: a failure is logged and excluded from the
    /// result map without aborting the rest. Between pairs that touched the
    /// gateway the client pauses for `delay` seconds (rate-limit courtesy);
    /// cache-satisfied pairs skip the pause.
    ///
    /// This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `.stations(Vec<String>)`: **Required.**
    /// * `.variables(Vec<VariableRef>)`: **Required.**
    /// * `.start(..)` / `.end(..)`: **Required.** As in
    ///   [`Self::get_data`].
    /// * `.delay(f64)`: Optional. Defaults to the configured
    ///   `default_delay`.
    #[builder]
    pub async fn bulk_download(
        &self,
        stations: Vec<String>,
        variables: Vec<VariableRef>,
        #[builder(into)] start: DateInput,
        #[builder(into)] end: DateInput,
        delay: Option<f64>,
    ) -> Result<HashMap<(String, VariableId), DataFrame>, AgrometError> {
        let interval = resolve_interval(&start, &end)?;
        Ok(self
            .engine
            .bulk_download(
                &stations,
                &variables,
                interval,
                delay.unwrap_or(self.default_delay),
            )
            .await)
    }

    /// Whether a station reports the given variable (id or name).
    #[builder]
    pub async fn validate_station_variable(
        &self,
        station: &str,
        #[builder(into)] variable: VariableRef,
    ) -> bool {
        self.catalog
            .validate_station_variable(station, &variable)
            .await
    }

    /// Resolves a variable name against a station's catalog.
    pub async fn find_variable_id(&self, station: &str, name: &str) -> Option<VariableId> {
        self.catalog.find_variable_id(station, name).await
    }

    /// Removes every cached catalog document and series chunk.
    pub async fn clear_cache(&self) -> Result<(), AgrometError> {
        if let Some(store) = &self.store {
            store.clear().await?;
        }
        Ok(())
    }
}

fn resolve_interval(start: &DateInput, end: &DateInput) -> Result<Interval, AgrometError> {
    let start = start.resolve()?;
    let end = end.resolve()?;
    Interval::new(start, end).ok_or(AgrometError::InvalidDateRange { start, end })
}
