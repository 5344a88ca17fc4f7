//! Catalog queries with a memory → disk → gateway fallthrough.

use crate::error::AgrometError;
use crate::gateway::Gateway;
use crate::store::LocalStore;
use crate::types::region::Region;
use crate::types::station::StationRecord;
use crate::types::variable::{VariableDescriptor, VariableId, VariableRef};
use crate::utils::normalize_text;
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::Mutex;

const STATIONS_KEY: &str = "stations";

fn variables_key(station: &str) -> String {
    format!("variables_{station}")
}

pub struct StationCatalog<G> {
    gateway: Arc<G>,
    store: Option<Arc<LocalStore>>,
    stations_memo: Mutex<Option<Vec<StationRecord>>>,
}

impl<G: Gateway> StationCatalog<G> {
    pub fn new(gateway: Arc<G>, store: Option<Arc<LocalStore>>) -> Self {
        Self {
            gateway,
            store,
            stations_memo: Mutex::new(None),
        }
    }

    /// The station catalog, filtered by region and/or network.
    ///
    /// `region` accepts a code (`"R16"`) or a name (`"Ñuble"`); an
    /// unrecognized value is a caller error. `network` matches the station
    /// code prefix case-insensitively. `force_update` bypasses both cache
    /// layers.
    pub async fn get_stations(
        &self,
        region: Option<&str>,
        network: Option<&str>,
        force_update: bool,
    ) -> Result<Vec<StationRecord>, AgrometError> {
        let region = region.map(str::parse::<Region>).transpose()?;
        let stations = self.load_stations(force_update).await?;
        let filtered: Vec<StationRecord> = stations
            .into_iter()
            .filter(|s| region.map_or(true, |r| s.region == Some(r)))
            .filter(|s| network.map_or(true, |n| s.network.eq_ignore_ascii_case(n)))
            .collect();
        debug!("Filtered to {} stations", filtered.len());
        Ok(filtered)
    }

    async fn load_stations(&self, force_update: bool) -> Result<Vec<StationRecord>, AgrometError> {
        if !force_update {
            let memo = self.stations_memo.lock().await;
            if let Some(stations) = memo.as_ref() {
                debug!("Using station catalog from memory");
                return Ok(stations.clone());
            }
        }

        if !force_update {
            if let Some(store) = &self.store {
                if let Some(doc) = store.get_metadata(STATIONS_KEY).await {
                    match serde_json::from_value::<Vec<StationRecord>>(doc) {
                        Ok(stations) => {
                            info!(
                                "Using station catalog from disk cache ({} stations)",
                                stations.len()
                            );
                            *self.stations_memo.lock().await = Some(stations.clone());
                            return Ok(stations);
                        }
                        Err(e) => warn!("Corrupt station catalog cache: {e}. Refetching."),
                    }
                }
            }
        }

        let stations = self.gateway.fetch_stations().await?;
        if let Some(store) = &self.store {
            match serde_json::to_value(&stations) {
                Ok(doc) => {
                    if let Err(e) = store.put_metadata(STATIONS_KEY, &doc).await {
                        warn!("Failed to cache station catalog: {e}");
                    }
                }
                Err(e) => warn!("Failed to encode station catalog: {e}"),
            }
        }
        *self.stations_memo.lock().await = Some(stations.clone());
        Ok(stations)
    }

    /// The variable catalog of one station.
    pub async fn get_variables(
        &self,
        station: &str,
        force_update: bool,
    ) -> Result<Vec<VariableDescriptor>, AgrometError> {
        let key = variables_key(station);
        if !force_update {
            if let Some(store) = &self.store {
                if let Some(doc) = store.get_metadata(&key).await {
                    match serde_json::from_value::<Vec<VariableDescriptor>>(doc) {
                        Ok(variables) => {
                            debug!("Using cached variables for {station}");
                            return Ok(variables);
                        }
                        Err(e) => warn!("Corrupt variable cache for {station}: {e}. Refetching."),
                    }
                }
            }
        }

        let variables = self.gateway.fetch_variables(station).await?;
        if let Some(store) = &self.store {
            match serde_json::to_value(&variables) {
                Ok(doc) => {
                    if let Err(e) = store.put_metadata(&key, &doc).await {
                        warn!("Failed to cache variables for {station}: {e}");
                    }
                }
                Err(e) => warn!("Failed to encode variables for {station}: {e}"),
            }
        }
        Ok(variables)
    }

    /// Whether `variable` (id or name) appears in the station's catalog.
    pub async fn validate_station_variable(&self, station: &str, variable: &VariableRef) -> bool {
        let Ok(variables) = self.get_variables(station, false).await else {
            return false;
        };
        match variable {
            VariableRef::Id(id) => variables.iter().any(|v| v.variable_id == *id),
            VariableRef::Name(name) => {
                if let Ok(id) = name.trim().parse::<VariableId>() {
                    return variables.iter().any(|v| v.variable_id == id);
                }
                let needle = normalize_text(name);
                variables
                    .iter()
                    .any(|v| normalize_text(&v.display_name).contains(&needle))
            }
        }
    }

    /// Resolves a variable name against the station's catalog.
    pub async fn find_variable_id(&self, station: &str, name: &str) -> Option<VariableId> {
        let variables = self.get_variables(station, false).await.ok()?;
        let needle = normalize_text(name);
        variables
            .iter()
            .find(|v| normalize_text(&v.display_name).contains(&needle))
            .map(|v| v.variable_id)
    }
}
