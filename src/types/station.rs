//! Station metadata records as exposed to callers.

use crate::types::region::Region;
use serde::{Deserialize, Serialize};

/// Metadata for one station of the Agromet network.
///
/// Records are immutable: a catalog refresh replaces the whole set, single
/// records are never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationRecord {
    /// Unique station code, e.g. `"INIA-47"`. The prefix before the dash
    /// identifies the operating network.
    pub code: String,
    /// Human-readable station name.
    pub name: String,
    /// Administrative region, when the upstream region label is recognized.
    pub region: Option<Region>,
    /// Commune the station is located in.
    pub commune: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Elevation above sea level in meters, when reported.
    pub elevation: Option<f64>,
    /// Operating network tag derived from the code prefix (`"INIA"`,
    /// `"DMC"`, ...; `"OTHER"` when the code carries no prefix).
    pub network: String,
    /// Timestamp of the first reading the service holds for this station,
    /// passed through verbatim.
    pub first_reading: Option<String>,
}

impl StationRecord {
    /// The network tag for a station code: the part before the first dash,
    /// upper-cased, or `"OTHER"` when there is none.
    pub fn network_of(code: &str) -> String {
        match code.split_once('-') {
            Some((prefix, _)) if !prefix.is_empty() => prefix.to_uppercase(),
            _ => "OTHER".to_string(),
        }
    }
}
