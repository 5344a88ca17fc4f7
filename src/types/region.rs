//! The sixteen Chilean administrative regions stations are assigned to.

use crate::utils::normalize_text;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A Chilean region, identified by its `R<nn>` code.
///
/// Parses from either the code or the Spanish name, accent- and
/// case-insensitively:
///
/// ```
/// use agromet::Region;
///
/// assert_eq!("R16".parse::<Region>().unwrap(), Region::Nuble);
/// assert_eq!("Ñuble".parse::<Region>().unwrap(), Region::Nuble);
/// assert_eq!(Region::Nuble.code(), "R16");
/// assert_eq!(Region::Nuble.name(), "Ñuble");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Tarapaca,
    Antofagasta,
    Atacama,
    Coquimbo,
    Valparaiso,
    OHiggins,
    Maule,
    Biobio,
    Araucania,
    LosLagos,
    Aysen,
    Magallanes,
    Metropolitana,
    LosRios,
    AricaYParinacota,
    Nuble,
}

const REGIONS: [(Region, &str, &str); 16] = [
    (Region::Tarapaca, "R01", "Tarapacá"),
    (Region::Antofagasta, "R02", "Antofagasta"),
    (Region::Atacama, "R03", "Atacama"),
    (Region::Coquimbo, "R04", "Coquimbo"),
    (Region::Valparaiso, "R05", "Valparaíso"),
    (Region::OHiggins, "R06", "O'Higgins"),
    (Region::Maule, "R07", "Maule"),
    (Region::Biobio, "R08", "Biobío"),
    (Region::Araucania, "R09", "La Araucanía"),
    (Region::LosLagos, "R10", "Los Lagos"),
    (Region::Aysen, "R11", "Aysén"),
    (Region::Magallanes, "R12", "Magallanes"),
    (Region::Metropolitana, "R13", "Metropolitana"),
    (Region::LosRios, "R14", "Los Ríos"),
    (Region::AricaYParinacota, "R15", "Arica y Parinacota"),
    (Region::Nuble, "R16", "Ñuble"),
];

impl Region {
    /// The `R<nn>` region code.
    pub fn code(&self) -> &'static str {
        REGIONS.iter().find(|(r, _, _)| r == self).unwrap().1
    }

    /// The Spanish region name as reported by the service.
    pub fn name(&self) -> &'static str {
        REGIONS.iter().find(|(r, _, _)| r == self).unwrap().2
    }

    /// All sixteen regions, in code order.
    pub fn all() -> impl Iterator<Item = Region> {
        REGIONS.iter().map(|(r, _, _)| *r)
    }
}

impl FromStr for Region {
    type Err = UnknownRegion;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let upper = trimmed.to_uppercase();
        if let Some((region, _, _)) = REGIONS.iter().find(|(_, code, _)| *code == upper) {
            return Ok(*region);
        }
        let normalized = normalize_text(trimmed);
        REGIONS
            .iter()
            .find(|(_, _, name)| normalize_text(name) == normalized)
            .map(|(region, _, _)| *region)
            .ok_or_else(|| UnknownRegion(input.to_string()))
    }
}

/// Parse failure for a region code or name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown region '{0}' (expected a code like R16 or a name like Ñuble)")]
pub struct UnknownRegion(pub String);

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Serialize for Region {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for Region {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
