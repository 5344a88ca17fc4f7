//! Variable identifiers, descriptors, and the fixed reference table for the
//! well-known Agromet variable ids.

use crate::utils::normalize_text;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Service-wide numeric variable identifier (e.g. `2002` = air temperature).
pub type VariableId = u32;

/// Broad physical category of a variable; drives aggregation semantics and
/// quality-control thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableCategory {
    Temperature,
    Precipitation,
    Humidity,
    Wind,
    Radiation,
    Pressure,
    Other,
}

impl VariableCategory {
    /// Physically plausible bounds for readings in this category, used by the
    /// fixed-bound extreme value check.
    pub fn physical_range(&self) -> (f64, f64) {
        match self {
            VariableCategory::Temperature => (-60.0, 60.0),
            VariableCategory::Precipitation => (0.0, 500.0),
            VariableCategory::Humidity => (0.0, 100.0),
            VariableCategory::Wind => (0.0, 100.0),
            VariableCategory::Radiation => (0.0, 1500.0),
            VariableCategory::Pressure => (800.0, 1100.0),
            VariableCategory::Other => (f64::NEG_INFINITY, f64::INFINITY),
        }
    }

    /// Largest plausible jump between consecutive readings, used by the
    /// sudden change check. Unbounded for accumulating or unclassified
    /// variables.
    pub fn default_max_change(&self) -> f64 {
        match self {
            VariableCategory::Temperature => 10.0,
            VariableCategory::Humidity => 45.0,
            VariableCategory::Pressure => 10.0,
            VariableCategory::Radiation => 555.0,
            VariableCategory::Wind => 10.0,
            VariableCategory::Precipitation | VariableCategory::Other => f64::INFINITY,
        }
    }
}

impl fmt::Display for VariableCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            VariableCategory::Temperature => "temperature",
            VariableCategory::Precipitation => "precipitation",
            VariableCategory::Humidity => "humidity",
            VariableCategory::Wind => "wind",
            VariableCategory::Radiation => "radiation",
            VariableCategory::Pressure => "pressure",
            VariableCategory::Other => "other",
        };
        write!(f, "{label}")
    }
}

/// Metadata for one variable as reported by the service catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDescriptor {
    pub variable_id: VariableId,
    pub display_name: String,
    pub unit: String,
    pub category: VariableCategory,
}

/// The fixed reference table for well-known variable ids. Per-station
/// catalogs from the service may carry more ids; those resolve to
/// [`VariableCategory::Other`].
const VARIABLE_TABLE: [(VariableId, &str, &str, VariableCategory); 9] = [
    (2001, "Humedad Relativa", "%", VariableCategory::Humidity),
    (2002, "Temperatura", "°C", VariableCategory::Temperature),
    (2003, "Precipitación", "mm", VariableCategory::Precipitation),
    (2004, "Radiación Solar", "W/m²", VariableCategory::Radiation),
    (2005, "Velocidad Viento", "m/s", VariableCategory::Wind),
    (2006, "Dirección Viento", "°", VariableCategory::Other),
    (2007, "Presión Atmosférica", "hPa", VariableCategory::Pressure),
    (2008, "Temperatura Mínima", "°C", VariableCategory::Temperature),
    (2009, "Temperatura Máxima", "°C", VariableCategory::Temperature),
];

/// Descriptors for every variable in the fixed table.
pub fn known_variables() -> Vec<VariableDescriptor> {
    VARIABLE_TABLE
        .iter()
        .map(|&(variable_id, name, unit, category)| VariableDescriptor {
            variable_id,
            display_name: name.to_string(),
            unit: unit.to_string(),
            category,
        })
        .collect()
}

/// The category of a variable id; `Other` for ids outside the fixed table.
pub fn category_of(variable_id: VariableId) -> VariableCategory {
    VARIABLE_TABLE
        .iter()
        .find(|(id, _, _, _)| *id == variable_id)
        .map(|(_, _, _, category)| *category)
        .unwrap_or(VariableCategory::Other)
}

/// A caller-supplied variable reference: numeric id or display name.
///
/// This is the single int-or-string dispatch boundary; everything past
/// [`resolve_variable`] works with a plain [`VariableId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableRef {
    Id(VariableId),
    Name(String),
}

impl From<VariableId> for VariableRef {
    fn from(id: VariableId) -> Self {
        VariableRef::Id(id)
    }
}

impl From<i32> for VariableRef {
    fn from(id: i32) -> Self {
        VariableRef::Id(id as VariableId)
    }
}

impl From<&str> for VariableRef {
    fn from(name: &str) -> Self {
        VariableRef::Name(name.to_string())
    }
}

impl From<String> for VariableRef {
    fn from(name: String) -> Self {
        VariableRef::Name(name)
    }
}

impl fmt::Display for VariableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableRef::Id(id) => write!(f, "{id}"),
            VariableRef::Name(name) => write!(f, "{name}"),
        }
    }
}

/// Resolve failure for a variable name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown variable '{0}'")]
pub struct UnknownVariable(pub String);

/// Resolves a variable reference to its id.
///
/// Numeric ids pass through untouched (the service carries more ids than the
/// fixed table knows). Names are matched against the fixed table after
/// accent/case normalization; a substring match suffices, so `"temperatura"`
/// resolves to `2002` ("Temperatura"). A digit-only name is treated as an id.
pub fn resolve_variable(variable: &VariableRef) -> Result<VariableId, UnknownVariable> {
    match variable {
        VariableRef::Id(id) => Ok(*id),
        VariableRef::Name(name) => {
            if let Ok(id) = name.trim().parse::<VariableId>() {
                return Ok(id);
            }
            let needle = normalize_text(name);
            VARIABLE_TABLE
                .iter()
                .find(|(_, display, _, _)| normalize_text(display).contains(&needle))
                .map(|(id, _, _, _)| *id)
                .ok_or_else(|| UnknownVariable(name.clone()))
        }
    }
}
