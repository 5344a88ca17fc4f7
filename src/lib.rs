mod acquisition;
mod agromet;
mod error;
mod gateway;
pub mod qc;
mod stations;
mod store;
mod types;
mod utils;

pub use agromet::{Agromet, AgrometConfig};
pub use error::AgrometError;

pub use acquisition::aggregate::aggregate_series;
pub use acquisition::engine::DataAcquisition;

pub use gateway::api_client::ApiClient;
pub use gateway::{Gateway, GatewayError, API_KEY_ENV};

pub use stations::catalog::StationCatalog;
pub use store::{LocalStore, StoreError};

pub use types::aggregation::Aggregation;
pub use types::date_input::{DateInput, InvalidDate};
pub use types::interval::Interval;
pub use types::observation::{Observation, ObservationSeries};
pub use types::region::{Region, UnknownRegion};
pub use types::station::StationRecord;
pub use types::variable::{
    category_of, known_variables, resolve_variable, UnknownVariable, VariableCategory,
    VariableDescriptor, VariableId, VariableRef,
};

pub use qc::{
    apply_quality_control, apply_quality_control_with, check_internal_consistency_temperature,
    get_qc_report, ExtremeMethod, QcConfig, QcFlag, QcReport, QcVerdict, QualityControl,
};
