//! Station and variable catalog management.

pub mod catalog;

pub use catalog::StationCatalog;
