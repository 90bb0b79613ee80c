// src/models/mod.rs

//! Domain models for the reconciliation pipeline.
//!
//! This module contains all data structures used throughout the
//! application, organized by their primary purpose.

mod base;
mod config;
mod occurrence;
mod run;

// Re-export all public types
pub use base::HistoricalBase;
pub use config::{ApiConfig, Config, Credentials, PathsConfig, SheetsConfig, WindowConfig};
pub use occurrence::{
    DeliveryStatus, Occurrence, RawCarrier, RawOccurrence, RawOccurrenceType, RawOrder,
    RawShipment,
};
pub use run::RunContext;
