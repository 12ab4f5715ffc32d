//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - canonical series types (`Point`, `Series`, `SeriesRequest`)
//! - provider and indicator enums (`Provider`, `Indicator`, `FailureMode`)
//! - derived outputs (`DerivedMetric`, `FactSet`)
//! - runtime configuration (`DashboardConfig`)

pub mod config;
pub mod types;

pub use config::*;
pub use types::*;
