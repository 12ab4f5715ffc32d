//! `macro-pulse` library crate.
//!
//! The binary (`pulse`) is a thin wrapper around this library so that:
//!
//! - fetching, normalization and metrics are testable without spawning processes
//! - adapters can be swapped for in-memory fakes
//!
//! Data flows one way: `data` (provider adapters) -> `facts` (metrics per
//! indicator) -> `report` (cards, summary) -> `app` (CLI dispatch).

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod facts;
pub mod io;
pub mod metrics;
pub mod plot;
pub mod report;
