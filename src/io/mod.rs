//! Input/output helpers.
//!
//! - series exports (CSV/JSON) (`export`)
//! - fact set export (JSON) (`export`)

pub mod export;

pub use export::*;
