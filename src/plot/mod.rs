//! Terminal plotting.
//!
//! Only a one-line Unicode sparkline is needed for the dashboard cards.

pub mod sparkline;

pub use sparkline::*;
