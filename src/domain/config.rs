//! Runtime configuration.
//!
//! Values come from the environment (`.env` is loaded via `dotenvy`) and are
//! then overridden by CLI flags in `app`.

use std::time::Duration;

use crate::domain::FailureMode;

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_SUMMARY_TIMEOUT: Duration = Duration::from_millis(2500);

pub const FRED_BASE_URL: &str = "https://api.stlouisfed.org/fred/series/observations";
pub const BLS_BASE_URL: &str = "https://api.bls.gov/publicAPI/v2/timeseries/data/";
pub const ECB_BASE_URL: &str = "https://data-api.ecb.europa.eu/service/data";

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// FRED requires a key; a missing key surfaces as a configuration error on first fetch.
    pub fred_api_key: Option<String>,
    /// BLS works without a key (lower daily quota).
    pub bls_api_key: Option<String>,

    pub fred_base_url: String,
    pub bls_base_url: String,
    pub ecb_base_url: String,

    /// Per-request HTTP timeout; an expired request counts as an upstream failure.
    pub http_timeout: Duration,
    pub failure_mode: FailureMode,

    /// External summarizer command (prompt on stdin, text on stdout).
    pub summarizer_cmd: Option<String>,
    pub summary_timeout: Duration,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            fred_api_key: None,
            bls_api_key: None,
            fred_base_url: FRED_BASE_URL.to_string(),
            bls_base_url: BLS_BASE_URL.to_string(),
            ecb_base_url: ECB_BASE_URL.to_string(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            failure_mode: FailureMode::Strict,
            summarizer_cmd: None,
            summary_timeout: DEFAULT_SUMMARY_TIMEOUT,
        }
    }
}

impl DashboardConfig {
    /// Load from the process environment (after reading `.env`, if present).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment, or a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Self {
            fred_api_key: non_empty("FRED_API_KEY"),
            bls_api_key: non_empty("BLS_API_KEY"),
            fred_base_url: non_empty("PULSE_FRED_URL").unwrap_or(defaults.fred_base_url),
            bls_base_url: non_empty("PULSE_BLS_URL").unwrap_or(defaults.bls_base_url),
            ecb_base_url: non_empty("PULSE_ECB_URL").unwrap_or(defaults.ecb_base_url),
            summarizer_cmd: non_empty("PULSE_SUMMARIZER_CMD"),
            ..defaults
        }
    }
}
