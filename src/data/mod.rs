//! Upstream data providers.
//!
//! Each provider adapter turns one raw upstream format into a canonical
//! `Series`:
//!
//! - `fred`: flat `{date, value}` observations (`"."` = missing)
//! - `bls`: `{year, period, value}` rows, newest first
//! - `ecb`: SDMX-JSON cube, decoded by `sdmx`
//!
//! Adapters share one capability (`SeriesSource`) and are selected by
//! `Provider` through a `SourceRegistry`.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::domain::{DashboardConfig, FailureMode, Provider, Series, SeriesRequest};
use crate::error::{AppError, ProviderError};

pub mod bls;
pub mod ecb;
pub mod fred;
pub mod sdmx;

pub use bls::BlsClient;
pub use ecb::EcbClient;
pub use fred::FredClient;

/// Fetch one series from an upstream and normalize it.
pub trait SeriesSource: Send + Sync {
    fn provider(&self) -> Provider;

    fn fetch_and_normalize(&self, request: &SeriesRequest) -> Result<Series, ProviderError>;
}

impl<T: SeriesSource + ?Sized> SeriesSource for std::sync::Arc<T> {
    fn provider(&self) -> Provider {
        (**self).provider()
    }

    fn fetch_and_normalize(&self, request: &SeriesRequest) -> Result<Series, ProviderError> {
        (**self).fetch_and_normalize(request)
    }
}

/// Fetch with an explicit failure policy.
///
/// `Strict` returns the adapter error unchanged; `Degrade` logs it and returns
/// an empty series tagged with the requested id.
pub fn fetch_series(
    source: &dyn SeriesSource,
    request: &SeriesRequest,
    mode: FailureMode,
) -> Result<Series, ProviderError> {
    match source.fetch_and_normalize(request) {
        Ok(series) => Ok(series),
        Err(err) => match mode {
            FailureMode::Strict => Err(err),
            FailureMode::Degrade => {
                warn!(provider = %source.provider(), series = %request.series_id, error = %err, "degrading to empty series");
                Ok(Series::empty(request.series_id.clone()))
            }
        },
    }
}

/// One source per provider.
pub struct SourceRegistry {
    fred: Box<dyn SeriesSource>,
    bls: Box<dyn SeriesSource>,
    ecb: Box<dyn SeriesSource>,
}

impl SourceRegistry {
    pub fn new(fred: Box<dyn SeriesSource>, bls: Box<dyn SeriesSource>, ecb: Box<dyn SeriesSource>) -> Self {
        Self { fred, bls, ecb }
    }

    /// Live HTTP clients built from configuration.
    pub fn from_config(config: &DashboardConfig) -> Result<Self, AppError> {
        let http = http_client(config.http_timeout)?;
        Ok(Self::new(
            Box::new(FredClient::new(
                http.clone(),
                config.fred_base_url.clone(),
                config.fred_api_key.clone(),
            )),
            Box::new(BlsClient::new(
                http.clone(),
                config.bls_base_url.clone(),
                config.bls_api_key.clone(),
            )),
            Box::new(EcbClient::new(http, config.ecb_base_url.clone())),
        ))
    }

    pub fn source(&self, provider: Provider) -> &dyn SeriesSource {
        match provider {
            Provider::Fred => self.fred.as_ref(),
            Provider::Bls => self.bls.as_ref(),
            Provider::Ecb => self.ecb.as_ref(),
        }
    }
}

pub fn http_client(timeout: Duration) -> Result<Client, AppError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("macro-pulse/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AppError::new(2, format!("Failed to build HTTP client: {e}")))
}

/// Turn a response into its body text, mapping transport and status failures.
pub(crate) fn read_body(provider: Provider, resp: reqwest::Result<Response>) -> Result<String, ProviderError> {
    let resp = resp.map_err(|e| ProviderError::unavailable(provider, None, e.to_string()))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(ProviderError::unavailable(
            provider,
            Some(status.as_u16()),
            status.canonical_reason().unwrap_or("non-success status"),
        ));
    }
    resp.text()
        .map_err(|e| ProviderError::unavailable(provider, Some(status.as_u16()), format!("failed to read body: {e}")))
}

pub(crate) fn parse_json<T: DeserializeOwned>(provider: Provider, body: &str) -> Result<T, ProviderError> {
    serde_json::from_str(body).map_err(|e| ProviderError::malformed(provider, format!("invalid JSON: {e}")))
}

/// Parse an upstream numeric field; `None` for missing markers and non-finite values.
pub(crate) fn parse_value(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed == "." || trimmed.is_empty() {
        return None;
    }
    let v = trimmed.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}
