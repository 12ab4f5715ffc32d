//! FRED API integration (flat observations JSON).

use chrono::NaiveDate;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::data::{SeriesSource, parse_json, parse_value, read_body};
use crate::domain::{Point, Provider, Series, SeriesRequest};
use crate::error::ProviderError;

pub struct FredClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl FredClient {
    pub fn new(client: Client, base_url: String, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }
}

impl SeriesSource for FredClient {
    fn provider(&self) -> Provider {
        Provider::Fred
    }

    fn fetch_and_normalize(&self, request: &SeriesRequest) -> Result<Series, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingCredential("FRED_API_KEY"))?;

        let mut req = self.client.get(&self.base_url).query(&[
            ("series_id", request.series_id.as_str()),
            ("api_key", api_key),
            ("file_type", "json"),
        ]);
        if let Some(start) = request.start {
            req = req.query(&[("observation_start", start.to_string())]);
        }

        debug!(series = %request.series_id, start = ?request.start, "requesting FRED observations");
        let body = read_body(Provider::Fred, req.send())?;
        let series = parse_fred(&request.series_id, &body)?;
        let series = match request.limit {
            Some(limit) => series.keep_last(limit),
            None => series,
        };

        info!(series = %series.series, points = series.len(), "fetched FRED series");
        Ok(series)
    }
}

#[derive(Debug, Deserialize)]
pub struct FredResponse {
    pub observations: Option<Vec<FredObservation>>,
    pub units: Option<String>,
    pub frequency: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FredObservation {
    pub date: String,
    /// FRED returns strings; `"."` means missing.
    #[serde(default)]
    pub value: String,
}

/// Parse a raw FRED body into a canonical series.
pub fn parse_fred(series_id: &str, body: &str) -> Result<Series, ProviderError> {
    let response: FredResponse = parse_json(Provider::Fred, body)?;
    normalize_fred(series_id, response)
}

/// Convert FRED observations to points.
///
/// Missing markers, non-finite values and unparseable dates are dropped row
/// by row, never zero-filled.
pub fn normalize_fred(series_id: &str, response: FredResponse) -> Result<Series, ProviderError> {
    let observations = response
        .observations
        .ok_or_else(|| ProviderError::malformed(Provider::Fred, format!("missing observations array for {series_id}")))?;

    let mut points = Vec::with_capacity(observations.len());
    let mut dropped = 0usize;
    for obs in observations {
        let Some(value) = parse_value(&obs.value) else {
            dropped += 1;
            continue;
        };
        let Ok(date) = NaiveDate::parse_from_str(obs.date.trim(), "%Y-%m-%d") else {
            debug!(series = series_id, date = %obs.date, "skipping FRED row with unparseable date");
            continue;
        };
        points.push(Point::new(date, value));
    }
    if dropped > 0 {
        debug!(series = series_id, dropped, "dropped missing FRED observations");
    }

    Ok(Series::from_points(series_id, points)
        .with_units(response.units)
        .with_frequency(response.frequency))
}
