//! BLS public API v2 (timeseries POST endpoint).

use chrono::NaiveDate;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::data::{SeriesSource, parse_json, parse_value, read_body};
use crate::domain::{Point, Provider, Series, SeriesRequest};
use crate::error::ProviderError;

const STATUS_NOT_PROCESSED: &str = "REQUEST_NOT_PROCESSED";

pub struct BlsClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl BlsClient {
    pub fn new(client: Client, base_url: String, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }
}

#[derive(Debug, Serialize)]
struct BlsRequestBody<'a> {
    seriesid: [&'a str; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    registrationkey: Option<&'a str>,
}

impl SeriesSource for BlsClient {
    fn provider(&self) -> Provider {
        Provider::Bls
    }

    fn fetch_and_normalize(&self, request: &SeriesRequest) -> Result<Series, ProviderError> {
        let body = BlsRequestBody {
            seriesid: [request.series_id.as_str()],
            registrationkey: self.api_key.as_deref(),
        };

        debug!(series = %request.series_id, "requesting BLS timeseries");
        let text = read_body(Provider::Bls, self.client.post(&self.base_url).json(&body).send())?;
        let series = parse_bls(&request.series_id, &text)?;
        let series = match request.limit {
            Some(limit) => series.keep_last(limit),
            None => series,
        };

        info!(series = %series.series, points = series.len(), "fetched BLS series");
        Ok(series)
    }
}

#[derive(Debug, Deserialize)]
pub struct BlsResponse {
    pub status: Option<String>,
    #[serde(default)]
    pub message: Vec<String>,
    #[serde(rename = "Results")]
    pub results: Option<BlsResults>,
}

#[derive(Debug, Deserialize)]
pub struct BlsResults {
    #[serde(default)]
    pub series: Vec<BlsSeries>,
}

#[derive(Debug, Deserialize)]
pub struct BlsSeries {
    #[serde(rename = "seriesID")]
    pub series_id: Option<String>,
    /// Newest first.
    #[serde(default)]
    pub data: Vec<BlsDatum>,
}

#[derive(Debug, Deserialize)]
pub struct BlsDatum {
    pub year: String,
    /// `M01`..`M12` for monthly data; `M13` is the annual average.
    pub period: String,
    pub value: String,
}

pub fn parse_bls(series_id: &str, body: &str) -> Result<Series, ProviderError> {
    let response: BlsResponse = parse_json(Provider::Bls, body)?;
    normalize_bls(series_id, response)
}

/// Convert BLS rows to an ascending monthly series dated `YYYY-MM-01`.
///
/// Rows whose period is not a two-digit calendar month, or whose value does
/// not parse, are skipped.
pub fn normalize_bls(series_id: &str, response: BlsResponse) -> Result<Series, ProviderError> {
    if response.status.as_deref() == Some(STATUS_NOT_PROCESSED) {
        return Err(ProviderError::unavailable(
            Provider::Bls,
            None,
            response.message.join("; "),
        ));
    }

    let results = response
        .results
        .ok_or_else(|| ProviderError::malformed(Provider::Bls, format!("missing Results for {series_id}")))?;
    let Some(first) = results.series.into_iter().next() else {
        return Err(ProviderError::malformed(Provider::Bls, format!("no series in Results for {series_id}")));
    };

    let mut points = Vec::with_capacity(first.data.len());
    for row in first.data.iter().rev() {
        let Some(date) = period_date(&row.year, &row.period) else {
            debug!(series = series_id, year = %row.year, period = %row.period, "skipping non-monthly BLS period");
            continue;
        };
        let Some(value) = parse_value(&row.value) else {
            debug!(series = series_id, %date, value = %row.value, "skipping unparseable BLS value");
            continue;
        };
        points.push(Point::new(date, value));
    }

    Ok(Series::from_points(series_id, points).with_frequency(Some("Monthly".to_string())))
}

/// `("2025", "M07")` -> 2025-07-01.
fn period_date(year: &str, period: &str) -> Option<NaiveDate> {
    let month = period.strip_prefix('M')?;
    if month.len() != 2 || !month.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let month: u32 = month.parse().ok()?;
    let year: i32 = year.trim().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn body(rows: &str) -> String {
        format!(
            r#"{{"status": "REQUEST_SUCCEEDED", "message": [],
                "Results": {{"series": [{{"seriesID": "LNS14000000", "data": [{rows}]}}]}}}}"#
        )
    }

    #[test]
    fn reverses_newest_first_rows_to_ascending() {
        let rows = r#"
            {"year": "2025", "period": "M07", "periodName": "July", "value": "4.2"},
            {"year": "2025", "period": "M06", "periodName": "June", "value": "4.1"},
            {"year": "2024", "period": "M12", "periodName": "December", "value": "4.1"}
        "#;
        let series = parse_bls("LNS14000000", &body(rows)).unwrap();
        let dates: Vec<String> = series.observations.iter().map(|p| p.date.to_string()).collect();
        assert_eq!(dates, vec!["2024-12-01", "2025-06-01", "2025-07-01"]);
        assert_eq!(series.values(), vec![4.1, 4.1, 4.2]);
        assert_eq!(series.frequency.as_deref(), Some("Monthly"));
    }

    #[test]
    fn rejects_annual_and_non_monthly_period_codes() {
        let rows = r#"
            {"year": "2024", "period": "M13", "value": "4.0"},
            {"year": "2024", "period": "Q04", "value": "4.1"},
            {"year": "2024", "period": "M1", "value": "4.2"},
            {"year": "2024", "period": "A01", "value": "4.3"},
            {"year": "2024", "period": "M11", "value": "4.2"}
        "#;
        let series = parse_bls("LNS14000000", &body(rows)).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.observations[0].date.to_string(), "2024-11-01");
    }

    #[test]
    fn unparseable_values_are_skipped_silently() {
        let rows = r#"
            {"year": "2025", "period": "M02", "value": "-"},
            {"year": "2025", "period": "M01", "value": "4.0"}
        "#;
        let series = parse_bls("LNS14000000", &body(rows)).unwrap();
        assert_eq!(series.values(), vec![4.0]);
    }

    #[test]
    fn not_processed_status_is_upstream_unavailable() {
        let raw = r#"{"status": "REQUEST_NOT_PROCESSED",
            "message": ["daily threshold for total number of requests allocated to you has been reached"],
            "Results": {}}"#;
        let err = parse_bls("LNS14000000", raw).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);
        assert!(err.to_string().contains("daily threshold"));
    }

    #[test]
    fn missing_results_is_malformed() {
        let err = parse_bls("LNS14000000", r#"{"status": "REQUEST_SUCCEEDED"}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedPayload);
    }
}
