//! ECB data API (SDMX-JSON).

use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use tracing::{debug, info};

use crate::data::sdmx::{SdmxJson, parse_sdmx};
use crate::data::{SeriesSource, parse_json, read_body};
use crate::domain::{Provider, Series, SeriesRequest};
use crate::error::ProviderError;

const DEFAULT_FLOW: &str = "EXR";
const SDMX_JSON: &str = "application/vnd.sdmx.data+json;version=1.0.0-wd, application/json";

pub struct EcbClient {
    client: Client,
    base_url: String,
}

impl EcbClient {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

/// Split `EXR:D.USD.EUR.SP00.A` into `("EXR", "D.USD.EUR.SP00.A")`; a bare key uses `EXR`.
pub fn split_series_id(series_id: &str) -> (&str, &str) {
    match series_id.split_once(':') {
        Some((flow, key)) if !flow.is_empty() => (flow, key),
        Some((_, key)) => (DEFAULT_FLOW, key),
        None => (DEFAULT_FLOW, series_id),
    }
}

impl SeriesSource for EcbClient {
    fn provider(&self) -> Provider {
        Provider::Ecb
    }

    fn fetch_and_normalize(&self, request: &SeriesRequest) -> Result<Series, ProviderError> {
        let (flow, key) = split_series_id(&request.series_id);
        let url = format!("{}/{flow}/{key}", self.base_url.trim_end_matches('/'));

        let mut req = self
            .client
            .get(&url)
            .header(ACCEPT, SDMX_JSON)
            .query(&[("format", "jsondata")]);
        if let Some(n) = request.limit {
            req = req.query(&[("lastNObservations", n.max(1))]);
        }

        debug!(%url, limit = ?request.limit, "requesting ECB data");
        let body = read_body(Provider::Ecb, req.send())?;
        let series = parse_ecb(&request.series_id, &body)?;

        info!(series = %series.series, points = series.len(), "fetched ECB series");
        Ok(series)
    }
}

pub fn parse_ecb(series_id: &str, body: &str) -> Result<Series, ProviderError> {
    let message: SdmxJson = parse_json(Provider::Ecb, body)?;
    normalize_ecb(series_id, &message)
}

pub fn normalize_ecb(series_id: &str, message: &SdmxJson) -> Result<Series, ProviderError> {
    let points = parse_sdmx(message).map_err(|e| ProviderError::malformed(Provider::Ecb, e.to_string()))?;
    Ok(Series::from_points(series_id, points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn splits_flow_and_key() {
        assert_eq!(split_series_id("EXR:D.USD.EUR.SP00.A"), ("EXR", "D.USD.EUR.SP00.A"));
        assert_eq!(split_series_id("D.GBP.EUR.SP00.A"), ("EXR", "D.GBP.EUR.SP00.A"));
        assert_eq!(split_series_id(":D.JPY.EUR.SP00.A"), ("EXR", "D.JPY.EUR.SP00.A"));
        assert_eq!(split_series_id("ICP:M.U2.N.000000.4.ANR"), ("ICP", "M.U2.N.000000.4.ANR"));
    }

    #[test]
    fn normalizes_cube_into_tagged_series() {
        let body = r#"{
            "dataSets": [{"action": "Replace", "series": {"0:0:0:0:0": {"attributes": [0], "observations": {
                "1": [1.1641, 0, 0, null, null],
                "0": [1.1596, 0, 0, null, null]
            }}}}],
            "structure": {"dimensions": {"series": [], "observation": [{
                "id": "TIME_PERIOD", "name": "Time period or range",
                "values": [
                    {"id": "2025-08-07", "name": "2025-08-07"},
                    {"id": "2025-08-08", "name": "2025-08-08"}
                ]
            }]}}
        }"#;
        let series = parse_ecb("EXR:D.USD.EUR.SP00.A", body).unwrap();
        assert_eq!(series.series, "EXR:D.USD.EUR.SP00.A");
        assert_eq!(series.values(), vec![1.1596, 1.1641]);
    }

    #[test]
    fn empty_or_structureless_payload_is_malformed() {
        let err = parse_ecb("EXR:D.USD.EUR.SP00.A", "{}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedPayload);

        let err = parse_ecb("EXR:D.USD.EUR.SP00.A", "null").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedPayload);
    }
}
