//! SDMX-JSON cube decoding (ECB data API).
//!
//! An SDMX-JSON data message stores a series as a sparse map from
//! observation index (a string-encoded integer) to a value array, and keeps
//! the calendar labels for those indices in a separate dimension table:
//!
//! ```text
//! dataSets[0].series["0:0:0:0:0"].observations["3"] = [1.0876, 0, 0, null, null]
//! structure.dimensions.observation[k].values[3]      = {"id": "2025-08-08"}
//! ```
//!
//! Decoding is a join of those two mappings on the shared index, followed by a
//! sort on date (the index map carries no ordering guarantee).

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::Point;

/// Dimension id that carries calendar time.
pub const TIME_DIMENSION_ID: &str = "TIME_PERIOD";

#[derive(Debug, Default, Deserialize)]
pub struct SdmxJson {
    #[serde(rename = "dataSets")]
    pub data_sets: Option<Vec<SdmxDataSet>>,
    pub structure: Option<SdmxStructure>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SdmxDataSet {
    /// Raw series objects in document order (`preserve_order`).
    pub series: Option<Map<String, Value>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SdmxSeries {
    pub observations: Option<BTreeMap<String, ObservationValue>>,
}

/// An observation is normally `[value, attr, attr, ...]`; some encoders emit a bare value.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ObservationValue {
    Sequence(Vec<Value>),
    Scalar(Value),
}

impl ObservationValue {
    /// The numeric observation (first element of a sequence), if finite.
    pub fn number(&self) -> Option<f64> {
        let raw = match self {
            ObservationValue::Sequence(items) => items.first()?,
            ObservationValue::Scalar(v) => v,
        };
        let v = match raw {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        v.is_finite().then_some(v)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SdmxStructure {
    #[serde(default)]
    pub dimensions: SdmxDimensions,
}

#[derive(Debug, Default, Deserialize)]
pub struct SdmxDimensions {
    #[serde(default)]
    pub observation: Vec<SdmxDimension>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SdmxDimension {
    pub id: Option<String>,
    #[serde(default)]
    pub values: Vec<SdmxDimensionValue>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SdmxDimensionValue {
    pub id: Option<String>,
    pub name: Option<String>,
}

impl SdmxDimensionValue {
    fn label(&self) -> Option<&str> {
        [self.id.as_deref(), self.name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SdmxError {
    #[error("no dataSets in message")]
    NoDataSet,
    #[error("dataSet has no series")]
    NoSeries,
    #[error("series {0} has no observations map")]
    NoObservations(String),
    #[error("series {key} is not a valid series object: {message}")]
    InvalidSeries { key: String, message: String },
    #[error("structure has no observation dimension")]
    NoTimeDimension,
}

/// Decode the first series of the first data set into date-ascending points.
///
/// Only single-series messages are supported: with several series keys the
/// first key as written in the document wins. Observations without a date label or a
/// finite value are dropped.
pub fn parse_sdmx(message: &SdmxJson) -> Result<Vec<Point>, SdmxError> {
    let data_set = message
        .data_sets
        .as_ref()
        .and_then(|sets| sets.first())
        .ok_or(SdmxError::NoDataSet)?;
    let (key, raw) = data_set
        .series
        .as_ref()
        .and_then(|m| m.iter().next())
        .ok_or(SdmxError::NoSeries)?;
    let series = SdmxSeries::deserialize(raw).map_err(|e| SdmxError::InvalidSeries {
        key: key.clone(),
        message: e.to_string(),
    })?;
    let observations = series
        .observations
        .as_ref()
        .ok_or_else(|| SdmxError::NoObservations(key.clone()))?;

    let dims = message
        .structure
        .as_ref()
        .map(|s| s.dimensions.observation.as_slice())
        .unwrap_or_default();
    let time_dim = time_dimension(dims).ok_or(SdmxError::NoTimeDimension)?;

    let mut points: Vec<Point> = observations
        .iter()
        .filter_map(|(idx, value)| {
            let i: usize = idx.trim().parse().ok()?;
            let date = parse_period_label(time_dim.values.get(i)?.label()?)?;
            Some(Point::new(date, value.number()?))
        })
        .collect();
    points.sort_by_key(|p| p.date);
    Ok(points)
}

/// Prefer the dimension explicitly identified as time, else the first one.
fn time_dimension(dims: &[SdmxDimension]) -> Option<&SdmxDimension> {
    dims.iter()
        .find(|d| d.id.as_deref() == Some(TIME_DIMENSION_ID))
        .or_else(|| dims.first())
}

/// `2025-08-08` as-is; `2025-08` maps to the first of the month.
pub fn parse_period_label(label: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(label, "%Y-%m-%d")
        .ok()
        .or_else(|| NaiveDate::parse_from_str(&format!("{label}-01"), "%Y-%m-%d").ok())
}
