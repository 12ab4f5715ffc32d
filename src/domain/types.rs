//! Shared domain types.
//!
//! These types are intentionally kept small and serializable so they can be:
//!
//! - produced by any provider adapter
//! - consumed by metric functions and the facts builder
//! - exported to JSON/CSV

use std::collections::BTreeMap;

use chrono::{Months, NaiveDate};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// One observation: a calendar date and a finite value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub date: NaiveDate,
    pub value: f64,
}

impl Point {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// A named, date-ascending sequence of points.
///
/// Invariant (enforced by `from_points`): dates are unique and strictly
/// ascending, values are finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub series: String,
    pub observations: Vec<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
}

impl Series {
    pub fn empty(series: impl Into<String>) -> Self {
        Self {
            series: series.into(),
            observations: Vec::new(),
            units: None,
            frequency: None,
        }
    }

    /// Build a series from points in any order.
    ///
    /// Non-finite values are dropped, points are stably sorted by date and
    /// duplicate dates collapse to their first occurrence.
    pub fn from_points(series: impl Into<String>, points: impl IntoIterator<Item = Point>) -> Self {
        let mut observations: Vec<Point> = points.into_iter().filter(|p| p.value.is_finite()).collect();
        observations.sort_by_key(|p| p.date);
        observations.dedup_by_key(|p| p.date);
        Self {
            series: series.into(),
            observations,
            units: None,
            frequency: None,
        }
    }

    pub fn with_units(mut self, units: Option<String>) -> Self {
        self.units = units;
        self
    }

    pub fn with_frequency(mut self, frequency: Option<String>) -> Self {
        self.frequency = frequency;
        self
    }

    /// Keep only the most recent `max(n, 1)` observations.
    pub fn keep_last(mut self, n: usize) -> Self {
        let n = n.max(1);
        if self.observations.len() > n {
            self.observations.drain(..self.observations.len() - n);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn latest(&self) -> Option<&Point> {
        self.observations.last()
    }

    pub fn values(&self) -> Vec<f64> {
        self.observations.iter().map(|p| p.value).collect()
    }
}

/// Upstream data providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// St. Louis Fed (flat observations JSON).
    Fred,
    /// Bureau of Labor Statistics (year/period rows, newest first).
    Bls,
    /// European Central Bank (SDMX-JSON cube).
    Ecb,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Fred, Provider::Bls, Provider::Ecb];

    pub fn display_name(self) -> &'static str {
        match self {
            Provider::Fred => "FRED",
            Provider::Bls => "BLS",
            Provider::Ecb => "ECB",
        }
    }

    /// A cheap, always-present series used for health probes.
    pub fn probe_series(self) -> &'static str {
        match self {
            Provider::Fred => "CPIAUCSL",
            Provider::Bls => "LNS14000000",
            Provider::Ecb => "EXR:D.USD.EUR.SP00.A",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// What to ask an upstream for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesRequest {
    /// Provider-specific id (`CPIAUCSL`, `LNS14000000`, `EXR:D.USD.EUR.SP00.A`).
    pub series_id: String,
    /// Keep at most this many of the most recent observations.
    pub limit: Option<usize>,
    /// Earliest observation date to request (FRED only).
    pub start: Option<NaiveDate>,
}

impl SeriesRequest {
    pub fn new(series_id: impl Into<String>) -> Self {
        Self {
            series_id: series_id.into(),
            limit: None,
            start: None,
        }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn start(mut self, start: NaiveDate) -> Self {
        self.start = Some(start);
        self
    }
}

/// What an adapter does when a fetch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    /// Return the error to the caller (interactive use).
    #[default]
    Strict,
    /// Log and return an empty series (static/prerender use).
    Degrade,
}

/// How dates of an indicator are displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Monthly,
    Daily,
}

/// The five tracked dashboard indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    /// Headline CPI (CPI-U, seasonally adjusted index).
    Cpi,
    /// U-3 unemployment rate (seasonally adjusted).
    Unemployment,
    /// US 10-year Treasury constant-maturity yield.
    Treasury10y,
    /// S&P 500 index level.
    Equity,
    /// EUR/USD reference rate (USD per EUR).
    EurUsd,
}

impl Indicator {
    pub const ALL: [Indicator; 5] = [
        Indicator::Cpi,
        Indicator::Unemployment,
        Indicator::Treasury10y,
        Indicator::Equity,
        Indicator::EurUsd,
    ];

    pub fn provider(self) -> Provider {
        match self {
            Indicator::Cpi | Indicator::Treasury10y | Indicator::Equity => Provider::Fred,
            Indicator::Unemployment => Provider::Bls,
            Indicator::EurUsd => Provider::Ecb,
        }
    }

    pub fn series_id(self) -> &'static str {
        match self {
            Indicator::Cpi => "CPIAUCSL",
            Indicator::Unemployment => "LNS14000000",
            Indicator::Treasury10y => "DGS10",
            Indicator::Equity => "SP500",
            Indicator::EurUsd => "EXR:D.USD.EUR.SP00.A",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Indicator::Cpi => "Headline CPI (YoY)",
            Indicator::Unemployment => "Unemployment Rate (U-3, SA)",
            Indicator::Treasury10y => "US 10-Year Treasury",
            Indicator::Equity => "S&P 500",
            Indicator::EurUsd => "EUR/USD (ECB)",
        }
    }

    pub fn cadence(self) -> Cadence {
        match self {
            Indicator::Cpi | Indicator::Unemployment => Cadence::Monthly,
            Indicator::Treasury10y | Indicator::Equity | Indicator::EurUsd => Cadence::Daily,
        }
    }

    /// Default fetch window for this indicator, relative to `today`.
    ///
    /// - CPI: ~20 years of monthly points (enough for YoY)
    /// - unemployment: two years of monthly points
    /// - 10y / S&P 500: last 90 points within ~6 months of daily data
    /// - EUR/USD: last 30 daily reference rates (sparkline)
    pub fn default_request(self, today: NaiveDate) -> SeriesRequest {
        let request = SeriesRequest::new(self.series_id());
        match self {
            Indicator::Cpi => {
                let start = today.checked_sub_months(Months::new(240)).unwrap_or(today);
                request.limit(240).start(start)
            }
            Indicator::Unemployment => request.limit(24),
            Indicator::Treasury10y | Indicator::Equity => {
                let start = today - chrono::Duration::days(180);
                request.limit(90).start(start)
            }
            Indicator::EurUsd => request.limit(30),
        }
    }
}

/// A derived display value: current/previous endpoints and their delta.
///
/// Every field is optional; a missing endpoint or a guarded division leaves
/// `delta` as `None`, never NaN/inf.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DerivedMetric {
    pub current: Option<f64>,
    pub previous: Option<f64>,
    pub delta: Option<f64>,
    pub as_of: Option<NaiveDate>,
}

impl DerivedMetric {
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn is_available(&self) -> bool {
        self.current.is_some()
    }
}

/// One derived metric per tracked indicator.
///
/// - `cpi`: current = index level, previous = 12 points back, delta = YoY %
/// - `unemployment`: level %, delta = m/m percentage points
/// - `treasury_10y`: yield %, delta = ~1 month change in bps
/// - `equity`: index level, delta = ~1 month % change
/// - `eur_usd`: USD per EUR, delta = day/day absolute change
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FactSet {
    pub cpi: DerivedMetric,
    pub unemployment: DerivedMetric,
    pub treasury_10y: DerivedMetric,
    pub equity: DerivedMetric,
    pub eur_usd: DerivedMetric,
    /// Why an indicator is unavailable (fetch error text or empty data).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub unavailable: BTreeMap<Indicator, String>,
}

impl FactSet {
    pub fn metric(&self, indicator: Indicator) -> &DerivedMetric {
        match indicator {
            Indicator::Cpi => &self.cpi,
            Indicator::Unemployment => &self.unemployment,
            Indicator::Treasury10y => &self.treasury_10y,
            Indicator::Equity => &self.equity,
            Indicator::EurUsd => &self.eur_usd,
        }
    }

    pub fn metric_mut(&mut self, indicator: Indicator) -> &mut DerivedMetric {
        match indicator {
            Indicator::Cpi => &mut self.cpi,
            Indicator::Unemployment => &mut self.unemployment,
            Indicator::Treasury10y => &mut self.treasury_10y,
            Indicator::Equity => &mut self.equity,
            Indicator::EurUsd => &mut self.eur_usd,
        }
    }
}
