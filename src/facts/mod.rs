//! Facts builder: one `DerivedMetric` per indicator.
//!
//! The builder never fails. An indicator whose fetch failed, or whose series
//! is empty, gets an all-`None` metric and a reason in `FactSet::unavailable`.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::domain::{DerivedMetric, FactSet, Indicator, Point, Series};
use crate::error::ProviderError;
use crate::metrics::{
    TRADING_MONTH_LOOKBACK, YOY_LAG, delta_absolute, delta_bps, delta_percent, n_periods_back, year_over_year,
};

/// Decimal places for FX day/day changes.
const FX_DECIMALS: u32 = 4;
/// Decimal places for percentage-point changes.
const PP_DECIMALS: u32 = 1;

/// Settled fetch outcomes, keyed by indicator.
#[derive(Debug, Default)]
pub struct SeriesBundle {
    entries: BTreeMap<Indicator, Result<Series, ProviderError>>,
}

impl SeriesBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, indicator: Indicator, outcome: Result<Series, ProviderError>) {
        self.entries.insert(indicator, outcome);
    }

    pub fn with(mut self, indicator: Indicator, outcome: Result<Series, ProviderError>) -> Self {
        self.insert(indicator, outcome);
        self
    }

    pub fn outcome(&self, indicator: Indicator) -> Option<&Result<Series, ProviderError>> {
        self.entries.get(&indicator)
    }

    /// The series for an indicator, if its fetch succeeded.
    pub fn series(&self, indicator: Indicator) -> Option<&Series> {
        self.outcome(indicator).and_then(|r| r.as_ref().ok())
    }
}

impl FromIterator<(Indicator, Result<Series, ProviderError>)> for SeriesBundle {
    fn from_iter<T: IntoIterator<Item = (Indicator, Result<Series, ProviderError>)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Assemble the fact set from whatever settled.
pub fn build_fact_set(bundle: &SeriesBundle) -> FactSet {
    let mut facts = FactSet::default();

    for indicator in Indicator::ALL {
        let series = match bundle.outcome(indicator) {
            None => Err("not fetched".to_string()),
            Some(Err(err)) => Err(err.to_string()),
            Some(Ok(series)) if series.is_empty() => Err(format!("no observations for {}", series.series)),
            Some(Ok(series)) => Ok(series),
        };

        match series {
            Ok(series) => *facts.metric_mut(indicator) = derive(indicator, &series.observations),
            Err(reason) => {
                warn!(indicator = ?indicator, %reason, "indicator unavailable");
                facts.unavailable.insert(indicator, reason);
            }
        }
    }

    facts
}

/// Derive one indicator's metric from its points.
pub fn derive(indicator: Indicator, points: &[Point]) -> DerivedMetric {
    match indicator {
        Indicator::Cpi => cpi_yoy(points),
        Indicator::Unemployment => one_back(points, |c, p| delta_absolute(c, p, PP_DECIMALS)),
        Indicator::Treasury10y => trading_month(indicator, points, delta_bps),
        Indicator::Equity => trading_month(indicator, points, delta_percent),
        Indicator::EurUsd => one_back(points, |c, p| delta_absolute(c, p, FX_DECIMALS)),
    }
}

fn cpi_yoy(points: &[Point]) -> DerivedMetric {
    let Some(latest) = points.last() else {
        return DerivedMetric::unavailable();
    };
    let previous = points
        .len()
        .checked_sub(YOY_LAG + 1)
        .map(|i| points[i].value);
    DerivedMetric {
        current: Some(latest.value),
        previous,
        delta: year_over_year(points),
        as_of: Some(latest.date),
    }
}

/// Month-over-month / day-over-day: needs two points, otherwise no comparison.
fn one_back(points: &[Point], delta: impl Fn(Option<f64>, Option<f64>) -> Option<f64>) -> DerivedMetric {
    let Some(lb) = n_periods_back(points, 1) else {
        return DerivedMetric::unavailable();
    };
    let current = Some(lb.current.value);
    let previous = (!lb.clamped).then_some(lb.previous.value);
    DerivedMetric {
        current,
        previous,
        delta: delta(current, previous),
        as_of: Some(lb.current.date),
    }
}

/// ~1 trading month lookback; short series clamp to the first point.
fn trading_month(
    indicator: Indicator,
    points: &[Point],
    delta: impl Fn(Option<f64>, Option<f64>) -> Option<f64>,
) -> DerivedMetric {
    let Some(lb) = n_periods_back(points, TRADING_MONTH_LOOKBACK) else {
        return DerivedMetric::unavailable();
    };
    if lb.clamped {
        debug!(
            indicator = ?indicator,
            points = points.len(),
            span = lb.current_index - lb.previous_index,
            "lookback clamped to first point"
        );
    }
    let current = Some(lb.current.value);
    let previous = Some(lb.previous.value);
    DerivedMetric {
        current,
        previous,
        delta: delta(current, previous),
        as_of: Some(lb.current.date),
    }
}
