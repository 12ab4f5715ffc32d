//! Derived metrics over date-ascending point slices.
//!
//! All functions are pure. Intermediate math keeps full `f64` precision;
//! rounding happens only in the `delta_*` formatting helpers.

use crate::domain::Point;

/// Index offset for year-over-year on monthly series.
pub const YOY_LAG: usize = 12;

/// "About one month" of daily trading observations.
///
/// A fixed policy constant, not derived from the data: weekends and holidays
/// are already absent from daily series, so 21 points is used regardless of
/// actual calendar gaps.
pub const TRADING_MONTH_LOOKBACK: usize = 21;

/// Year-over-year percent change: latest vs the point 12 positions earlier.
///
/// Offsets are by index, not by calendar arithmetic; the series is assumed
/// monthly. `None` with fewer than 13 points or a zero/non-finite divisor.
pub fn year_over_year(points: &[Point]) -> Option<f64> {
    if points.len() < YOY_LAG + 1 {
        return None;
    }
    let latest = points[points.len() - 1].value;
    let base = points[points.len() - 1 - YOY_LAG].value;
    if !latest.is_finite() || !base.is_finite() || base == 0.0 {
        return None;
    }
    finite(((latest / base) - 1.0) * 100.0)
}

/// The latest point paired with the point `n` positions before it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lookback<'a> {
    pub current: &'a Point,
    pub previous: &'a Point,
    pub current_index: usize,
    pub previous_index: usize,
    /// The series was shorter than `n + 1`, so `previous` was clamped to index 0.
    pub clamped: bool,
}

/// Pair the last point with the one `n` positions earlier.
///
/// The lookback index is clamped at 0 instead of failing: on a short series
/// `previous` silently becomes the first point and `clamped` is set. Callers
/// must treat that as a lower-precision comparison, not an error. `None` only
/// for an empty slice.
pub fn n_periods_back(points: &[Point], n: usize) -> Option<Lookback<'_>> {
    let current_index = points.len().checked_sub(1)?;
    let previous_index = current_index.saturating_sub(n);
    Some(Lookback {
        current: &points[current_index],
        previous: &points[previous_index],
        current_index,
        previous_index,
        clamped: current_index < n,
    })
}

/// Change in basis points between two percentage levels, one decimal.
pub fn delta_bps(current: Option<f64>, previous: Option<f64>) -> Option<f64> {
    let (c, p) = (current?, previous?);
    finite((c - p) * 100.0).map(|v| round_to(v, 1))
}

/// Percent change, two decimals. `None` if `previous` is missing or zero.
pub fn delta_percent(current: Option<f64>, previous: Option<f64>) -> Option<f64> {
    let (c, p) = (current?, previous?);
    if p == 0.0 {
        return None;
    }
    finite(((c / p) - 1.0) * 100.0).map(|v| round_to(v, 2))
}

/// Absolute difference rounded to `decimals`
/// (4 for FX rates, 1 for percentage-point indicators).
pub fn delta_absolute(current: Option<f64>, previous: Option<f64>, decimals: u32) -> Option<f64> {
    let (c, p) = (current?, previous?);
    finite(c - p).map(|v| round_to(v, decimals))
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * factor).round() / factor;
    // Avoid rendering "-0.0".
    if rounded == 0.0 { 0.0 } else { rounded }
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}
