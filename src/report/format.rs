//! Terminal rendering of the fact set as dashboard cards.
//!
//! Every indicator renders either its values or an explicit
//! `data unavailable` line; missing values are never shown as zero.

use chrono::NaiveDate;

use crate::domain::{Cadence, DerivedMetric, FactSet, Indicator, Point};
use crate::plot::sparkline;

/// Number of FX observations shown in the sparkline.
pub const SPARKLINE_POINTS: usize = 30;

const LABEL_WIDTH: usize = 28;

/// `July 2025`.
pub fn fmt_month(date: NaiveDate) -> String {
    date.format("%B %Y").to_string()
}

/// `Aug 8, 2025`.
pub fn fmt_day(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

pub fn fmt_as_of(indicator: Indicator, date: NaiveDate) -> String {
    match indicator.cadence() {
        Cadence::Monthly => fmt_month(date),
        Cadence::Daily => fmt_day(date),
    }
}

/// Leading `+` for positive values; `f64` display otherwise (`21`, `-0.5`).
pub fn signed(v: f64) -> String {
    if v > 0.0 { format!("+{v}") } else { format!("{v}") }
}

/// Fixed decimals with trailing zeros removed (`2.70` -> `2.7`, `3.00` -> `3`).
pub fn fmt_trimmed(v: f64, max_decimals: usize) -> String {
    let s = format!("{v:.max_decimals$}");
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

/// Headline value of an indicator (`3.0%`, `4.3%`, `4.28%`, `6389`, `1.1641`).
pub fn headline(indicator: Indicator, metric: &DerivedMetric) -> Option<String> {
    match indicator {
        Indicator::Cpi => metric.delta.map(|v| format!("{v:.1}%")),
        Indicator::Unemployment => metric.current.map(|v| format!("{v:.1}%")),
        Indicator::Treasury10y => metric.current.map(|v| format!("{v:.2}%")),
        Indicator::Equity => metric.current.map(|v| format!("{v:.0}")),
        Indicator::EurUsd => metric.current.map(|v| format!("{v:.4}")),
    }
}

/// Secondary line describing the change.
pub fn change_text(indicator: Indicator, metric: &DerivedMetric) -> String {
    match indicator {
        Indicator::Cpi => match metric.current {
            Some(level) => format!("index {level:.1}"),
            None => "index n/a".to_string(),
        },
        Indicator::Unemployment => match metric.delta {
            Some(d) => format!("{} pp m/m", signed(d)),
            None => "m/m n/a".to_string(),
        },
        Indicator::Treasury10y => match metric.delta {
            Some(d) => format!("{} bps ~1m", signed(d)),
            None => "1m change n/a".to_string(),
        },
        Indicator::Equity => match metric.delta {
            Some(d) => format!("{}% ~1m", signed(d)),
            None => "1m change n/a".to_string(),
        },
        Indicator::EurUsd => match metric.delta {
            Some(d) => format!("{} d/d", if d > 0.0 { format!("+{d:.4}") } else { format!("{d:.4}") }),
            None => "d/d n/a".to_string(),
        },
    }
}

fn format_card(indicator: Indicator, facts: &FactSet) -> String {
    let metric = facts.metric(indicator);
    let label = indicator.display_name();
    let w = LABEL_WIDTH;

    let Some(value) = headline(indicator, metric) else {
        let reason = facts
            .unavailable
            .get(&indicator)
            .map(|r| format!(" ({r})"))
            .unwrap_or_default();
        return format!("{label:<w$} data unavailable{reason}");
    };

    let as_of = metric
        .as_of
        .map(|d| format!(" | as of {}", fmt_as_of(indicator, d)))
        .unwrap_or_default();
    format!("{label:<w$} {value:>10}  {}{as_of}", change_text(indicator, metric))
}

/// Format all indicator cards; `fx_history` feeds the EUR/USD sparkline.
pub fn format_dashboard(facts: &FactSet, fx_history: &[Point]) -> String {
    let mut out = String::new();
    out.push_str("=== pulse - Macro Dashboard ===\n");

    for indicator in Indicator::ALL {
        out.push_str(&format_card(indicator, facts));
        out.push('\n');
    }

    if facts.eur_usd.is_available() && fx_history.len() > 1 {
        let start = fx_history.len().saturating_sub(SPARKLINE_POINTS);
        let values: Vec<f64> = fx_history[start..].iter().map(|p| p.value).collect();
        out.push_str(&format!(
            "{:<w$} {}  ({} obs)\n",
            "EUR/USD trend",
            sparkline(&values),
            values.len(),
            w = LABEL_WIDTH,
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sample_facts() -> FactSet {
        let mut facts = FactSet::default();
        facts.cpi = DerivedMetric {
            current: Some(322.132),
            previous: Some(314.0),
            delta: Some(2.7089),
            as_of: Some(d(2025, 7, 1)),
        };
        facts.unemployment = DerivedMetric {
            current: Some(4.2),
            previous: Some(4.1),
            delta: Some(0.1),
            as_of: Some(d(2025, 7, 1)),
        };
        facts.treasury_10y = DerivedMetric {
            current: Some(4.28),
            previous: Some(4.40),
            delta: Some(-12.0),
            as_of: Some(d(2025, 8, 8)),
        };
        facts.equity = DerivedMetric {
            current: Some(6389.77),
            previous: Some(6245.0),
            delta: Some(2.32),
            as_of: Some(d(2025, 8, 8)),
        };
        facts
    }

    #[test]
    fn date_display_by_cadence() {
        assert_eq!(fmt_month(d(2025, 7, 1)), "July 2025");
        assert_eq!(fmt_day(d(2025, 8, 8)), "Aug 8, 2025");
        assert_eq!(fmt_as_of(Indicator::Unemployment, d(2025, 7, 1)), "July 2025");
        assert_eq!(fmt_as_of(Indicator::EurUsd, d(2025, 8, 8)), "Aug 8, 2025");
    }

    #[test]
    fn signed_and_trimmed_numbers() {
        assert_eq!(signed(21.0), "+21");
        assert_eq!(signed(-12.5), "-12.5");
        assert_eq!(signed(0.0), "0");
        assert_eq!(fmt_trimmed(2.7089, 2), "2.71");
        assert_eq!(fmt_trimmed(2.7, 2), "2.7");
        assert_eq!(fmt_trimmed(3.0, 2), "3");
    }

    #[test]
    fn renders_values_and_unavailable_state() {
        let mut facts = sample_facts();
        facts
            .unavailable
            .insert(Indicator::EurUsd, "ECB request failed (status 503): Service Unavailable".to_string());
        let out = format_dashboard(&facts, &[]);

        assert!(out.contains("2.7%"));
        assert!(out.contains("index 322.1 | as of July 2025"));
        assert!(out.contains("+0.1 pp m/m"));
        assert!(out.contains("-12 bps ~1m | as of Aug 8, 2025"));
        assert!(out.contains("6390"));
        assert!(out.contains("+2.32% ~1m"));

        let fx_line = out.lines().find(|l| l.starts_with("EUR/USD (ECB)")).unwrap();
        assert!(fx_line.contains("data unavailable (ECB request failed"));
        assert!(!out.contains("EUR/USD trend"));
    }

    #[test]
    fn fx_card_includes_sparkline_when_history_present() {
        let mut facts = sample_facts();
        facts.eur_usd = DerivedMetric {
            current: Some(1.1641),
            previous: Some(1.1596),
            delta: Some(0.0045),
            as_of: Some(d(2025, 8, 8)),
        };
        let history = vec![
            Point::new(d(2025, 8, 6), 1.1580),
            Point::new(d(2025, 8, 7), 1.1596),
            Point::new(d(2025, 8, 8), 1.1641),
        ];
        let out = format_dashboard(&facts, &history);
        assert!(out.contains("1.1641"));
        assert!(out.contains("+0.0045 d/d"));
        assert!(out.contains("EUR/USD trend"));
        assert!(out.contains("(3 obs)"));
    }
}
