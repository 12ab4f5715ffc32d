//! Shared "dashboard pipeline" logic used by every CLI command.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! plan -> concurrent fetch (all settle) -> facts
//!
//! The commands can then focus on presentation (cards, summary, JSON).

use chrono::NaiveDate;
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::data::{SourceRegistry, fetch_series};
use crate::domain::{DashboardConfig, FactSet, FailureMode, Indicator, Provider, SeriesRequest};
use crate::error::AppError;
use crate::facts::{SeriesBundle, build_fact_set};

/// All computed outputs of one dashboard run.
#[derive(Debug)]
pub struct DashboardRun {
    pub bundle: SeriesBundle,
    pub facts: FactSet,
}

/// The default request for each tracked indicator.
pub fn default_plan(today: NaiveDate) -> Vec<(Indicator, SeriesRequest)> {
    Indicator::ALL
        .into_iter()
        .map(|indicator| (indicator, indicator.default_request(today)))
        .collect()
}

/// Run `f` over every item at once, one pool thread per item.
///
/// Fetches block on I/O, so the global pool (one thread per CPU) would
/// serialize them on small hosts.
fn fan_out<T: Sync, R: Send>(items: &[T], f: impl Fn(&T) -> R + Sync) -> Vec<R> {
    match ThreadPoolBuilder::new()
        .num_threads(items.len().max(1))
        .thread_name(|i| format!("pulse-fetch-{i}"))
        .build()
    {
        Ok(pool) => pool.install(|| items.par_iter().map(&f).collect()),
        Err(err) => {
            warn!(error = %err, "could not build fetch pool; using the global pool");
            items.par_iter().map(&f).collect()
        }
    }
}

/// Issue every request concurrently and wait for all of them to settle.
///
/// One slow or failing upstream only affects its own indicator; in `Degrade`
/// mode failures are already converted to empty series here.
pub fn gather(registry: &SourceRegistry, plan: &[(Indicator, SeriesRequest)], mode: FailureMode) -> SeriesBundle {
    fan_out(plan, |(indicator, request)| {
        let source = registry.source(indicator.provider());
        (*indicator, fetch_series(source, request, mode))
    })
    .into_iter()
    .collect()
}

/// Execute the full pipeline against live upstreams.
pub fn run_dashboard(config: &DashboardConfig, today: NaiveDate) -> Result<DashboardRun, AppError> {
    let registry = SourceRegistry::from_config(config)?;
    Ok(run_dashboard_with(&registry, &default_plan(today), config.failure_mode))
}

/// Execute the pipeline with a pre-built registry (fakes in tests).
pub fn run_dashboard_with(
    registry: &SourceRegistry,
    plan: &[(Indicator, SeriesRequest)],
    mode: FailureMode,
) -> DashboardRun {
    let bundle = gather(registry, plan, mode);
    let facts = build_fact_set(&bundle);
    info!(
        available = Indicator::ALL.len() - facts.unavailable.len(),
        unavailable = facts.unavailable.len(),
        "built fact set"
    );
    DashboardRun { bundle, facts }
}

/// Outcome of probing one provider.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub provider: Provider,
    pub ok: bool,
    pub detail: String,
}

/// Fetch one point from each provider, concurrently.
pub fn probe_providers(registry: &SourceRegistry) -> Vec<ProbeResult> {
    fan_out(&Provider::ALL, |&provider| {
        let request = SeriesRequest::new(provider.probe_series()).limit(1);
        match registry.source(provider).fetch_and_normalize(&request) {
            Ok(series) => ProbeResult {
                provider,
                ok: !series.is_empty(),
                detail: match series.latest() {
                    Some(p) => format!("{} latest {} = {}", series.series, p.date, p.value),
                    None => format!("{} returned no observations", series.series),
                },
            },
            Err(err) => ProbeResult {
                provider,
                ok: false,
                detail: err.to_string(),
            },
        }
    })
}
