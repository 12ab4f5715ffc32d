//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - installs logging
//! - parses CLI arguments
//! - builds configuration (environment + flags)
//! - runs the dashboard pipeline
//! - prints cards / summary / JSON and writes optional exports

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, DashboardArgs, FetchArgs, SeriesArgs, SummaryArgs};
use crate::data::{SourceRegistry, fetch_series};
use crate::domain::{DashboardConfig, FailureMode, Indicator, SeriesRequest};
use crate::error::AppError;
use crate::report::{CommandSummarizer, LazySummarizer, Summarizer};

pub mod pipeline;

const DEFAULT_LOG_FILTER: &str = "macro_pulse=info";

/// Entry point for the `pulse` binary.
pub fn run() -> Result<(), AppError> {
    init_logging();

    // `pulse` alone behaves like `pulse dashboard`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);
    let config = DashboardConfig::from_env();
    let today = Local::now().date_naive();

    match cli.command {
        Command::Dashboard(args) => handle_dashboard(args, config, today),
        Command::Summary(args) => handle_summary(args, config, today),
        Command::Series(args) => handle_series(args, config),
        Command::Health => handle_health(&config),
    }
}

/// Logs go to stderr so stdout stays machine-readable; `RUST_LOG` overrides the default.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn apply_fetch_args(mut config: DashboardConfig, args: &FetchArgs) -> DashboardConfig {
    if args.degrade {
        config.failure_mode = FailureMode::Degrade;
    }
    if let Some(secs) = args.timeout_secs {
        config.http_timeout = Duration::from_secs(secs);
    }
    config
}

fn handle_dashboard(args: DashboardArgs, config: DashboardConfig, today: NaiveDate) -> Result<(), AppError> {
    let config = apply_fetch_args(config, &args.fetch);
    let run = pipeline::run_dashboard(&config, today)?;

    if args.json {
        println!("{}", to_json(&run.facts)?);
    } else {
        let fx_history = run
            .bundle
            .series(Indicator::EurUsd)
            .map(|s| s.observations.as_slice())
            .unwrap_or_default();
        print!("{}", crate::report::format_dashboard(&run.facts, fx_history));
    }

    if let Some(path) = &args.export_facts {
        crate::io::write_facts_json(path, &run.facts)?;
        info!(path = %path.display(), "wrote fact set");
    }
    Ok(())
}

fn handle_summary(args: SummaryArgs, config: DashboardConfig, today: NaiveDate) -> Result<(), AppError> {
    let mut config = apply_fetch_args(config, &args.fetch);
    if let Some(cmd) = args.summarizer_cmd {
        config.summarizer_cmd = Some(cmd);
    }
    if let Some(ms) = args.summary_timeout_ms {
        config.summary_timeout = Duration::from_millis(ms);
    }

    let run = pipeline::run_dashboard(&config, today)?;
    let summarizer = summarizer_from_config(&config);
    let summary = crate::report::compose_summary(&run.facts, summarizer.as_ref(), config.summary_timeout);

    if args.json {
        println!("{}", to_json(&summary)?);
    } else {
        println!("{}", summary.text);
    }
    Ok(())
}

/// The command is parsed on first use, inside the lazy initializer.
pub fn summarizer_from_config(config: &DashboardConfig) -> Option<Arc<LazySummarizer>> {
    let cmd = config.summarizer_cmd.clone()?;
    Some(LazySummarizer::new(move || {
        CommandSummarizer::from_command_line(&cmd).map(|s| Box::new(s) as Box<dyn Summarizer>)
    }))
}

fn handle_series(args: SeriesArgs, mut config: DashboardConfig) -> Result<(), AppError> {
    if let Some(secs) = args.timeout_secs {
        config.http_timeout = Duration::from_secs(secs);
    }
    let registry = SourceRegistry::from_config(&config)?;

    let mut request = SeriesRequest::new(&args.series_id);
    if let Some(limit) = args.limit {
        request = request.limit(limit);
    }
    if let Some(start) = args.start {
        request = request.start(start);
    }

    let series = fetch_series(registry.source(args.provider), &request, FailureMode::Strict)?;
    info!(provider = %args.provider, series = %series.series, points = series.len(), "fetched series");

    if args.json {
        println!("{}", to_json(&series)?);
    } else {
        let mut out = std::io::stdout().lock();
        crate::io::write_series_csv_to(&mut out, &series)?;
    }

    if let Some(path) = &args.export {
        crate::io::write_series(path, &series)?;
        info!(path = %path.display(), "wrote series export");
    }
    Ok(())
}

fn handle_health(config: &DashboardConfig) -> Result<(), AppError> {
    let registry = SourceRegistry::from_config(config)?;
    let probes = pipeline::probe_providers(&registry);

    for probe in &probes {
        let status = if probe.ok { "ok" } else { "FAILED" };
        println!("{:<5} {status:<6} {}", probe.provider.display_name(), probe.detail);
    }

    let failed: Vec<&str> = probes
        .iter()
        .filter(|p| !p.ok)
        .map(|p| p.provider.display_name())
        .collect();
    if failed.is_empty() {
        Ok(())
    } else {
        Err(AppError::new(4, format!("Provider health check failed: {}", failed.join(", "))))
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string_pretty(value).map_err(|e| AppError::new(4, format!("Failed to serialize JSON: {e}")))
}

/// Rewrite argv so `pulse` defaults to `pulse dashboard`.
///
/// Rules:
/// - `pulse`                        -> `pulse dashboard`
/// - `pulse --json ...`             -> `pulse dashboard --json ...`
/// - `pulse --help/--version/-h`    -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("dashboard".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    // If the first token is a flag, treat it as "dashboard flags".
    if arg1.starts_with('-') {
        argv.insert(1, "dashboard".to_string());
    }
    argv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::SummaryError;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_runs_dashboard() {
        assert_eq!(rewrite_args(args(&["pulse"])), args(&["pulse", "dashboard"]));
        assert_eq!(
            rewrite_args(args(&["pulse", "--json"])),
            args(&["pulse", "dashboard", "--json"])
        );
        assert_eq!(rewrite_args(args(&["pulse", "--help"])), args(&["pulse", "--help"]));
        assert_eq!(rewrite_args(args(&["pulse", "health"])), args(&["pulse", "health"]));
    }

    #[test]
    fn fetch_flags_override_config() {
        let config = apply_fetch_args(
            DashboardConfig::default(),
            &FetchArgs {
                degrade: true,
                timeout_secs: Some(3),
            },
        );
        assert_eq!(config.failure_mode, FailureMode::Degrade);
        assert_eq!(config.http_timeout, Duration::from_secs(3));
    }

    #[test]
    fn summarizer_is_built_only_when_configured() {
        assert!(summarizer_from_config(&DashboardConfig::default()).is_none());

        let config = DashboardConfig {
            summarizer_cmd: Some("   ".to_string()),
            ..DashboardConfig::default()
        };
        let summarizer = summarizer_from_config(&config).unwrap();
        let err = summarizer.summarize("prompt").unwrap_err();
        assert!(matches!(err, SummaryError::Unavailable(_)));
    }
}
