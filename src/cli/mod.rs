//! Command-line parsing for the macro dashboard.
//!
//! The goal of this module is to keep **argument parsing** separate from
//! fetching, metrics and rendering; dispatch lives in `crate::app`.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::Provider;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "pulse", version, about = "Macro dashboard: CPI, unemployment, 10y yield, S&P 500 and EUR/USD")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch every indicator and print the dashboard cards.
    Dashboard(DashboardArgs),
    /// Print the one-paragraph summary of the current facts.
    Summary(SummaryArgs),
    /// Fetch and print one normalized series.
    Series(SeriesArgs),
    /// Probe each provider with a one-point request.
    Health,
}

/// Options shared by commands that run the full pipeline.
#[derive(Debug, Args, Clone)]
pub struct FetchArgs {
    /// Turn upstream failures into empty series instead of errors.
    #[arg(long)]
    pub degrade: bool,

    /// HTTP timeout per request (seconds).
    #[arg(long, value_name = "N")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct DashboardArgs {
    #[command(flatten)]
    pub fetch: FetchArgs,

    /// Print the fact set as JSON instead of cards.
    #[arg(long)]
    pub json: bool,

    /// Also write the fact set to a JSON file.
    #[arg(long = "export-facts", value_name = "JSON")]
    pub export_facts: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub fetch: FetchArgs,

    /// External summarizer command (prompt on stdin, sentence on stdout).
    #[arg(long, value_name = "CMD")]
    pub summarizer_cmd: Option<String>,

    /// Summarizer time limit (milliseconds).
    #[arg(long, value_name = "N")]
    pub summary_timeout_ms: Option<u64>,

    /// Print `{text, source}` as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct SeriesArgs {
    /// Upstream provider (fred, bls, ecb).
    #[arg(value_enum)]
    pub provider: Provider,

    /// Provider series id (`DGS10`, `LNS14000000`, `EXR:D.USD.EUR.SP00.A`).
    pub series_id: String,

    /// Keep only the most recent N observations.
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Earliest observation date (YYYY-MM-DD).
    #[arg(long, value_name = "DATE")]
    pub start: Option<NaiveDate>,

    /// Write the series to CSV (or JSON when the path ends in `.json`).
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,

    /// Print the series as JSON instead of a table.
    #[arg(long)]
    pub json: bool,

    /// HTTP timeout (seconds).
    #[arg(long, value_name = "N")]
    pub timeout_secs: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_series_command() {
        let cli = Cli::parse_from([
            "pulse",
            "series",
            "ecb",
            "EXR:D.USD.EUR.SP00.A",
            "--limit",
            "30",
            "--start",
            "2025-01-01",
        ]);
        let Command::Series(args) = cli.command else {
            panic!("expected series command");
        };
        assert_eq!(args.provider, Provider::Ecb);
        assert_eq!(args.series_id, "EXR:D.USD.EUR.SP00.A");
        assert_eq!(args.limit, Some(30));
        assert_eq!(args.start, NaiveDate::from_ymd_opt(2025, 1, 1));
    }

    #[test]
    fn parses_dashboard_flags() {
        let cli = Cli::parse_from(["pulse", "dashboard", "--json", "--degrade", "--timeout-secs", "5"]);
        let Command::Dashboard(args) = cli.command else {
            panic!("expected dashboard command");
        };
        assert!(args.json);
        assert!(args.fetch.degrade);
        assert_eq!(args.fetch.timeout_secs, Some(5));
    }

    #[test]
    fn rejects_unknown_provider() {
        assert!(Cli::try_parse_from(["pulse", "series", "imf", "X"]).is_err());
    }
}
