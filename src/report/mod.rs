//! Reporting: dashboard cards and the natural-language summary.

pub mod format;
pub mod summary;

pub use format::{SPARKLINE_POINTS, change_text, fmt_as_of, fmt_day, fmt_month, format_dashboard, headline};
pub use summary::{
    CommandSummarizer, LazySummarizer, Summarizer, Summary, SummaryError, SummarySource, analysis_sentence,
    compose_summary, deterministic_summary, fact_line,
};
