//! Natural-language summary of a fact set.
//!
//! Two sources of text:
//!
//! - a deterministic narrative built from the facts (always available)
//! - an optional `Summarizer` capability that compresses the fact line into
//!   one sentence; it is injected by the caller, initialized lazily on first
//!   use and bounded by a timeout
//!
//! Model output that fails the guardrails (one sentence, terminal
//! punctuation, at least 30 characters) falls back to the deterministic text.

use std::io::{Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, OnceLock, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{FactSet, Indicator};
use crate::report::format::{fmt_as_of, fmt_trimmed, signed};

const MIN_MODEL_SENTENCE_LEN: usize = 30;
/// How long a timed-out call waits for the backend to cancel its own work.
const CANCEL_GRACE: Duration = Duration::from_millis(250);
const CHILD_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SummaryError {
    #[error("summarizer unavailable: {0}")]
    Unavailable(String),
    #[error("summarizer timed out after {0:?}")]
    TimedOut(Duration),
    #[error("summarizer failed: {0}")]
    Failed(String),
}

/// Text-to-text capability used to compress the fact line.
///
/// `summarize_until` is the cancellation contract: a backend that holds
/// external resources must release them and return `TimedOut` once
/// `deadline` passes. The default ignores the deadline.
pub trait Summarizer: Send + Sync {
    fn summarize(&self, prompt: &str) -> Result<String, SummaryError>;

    fn summarize_until(&self, prompt: &str, deadline: Instant) -> Result<String, SummaryError> {
        let _ = deadline;
        self.summarize(prompt)
    }
}

type BackendInit = Box<dyn Fn() -> Result<Box<dyn Summarizer>, SummaryError> + Send + Sync>;

/// A summarizer whose backend is constructed on first use.
///
/// Initialization runs at most once per instance; a failed initialization is
/// cached and reported on every later call.
pub struct LazySummarizer {
    init: BackendInit,
    backend: OnceLock<Result<Box<dyn Summarizer>, SummaryError>>,
}

impl LazySummarizer {
    pub fn new(
        init: impl Fn() -> Result<Box<dyn Summarizer>, SummaryError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            init: Box::new(init),
            backend: OnceLock::new(),
        })
    }

    fn backend(&self) -> Result<&dyn Summarizer, SummaryError> {
        match self.backend.get_or_init(|| (self.init)()) {
            Ok(backend) => Ok(backend.as_ref()),
            Err(err) => Err(err.clone()),
        }
    }

    /// Summarize on a worker thread, giving up after `timeout`.
    ///
    /// The backend receives the same deadline. On timeout the caller waits up
    /// to `CANCEL_GRACE` for it to cancel, then detaches the worker.
    pub fn summarize_within(self: &Arc<Self>, prompt: &str, timeout: Duration) -> Result<String, SummaryError> {
        let deadline = Instant::now() + timeout;
        let (tx, rx) = mpsc::channel();
        let this = Arc::clone(self);
        let prompt = prompt.to_string();
        thread::spawn(move || {
            let result = this.backend().and_then(|b| b.summarize_until(&prompt, deadline));
            let _ = tx.send(result);
        });

        match rx.recv_timeout(timeout) {
            Ok(Err(SummaryError::TimedOut(_))) => Err(SummaryError::TimedOut(timeout)),
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                let _ = rx.recv_timeout(CANCEL_GRACE);
                Err(SummaryError::TimedOut(timeout))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(SummaryError::Failed("summarizer worker exited without a result".to_string()))
            }
        }
    }
}

impl Summarizer for LazySummarizer {
    fn summarize(&self, prompt: &str) -> Result<String, SummaryError> {
        self.backend()?.summarize(prompt)
    }

    fn summarize_until(&self, prompt: &str, deadline: Instant) -> Result<String, SummaryError> {
        self.backend()?.summarize_until(prompt, deadline)
    }
}

/// Runs an external command: prompt on stdin, summary on stdout.
#[derive(Debug, Clone)]
pub struct CommandSummarizer {
    program: String,
    args: Vec<String>,
}

impl CommandSummarizer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Parse a whitespace-separated command line (`"ollama run llama3"`).
    pub fn from_command_line(command: &str) -> Result<Self, SummaryError> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| SummaryError::Unavailable("empty summarizer command".to_string()))?;
        Ok(Self::new(program, parts.collect()))
    }

    fn run(&self, prompt: &str, deadline: Option<Instant>) -> Result<String, SummaryError> {
        let started = Instant::now();
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| SummaryError::Unavailable(format!("{}: {e}", self.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(prompt.as_bytes()) {
                reap(&mut child);
                return Err(SummaryError::Failed(format!("writing prompt: {e}")));
            }
        }

        // Drain stdout concurrently so a chatty child never blocks on a full pipe.
        let stdout = child.stdout.take();
        let reader = thread::spawn(move || {
            let mut text = String::new();
            if let Some(mut out) = stdout {
                let _ = out.read_to_string(&mut text);
            }
            text
        });

        let status = match deadline {
            Some(deadline) => wait_until(&mut child, deadline).map_err(|e| match e {
                SummaryError::TimedOut(_) => SummaryError::TimedOut(deadline.saturating_duration_since(started)),
                other => other,
            })?,
            None => child
                .wait()
                .map_err(|e| SummaryError::Failed(format!("waiting for {}: {e}", self.program)))?,
        };
        if !status.success() {
            return Err(SummaryError::Failed(format!("{} exited with {status}", self.program)));
        }
        reader
            .join()
            .map_err(|_| SummaryError::Failed("stdout reader panicked".to_string()))
    }
}

/// Wait for the child, killing it once `deadline` passes.
fn wait_until(child: &mut Child, deadline: Instant) -> Result<ExitStatus, SummaryError> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {}
            Err(e) => {
                reap(child);
                return Err(SummaryError::Failed(format!("polling summarizer: {e}")));
            }
        }
        if Instant::now() >= deadline {
            debug!(pid = child.id(), "killing summarizer past its deadline");
            reap(child);
            return Err(SummaryError::TimedOut(Duration::ZERO));
        }
        thread::sleep(CHILD_POLL_INTERVAL);
    }
}

fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

impl Summarizer for CommandSummarizer {
    fn summarize(&self, prompt: &str) -> Result<String, SummaryError> {
        self.run(prompt, None)
    }

    fn summarize_until(&self, prompt: &str, deadline: Instant) -> Result<String, SummaryError> {
        self.run(prompt, Some(deadline))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SummarySource {
    #[serde(rename = "model+deterministic")]
    ModelAndDeterministic,
    #[serde(rename = "deterministic")]
    Deterministic,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub text: String,
    pub source: SummarySource,
}

fn as_of(facts: &FactSet, indicator: Indicator) -> String {
    facts
        .metric(indicator)
        .as_of
        .map(|d| fmt_as_of(indicator, d))
        .unwrap_or_else(|| "n/a".to_string())
}

fn level(v: Option<f64>, decimals: usize) -> String {
    v.map(|v| format!("{v:.decimals$}")).unwrap_or_else(|| "n/a".to_string())
}

fn pct(v: Option<f64>) -> String {
    v.map(|v| format!("{}%", fmt_trimmed(v, 2)))
        .unwrap_or_else(|| "n/a".to_string())
}

fn bps_1m(delta: Option<f64>, suffix: &str) -> String {
    match delta {
        Some(d) => format!("{} bps {suffix}", signed(d)),
        None => "1m change n/a".to_string(),
    }
}

fn pct_1m(delta: Option<f64>) -> String {
    match delta {
        Some(d) => format!("{}%", signed(d)),
        None => "1m change n/a".to_string(),
    }
}

/// One compact line with every fact (the summarizer prompt).
pub fn fact_line(facts: &FactSet) -> String {
    let unemp_mom = match facts.unemployment.delta {
        Some(d) => format!("m/m {}pp", signed(d)),
        None => "m/m n/a".to_string(),
    };
    let fx_change = match facts.eur_usd.delta {
        Some(d) => format!(", d/d {}", signed(d)),
        None => String::new(),
    };

    format!(
        "CPI YoY {} ({}); unemployment {}% ({}, {unemp_mom}); \
         10y {}% on {} ({}); S&P 500 {} on {} ({}); EUR/USD {} ({}{fx_change}).",
        pct(facts.cpi.delta),
        as_of(facts, Indicator::Cpi),
        level(facts.unemployment.current, 1),
        as_of(facts, Indicator::Unemployment),
        level(facts.treasury_10y.current, 2),
        as_of(facts, Indicator::Treasury10y),
        bps_1m(facts.treasury_10y.delta, "~1m"),
        level(facts.equity.current, 0),
        as_of(facts, Indicator::Equity),
        pct_1m(facts.equity.delta),
        level(facts.eur_usd.current, 4),
        as_of(facts, Indicator::EurUsd),
    )
}

fn bonds_tone(facts: &FactSet) -> &'static str {
    match facts.treasury_10y.delta {
        None => "mixed for bonds",
        Some(d) if d < 0.0 => "supportive for bond prices as yields fell",
        Some(_) => "a headwind for bond prices as yields rose",
    }
}

fn equities_tone(facts: &FactSet) -> &'static str {
    match facts.equity.delta {
        None => "mixed for equities",
        Some(d) if d >= 0.0 => "constructive for equities",
        Some(_) => "soft for equities",
    }
}

fn fx_tone(facts: &FactSet) -> Option<&'static str> {
    facts.eur_usd.delta.map(|d| {
        if d > 0.0 {
            "a slightly weaker USD vs EUR"
        } else {
            "a slightly stronger USD vs EUR"
        }
    })
}

/// Deterministic one-sentence reading of the facts.
pub fn analysis_sentence(facts: &FactSet) -> String {
    format!(
        "This mix suggests {} and {}; for payments/FX, conditions point to {} in the near term.",
        bonds_tone(facts),
        equities_tone(facts),
        fx_tone(facts).unwrap_or("stable USD/EUR rates"),
    )
}

/// Two-sentence narrative used when no model text is available.
pub fn deterministic_summary(facts: &FactSet) -> String {
    let cpi_index = facts
        .cpi
        .current
        .map(|v| format!(" (index {})", fmt_trimmed(v, 3)))
        .unwrap_or_default();
    let unemp_change = match facts.unemployment.delta {
        Some(d) if d > 0.0 => format!("rose {}pp m/m", fmt_trimmed(d, 1)),
        Some(d) if d < 0.0 => format!("fell {}pp m/m", fmt_trimmed(d.abs(), 1)),
        Some(_) => "was unchanged m/m".to_string(),
        None => "m/m change n/a".to_string(),
    };
    let fx = fx_tone(facts).map(|t| format!(", and {t}")).unwrap_or_default();

    format!(
        "In {}, CPI inflation was {}{cpi_index}; unemployment was {}% in {} ({unemp_change}). \
         The 10-year Treasury yield was {}% on {} ({}), and the S&P 500 was {} on {} ({}), \
         which is {}, {}{fx}.",
        as_of(facts, Indicator::Cpi),
        pct(facts.cpi.delta),
        level(facts.unemployment.current, 1),
        as_of(facts, Indicator::Unemployment),
        level(facts.treasury_10y.current, 2),
        as_of(facts, Indicator::Treasury10y),
        bps_1m(facts.treasury_10y.delta, "over ~1m"),
        level(facts.equity.current, 0),
        as_of(facts, Indicator::Equity),
        pct_1m(facts.equity.delta),
        bonds_tone(facts),
        equities_tone(facts),
    )
}

/// Reduce model output to one clean sentence, or reject it.
pub fn guard_sentence(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let first = first_sentence(&collapsed).trim();
    if first.is_empty() {
        return None;
    }
    let sentence = if first.ends_with(['.', '!', '?']) {
        first.to_string()
    } else {
        format!("{first}.")
    };
    (sentence.chars().count() > MIN_MODEL_SENTENCE_LEN).then_some(sentence)
}

/// Text up to and including the first `.`, `!` or `?` that is followed by whitespace.
fn first_sentence(text: &str) -> &str {
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') && chars.peek().is_some_and(|(_, next)| next.is_whitespace()) {
            return &text[..i + c.len_utf8()];
        }
    }
    text
}

/// Build the summary, using the summarizer when one is injected.
pub fn compose_summary(facts: &FactSet, summarizer: Option<&Arc<LazySummarizer>>, timeout: Duration) -> Summary {
    if let Some(summarizer) = summarizer {
        let prompt = format!("summarize: {}", fact_line(facts));
        match summarizer.summarize_within(&prompt, timeout) {
            Ok(text) => match guard_sentence(&text) {
                Some(sentence) => {
                    return Summary {
                        text: format!("{sentence} {}", analysis_sentence(facts)),
                        source: SummarySource::ModelAndDeterministic,
                    };
                }
                None => debug!(output = %text, "summarizer output rejected by guardrails"),
            },
            Err(err) => warn!(error = %err, "summarizer failed; using deterministic text"),
        }
    }

    Summary {
        text: deterministic_summary(facts),
        source: SummarySource::Deterministic,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::NaiveDate;

    use super::*;
    use crate::domain::DerivedMetric;

    struct Echo(&'static str);

    impl Summarizer for Echo {
        fn summarize(&self, _prompt: &str) -> Result<String, SummaryError> {
            Ok(self.0.to_string())
        }
    }

    struct Slow;

    impl Summarizer for Slow {
        fn summarize(&self, _prompt: &str) -> Result<String, SummaryError> {
            thread::sleep(Duration::from_millis(500));
            Ok("Too late to matter for anyone reading this summary.".to_string())
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn facts() -> FactSet {
        let mut facts = FactSet::default();
        facts.cpi = DerivedMetric {
            current: Some(322.132),
            previous: Some(313.6),
            delta: Some(2.7207),
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
            previous: Some(4.4),
            delta: Some(-12.0),
            as_of: Some(d(2025, 8, 8)),
        };
        facts.equity = DerivedMetric {
            current: Some(6389.77),
            previous: Some(6245.0),
            delta: Some(2.32),
            as_of: Some(d(2025, 8, 8)),
        };
        facts.eur_usd = DerivedMetric {
            current: Some(1.1641),
            previous: Some(1.1596),
            delta: Some(0.0045),
            as_of: Some(d(2025, 8, 8)),
        };
        facts
    }

    #[test]
    fn fact_line_lists_every_indicator() {
        let line = fact_line(&facts());
        assert_eq!(
            line,
            "CPI YoY 2.72% (July 2025); unemployment 4.2% (July 2025, m/m +0.1pp); \
             10y 4.28% on Aug 8, 2025 (-12 bps ~1m); S&P 500 6390 on Aug 8, 2025 (+2.32%); \
             EUR/USD 1.1641 (Aug 8, 2025, d/d +0.0045)."
        );
    }

    #[test]
    fn fact_line_marks_missing_values() {
        let mut f = facts();
        f.eur_usd = DerivedMetric::unavailable();
        f.treasury_10y.delta = None;
        let line = fact_line(&f);
        assert!(line.contains("(1m change n/a)"));
        assert!(line.ends_with("EUR/USD n/a (n/a)."));
    }

    #[test]
    fn analysis_tones_follow_deltas() {
        let f = facts();
        assert_eq!(
            analysis_sentence(&f),
            "This mix suggests supportive for bond prices as yields fell and constructive for equities; \
             for payments/FX, conditions point to a slightly weaker USD vs EUR in the near term."
        );

        let mut f = FactSet::default();
        f.equity.delta = Some(-1.0);
        let s = analysis_sentence(&f);
        assert!(s.contains("mixed for bonds"));
        assert!(s.contains("soft for equities"));
        assert!(s.contains("stable USD/EUR rates"));
    }

    #[test]
    fn deterministic_summary_reads_naturally() {
        let text = deterministic_summary(&facts());
        assert!(text.starts_with("In July 2025, CPI inflation was 2.72% (index 322.132);"));
        assert!(text.contains("unemployment was 4.2% in July 2025 (rose 0.1pp m/m)"));
        assert!(text.contains("(-12 bps over ~1m)"));
        assert!(text.ends_with("constructive for equities, and a slightly weaker USD vs EUR."));
    }

    #[test]
    fn guardrails_keep_first_sentence_and_punctuate() {
        assert_eq!(
            guard_sentence("  Inflation held near 2.7%   while yields eased in August. Extra text."),
            Some("Inflation held near 2.7% while yields eased in August.".to_string())
        );
        assert_eq!(
            guard_sentence("Inflation held near 2.7% while yields eased"),
            Some("Inflation held near 2.7% while yields eased.".to_string())
        );
        assert_eq!(guard_sentence("Too short."), None);
        assert_eq!(guard_sentence("   "), None);
    }

    #[test]
    fn model_text_is_used_when_it_passes_guardrails() {
        let summarizer = LazySummarizer::new(|| {
            Ok(Box::new(Echo("Inflation held near 2.7% while yields eased in early August.")) as Box<dyn Summarizer>)
        });
        let summary = compose_summary(&facts(), Some(&summarizer), Duration::from_secs(2));
        assert_eq!(summary.source, SummarySource::ModelAndDeterministic);
        assert!(summary.text.starts_with("Inflation held near 2.7%"));
        assert!(summary.text.ends_with("in the near term."));
    }

    #[test]
    fn falls_back_on_short_output_timeout_and_init_failure() {
        let f = facts();

        let short = LazySummarizer::new(|| Ok(Box::new(Echo("ok")) as Box<dyn Summarizer>));
        let s = compose_summary(&f, Some(&short), Duration::from_secs(2));
        assert_eq!(s.source, SummarySource::Deterministic);

        let slow = LazySummarizer::new(|| Ok(Box::new(Slow) as Box<dyn Summarizer>));
        let err = slow.summarize_within("x", Duration::from_millis(20)).unwrap_err();
        assert_eq!(err, SummaryError::TimedOut(Duration::from_millis(20)));
        let s = compose_summary(&f, Some(&slow), Duration::from_millis(20));
        assert_eq!(s.text, deterministic_summary(&f));

        let broken = LazySummarizer::new(|| Err(SummaryError::Unavailable("no model".to_string())));
        let s = compose_summary(&f, Some(&broken), Duration::from_secs(2));
        assert_eq!(s.source, SummarySource::Deterministic);

        assert_eq!(compose_summary(&f, None, Duration::from_secs(2)).source, SummarySource::Deterministic);
    }

    #[test]
    fn backend_is_initialized_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let summarizer = LazySummarizer::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(Echo("A sufficiently long sentence about the economy.")) as Box<dyn Summarizer>)
        });
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        for _ in 0..3 {
            summarizer.summarize_within("p", Duration::from_secs(2)).unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_command_is_rejected() {
        assert!(CommandSummarizer::from_command_line("   ").is_err());
        let cmd = CommandSummarizer::from_command_line("ollama run llama3").unwrap();
        assert_eq!(cmd.program, "ollama");
        assert_eq!(cmd.args, vec!["run", "llama3"]);
    }

    #[cfg(unix)]
    #[test]
    fn command_reads_prompt_from_stdin() {
        let cat = CommandSummarizer::from_command_line("cat").unwrap();
        assert_eq!(cat.summarize("hello there").unwrap(), "hello there");
        let within = cat.summarize_until("again", Instant::now() + Duration::from_secs(5));
        assert_eq!(within.unwrap(), "again");
    }

    #[cfg(unix)]
    #[test]
    fn command_past_deadline_is_killed() {
        let sleeper = CommandSummarizer::new("sleep", vec!["5".to_string()]);
        let started = Instant::now();
        let err = sleeper
            .summarize_until("p", Instant::now() + Duration::from_millis(50))
            .unwrap_err();
        assert!(matches!(err, SummaryError::TimedOut(_)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[cfg(unix)]
    #[test]
    fn timed_out_summary_leaves_no_process_behind() {
        let marker = std::env::temp_dir().join(format!("macro-pulse-summarizer-{}", std::process::id()));
        let _ = std::fs::remove_file(&marker);
        let script = format!("sleep 1; touch '{}'", marker.display());
        let cmd = CommandSummarizer::new("sh", vec!["-c".to_string(), script]);
        let summarizer = LazySummarizer::new(move || Ok(Box::new(cmd.clone()) as Box<dyn Summarizer>));

        let started = Instant::now();
        let err = summarizer
            .summarize_within("prompt", Duration::from_millis(100))
            .unwrap_err();
        assert_eq!(err, SummaryError::TimedOut(Duration::from_millis(100)));
        assert!(started.elapsed() < Duration::from_millis(900));

        thread::sleep(Duration::from_millis(1500));
        assert!(!marker.exists(), "summarizer command kept running after the timeout");
    }
}
