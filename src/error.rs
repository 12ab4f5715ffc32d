//! Error types.
//!
//! Two layers:
//! - `ProviderError`: what an upstream adapter reports (caller-visible, matchable)
//! - `AppError`: what the `pulse` binary reports (message + process exit code)

use thiserror::Error;

use crate::domain::Provider;

/// Coarse classification of a `ProviderError`, for callers that only need to branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UpstreamUnavailable,
    MalformedPayload,
    Configuration,
}

/// Failure while fetching or normalizing one upstream series.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Network failure, timeout, or non-success HTTP status.
    #[error("{provider} request failed{}: {message}", status_suffix(.status))]
    UpstreamUnavailable {
        provider: Provider,
        status: Option<u16>,
        message: String,
    },
    /// The body parsed (or failed to parse) but lacks the expected shape.
    #[error("{provider} returned a malformed payload: {message}")]
    MalformedPayload { provider: Provider, message: String },
    /// A required credential is not configured.
    #[error("missing {0} in environment (.env)")]
    MissingCredential(&'static str),
}

impl ProviderError {
    pub fn unavailable(provider: Provider, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            provider,
            status,
            message: message.into(),
        }
    }

    pub fn malformed(provider: Provider, message: impl Into<String>) -> Self {
        Self::MalformedPayload {
            provider,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UpstreamUnavailable { .. } => ErrorKind::UpstreamUnavailable,
            Self::MalformedPayload { .. } => ErrorKind::MalformedPayload,
            Self::MissingCredential(_) => ErrorKind::Configuration,
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {s})")).unwrap_or_default()
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        let exit_code = match err.kind() {
            ErrorKind::Configuration => 2,
            ErrorKind::UpstreamUnavailable | ErrorKind::MalformedPayload => 4,
        };
        AppError::new(exit_code, err.to_string())
    }
}
