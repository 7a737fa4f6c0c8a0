//! Error types for the Apidance client.
//!
//! Errors fall into three families: configuration problems detected before any
//! request is made, failures reported by the upstream platform (Twitter/X), and
//! failures reported by the Apidance proxy itself. Each variant is selected from
//! a machine-readable code in the response body, never from prose messages.

use thiserror::Error;

/// All failures surfaced by the client.
#[derive(Error, Debug)]
pub enum ApidanceError {
    /// Missing or malformed credential (API key, auth token).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Upstream rejected the credentials (code 32).
    #[error("Authentication failed (code {code}): {detail}")]
    Authentication { code: i64, detail: String },

    /// Upstream or proxy throttling that outlasted the retry budget.
    #[error("Rate limit exceeded after {attempts} attempts: {detail}")]
    RateLimit { attempts: u32, detail: String },

    /// Proxy account has no credits left.
    #[error("Insufficient credits on the Apidance account: {detail}")]
    InsufficientCredits { detail: String },

    /// Upstream rejected a query or parameter (code 366).
    #[error("Invalid input (code {code}): {detail}")]
    InvalidInput { code: i64, detail: String },

    /// Connection-level timeout on the final attempt.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Any other upstream or proxy failure.
    #[error("Platform error{}: {detail}", .code.map(|c| format!(" (code {c})")).unwrap_or_default())]
    Platform { code: Option<i64>, detail: String },

    /// A payload did not have the shape the model mapper relies on.
    #[error("Failed to map response: {0}")]
    Mapping(String),

    /// Transport failure that is not a timeout.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ApidanceError {
    /// Numeric upstream code carried by the error, when one was reported.
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Authentication { code, .. } | Self::InvalidInput { code, .. } => Some(*code),
            Self::Platform { code, .. } => *code,
            Self::RateLimit { .. } => Some(88),
            _ => None,
        }
    }

    /// Whether the underlying condition is transient in nature.
    ///
    /// The retry engine has already spent its budget by the time one of these
    /// reaches the caller; this only tells a caller whether trying again later
    /// could help.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimit { .. } | Self::Timeout(_) | Self::Http(_))
    }
}

/// Result type for Apidance operations.
pub type Result<T> = std::result::Result<T, ApidanceError>;
