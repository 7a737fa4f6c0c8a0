//! Configuration module for the Apidance client.
//!
//! This module contains the configuration structures for the proxy credentials,
//! the HTTP timeout and the retry policy. The client only ever receives an
//! explicit [`ApidanceConfig`]; reading the process environment is left to
//! [`ApidanceConfig::from_env`], which binaries call during bootstrap.

use log::{debug, error, info, warn};
use std::env;
use std::time::Duration;

use crate::error::{ApidanceError, Result};

/// Default base URL of the Apidance proxy.
pub const DEFAULT_BASE_URL: &str = "https://api.apidance.pro";

/// Default per-call HTTP timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variable holding the proxy API key.
pub const API_KEY_ENV: &str = "APIDANCE_API_KEY";

/// Environment variable holding the optional upstream auth token.
pub const AUTH_TOKEN_ENV: &str = "X_AUTH_TOKEN";

/// Environment variable overriding the proxy base URL.
pub const BASE_URL_ENV: &str = "APIDANCE_BASE_URL";

const AUTH_TOKEN_PATTERN: &str = r"^[0-9a-f]{40}$";

/// Exponential backoff schedule for the retry engine.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_delay: Duration,
    /// Multiplier applied for every further failed attempt.
    pub backoff_factor: f64,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Returns the sleep taken after failed attempt `attempt` (1-based):
    /// `min(initial_delay * backoff_factor^(attempt-1), max_delay)`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let scaled = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        if !scaled.is_finite() || scaled >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(scaled.max(0.0))
    }
}

/// Configuration for the Apidance proxy client.
///
/// Holds the proxy API key (sent on every request), the optional upstream
/// auth token (sent only on privileged operations such as favoriting and
/// posting), the proxy base URL, the per-call timeout and the retry policy.
#[derive(Debug, Clone)]
pub struct ApidanceConfig {
    /// The Apidance API key
    pub api_key: String,
    /// The Twitter/X `auth_token` cookie value for privileged operations
    pub auth_token: Option<String>,
    /// Base URL of the proxy, without trailing slash
    pub base_url: String,
    /// Timeout applied to every HTTP call
    pub timeout: Duration,
    /// Backoff schedule for transient failures
    pub retry: RetryPolicy,
}

impl ApidanceConfig {
    /// Creates a configuration with the given API key and default settings.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            auth_token: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_auth_token(mut self, auth_token: impl Into<String>) -> Self {
        self.auth_token = Some(auth_token.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Creates a new `ApidanceConfig` instance by loading credentials from environment variables.
    ///
    /// # Required Environment Variables
    ///
    /// - `APIDANCE_API_KEY`: Apidance proxy API key
    ///
    /// # Optional Environment Variables
    ///
    /// - `X_AUTH_TOKEN`: Twitter/X auth token, needed for favoriting and posting
    /// - `APIDANCE_BASE_URL`: Override for the proxy base URL
    ///
    /// # Returns
    ///
    /// - `Ok(ApidanceConfig)`: If the API key is present and not empty
    /// - `Err(ApidanceError::Configuration)`: If the API key is missing
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use apidance::ApidanceConfig;
    ///
    /// std::env::set_var("APIDANCE_API_KEY", "your_api_key");
    /// let config = ApidanceConfig::from_env().unwrap();
    /// ```
    pub fn from_env() -> Result<Self> {
        info!("Loading Apidance configuration from environment variables");

        let api_key = match env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => {
                info!(
                    "Found {} environment variable with length: {}",
                    API_KEY_ENV,
                    key.len()
                );
                debug!("API key (masked): {}", mask_secret(&key));
                key.trim().to_string()
            }
            Ok(_) => {
                error!("{} is set but empty", API_KEY_ENV);
                return Err(ApidanceError::Configuration(format!(
                    "{} cannot be empty",
                    API_KEY_ENV
                )));
            }
            Err(e) => {
                error!("Failed to load {} from environment: {}", API_KEY_ENV, e);
                return Err(ApidanceError::Configuration(format!(
                    "Missing {} environment variable: {}",
                    API_KEY_ENV, e
                )));
            }
        };

        let mut config = Self::new(api_key);

        match env::var(AUTH_TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => {
                info!("Found {} environment variable", AUTH_TOKEN_ENV);
                debug!("Auth token (masked): {}", mask_secret(&token));
                config.auth_token = Some(token.trim().to_string());
            }
            _ => {
                info!(
                    "No {} found in environment variables - favoriting and posting will be unavailable",
                    AUTH_TOKEN_ENV
                );
            }
        }

        if let Ok(base_url) = env::var(BASE_URL_ENV) {
            if !base_url.trim().is_empty() {
                info!("Using proxy base URL override: {}", base_url);
                config = config.with_base_url(base_url.trim());
            }
        }

        config.validate()?;
        info!("Apidance configuration loaded successfully");
        Ok(config)
    }

    /// Checks the credentials before the client issues any request.
    ///
    /// The API key must be non-empty and, when an auth token is configured, it
    /// must be 40 lowercase hex characters.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            error!("API key is empty");
            return Err(ApidanceError::Configuration(
                "API key cannot be empty".to_string(),
            ));
        }

        if let Some(token) = &self.auth_token {
            validate_auth_token(token)?;
        }

        if self.retry.max_attempts == 0 {
            warn!("Retry policy allows zero attempts, treating it as a single attempt");
        }

        Ok(())
    }

    /// Returns the auth token for a privileged operation, validated.
    pub(crate) fn require_auth_token(&self, operation: &str) -> Result<&str> {
        match self.auth_token.as_deref() {
            Some(token) => {
                validate_auth_token(token)?;
                Ok(token)
            }
            None => {
                error!("Operation '{}' requires an auth token", operation);
                Err(ApidanceError::Configuration(format!(
                    "{} requires an auth token ({} is not set)",
                    operation, AUTH_TOKEN_ENV
                )))
            }
        }
    }
}

/// Validates that an auth token is exactly 40 lowercase hexadecimal characters.
pub fn validate_auth_token(token: &str) -> Result<()> {
    let re = regex::Regex::new(AUTH_TOKEN_PATTERN)
        .map_err(|e| ApidanceError::Configuration(format!("Invalid token pattern: {}", e)))?;
    if re.is_match(token) {
        Ok(())
    } else {
        error!(
            "Auth token has an invalid format (length {}, masked {})",
            token.len(),
            mask_secret(token)
        );
        Err(ApidanceError::Configuration(
            "Auth token must be 40 lowercase hexadecimal characters".to_string(),
        ))
    }
}

/// Masks a secret for logging, keeping at most four characters on each side.
pub(crate) fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    match chars.len() {
        0 => String::new(),
        len if len > 12 => {
            let prefix: String = chars[..4].iter().collect();
            let suffix: String = chars[len - 4..].iter().collect();
            format!("{}...{}", prefix, suffix)
        }
        len if len > 4 => format!("{}...", chars[..4].iter().collect::<String>()),
        _ => "...".to_string(),
    }
}
