//! Core proxy API utilities.
//!
//! This module contains the request/retry engine used by every operation:
//! it builds the GraphQL request, attaches the proxy and auth headers, runs the
//! attempt loop with exponential backoff and consults the response classifier
//! after each round-trip. It also hosts the advisory balance check.

use log::{debug, error, info, warn};
use reqwest::Method;
use serde_json::{json, Value};

use super::classify::{classify, Transient, Verdict};
use crate::client::TwitterClient;
use crate::config::mask_secret;
use crate::error::{ApidanceError, Result};

/// Header carrying the proxy API key.
pub(crate) const API_KEY_HEADER: &str = "apikey";
/// Header carrying the upstream auth token on privileged operations.
pub(crate) const AUTH_TOKEN_HEADER: &str = "AuthToken";

/// Sanitizes text for safe logging by truncating and escaping control characters.
///
/// # Parameters
///
/// - `text`: The text to sanitize
/// - `max_len`: Maximum length (in characters) before truncation
///
/// # Returns
///
/// A sanitized string safe for logging
pub(crate) fn sanitize_for_logging(text: &str, max_len: usize) -> String {
    let sanitized: String = text
        .chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            c if c.is_control() => '?',
            c => c,
        })
        .collect();

    if sanitized.chars().count() > max_len {
        let truncated: String = sanitized.chars().take(max_len).collect();
        format!(
            "{}... [truncated, {} total bytes]",
            truncated,
            text.len()
        )
    } else {
        sanitized
    }
}

/// One call against `/graphql/<operation>`.
#[derive(Debug, Clone)]
pub(crate) struct GraphqlRequest {
    pub method: Method,
    pub operation: &'static str,
    pub variables: Value,
    /// Attach the upstream auth token (favoriting, posting).
    pub privileged: bool,
}

impl GraphqlRequest {
    pub fn get(operation: &'static str, variables: Value) -> Self {
        Self {
            method: Method::GET,
            operation,
            variables,
            privileged: false,
        }
    }

    pub fn post_privileged(operation: &'static str, variables: Value) -> Self {
        Self {
            method: Method::POST,
            operation,
            variables,
            privileged: true,
        }
    }
}

impl TwitterClient {
    /// Executes a GraphQL request with retries and exponential backoff.
    ///
    /// Fatal verdicts return immediately whatever budget is left. Transient
    /// ones are retried until `max_attempts` is spent, after which the last
    /// transient condition is returned as an error.
    ///
    /// # Returns
    ///
    /// - `Ok(Value)`: The parsed response body on acceptance
    /// - `Err(ApidanceError)`: The classified failure
    pub(crate) async fn execute(&self, request: &GraphqlRequest) -> Result<Value> {
        let operation = request.operation;
        let auth_token = if request.privileged {
            Some(self.config.require_auth_token(operation)?)
        } else {
            None
        };

        let url = format!("{}/graphql/{}", self.config.base_url, operation);
        let max_attempts = self.config.retry.max_attempts.max(1);
        let mut last_transient: Option<ApidanceError> = None;

        info!(
            "Executing {} {} (up to {} attempts)",
            request.method, operation, max_attempts
        );
        debug!(
            "Request for '{}' uses API key {}",
            operation,
            mask_secret(&self.config.api_key)
        );

        for attempt in 1..=max_attempts {
            let mut builder = self
                .http
                .request(request.method.clone(), &url)
                .header(API_KEY_HEADER, &self.config.api_key)
                .header("Content-Type", "application/json");

            builder = if request.method == Method::GET {
                builder.query(&[("variables", request.variables.to_string())])
            } else {
                builder.json(&json!({ "variables": request.variables }))
            };

            if let Some(token) = auth_token {
                builder = builder.header(AUTH_TOKEN_HEADER, token);
            }

            let transient = match builder.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    debug!(
                        "Attempt {}/{} for '{}' returned status {}",
                        attempt, max_attempts, operation, status
                    );
                    match response.text().await {
                        Ok(body) => {
                            debug!(
                                "Response summary for '{}': {} bytes received",
                                operation,
                                body.len()
                            );
                            match classify(status, &body, attempt, max_attempts) {
                                Verdict::Accept(json) => {
                                    info!(
                                        "Operation '{}' completed on attempt {}",
                                        operation, attempt
                                    );
                                    return Ok(json);
                                }
                                Verdict::Fail(err) => {
                                    error!("Operation '{}' failed: {}", operation, err);
                                    debug!(
                                        "Error response for '{}': {}",
                                        operation,
                                        sanitize_for_logging(&body, 200)
                                    );
                                    return Err(err);
                                }
                                Verdict::Retry(transient) => transient,
                            }
                        }
                        Err(e) => transport_failure(e, operation, attempt, max_attempts)?,
                    }
                }
                Err(e) => transport_failure(e, operation, attempt, max_attempts)?,
            };

            if attempt < max_attempts {
                let delay = self.config.retry.backoff_delay(attempt);
                warn!(
                    "Attempt {}/{} for '{}' hit a transient condition ({:?}), retrying in {:?}",
                    attempt, max_attempts, operation, transient, delay
                );
                last_transient = Some(transient.into_error(attempt));
                tokio::time::sleep(delay).await;
            } else {
                last_transient = Some(transient.into_error(attempt));
            }
        }

        let err = last_transient.unwrap_or_else(|| ApidanceError::Platform {
            code: None,
            detail: format!("retry budget exhausted for {}", operation),
        });
        error!(
            "Operation '{}' gave up after {} attempts: {}",
            operation, max_attempts, err
        );
        Err(err)
    }

    /// Checks the remaining credit balance of the API key.
    ///
    /// The balance is advisory: any transport failure or unparsable body is
    /// reported as a balance of zero rather than an error.
    pub async fn check_balance(&self) -> u64 {
        let url = format!(
            "{}/key/{}",
            self.config.base_url,
            urlencoding::encode(&self.config.api_key)
        );
        info!(
            "Checking balance for API key {}",
            mask_secret(&self.config.api_key)
        );

        let body = match self.http.get(&url).send().await {
            Ok(response) => match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!("Failed to read balance response: {}", e);
                    return 0;
                }
            },
            Err(e) => {
                warn!("Balance check failed: {}", e);
                return 0;
            }
        };

        match parse_balance(&body) {
            Some(balance) => {
                info!("Remaining balance: {}", balance);
                balance
            }
            None => {
                warn!(
                    "Unrecognised balance response, assuming zero: {}",
                    sanitize_for_logging(&body, 120)
                );
                0
            }
        }
    }
}

/// Turns a transport error into a transient condition, or into the final
/// error when no attempts remain.
///
/// Connection failures stay transient on the last attempt too, so budget
/// exhaustion reports them like any other transient condition.
fn transport_failure(
    e: reqwest::Error,
    operation: &str,
    attempt: u32,
    max_attempts: u32,
) -> Result<Transient> {
    let is_final = attempt >= max_attempts;
    if e.is_timeout() {
        if is_final {
            error!("Operation '{}' timed out on the final attempt", operation);
            return Err(ApidanceError::Timeout(e.to_string()));
        }
        return Ok(Transient::Timeout {
            detail: e.to_string(),
        });
    }
    if e.is_connect() {
        return Ok(Transient::Connect {
            detail: e.to_string(),
        });
    }
    error!("Operation '{}' failed with transport error: {}", operation, e);
    Err(ApidanceError::Http(e))
}

/// Parses a balance body: a bare integer, integer text or a JSON number.
pub(crate) fn parse_balance(body: &str) -> Option<u64> {
    let trimmed = body.trim();
    if let Ok(balance) = trimmed.parse::<u64>() {
        return Some(balance);
    }
    match serde_json::from_str::<Value>(trimmed).ok()? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}
