//! Response classification for the retry engine.
//!
//! Upstream (Twitter/X) and the Apidance proxy report failures with two
//! unrelated envelope shapes. Both are inspected here, before anything is
//! treated as transient, and the outcome is one of three verdicts: accept the
//! body, retry the request, or fail with a typed error.

use serde_json::Value;

use crate::error::ApidanceError;

/// Upstream code: rate limit exceeded.
pub const CODE_RATE_LIMIT: i64 = 88;
/// Upstream code: could not authenticate.
pub const CODE_AUTHENTICATION: i64 = 32;
/// Upstream code: tweet already favorited.
pub const CODE_ALREADY_FAVORITED: i64 = 139;
/// Upstream code: a query or parameter is invalid.
pub const CODE_INVALID_INPUT: i64 = 366;

/// Body the proxy returns when its own throttle kicks in.
pub const LOCAL_RATE_LIMITED: &str = "local_rate_limited";

const PROXY_INSUFFICIENT_CODES: [&str; 2] = ["INSUFFICIENT_CREDITS", "INSUFFICIENT_BALANCE"];
const PROXY_RATE_LIMITED: &str = "RATE_LIMITED";

/// Outcome of inspecting one HTTP response.
#[derive(Debug)]
pub enum Verdict {
    /// The parsed body is usable.
    Accept(Value),
    /// The condition is transient; try again after backing off.
    Retry(Transient),
    /// The condition is fatal; never retried.
    Fail(ApidanceError),
}

/// A transient condition observed on one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transient {
    /// Body was not JSON.
    MalformedBody { status: u16 },
    /// Upstream code 88 or proxy throttling.
    RateLimited { detail: String },
    /// Sentinel `null` body.
    TryAgain,
    /// JSON body without `data` and without a recognised envelope.
    NoData { status: u16 },
    /// Connection-level timeout.
    Timeout { detail: String },
    /// Connection could not be established, on any attempt.
    Connect { detail: String },
}

impl Transient {
    /// Converts the condition into the error surfaced when the budget runs out.
    pub fn into_error(self, attempts: u32) -> ApidanceError {
        match self {
            Self::MalformedBody { status } => ApidanceError::Platform {
                code: None,
                detail: format!("response body was not valid JSON (HTTP {})", status),
            },
            Self::RateLimited { detail } => ApidanceError::RateLimit { attempts, detail },
            Self::TryAgain => ApidanceError::Platform {
                code: None,
                detail: "proxy kept asking to try again".to_string(),
            },
            Self::NoData { status } => ApidanceError::Platform {
                code: None,
                detail: format!("response carried no data (HTTP {})", status),
            },
            Self::Timeout { detail } => ApidanceError::Timeout(detail),
            Self::Connect { detail } => ApidanceError::Platform {
                code: None,
                detail: format!("connection failed after {} attempts: {}", attempts, detail),
            },
        }
    }
}

/// Classifies a raw response.
///
/// Rules, first match wins:
/// 1. unparsable body → retry
/// 2. upstream `errors[].code`: 88 → retry (rate limit error on the final
///    attempt), 32 → authentication error, 139 → accept, 366 → invalid input,
///    any other nonzero code → platform error
/// 3. proxy envelope: insufficient balance → fail, throttling → treated like 88,
///    other codes → platform error
/// 4. sentinel `"local_rate_limited"` (bare or quoted) → treated like 88;
///    sentinel `null` → retry
/// 5. a present `data` field → accept; otherwise retry
pub fn classify(status: u16, body: &str, attempt: u32, max_attempts: u32) -> Verdict {
    let is_final = attempt >= max_attempts;

    let json: Value = match serde_json::from_str(body) {
        Ok(json) => json,
        Err(_) if body.trim() == LOCAL_RATE_LIMITED => {
            return rate_limited("proxy returned local_rate_limited".to_string(), attempt, is_final)
        }
        Err(_) => return Verdict::Retry(Transient::MalformedBody { status }),
    };
    // Quoted or not, the proxy throttle reads the same.
    if json.as_str() == Some(LOCAL_RATE_LIMITED) {
        return rate_limited("proxy returned local_rate_limited".to_string(), attempt, is_final);
    }

    if let Some((code, detail)) = upstream_error(&json) {
        return match code {
            CODE_RATE_LIMIT => rate_limited(detail, attempt, is_final),
            CODE_AUTHENTICATION => Verdict::Fail(ApidanceError::Authentication { code, detail }),
            CODE_ALREADY_FAVORITED => Verdict::Accept(json),
            CODE_INVALID_INPUT => Verdict::Fail(ApidanceError::InvalidInput { code, detail }),
            0 => classify_payload(json, status),
            _ => Verdict::Fail(ApidanceError::Platform {
                code: Some(code),
                detail,
            }),
        };
    }

    if let Some((code, detail)) = proxy_error(&json) {
        let upper = code.to_ascii_uppercase();
        if PROXY_INSUFFICIENT_CODES.contains(&upper.as_str()) {
            return Verdict::Fail(ApidanceError::InsufficientCredits { detail });
        }
        if upper == PROXY_RATE_LIMITED {
            return rate_limited(detail, attempt, is_final);
        }
        return Verdict::Fail(ApidanceError::Platform {
            code: None,
            detail: format!("proxy error {}: {}", code, detail),
        });
    }

    if has_uncoded_errors(&json) && json.get("data").map_or(true, Value::is_null) {
        return Verdict::Fail(ApidanceError::Platform {
            code: None,
            detail: first_error_message(&json).unwrap_or_else(|| "unknown error".to_string()),
        });
    }

    classify_payload(json, status)
}

fn classify_payload(json: Value, status: u16) -> Verdict {
    if json.is_null() {
        return Verdict::Retry(Transient::TryAgain);
    }

    match json.get("data") {
        Some(data) if !data.is_null() => Verdict::Accept(json),
        _ => Verdict::Retry(Transient::NoData { status }),
    }
}

fn rate_limited(detail: String, attempt: u32, is_final: bool) -> Verdict {
    if is_final {
        Verdict::Fail(ApidanceError::RateLimit {
            attempts: attempt,
            detail,
        })
    } else {
        Verdict::Retry(Transient::RateLimited { detail })
    }
}

/// First upstream error that carries a numeric code, with its message.
fn upstream_error(json: &Value) -> Option<(i64, String)> {
    json.get("errors")?.as_array()?.iter().find_map(|err| {
        let code = err
            .get("code")
            .and_then(Value::as_i64)
            .or_else(|| err.pointer("/extensions/code").and_then(Value::as_i64))?;
        let detail = err
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Some((code, detail))
    })
}

/// Proxy-level envelope: no `data`/`errors`, a string `code`.
fn proxy_error(json: &Value) -> Option<(String, String)> {
    let obj = json.as_object()?;
    if obj.contains_key("data") || obj.contains_key("errors") {
        return None;
    }
    let code = obj.get("code")?.as_str()?.to_string();
    let detail = obj
        .get("message")
        .or_else(|| obj.get("msg"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Some((code, detail))
}

fn has_uncoded_errors(json: &Value) -> bool {
    json.get("errors")
        .and_then(Value::as_array)
        .is_some_and(|errors| !errors.is_empty())
}

fn first_error_message(json: &Value) -> Option<String> {
    json.pointer("/errors/0/message")
        .and_then(Value::as_str)
        .map(String::from)
}
