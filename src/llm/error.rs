//! Completion errors
//!
//! Every provider failure is reduced to an [`LlmErrorKind`]; the run loop
//! retries on the kind alone.

use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub message: String,
    /// Server-requested backoff, when one was given
    pub retry_after: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// Timeouts, refused connections, truncated bodies
    Network,
    RateLimit,
    /// 5xx, including overload
    ServerError,
    /// Rejected credentials, or nothing configured to call
    Auth,
    /// The provider refused the request as built
    InvalidRequest,
    Unknown,
}

impl LlmErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::RateLimit | Self::ServerError)
    }
}

impl LlmError {
    pub fn new(kind: LlmErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after: None,
        }
    }

    #[must_use]
    pub fn with_retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Network, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::RateLimit, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::ServerError, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Auth, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::InvalidRequest, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Unknown, message)
    }

    /// Classify a non-success HTTP response.
    ///
    /// `retry_after` is the raw `retry-after` header; without it a
    /// `retry_after` field in the error body is used.
    pub fn from_status(status: StatusCode, retry_after: Option<&str>, body: &str) -> Self {
        let parsed = serde_json::from_str::<Value>(body).ok();
        let detail = parsed
            .as_ref()
            .and_then(|v| v.pointer("/error/message"))
            .and_then(Value::as_str)
            .unwrap_or(body);

        let kind = match status.as_u16() {
            401 | 403 => LlmErrorKind::Auth,
            408 => LlmErrorKind::Network,
            429 => LlmErrorKind::RateLimit,
            400 | 404 | 413 | 422 => LlmErrorKind::InvalidRequest,
            500..=599 => LlmErrorKind::ServerError,
            _ => LlmErrorKind::Unknown,
        };
        let error = Self::new(kind, format!("HTTP {}: {detail}", status.as_u16()));

        if kind != LlmErrorKind::RateLimit {
            return error;
        }
        let delay = retry_after
            .and_then(|h| h.trim().parse::<f64>().ok())
            .or_else(|| {
                parsed
                    .as_ref()
                    .and_then(|v| v.pointer("/error/retry_after"))
                    .and_then(Value::as_f64)
            })
            .filter(|secs| secs.is_finite() && *secs >= 0.0);
        match delay {
            Some(secs) => error.with_retry_after(Duration::from_secs_f64(secs)),
            None => error,
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() || e.is_body() {
            Self::network(e.to_string())
        } else if e.is_decode() {
            Self::unknown(format!("Unreadable response: {e}"))
        } else {
            Self::unknown(e.to_string())
        }
    }
}
