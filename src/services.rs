//! External collaborators reached by tool handlers
//!
//! Each collaborator sits behind a trait so runs can be driven entirely by
//! in-memory doubles. `Services` bundles one implementation of each.

mod bem;
mod gmail;
mod local;
mod slack;

pub use bem::BemTransformer;
pub use gmail::GmailGateway;
pub use local::LocalTransformer;
pub use slack::SlackHistorySource;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::config::ServicesConfig;
use crate::state::payload::ConversationMessage;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{service} is not configured; set {env_var}")]
    NotConfigured {
        service: &'static str,
        env_var: &'static str,
    },
    #[error("{service} request failed: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },
    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },
    #[error("{service} returned an unexpected response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },
    #[error("{service} rejected the request: {message}")]
    Rejected {
        service: &'static str,
        message: String,
    },
}

// ============================================================================
// Data transformation
// ============================================================================

/// A pipeline able to normalize raw data into a fixed JSON schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPipeline {
    pub id: String,
    pub inbox_email: Option<String>,
}

#[async_trait]
pub trait DataTransformer: Send + Sync {
    async fn create_pipeline(
        &self,
        name: &str,
        output_schema: &Value,
    ) -> Result<CreatedPipeline, ServiceError>;

    /// Run `input` (raw text) through the pipeline. `reference_id` is an
    /// idempotency key: the same id must yield the same output.
    async fn transform(
        &self,
        pipeline_id: &str,
        reference_id: &str,
        input: &str,
    ) -> Result<Value, ServiceError>;
}

// ============================================================================
// Email
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingEmail {
    pub to: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailSummary {
    pub id: String,
    pub thread_id: String,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub snippet: String,
}

#[async_trait]
pub trait EmailGateway: Send + Sync {
    /// Send and return the provider's message id
    async fn send(&self, email: &OutgoingEmail) -> Result<String, ServiceError>;

    /// Save a draft and return its id
    async fn draft(&self, email: &OutgoingEmail) -> Result<String, ServiceError>;

    async fn search(&self, query: &str, max_results: u32)
        -> Result<Vec<EmailSummary>, ServiceError>;
}

/// Email gateway used when no credentials are configured
pub struct UnconfiguredEmailGateway;

impl UnconfiguredEmailGateway {
    fn error() -> ServiceError {
        ServiceError::NotConfigured {
            service: "gmail",
            env_var: "GMAIL_ACCESS_TOKEN",
        }
    }
}

#[async_trait]
impl EmailGateway for UnconfiguredEmailGateway {
    async fn send(&self, _email: &OutgoingEmail) -> Result<String, ServiceError> {
        Err(Self::error())
    }

    async fn draft(&self, _email: &OutgoingEmail) -> Result<String, ServiceError> {
        Err(Self::error())
    }

    async fn search(
        &self,
        _query: &str,
        _max_results: u32,
    ) -> Result<Vec<EmailSummary>, ServiceError> {
        Err(Self::error())
    }
}

// ============================================================================
// Chat history
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
}

#[async_trait]
pub trait HistorySource: Send + Sync {
    async fn list_channels(&self) -> Result<Vec<Channel>, ServiceError>;

    /// Most recent messages of `channel` (id or name), oldest first
    async fn history(
        &self,
        channel: &str,
        limit: u32,
    ) -> Result<Vec<ConversationMessage>, ServiceError>;
}

/// History source used when no credentials are configured
pub struct UnconfiguredHistorySource;

impl UnconfiguredHistorySource {
    fn error() -> ServiceError {
        ServiceError::NotConfigured {
            service: "slack",
            env_var: "SLACK_BOT_TOKEN",
        }
    }
}

#[async_trait]
impl HistorySource for UnconfiguredHistorySource {
    async fn list_channels(&self) -> Result<Vec<Channel>, ServiceError> {
        Err(Self::error())
    }

    async fn history(
        &self,
        _channel: &str,
        _limit: u32,
    ) -> Result<Vec<ConversationMessage>, ServiceError> {
        Err(Self::error())
    }
}

// ============================================================================
// Bundle
// ============================================================================

/// The collaborators available to tool handlers
#[derive(Clone)]
pub struct Services {
    pub transformer: Arc<dyn DataTransformer>,
    pub email: Arc<dyn EmailGateway>,
    pub history: Arc<dyn HistorySource>,
}

impl Services {
    /// Pick real clients where credentials exist, local fallbacks elsewhere
    pub fn from_config(config: &ServicesConfig) -> Result<Self, ServiceError> {
        let transformer: Arc<dyn DataTransformer> = match &config.bem_api_key {
            Some(key) => Arc::new(BemTransformer::new(key.clone(), &config.bem_base_url)?),
            None => {
                tracing::info!("BEM_API_KEY not set, cleaning data locally");
                Arc::new(LocalTransformer::default())
            }
        };

        let email: Arc<dyn EmailGateway> = match &config.gmail_access_token {
            Some(token) => Arc::new(GmailGateway::new(token.clone())?),
            None => Arc::new(UnconfiguredEmailGateway),
        };

        let history: Arc<dyn HistorySource> = match &config.slack_bot_token {
            Some(token) => Arc::new(SlackHistorySource::new(token.clone())?),
            None => Arc::new(UnconfiguredHistorySource),
        };

        Ok(Self {
            transformer,
            email,
            history,
        })
    }

    /// No network access: local transformer, unconfigured email and history
    pub fn offline() -> Self {
        Self {
            transformer: Arc::new(LocalTransformer::default()),
            email: Arc::new(UnconfiguredEmailGateway),
            history: Arc::new(UnconfiguredHistorySource),
        }
    }
}

/// Lowercase hex SHA-256 of `bytes`
pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    use std::fmt::Write;

    Sha256::digest(bytes)
        .iter()
        .fold(String::with_capacity(64), |mut out, b| {
            let _ = write!(out, "{b:02x}");
            out
        })
}

/// Shared HTTP client construction for the REST collaborators
pub(crate) fn http_client(service: &'static str) -> Result<reqwest::Client, ServiceError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(60))
        .build()
        .map_err(|e| ServiceError::Transport {
            service,
            message: e.to_string(),
        })
}

/// Read a JSON body, turning non-2xx statuses into `ServiceError::Status`
pub(crate) async fn read_json(
    service: &'static str,
    response: Result<reqwest::Response, reqwest::Error>,
) -> Result<Value, ServiceError> {
    let response = response.map_err(|e| ServiceError::Transport {
        service,
        message: e.to_string(),
    })?;
    let status = response.status();
    let body = response.text().await.map_err(|e| ServiceError::Transport {
        service,
        message: e.to_string(),
    })?;
    if !status.is_success() {
        return Err(ServiceError::Status {
            service,
            status: status.as_u16(),
            body,
        });
    }
    serde_json::from_str(&body).map_err(|e| ServiceError::Decode {
        service,
        message: e.to_string(),
    })
}
