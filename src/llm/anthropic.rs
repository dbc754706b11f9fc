//! Anthropic Messages API provider

use super::types::{
    ContentBlock, LlmMessage, LlmRequest, LlmResponse, StopReason, SystemContent,
    ToolDefinition, Usage,
};
use super::{LlmError, LlmService};
use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const DIRECT_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnthropicModel {
    Opus45,
    Sonnet45,
    Haiku45,
}

impl AnthropicModel {
    pub const ALL: [AnthropicModel; 3] = [
        AnthropicModel::Opus45,
        AnthropicModel::Sonnet45,
        AnthropicModel::Haiku45,
    ];

    /// Dated model name sent to the API
    pub fn api_name(self) -> &'static str {
        match self {
            AnthropicModel::Opus45 => "claude-opus-4-5-20251101",
            AnthropicModel::Sonnet45 => "claude-sonnet-4-5-20250929",
            AnthropicModel::Haiku45 => "claude-haiku-4-5-20251001",
        }
    }

    /// Short id used in configuration and agent model hints
    pub fn model_id(self) -> &'static str {
        match self {
            AnthropicModel::Opus45 => "claude-4.5-opus",
            AnthropicModel::Sonnet45 => "claude-4.5-sonnet",
            AnthropicModel::Haiku45 => "claude-4.5-haiku",
        }
    }
}

/// Where requests go and how they authenticate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Direct { api_key: String },
    /// A gateway in front of the API that injects credentials itself
    Gateway { base_url: String },
}

impl Endpoint {
    fn url(&self) -> String {
        match self {
            Endpoint::Direct { .. } => DIRECT_URL.to_string(),
            Endpoint::Gateway { base_url } => format!(
                "{}/_/gateway/anthropic/v1/messages",
                base_url.trim_end_matches('/')
            ),
        }
    }
}

pub struct AnthropicService {
    client: Client,
    endpoint: Endpoint,
    url: String,
    model: AnthropicModel,
}

impl AnthropicService {
    pub fn new(endpoint: Endpoint, model: AnthropicModel) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LlmError::unknown(format!("HTTP client setup failed: {e}")))?;

        Ok(Self {
            client,
            url: endpoint.url(),
            endpoint,
            model,
        })
    }

    fn wire_request<'a>(&self, request: &'a LlmRequest) -> MessagesRequest<'a> {
        MessagesRequest {
            model: self.model.api_name(),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system: request.system.iter().map(SystemBlock::from).collect(),
            messages: &request.messages,
            tools: (!request.tools.is_empty()).then_some(request.tools.as_slice()),
        }
    }
}

#[async_trait]
impl LlmService for AnthropicService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let mut builder = self
            .client
            .post(&self.url)
            .header("anthropic-version", API_VERSION)
            .json(&self.wire_request(request));
        if let Endpoint::Direct { api_key } = &self.endpoint {
            builder = builder.header("x-api-key", api_key);
        }

        let response = builder.send().await?;
        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        if !status.is_success() {
            return Err(LlmError::from_status(status, retry_after.as_deref(), &body));
        }

        let parsed: MessagesResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::unknown(format!("Malformed completion response: {e}")))?;
        Ok(parsed.into())
    }

    fn model_id(&self) -> &str {
        self.model.model_id()
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'static str,
    max_tokens: u32,
    system: Vec<SystemBlock<'a>>,
    messages: &'a [LlmMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDefinition]>,
}

#[derive(Serialize)]
struct SystemBlock<'a> {
    r#type: &'static str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_control: Option<Value>,
}

impl<'a> From<&'a SystemContent> for SystemBlock<'a> {
    fn from(content: &'a SystemContent) -> Self {
        SystemBlock {
            r#type: "text",
            text: &content.text,
            cache_control: content
                .cache
                .then(|| serde_json::json!({"type": "ephemeral"})),
        }
    }
}

#[derive(Deserialize)]
struct MessagesResponse {
    /// Raw blocks; thinking and server-tool blocks are skipped on conversion
    content: Vec<Value>,
    stop_reason: Option<StopReason>,
    usage: WireUsage,
}

#[derive(Deserialize)]
struct WireUsage {
    input_tokens: u64,
    output_tokens: u64,
    #[serde(default)]
    cache_creation_input_tokens: Option<u64>,
    #[serde(default)]
    cache_read_input_tokens: Option<u64>,
}

impl From<MessagesResponse> for LlmResponse {
    fn from(resp: MessagesResponse) -> Self {
        let content = resp
            .content
            .into_iter()
            .filter_map(|block| serde_json::from_value::<ContentBlock>(block).ok())
            .collect();

        LlmResponse {
            content,
            stop_reason: resp.stop_reason.unwrap_or_default(),
            usage: Usage {
                input_tokens: resp.usage.input_tokens,
                output_tokens: resp.usage.output_tokens,
                cache_creation_tokens: resp.usage.cache_creation_input_tokens.unwrap_or(0),
                cache_read_tokens: resp.usage.cache_read_input_tokens.unwrap_or(0),
            },
        }
    }
}
