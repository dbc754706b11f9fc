//! API request and response types

use crate::llm::MessageRole;
use crate::network::{RequestMessage, RunStatus};
use crate::state::payload::ResultPayload;
use serde::{Deserialize, Serialize};

/// Request to run the network on a conversation
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl From<ChatMessage> for RequestMessage {
    fn from(message: ChatMessage) -> Self {
        RequestMessage {
            role: message.role,
            content: message.content,
        }
    }
}

/// Response for a finished run
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub message: AssistantMessage,
    pub status: RunStatus,
    pub run_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantMessage {
    pub role: MessageRole,
    pub content: String,
    /// Final artifact, when the run produced one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ResultPayload>,
}

/// Worker information for the registry listing
#[derive(Debug, Serialize)]
pub struct AgentInfo {
    pub name: String,
    pub description: String,
    pub tools: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentsResponse {
    pub agents: Vec<AgentInfo>,
    pub entry_agent: String,
    pub schema_version: u32,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
