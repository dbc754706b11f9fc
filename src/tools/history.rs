//! Chat-history tools over the configured [`HistorySource`](crate::services::HistorySource)

use super::{Tool, ToolContext, ToolError};
use crate::state::payload::{ConversationSpec, TerminalResult};
use crate::state::TerminalWrite;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

const DEFAULT_HISTORY_LIMIT: u32 = 20;
const MAX_HISTORY_LIMIT: u32 = 200;

// ============================================================================
// list_channels
// ============================================================================

pub struct ListChannelsTool;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListChannelsInput {}

#[async_trait]
impl Tool for ListChannelsTool {
    type Input = ListChannelsInput;

    fn name(&self) -> &'static str {
        "list_channels"
    }

    fn description(&self) -> String {
        "List the chat channels history can be read from.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object", "properties": {}, "additionalProperties": false})
    }

    async fn run(
        &self,
        _input: ListChannelsInput,
        ctx: &mut ToolContext<'_>,
    ) -> Result<String, ToolError> {
        let channels = ctx.services.history.list_channels().await?;
        if channels.is_empty() {
            return Ok("No channels available.".to_string());
        }
        let lines: Vec<String> = channels
            .iter()
            .map(|c| format!("- #{} ({})", c.name, c.id))
            .collect();
        Ok(format!("Available channels:\n{}", lines.join("\n")))
    }
}

// ============================================================================
// get_conversation_history
// ============================================================================

pub struct GetConversationHistoryTool;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HistoryInput {
    channel: String,
    #[serde(default)]
    limit: Option<u32>,
}

#[async_trait]
impl Tool for GetConversationHistoryTool {
    type Input = HistoryInput;

    fn name(&self) -> &'static str {
        "get_conversation_history"
    }

    fn description(&self) -> String {
        "Fetch recent messages of a channel and return them as the final answer.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["channel"],
            "additionalProperties": false,
            "properties": {
                "channel": {"type": "string", "description": "Channel name (with or without '#') or id"},
                "limit": {"type": "integer", "minimum": 1, "maximum": MAX_HISTORY_LIMIT}
            }
        })
    }

    fn validate(&self, input: &HistoryInput) -> Result<(), String> {
        if input.channel.trim_start_matches('#').trim().is_empty() {
            return Err("channel must not be empty".to_string());
        }
        Ok(())
    }

    async fn run(&self, input: HistoryInput, ctx: &mut ToolContext<'_>) -> Result<String, ToolError> {
        let limit = input
            .limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);
        let channel = input.channel.trim_start_matches('#').to_string();
        let messages = ctx.services.history.history(&channel, limit).await?;
        let count = messages.len();

        let spec = ConversationSpec { channel, messages };
        let label = spec.channel.clone();
        match ctx.state.set_terminal(TerminalResult::Conversation(spec))? {
            TerminalWrite::Stored => Ok(format!("Retrieved {count} messages from #{label}.")),
            TerminalWrite::Unchanged => Ok(format!("History of #{label} was already retrieved.")),
        }
    }
}
