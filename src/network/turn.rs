//! Run request, turn records and the per-run history

use crate::llm::MessageRole;
use crate::tools::ToolInvocation;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A request that failed boundary validation; the core never sees it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("messages must not be empty")]
    NoMessages,
    #[error("the last message must come from the user")]
    LastNotUser,
    #[error("the last user message must not be blank")]
    BlankContent,
}

/// One message of the conversation that led to a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMessage {
    pub role: MessageRole,
    pub content: String,
}

impl RequestMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Validated input of a run. Only [`RunRequest::new`] builds one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    messages: Vec<RequestMessage>,
}

impl RunRequest {
    pub fn new(messages: Vec<RequestMessage>) -> Result<Self, RequestError> {
        let last = messages.last().ok_or(RequestError::NoMessages)?;
        if last.role != MessageRole::User {
            return Err(RequestError::LastNotUser);
        }
        if last.content.trim().is_empty() {
            return Err(RequestError::BlankContent);
        }
        Ok(Self { messages })
    }

    /// Convenience for a single user message
    pub fn from_text(text: impl Into<String>) -> Result<Self, RequestError> {
        Self::new(vec![RequestMessage::user(text)])
    }

    pub fn messages(&self) -> &[RequestMessage] {
        &self.messages
    }

    /// The latest user message, trimmed
    pub fn user_request(&self) -> &str {
        // non-empty by construction
        self.messages
            .last()
            .map_or("", |m| m.content.trim())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOutcome {
    Completed,
    /// The turn overran its budget; none of its state changes were kept
    TimedOut,
}

/// Record of one worker invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub agent: String,
    /// Free text the worker produced alongside its tool calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub invocations: Vec<ToolInvocation>,
    pub outcome: TurnOutcome,
}

impl Turn {
    pub fn completed(
        agent: impl Into<String>,
        content: Option<String>,
        invocations: Vec<ToolInvocation>,
    ) -> Self {
        Self {
            agent: agent.into(),
            content: content.filter(|c| !c.trim().is_empty()),
            invocations,
            outcome: TurnOutcome::Completed,
        }
    }

    pub fn timed_out(agent: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            content: None,
            invocations: Vec::new(),
            outcome: TurnOutcome::TimedOut,
        }
    }

    /// Successful invocations, in call order
    pub fn successful(&self) -> impl Iterator<Item = &ToolInvocation> {
        self.invocations.iter().filter(|i| i.succeeded())
    }
}

/// Messages of the request followed by every turn taken so far.
///
/// Append-only: turns can be pushed and read, never edited or removed.
#[derive(Debug, Clone, Default)]
pub struct History {
    messages: Vec<RequestMessage>,
    turns: Vec<Turn>,
}

impl History {
    pub fn new(request: &RunRequest) -> Self {
        Self {
            messages: request.messages().to_vec(),
            turns: Vec::new(),
        }
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn messages(&self) -> &[RequestMessage] {
        &self.messages
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last_turn(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn into_turns(self) -> Vec<Turn> {
        self.turns
    }
}
