//! Tools workers can call
//!
//! A tool is a named operation with a typed input. Raw arguments from the
//! completion service are deserialized into that type before the handler
//! runs, so a malformed call never reaches a handler and never mutates state.

mod chart;
mod cleaning;
mod control;
mod data;
mod email;
mod history;
mod ui;

pub use chart::{
    CleanDataPlaceholderTool, GenerateChartTool, GenerateDataPlaceholderTool, PickChartTool,
};
pub use cleaning::{CreatePipelineTool, PrepareChartDataTool, TransformDataTool};
pub use control::{DoneTool, RouteToAgentTool, SupervisorDoneTool};
pub use data::{NoDataNeededTool, ProvideDataTool};
pub use email::{DraftEmailTool, SearchEmailTool, SendEmailTool};
pub use history::{GetConversationHistoryTool, ListChannelsTool};
pub use ui::GenerateUiTool;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::llm::ToolDefinition;
use crate::services::{ServiceError, Services};
use crate::state::{NetworkState, StateError};

/// Version shared by every tool input schema
pub const SCHEMA_VERSION: u32 = 1;

/// Why a handler refused or failed
#[derive(Debug, Error)]
pub enum ToolError {
    /// Input parsed but is semantically unusable
    #[error("{0}")]
    Invalid(String),
    /// State the tool depends on is missing
    #[error("{0}")]
    MissingState(String),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Out-of-band instruction a tool hands to the router
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum ControlSignal {
    RouteTo { agent: String },
    Done { message: String },
}

/// Everything a handler may touch during one call.
///
/// Tools are stateless singletons; all per-run context arrives here.
pub struct ToolContext<'a> {
    pub run_id: &'a str,
    /// Worker making the call
    pub agent: &'a str,
    pub state: &'a mut NetworkState,
    pub services: &'a Services,
    signal: Option<ControlSignal>,
}

impl<'a> ToolContext<'a> {
    pub fn new(
        run_id: &'a str,
        agent: &'a str,
        state: &'a mut NetworkState,
        services: &'a Services,
    ) -> Self {
        Self {
            run_id,
            agent,
            state,
            services,
            signal: None,
        }
    }

    /// Attach a control signal to the current invocation
    pub fn emit(&mut self, signal: ControlSignal) {
        self.signal = Some(signal);
    }

    fn take_signal(&mut self) -> Option<ControlSignal> {
        self.signal.take()
    }
}

/// A named, schema-described operation with a typed input
#[async_trait]
pub trait Tool: Send + Sync {
    type Input: DeserializeOwned + Send;

    fn name(&self) -> &'static str;

    /// Description sent to the completion service
    fn description(&self) -> String;

    /// JSON schema for the input, mirroring `Self::Input`
    fn input_schema(&self) -> Value;

    /// Checks a schema cannot express. Runs before the handler.
    fn validate(&self, _input: &Self::Input) -> Result<(), String> {
        Ok(())
    }

    async fn run(&self, input: Self::Input, ctx: &mut ToolContext<'_>) -> Result<String, ToolError>;
}

/// Failure of an erased invocation, split by whether the handler ran
#[derive(Debug)]
pub enum InvokeError {
    Validation(String),
    Handler(ToolError),
}

/// Object-safe view of a [`Tool`]
#[async_trait]
pub trait DynTool: Send + Sync {
    fn name(&self) -> &'static str;

    fn definition(&self) -> ToolDefinition;

    async fn invoke(&self, input: Value, ctx: &mut ToolContext<'_>) -> Result<String, InvokeError>;
}

#[async_trait]
impl<T: Tool> DynTool for T {
    fn name(&self) -> &'static str {
        Tool::name(self)
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Tool::name(self).to_string(),
            description: self.description(),
            input_schema: self.input_schema(),
        }
    }

    async fn invoke(&self, input: Value, ctx: &mut ToolContext<'_>) -> Result<String, InvokeError> {
        let typed: T::Input = serde_json::from_value(input)
            .map_err(|e| InvokeError::Validation(format!("Invalid input: {e}")))?;
        self.validate(&typed)
            .map_err(|e| InvokeError::Validation(format!("Invalid input: {e}")))?;
        self.run(typed, ctx).await.map_err(InvokeError::Handler)
    }
}

/// A tool call requested by the completion service
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationStatus {
    Ok,
    UnknownTool,
    ValidationFailed,
    HandlerFailed,
}

/// Record of one dispatched tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    pub input: Value,
    pub output: String,
    pub status: InvocationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<ControlSignal>,
}

impl ToolInvocation {
    pub fn succeeded(&self) -> bool {
        self.status == InvocationStatus::Ok
    }
}

/// Ordered tools of one worker. Names are unique within a set.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn DynTool>>,
}

impl std::fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool, replacing any existing tool of the same name in place
    #[must_use]
    pub fn with(mut self, tool: impl Tool + 'static) -> Self {
        let tool: Arc<dyn DynTool> = Arc::new(tool);
        match self.tools.iter().position(|t| t.name() == tool.name()) {
            Some(idx) => self.tools[idx] = tool,
            None => self.tools.push(tool),
        }
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name() == name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Definitions offered to the completion service
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Run one call against this set and record the outcome.
    ///
    /// Unknown names and inputs that fail validation are recorded without
    /// running anything. Handler errors become the invocation's output so the
    /// worker can react on its next turn.
    pub async fn dispatch(&self, call: ToolCall, ctx: &mut ToolContext<'_>) -> ToolInvocation {
        let ToolCall { id, name, input } = call;

        let Some(tool) = self.tools.iter().find(|t| t.name() == name) else {
            tracing::warn!(run_id = ctx.run_id, agent = ctx.agent, tool = %name, "Unknown tool");
            let output = format!(
                "Unknown tool '{name}'. Available tools: {}",
                self.names().join(", ")
            );
            return ToolInvocation {
                id,
                name,
                input,
                output,
                status: InvocationStatus::UnknownTool,
                signal: None,
            };
        };

        ctx.signal = None;
        let result = tool.invoke(input.clone(), ctx).await;
        let signal = ctx.take_signal();

        let (status, output, signal) = match result {
            Ok(output) => (InvocationStatus::Ok, output, signal),
            Err(InvokeError::Validation(message)) => {
                tracing::warn!(run_id = ctx.run_id, agent = ctx.agent, tool = %name, error = %message, "Tool input rejected");
                (InvocationStatus::ValidationFailed, message, None)
            }
            Err(InvokeError::Handler(e)) => {
                tracing::warn!(run_id = ctx.run_id, agent = ctx.agent, tool = %name, error = %e, "Tool failed");
                (InvocationStatus::HandlerFailed, format!("Error: {e}"), None)
            }
        };

        tracing::debug!(run_id = ctx.run_id, agent = ctx.agent, tool = %name, status = ?status, "Tool dispatched");

        ToolInvocation {
            id,
            name,
            input,
            output,
            status,
            signal,
        }
    }
}

/// Standard schema property for the `confirm*` flags of the state-driven tools
pub(crate) fn confirm_schema(field: &str, description: &str) -> Value {
    serde_json::json!({
        "type": "object",
        "required": [field],
        "additionalProperties": false,
        "properties": {
            field: {
                "type": "boolean",
                "description": description
            }
        }
    })
}
