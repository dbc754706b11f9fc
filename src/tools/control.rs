//! Routing and completion tools
//!
//! - `route_to_agent`: supervisor hands the request to a specialist
//! - `done` (supervisor): records the overall summary
//! - `done` (workers): records the completion message shown to the user

use super::{ControlSignal, Tool, ToolContext, ToolError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

// ============================================================================
// route_to_agent
// ============================================================================

pub struct RouteToAgentTool {
    /// Names offered in the schema enum
    agents: Vec<String>,
}

impl RouteToAgentTool {
    pub fn new(agents: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            agents: agents.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteInput {
    agent: String,
    reasoning: String,
}

#[async_trait]
impl Tool for RouteToAgentTool {
    type Input = RouteInput;

    fn name(&self) -> &'static str {
        "route_to_agent"
    }

    fn description(&self) -> String {
        "Route the request to the specialist agent best suited to handle it.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["agent", "reasoning"],
            "additionalProperties": false,
            "properties": {
                "agent": {
                    "type": "string",
                    "enum": self.agents,
                    "description": "Name of the agent to hand the request to"
                },
                "reasoning": {
                    "type": "string",
                    "description": "Why this agent fits the request"
                }
            }
        })
    }

    fn validate(&self, input: &RouteInput) -> Result<(), String> {
        if input.agent.trim().is_empty() {
            return Err("agent must not be empty".to_string());
        }
        Ok(())
    }

    async fn run(&self, input: RouteInput, ctx: &mut ToolContext<'_>) -> Result<String, ToolError> {
        let agent = input.agent.trim().to_string();
        ctx.state.routed_to = Some(agent.clone());
        ctx.state.routing_reason = Some(input.reasoning);
        ctx.emit(ControlSignal::RouteTo {
            agent: agent.clone(),
        });
        Ok(format!("Routing to {agent}"))
    }
}

// ============================================================================
// done (supervisor)
// ============================================================================

pub struct SupervisorDoneTool;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SummaryInput {
    summary: String,
}

#[async_trait]
impl Tool for SupervisorDoneTool {
    type Input = SummaryInput;

    fn name(&self) -> &'static str {
        "done"
    }

    fn description(&self) -> String {
        "Call this when the request is fully handled, or needs no specialist (greetings, small talk). The summary is shown to the user.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["summary"],
            "additionalProperties": false,
            "properties": {
                "summary": {
                    "type": "string",
                    "description": "Reply to the user summarizing what was accomplished"
                }
            }
        })
    }

    async fn run(&self, input: SummaryInput, ctx: &mut ToolContext<'_>) -> Result<String, ToolError> {
        ctx.state.task_completed = true;
        ctx.state.final_summary = Some(input.summary.clone());
        ctx.state.mark_completed(input.summary.clone());
        ctx.emit(ControlSignal::Done {
            message: input.summary.clone(),
        });
        Ok(input.summary)
    }
}

// ============================================================================
// done (workers)
// ============================================================================

pub struct DoneTool;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DoneInput {
    #[serde(alias = "summary")]
    message: String,
}

#[async_trait]
impl Tool for DoneTool {
    type Input = DoneInput;

    fn name(&self) -> &'static str {
        "done"
    }

    fn description(&self) -> String {
        "Call this when your part of the task is complete.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["message"],
            "additionalProperties": false,
            "properties": {
                "message": {
                    "type": "string",
                    "description": "Completion message for the user"
                }
            }
        })
    }

    async fn run(&self, input: DoneInput, ctx: &mut ToolContext<'_>) -> Result<String, ToolError> {
        ctx.state.mark_completed(input.message.clone());
        ctx.emit(ControlSignal::Done {
            message: input.message.clone(),
        });
        Ok(input.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::Services;
    use crate::state::NetworkState;
    use crate::tools::test_support::context;
    use crate::tools::{InvocationStatus, ToolCall, ToolSet};

    fn supervisor_set() -> ToolSet {
        ToolSet::new()
            .with(RouteToAgentTool::new(["chart_picker", "ui"]))
            .with(SupervisorDoneTool)
    }

    #[tokio::test]
    async fn route_records_target_and_signal() {
        let services = Services::offline();
        let mut state = NetworkState::for_request("make a form");

        let inv = supervisor_set()
            .dispatch(
                ToolCall {
                    id: "1".to_string(),
                    name: "route_to_agent".to_string(),
                    input: json!({"agent": "ui", "reasoning": "form request"}),
                },
                &mut context(&mut state, &services),
            )
            .await;

        assert_eq!(inv.status, InvocationStatus::Ok);
        assert_eq!(
            inv.signal,
            Some(ControlSignal::RouteTo {
                agent: "ui".to_string()
            })
        );
        assert_eq!(state.routed_to.as_deref(), Some("ui"));
        assert_eq!(state.routing_reason.as_deref(), Some("form request"));
    }

    #[tokio::test]
    async fn route_requires_reasoning() {
        let services = Services::offline();
        let mut state = NetworkState::default();

        let inv = supervisor_set()
            .dispatch(
                ToolCall {
                    id: "1".to_string(),
                    name: "route_to_agent".to_string(),
                    input: json!({"agent": "ui"}),
                },
                &mut context(&mut state, &services),
            )
            .await;

        assert_eq!(inv.status, InvocationStatus::ValidationFailed);
        assert!(state.routed_to.is_none());
        assert!(inv.signal.is_none());
    }

    #[tokio::test]
    async fn supervisor_done_sets_summary() {
        let services = Services::offline();
        let mut state = NetworkState::for_request("hi");

        let inv = supervisor_set()
            .dispatch(
                ToolCall {
                    id: "1".to_string(),
                    name: "done".to_string(),
                    input: json!({"summary": "Hello! How can I help?"}),
                },
                &mut context(&mut state, &services),
            )
            .await;

        assert!(inv.succeeded());
        assert!(state.task_completed);
        assert_eq!(state.final_summary.as_deref(), Some("Hello! How can I help?"));
        assert!(state.completed);
        assert_eq!(state.completion_message.as_deref(), Some("Hello! How can I help?"));
    }

    #[tokio::test]
    async fn worker_done_accepts_summary_alias() {
        let services = Services::offline();
        let mut state = NetworkState::default();
        let set = ToolSet::new().with(DoneTool);

        let inv = set
            .dispatch(
                ToolCall {
                    id: "1".to_string(),
                    name: "done".to_string(),
                    input: json!({"summary": "Picked a bar chart"}),
                },
                &mut context(&mut state, &services),
            )
            .await;

        assert!(inv.succeeded());
        assert!(state.completed);
        assert_eq!(state.completion_message.as_deref(), Some("Picked a bar chart"));
    }
}
