//! Data generation tools

use super::{Tool, ToolContext, ToolError};
use crate::state::payload::{DataResult, ProvidedData};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

pub struct ProvideDataTool;

#[async_trait]
impl Tool for ProvideDataTool {
    type Input = ProvidedData;

    fn name(&self) -> &'static str {
        "provide_data"
    }

    fn description(&self) -> String {
        "Supply the dataset for the requested visualization or analysis.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["query", "data", "metadata"],
            "additionalProperties": false,
            "properties": {
                "query": {"type": "string", "description": "What data was asked for"},
                "data": {
                    "type": "array",
                    "items": {"type": "object"},
                    "description": "One object per data point"
                },
                "metadata": {
                    "type": "object",
                    "required": ["description"],
                    "additionalProperties": false,
                    "properties": {
                        "description": {"type": "string"},
                        "suggestedVisualization": {
                            "type": "string",
                            "enum": ["bar", "line", "area", "pie", "scatter", "radar", "funnel", "treemap"]
                        },
                        "keys": {
                            "type": "object",
                            "additionalProperties": false,
                            "properties": {
                                "x": {"type": "string"},
                                "y": {"type": "string"},
                                "value": {"type": "string", "description": "Value field for pie and donut charts"},
                                "category": {"type": "string"}
                            }
                        }
                    }
                }
            }
        })
    }

    async fn run(&self, input: ProvidedData, ctx: &mut ToolContext<'_>) -> Result<String, ToolError> {
        let summary = format!("Provided {} data points for: {}", input.data.len(), input.query);
        ctx.state.data_query = Some(input.query.clone());
        ctx.state.data_result = Some(DataResult::Provided(input));
        Ok(summary)
    }
}

pub struct NoDataNeededTool;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoDataInput {
    reason: String,
}

#[async_trait]
impl Tool for NoDataNeededTool {
    type Input = NoDataInput;

    fn name(&self) -> &'static str {
        "no_data_needed"
    }

    fn description(&self) -> String {
        "Call this when the request needs no generated data, for example when the chart schema's example data is enough.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["reason"],
            "additionalProperties": false,
            "properties": {
                "reason": {"type": "string", "description": "Why no data is needed"}
            }
        })
    }

    async fn run(&self, input: NoDataInput, ctx: &mut ToolContext<'_>) -> Result<String, ToolError> {
        ctx.state.data_result = Some(DataResult::NotNeeded {
            reason: input.reason.clone(),
        });
        Ok(input.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::Services;
    use crate::state::payload::SuggestedVisualization;
    use crate::state::{NetworkState, StateKey};
    use crate::tools::test_support::context;
    use crate::tools::{InvocationStatus, ToolCall, ToolSet};

    fn set() -> ToolSet {
        ToolSet::new().with(ProvideDataTool).with(NoDataNeededTool)
    }

    fn call(name: &str, input: Value) -> ToolCall {
        ToolCall {
            id: "tu".to_string(),
            name: name.to_string(),
            input,
        }
    }

    #[tokio::test]
    async fn provide_data_stores_result_and_query() {
        let services = Services::offline();
        let mut state = NetworkState::default();

        let inv = set()
            .dispatch(
                call(
                    "provide_data",
                    json!({
                        "query": "Q1 revenue by region",
                        "data": [{"region": "North", "revenue": 120}, {"region": "South", "revenue": 80}],
                        "metadata": {
                            "description": "Revenue per region",
                            "suggestedVisualization": "bar",
                            "keys": {"x": "region", "y": "revenue"}
                        }
                    }),
                ),
                &mut context(&mut state, &services),
            )
            .await;

        assert!(inv.succeeded(), "{}", inv.output);
        assert_eq!(inv.output, "Provided 2 data points for: Q1 revenue by region");
        assert_eq!(state.data_query.as_deref(), Some("Q1 revenue by region"));
        let Some(DataResult::Provided(provided)) = &state.data_result else {
            panic!("expected provided data");
        };
        assert_eq!(
            provided.metadata.suggested_visualization,
            Some(SuggestedVisualization::Bar)
        );
    }

    #[tokio::test]
    async fn no_data_needed_still_completes_stage() {
        let services = Services::offline();
        let mut state = NetworkState::default();

        let inv = set()
            .dispatch(
                call("no_data_needed", json!({"reason": "example data suffices"})),
                &mut context(&mut state, &services),
            )
            .await;

        assert!(inv.succeeded());
        assert!(state.has(StateKey::DataResult));
        assert_eq!(state.data_result.as_ref().and_then(DataResult::records), None);
    }

    #[tokio::test]
    async fn metadata_is_required() {
        let services = Services::offline();
        let mut state = NetworkState::default();

        let inv = set()
            .dispatch(
                call("provide_data", json!({"query": "q", "data": []})),
                &mut context(&mut state, &services),
            )
            .await;

        assert_eq!(inv.status, InvocationStatus::ValidationFailed);
        assert!(!state.has(StateKey::DataResult));
    }
}
