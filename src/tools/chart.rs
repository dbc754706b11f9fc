//! Chart selection and rendering tools

use super::{Tool, ToolContext, ToolError};
use crate::state::payload::{ChartKind, ChartSpec, PickedChart, Record, SeriesStyle, TerminalResult};
use crate::state::TerminalWrite;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Theme color assigned to the primary series
const PRIMARY_SERIES_COLOR: &str = "hsl(var(--chart-1))";

fn records_schema(description: &str) -> Value {
    json!({
        "type": "array",
        "items": {"type": "object"},
        "description": description
    })
}

// ============================================================================
// pick_chart
// ============================================================================

pub struct PickChartTool;

#[async_trait]
impl Tool for PickChartTool {
    type Input = PickedChart;

    fn name(&self) -> &'static str {
        "pick_chart"
    }

    fn description(&self) -> String {
        "Record the chart type that best fits the request together with the full chart schema and the data it needs.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["chartType", "reasoning", "schema", "dataRequirements"],
            "additionalProperties": false,
            "properties": {
                "chartType": {
                    "type": "string",
                    "enum": ChartKind::names(),
                    "description": "Selected chart kind"
                },
                "reasoning": {
                    "type": "string",
                    "description": "Short explanation of the choice"
                },
                "schema": {
                    "type": "object",
                    "required": ["type", "title", "data", "xKey", "yKey", "config"],
                    "additionalProperties": false,
                    "properties": {
                        "type": {"type": "string", "description": "Chart kind, same as chartType"},
                        "title": {"type": "string"},
                        "data": records_schema("Example rows in the final shape"),
                        "xKey": {"type": "string", "description": "Field for the X axis, e.g. 'month'"},
                        "yKey": {"type": "string", "description": "Field for the Y axis, e.g. 'revenue'"},
                        "config": {"type": "object", "description": "Per-series label and color"},
                        "variant": {"type": "string"}
                    }
                },
                "dataRequirements": {
                    "type": "object",
                    "required": ["minimumDataPoints", "requiredFields", "dataExample"],
                    "additionalProperties": false,
                    "properties": {
                        "minimumDataPoints": {"type": "integer", "minimum": 1},
                        "requiredFields": {"type": "array", "items": {"type": "string"}},
                        "optionalFields": {"type": "array", "items": {"type": "string"}},
                        "dataExample": records_schema("Correctly formatted sample rows")
                    }
                }
            }
        })
    }

    fn validate(&self, input: &PickedChart) -> Result<(), String> {
        if input.schema.x_key.trim().is_empty() || input.schema.y_key.trim().is_empty() {
            return Err("schema.xKey and schema.yKey must not be empty".to_string());
        }
        if input.data_requirements.minimum_data_points == 0 {
            return Err("dataRequirements.minimumDataPoints must be at least 1".to_string());
        }
        Ok(())
    }

    async fn run(&self, input: PickedChart, ctx: &mut ToolContext<'_>) -> Result<String, ToolError> {
        let summary = format!(
            "Selected {} chart. {}\n\nChart schema:\n- Type: {}\n- Title: {}\n- X-axis key: {}\n- Y-axis key: {}\n- Minimum data points: {}\n- Required fields: {}",
            input.chart_type,
            input.reasoning,
            input.schema.kind,
            input.schema.title,
            input.schema.x_key,
            input.schema.y_key,
            input.data_requirements.minimum_data_points,
            input.data_requirements.required_fields.join(", "),
        );
        ctx.state.picked_chart = Some(input);
        Ok(summary)
    }
}

// ============================================================================
// generate_data / clean_data placeholders
// ============================================================================

/// Stand-in for a later stage's tool, offered to workers that sometimes
/// reach for it. It only notes the need; the router schedules the real stage.
pub struct GenerateDataPlaceholderTool;

/// See [`GenerateDataPlaceholderTool`]
pub struct CleanDataPlaceholderTool;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReasonInput {
    reason: String,
}

fn reason_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "required": ["reason"],
        "additionalProperties": false,
        "properties": {
            "reason": {"type": "string", "description": description}
        }
    })
}

#[async_trait]
impl Tool for GenerateDataPlaceholderTool {
    type Input = ReasonInput;

    fn name(&self) -> &'static str {
        "generate_data"
    }

    fn description(&self) -> String {
        "Note that data must be generated for the chart. The data agent runs next and does the actual work.".to_string()
    }

    fn input_schema(&self) -> Value {
        reason_schema("Why data generation is needed")
    }

    async fn run(&self, input: ReasonInput, ctx: &mut ToolContext<'_>) -> Result<String, ToolError> {
        ctx.state.need_data_generation = true;
        ctx.state.data_generation_reason = Some(input.reason);
        Ok("Noted: data generation is required. The data agent will handle it next.".to_string())
    }
}

#[async_trait]
impl Tool for CleanDataPlaceholderTool {
    type Input = ReasonInput;

    fn name(&self) -> &'static str {
        "clean_data"
    }

    fn description(&self) -> String {
        "Note that the data must be cleaned and reshaped for the chart. The data cleaning agent does the actual work.".to_string()
    }

    fn input_schema(&self) -> Value {
        reason_schema("Why cleaning is needed")
    }

    async fn run(&self, input: ReasonInput, ctx: &mut ToolContext<'_>) -> Result<String, ToolError> {
        ctx.state.need_data_cleaning = true;
        ctx.state.data_cleaning_reason = Some(input.reason);
        Ok("Noted: data cleaning is required. The data cleaning agent will handle it next.".to_string())
    }
}

// ============================================================================
// generate_chart
// ============================================================================

pub struct GenerateChartTool;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GenerateChartInput {
    #[serde(rename = "type")]
    kind: ChartKind,
    title: String,
    data: Vec<Record>,
    x_key: String,
    y_key: String,
}

/// Upper-case the first character, leave the rest alone
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl GenerateChartInput {
    fn into_spec(self) -> ChartSpec {
        let mut config = BTreeMap::new();
        config.insert(
            self.y_key.clone(),
            SeriesStyle {
                label: capitalize(&self.y_key),
                color: PRIMARY_SERIES_COLOR.to_string(),
            },
        );
        ChartSpec {
            kind: self.kind,
            title: self.title,
            data: self.data,
            x_key: self.x_key,
            y_key: self.y_key,
            config,
        }
    }
}

#[async_trait]
impl Tool for GenerateChartTool {
    type Input = GenerateChartInput;

    fn name(&self) -> &'static str {
        "generate_chart"
    }

    fn description(&self) -> String {
        "Render the final chart from prepared data. Supports bar, line, area, pie and radar families with their stacked, step and donut variants.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["type", "title", "data", "xKey", "yKey"],
            "additionalProperties": false,
            "properties": {
                "type": {"type": "string", "enum": ChartKind::names()},
                "title": {"type": "string"},
                "data": records_schema("Data points, one object per X value"),
                "xKey": {"type": "string"},
                "yKey": {"type": "string"}
            }
        })
    }

    fn validate(&self, input: &GenerateChartInput) -> Result<(), String> {
        if input.x_key.trim().is_empty() || input.y_key.trim().is_empty() {
            return Err("xKey and yKey must not be empty".to_string());
        }
        Ok(())
    }

    async fn run(
        &self,
        input: GenerateChartInput,
        ctx: &mut ToolContext<'_>,
    ) -> Result<String, ToolError> {
        let spec = input.into_spec();
        let summary = format!(
            "Created {} chart titled \"{}\" with {} data points.",
            spec.kind,
            spec.title,
            spec.data.len()
        );

        match ctx.state.set_terminal(TerminalResult::Chart(spec))? {
            TerminalWrite::Stored => Ok(summary),
            TerminalWrite::Unchanged => Ok(format!("{summary} (already recorded)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::Services;
    use crate::state::payload::ResultType;
    use crate::state::{NetworkState, StateKey};
    use crate::tools::test_support::context;
    use crate::tools::{InvocationStatus, ToolCall, ToolSet};

    fn pick_chart_args() -> Value {
        json!({
            "chartType": "bar",
            "reasoning": "Comparing revenue across regions",
            "schema": {
                "type": "bar",
                "title": "Q1 Revenue by Region",
                "data": [{"region": "North", "revenue": 100}],
                "xKey": "region",
                "yKey": "revenue",
                "config": {}
            },
            "dataRequirements": {
                "minimumDataPoints": 2,
                "requiredFields": ["region", "revenue"],
                "dataExample": [{"region": "North", "revenue": 100}]
            }
        })
    }

    fn chart_args() -> Value {
        json!({
            "type": "bar",
            "title": "Q1 Revenue",
            "data": [{"region": "North", "revenue": 120}, {"region": "South", "revenue": 80}],
            "xKey": "region",
            "yKey": "revenue"
        })
    }

    fn call(name: &str, input: Value) -> ToolCall {
        ToolCall {
            id: "tu".to_string(),
            name: name.to_string(),
            input,
        }
    }

    fn set() -> ToolSet {
        ToolSet::new()
            .with(PickChartTool)
            .with(GenerateDataPlaceholderTool)
            .with(CleanDataPlaceholderTool)
            .with(GenerateChartTool)
    }

    #[test]
    fn capitalize_first_letter_only() {
        assert_eq!(capitalize("revenue"), "Revenue");
        assert_eq!(capitalize("q1Sales"), "Q1Sales");
        assert_eq!(capitalize(""), "");
    }

    #[tokio::test]
    async fn pick_chart_stores_selection() {
        let services = Services::offline();
        let mut state = NetworkState::for_request("bar chart of revenue");

        let inv = set()
            .dispatch(call("pick_chart", pick_chart_args()), &mut context(&mut state, &services))
            .await;

        assert_eq!(inv.status, InvocationStatus::Ok, "{}", inv.output);
        let picked = state.picked_chart.as_ref().unwrap();
        assert_eq!(picked.chart_type, ChartKind::Bar);
        assert_eq!(picked.schema.x_key, "region");
        assert!(inv.output.contains("Required fields: region, revenue"));
    }

    #[tokio::test]
    async fn pick_chart_rejects_unknown_kind() {
        let services = Services::offline();
        let mut state = NetworkState::default();
        let mut args = pick_chart_args();
        args["chartType"] = json!("scatter");

        let inv = set()
            .dispatch(call("pick_chart", args), &mut context(&mut state, &services))
            .await;

        assert_eq!(inv.status, InvocationStatus::ValidationFailed);
        assert!(!state.has(StateKey::PickedChart));
    }

    #[tokio::test]
    async fn placeholder_only_records_need() {
        let services = Services::offline();
        let mut state = NetworkState::default();

        let inv = set()
            .dispatch(
                call("generate_data", json!({"reason": "no data supplied"})),
                &mut context(&mut state, &services),
            )
            .await;

        assert!(inv.succeeded());
        assert!(state.need_data_generation);
        assert!(!state.has(StateKey::DataResult));
    }

    #[tokio::test]
    async fn generate_chart_sets_terminal_with_config() {
        let services = Services::offline();
        let mut state = NetworkState::default();

        let inv = set()
            .dispatch(call("generate_chart", chart_args()), &mut context(&mut state, &services))
            .await;

        assert!(inv.succeeded(), "{}", inv.output);
        assert_eq!(state.result_type(), Some(ResultType::Chart));
        let chart = state.chart_result().unwrap();
        assert_eq!(chart.data.len(), 2);
        let style = &chart.config["revenue"];
        assert_eq!(style.label, "Revenue");
        assert_eq!(style.color, PRIMARY_SERIES_COLOR);
    }

    #[tokio::test]
    async fn generate_chart_is_idempotent() {
        let services = Services::offline();
        let mut state = NetworkState::default();
        let tools = set();

        tools
            .dispatch(call("generate_chart", chart_args()), &mut context(&mut state, &services))
            .await;
        let after_first = state.clone();
        let second = tools
            .dispatch(call("generate_chart", chart_args()), &mut context(&mut state, &services))
            .await;

        assert!(second.succeeded());
        assert_eq!(state, after_first);
    }

    #[tokio::test]
    async fn generate_chart_never_overwrites() {
        let services = Services::offline();
        let mut state = NetworkState::default();
        let tools = set();
        tools
            .dispatch(call("generate_chart", chart_args()), &mut context(&mut state, &services))
            .await;

        let mut other = chart_args();
        other["title"] = json!("Something else");
        let inv = tools
            .dispatch(call("generate_chart", other), &mut context(&mut state, &services))
            .await;

        assert_eq!(inv.status, InvocationStatus::HandlerFailed);
        assert!(inv.output.contains("chart_result is already set"));
        assert_eq!(state.chart_result().unwrap().title, "Q1 Revenue");
    }
}
