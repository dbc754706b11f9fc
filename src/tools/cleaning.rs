//! Data cleaning tools
//!
//! All three work from what earlier stages left in state, so their inputs are
//! only confirmation flags. Each step is safe to repeat.

use super::{confirm_schema, Tool, ToolContext, ToolError};
use crate::services::sha256_hex;
use crate::state::payload::{ChartSchema, DataResult, PickedChart, PipelineInfo, Record};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

/// Idempotency key for a transform: same pipeline and content, same key
pub fn content_reference_id(pipeline_id: &str, content: &str) -> String {
    let digest = sha256_hex(format!("{pipeline_id}\n{content}").as_bytes());
    let short: String = digest.chars().take(32).collect();
    format!("transform-{short}")
}

/// Output schema for the cleaned rows of `picked`
fn output_schema(picked: &PickedChart) -> Value {
    let mut properties = Map::new();
    properties.insert(picked.schema.x_key.clone(), json!({"type": "string"}));
    properties.insert(picked.schema.y_key.clone(), json!({"type": "number"}));
    for field in picked
        .data_requirements
        .optional_fields
        .iter()
        .flatten()
    {
        properties
            .entry(field.clone())
            .or_insert_with(|| json!({"type": "string"}));
    }

    json!({
        "type": "array",
        "items": {
            "type": "object",
            "properties": properties,
            "required": picked.data_requirements.required_fields,
        }
    })
}

fn pipeline_name(picked: &PickedChart) -> String {
    format!("{} - {}", picked.chart_type, picked.schema.title)
}

/// Rows to feed the pipeline. "No data needed" means the chart's own
/// example rows are used.
fn raw_rows(data: &DataResult, picked: &PickedChart) -> Vec<Record> {
    match data {
        DataResult::Provided(provided) => provided.data.clone(),
        DataResult::NotNeeded { .. } if !picked.schema.data.is_empty() => {
            picked.schema.data.clone()
        }
        DataResult::NotNeeded { .. } => picked.data_requirements.data_example.clone(),
    }
}

fn into_records(value: Value) -> Vec<Record> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect(),
        Value::Object(map) => vec![map],
        _ => Vec::new(),
    }
}

fn missing_chart() -> ToolError {
    ToolError::MissingState(
        "No chart schema found. The chart picker must choose a chart first.".to_string(),
    )
}

// ============================================================================
// create_pipeline_from_state
// ============================================================================

pub struct CreatePipelineTool;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreatePipelineInput {
    confirm_creation: bool,
}

#[async_trait]
impl Tool for CreatePipelineTool {
    type Input = CreatePipelineInput;

    fn name(&self) -> &'static str {
        "create_pipeline_from_state"
    }

    fn description(&self) -> String {
        "Create a transform pipeline whose output matches the picked chart's schema. Reuses the pipeline if one already exists for this chart.".to_string()
    }

    fn input_schema(&self) -> Value {
        confirm_schema("confirmCreation", "Confirm the pipeline should be created")
    }

    async fn run(
        &self,
        input: CreatePipelineInput,
        ctx: &mut ToolContext<'_>,
    ) -> Result<String, ToolError> {
        if !input.confirm_creation {
            return Ok("Please confirm pipeline creation.".to_string());
        }
        let picked = ctx.state.picked_chart.clone().ok_or_else(missing_chart)?;
        let schema = output_schema(&picked);

        if let Some(existing) = &ctx.state.pipeline {
            if existing.chart_type == picked.chart_type && existing.schema == schema {
                return Ok(format!(
                    "Pipeline {} already exists for this {} chart.",
                    existing.id, picked.chart_type
                ));
            }
        }

        let name = pipeline_name(&picked);
        let created = ctx.services.transformer.create_pipeline(&name, &schema).await?;
        tracing::info!(run_id = ctx.run_id, pipeline_id = %created.id, "Pipeline ready");

        let summary = format!(
            "Created pipeline for {} chart with ID: {}",
            picked.chart_type, created.id
        );
        ctx.state.pipeline = Some(PipelineInfo {
            id: created.id,
            name,
            chart_type: picked.chart_type,
            schema,
            inbox_email: created.inbox_email,
        });
        Ok(summary)
    }
}

// ============================================================================
// transform_data_from_state
// ============================================================================

pub struct TransformDataTool;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TransformDataInput {
    confirm_transform: bool,
}

#[async_trait]
impl Tool for TransformDataTool {
    type Input = TransformDataInput;

    fn name(&self) -> &'static str {
        "transform_data_from_state"
    }

    fn description(&self) -> String {
        "Run the raw data from state through the pipeline and store the cleaned rows.".to_string()
    }

    fn input_schema(&self) -> Value {
        confirm_schema("confirmTransform", "Confirm the data should be transformed")
    }

    async fn run(
        &self,
        input: TransformDataInput,
        ctx: &mut ToolContext<'_>,
    ) -> Result<String, ToolError> {
        if !input.confirm_transform {
            return Ok("Please confirm data transformation.".to_string());
        }
        let pipeline_id = ctx
            .state
            .pipeline
            .as_ref()
            .map(|p| p.id.clone())
            .ok_or_else(|| {
                ToolError::MissingState(
                    "No pipeline found. Create the pipeline first.".to_string(),
                )
            })?;
        let picked = ctx.state.picked_chart.as_ref().ok_or_else(missing_chart)?;
        let data = ctx.state.data_result.as_ref().ok_or_else(|| {
            ToolError::MissingState(
                "No raw data found. The data agent must provide data first.".to_string(),
            )
        })?;

        let rows = raw_rows(data, picked);
        if rows.is_empty() {
            return Err(ToolError::MissingState(
                "There are no rows to transform.".to_string(),
            ));
        }
        let content = serde_json::to_string(&rows)
            .map_err(|e| ToolError::Invalid(format!("Raw data is not serializable: {e}")))?;
        let reference_id = content_reference_id(&pipeline_id, &content);

        let output = ctx
            .services
            .transformer
            .transform(&pipeline_id, &reference_id, &content)
            .await?;
        let cleaned = into_records(output);
        if cleaned.is_empty() {
            return Err(ToolError::Invalid(
                "The pipeline returned no usable rows.".to_string(),
            ));
        }

        let summary = format!(
            "Data transformed successfully. {} records processed.",
            cleaned.len()
        );
        ctx.state.cleaned_data = Some(cleaned);
        Ok(summary)
    }
}

// ============================================================================
// prepare_chart_data_from_state
// ============================================================================

pub struct PrepareChartDataTool;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PrepareChartDataInput {
    confirm_preparation: bool,
}

#[async_trait]
impl Tool for PrepareChartDataTool {
    type Input = PrepareChartDataInput;

    fn name(&self) -> &'static str {
        "prepare_chart_data_from_state"
    }

    fn description(&self) -> String {
        "Combine the chart schema with the cleaned rows into the final chart input.".to_string()
    }

    fn input_schema(&self) -> Value {
        confirm_schema("confirmPreparation", "Confirm the chart data should be prepared")
    }

    async fn run(
        &self,
        input: PrepareChartDataInput,
        ctx: &mut ToolContext<'_>,
    ) -> Result<String, ToolError> {
        if !input.confirm_preparation {
            return Ok("Please confirm chart data preparation.".to_string());
        }
        let picked = ctx.state.picked_chart.as_ref().ok_or_else(missing_chart)?;
        let cleaned = ctx.state.cleaned_data.clone().ok_or_else(|| {
            ToolError::MissingState(
                "No cleaned data available. Transform the data first.".to_string(),
            )
        })?;

        let prepared = ChartSchema {
            data: cleaned,
            variant: Some(picked.schema.kind.clone()),
            ..picked.schema.clone()
        };
        let summary = format!(
            "Chart data prepared with {} data points. Ready for visualization as {} chart.",
            prepared.data.len(),
            picked.chart_type
        );
        ctx.state.prepared_chart_data = Some(prepared);
        Ok(summary)
    }
}
