//! UI component generation

use super::{Tool, ToolContext, ToolError};
use crate::state::payload::{TerminalResult, UiComponent, UiKind, UiLayout, UiSpec, UiTheme};
use crate::state::TerminalWrite;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

pub struct GenerateUiTool;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenerateUiInput {
    #[serde(rename = "type")]
    kind: UiKind,
    title: String,
    components: Vec<Value>,
    #[serde(default)]
    layout: UiLayout,
    #[serde(default)]
    theme: UiTheme,
}

fn component_schema() -> Value {
    json!({
        "type": "object",
        "required": ["type"],
        "properties": {
            "type": {"type": "string", "description": "Component name, e.g. 'Button', 'Input', 'Card'"},
            "props": {"type": "object"},
            "children": {"type": "array", "items": {"type": "object"}}
        }
    })
}

#[async_trait]
impl Tool for GenerateUiTool {
    type Input = GenerateUiInput;

    fn name(&self) -> &'static str {
        "generate_ui"
    }

    fn description(&self) -> String {
        "Produce the final UI specification: a tree of components with their props. Call once, when the design is complete.".to_string()
    }

    fn input_schema(&self) -> Value {
        let kinds: Vec<&str> = UiKind::ALL.into_iter().map(UiKind::as_str).collect();
        json!({
            "type": "object",
            "required": ["type", "title", "components"],
            "additionalProperties": false,
            "properties": {
                "type": {"type": "string", "enum": kinds},
                "title": {"type": "string"},
                "components": {"type": "array", "items": component_schema()},
                "layout": {"type": "string", "enum": ["vertical", "horizontal", "grid", "flex"]},
                "theme": {"type": "string", "enum": ["default", "dark", "light"]}
            }
        })
    }

    fn validate(&self, input: &GenerateUiInput) -> Result<(), String> {
        if input.title.trim().is_empty() {
            return Err("title must not be empty".to_string());
        }
        Ok(())
    }

    async fn run(
        &self,
        input: GenerateUiInput,
        ctx: &mut ToolContext<'_>,
    ) -> Result<String, ToolError> {
        let components = UiComponent::tree_from_values(&input.components);
        if components.is_empty() {
            return Err(ToolError::Invalid(
                "components must contain at least one object with a string 'type'".to_string(),
            ));
        }
        let count = components.len();
        let spec = UiSpec {
            action: format!("generate_{}", input.kind.as_str()),
            title: input.title,
            components,
            layout: input.layout,
            theme: input.theme,
        };
        let title = spec.title.clone();

        match ctx.state.set_terminal(TerminalResult::Ui(spec))? {
            TerminalWrite::Stored => Ok(format!(
                "Generated {} UI \"{title}\" with {count} top-level components.",
                input.kind.as_str()
            )),
            TerminalWrite::Unchanged => Ok(format!("UI \"{title}\" was already generated.")),
        }
    }
}
