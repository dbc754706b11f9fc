//! Typed values stored in the network state
//!
//! Wire names follow the front end's JSON conventions (camelCase fields,
//! kebab-case chart kinds), so the same types are used for tool inputs,
//! state entries and the final response payload.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// One row of tabular chart data
pub type Record = Map<String, Value>;

// ============================================================================
// Charts
// ============================================================================

/// Supported chart kinds and variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartKind {
    Bar,
    BarHorizontal,
    BarStacked,
    BarMultiple,
    Line,
    LineMultiple,
    LineStep,
    Area,
    AreaStacked,
    AreaStep,
    Pie,
    PieDonut,
    PieDonutText,
    Radar,
    Radial,
}

impl ChartKind {
    pub const ALL: [ChartKind; 15] = [
        ChartKind::Bar,
        ChartKind::BarHorizontal,
        ChartKind::BarStacked,
        ChartKind::BarMultiple,
        ChartKind::Line,
        ChartKind::LineMultiple,
        ChartKind::LineStep,
        ChartKind::Area,
        ChartKind::AreaStacked,
        ChartKind::AreaStep,
        ChartKind::Pie,
        ChartKind::PieDonut,
        ChartKind::PieDonutText,
        ChartKind::Radar,
        ChartKind::Radial,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::BarHorizontal => "bar-horizontal",
            ChartKind::BarStacked => "bar-stacked",
            ChartKind::BarMultiple => "bar-multiple",
            ChartKind::Line => "line",
            ChartKind::LineMultiple => "line-multiple",
            ChartKind::LineStep => "line-step",
            ChartKind::Area => "area",
            ChartKind::AreaStacked => "area-stacked",
            ChartKind::AreaStep => "area-step",
            ChartKind::Pie => "pie",
            ChartKind::PieDonut => "pie-donut",
            ChartKind::PieDonutText => "pie-donut-text",
            ChartKind::Radar => "radar",
            ChartKind::Radial => "radial",
        }
    }

    /// All wire names, for JSON schema enums
    pub fn names() -> Vec<&'static str> {
        Self::ALL.into_iter().map(ChartKind::as_str).collect()
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chart layout proposed by the chart picker, later filled with cleaned data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChartSchema {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub data: Vec<Record>,
    pub x_key: String,
    pub y_key: String,
    pub config: Record,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

/// Shape of the data a chart needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DataRequirements {
    pub minimum_data_points: u32,
    pub required_fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional_fields: Option<Vec<String>>,
    pub data_example: Vec<Record>,
}

/// Output of the chart-type selection stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PickedChart {
    pub chart_type: ChartKind,
    pub reasoning: String,
    pub schema: ChartSchema,
    pub data_requirements: DataRequirements,
}

/// Styling for one data series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesStyle {
    pub label: String,
    pub color: String,
}

/// Final chart specification handed to the front end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSpec {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub title: String,
    pub data: Vec<Record>,
    pub x_key: String,
    pub y_key: String,
    pub config: BTreeMap<String, SeriesStyle>,
}

// ============================================================================
// Data generation and cleaning
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestedVisualization {
    Bar,
    Line,
    Area,
    Pie,
    Scatter,
    Radar,
    Funnel,
    Treemap,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataKeys {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DataMetadata {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_visualization: Option<SuggestedVisualization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<DataKeys>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProvidedData {
    pub query: String,
    pub data: Vec<Record>,
    pub metadata: DataMetadata,
}

/// Output of the data generation stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DataResult {
    Provided(ProvidedData),
    NotNeeded { reason: String },
}

impl DataResult {
    pub fn records(&self) -> Option<&[Record]> {
        match self {
            DataResult::Provided(provided) => Some(&provided.data),
            DataResult::NotNeeded { .. } => None,
        }
    }
}

/// Transform pipeline created for the cleaning stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineInfo {
    pub id: String,
    pub name: String,
    pub chart_type: ChartKind,
    pub schema: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inbox_email: Option<String>,
}

// ============================================================================
// UI generation
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiKind {
    Form,
    Card,
    Dashboard,
    Modal,
    Table,
    Navigation,
    Profile,
    Settings,
    Landing,
    Auth,
    Custom,
}

impl UiKind {
    pub const ALL: [UiKind; 11] = [
        UiKind::Form,
        UiKind::Card,
        UiKind::Dashboard,
        UiKind::Modal,
        UiKind::Table,
        UiKind::Navigation,
        UiKind::Profile,
        UiKind::Settings,
        UiKind::Landing,
        UiKind::Auth,
        UiKind::Custom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            UiKind::Form => "form",
            UiKind::Card => "card",
            UiKind::Dashboard => "dashboard",
            UiKind::Modal => "modal",
            UiKind::Table => "table",
            UiKind::Navigation => "navigation",
            UiKind::Profile => "profile",
            UiKind::Settings => "settings",
            UiKind::Landing => "landing",
            UiKind::Auth => "auth",
            UiKind::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiLayout {
    #[default]
    Vertical,
    Horizontal,
    Grid,
    Flex,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiTheme {
    #[default]
    Default,
    Dark,
    Light,
}

/// One node of a rendered component tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiComponent {
    #[serde(rename = "type")]
    pub kind: String,
    pub props: Record,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<UiComponent>>,
}

impl UiComponent {
    /// Build a component tree from loosely-shaped JSON.
    ///
    /// Entries that are not objects or carry no string `type` are dropped,
    /// at every depth. Missing `props` become an empty map.
    pub fn tree_from_values(values: &[Value]) -> Vec<UiComponent> {
        values.iter().filter_map(UiComponent::from_value).collect()
    }

    fn from_value(value: &Value) -> Option<UiComponent> {
        let obj = value.as_object()?;
        let kind = obj.get("type")?.as_str().filter(|s| !s.is_empty())?;
        let props = obj
            .get("props")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let children = obj
            .get("children")
            .and_then(Value::as_array)
            .map(|items| UiComponent::tree_from_values(items));
        Some(UiComponent {
            kind: kind.to_string(),
            props,
            children,
        })
    }
}

/// Final UI specification handed to the front end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiSpec {
    pub action: String,
    pub title: String,
    pub components: Vec<UiComponent>,
    pub layout: UiLayout,
    pub theme: UiTheme,
}

// ============================================================================
// Conversation history
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub author: String,
    pub text: String,
    pub timestamp: String,
}

/// Retrieved chat history handed to the front end
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSpec {
    pub channel: String,
    pub messages: Vec<ConversationMessage>,
}

// ============================================================================
// Email
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailAction {
    Send,
    Draft,
    Search,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailResult {
    pub action: EmailAction,
    pub message: String,
    #[serde(default)]
    pub details: Value,
}

// ============================================================================
// Terminal results
// ============================================================================

/// Discriminator of the run's final artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultType {
    Chart,
    Component,
    Conversation,
}

/// The single final artifact a run may produce
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TerminalResult {
    #[serde(rename = "chart_result")]
    Chart(ChartSpec),
    #[serde(rename = "ui_result")]
    Ui(UiSpec),
    #[serde(rename = "conversation_result")]
    Conversation(ConversationSpec),
}

impl TerminalResult {
    pub fn result_type(&self) -> ResultType {
        match self {
            TerminalResult::Chart(_) => ResultType::Chart,
            TerminalResult::Ui(_) => ResultType::Component,
            TerminalResult::Conversation(_) => ResultType::Conversation,
        }
    }

    pub fn to_payload(&self) -> ResultPayload {
        match self {
            TerminalResult::Chart(spec) => ResultPayload::Chart {
                name: "generate_chart".to_string(),
                data: spec.clone(),
            },
            TerminalResult::Ui(spec) => ResultPayload::Component {
                name: "generate_ui".to_string(),
                data: spec.clone(),
            },
            TerminalResult::Conversation(spec) => ResultPayload::Conversation {
                name: "get_conversation_history".to_string(),
                data: spec.clone(),
            },
        }
    }
}

/// Tagged payload attached to the assistant's reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResultPayload {
    Chart { name: String, data: ChartSpec },
    Component { name: String, data: UiSpec },
    Conversation { name: String, data: ConversationSpec },
}
