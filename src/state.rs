//! Per-run shared state
//!
//! One `NetworkState` is created per run and owned by that run's loop, so no
//! locking is involved. Stage outputs are plain optional fields; the terminal
//! result lives in a single slot that can only be written once.

pub mod payload;

use payload::{
    ChartSchema, ChartSpec, ConversationSpec, DataResult, EmailResult, PickedChart, PipelineInfo,
    Record, ResultType, TerminalResult, UiSpec,
};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Every key the store knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKey {
    UserRequest,
    RoutedTo,
    RoutingReason,
    TaskCompleted,
    FinalSummary,
    PickedChart,
    NeedDataGeneration,
    DataGenerationReason,
    DataResult,
    DataQuery,
    NeedDataCleaning,
    DataCleaningReason,
    Pipeline,
    CleanedData,
    PreparedChartData,
    EmailResult,
    Completed,
    CompletionMessage,
    ResultType,
    ChartResult,
    UiResult,
    ConversationResult,
}

impl StateKey {
    /// Keys whose presence ends a run
    pub const TERMINAL: [StateKey; 3] = [
        StateKey::ChartResult,
        StateKey::UiResult,
        StateKey::ConversationResult,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StateKey::UserRequest => "user_request",
            StateKey::RoutedTo => "routed_to",
            StateKey::RoutingReason => "routing_reason",
            StateKey::TaskCompleted => "task_completed",
            StateKey::FinalSummary => "final_summary",
            StateKey::PickedChart => "picked_chart",
            StateKey::NeedDataGeneration => "need_data_generation",
            StateKey::DataGenerationReason => "data_generation_reason",
            StateKey::DataResult => "data_result",
            StateKey::DataQuery => "data_query",
            StateKey::NeedDataCleaning => "need_data_cleaning",
            StateKey::DataCleaningReason => "data_cleaning_reason",
            StateKey::Pipeline => "pipeline",
            StateKey::CleanedData => "cleaned_data",
            StateKey::PreparedChartData => "prepared_chart_data",
            StateKey::EmailResult => "email_result",
            StateKey::Completed => "completed",
            StateKey::CompletionMessage => "completion_message",
            StateKey::ResultType => "result_type",
            StateKey::ChartResult => "chart_result",
            StateKey::UiResult => "ui_result",
            StateKey::ConversationResult => "conversation_result",
        }
    }

    pub fn is_terminal(self) -> bool {
        Self::TERMINAL.contains(&self)
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TerminalResult {
    /// The state key this result occupies
    pub fn key(&self) -> StateKey {
        match self {
            TerminalResult::Chart(_) => StateKey::ChartResult,
            TerminalResult::Ui(_) => StateKey::UiResult,
            TerminalResult::Conversation(_) => StateKey::ConversationResult,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("{existing} is already set; refusing to write {attempted}")]
    TerminalAlreadySet {
        existing: StateKey,
        attempted: StateKey,
    },
}

/// What a successful terminal write did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalWrite {
    Stored,
    /// Identical value was already present
    Unchanged,
}

/// Shared key/value store for one run
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetworkState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_request: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub routed_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing_reason: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub task_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_summary: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub picked_chart: Option<PickedChart>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub need_data_generation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_generation_reason: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_result: Option<DataResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_query: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub need_data_cleaning: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_cleaning_reason: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<PipelineInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleaned_data: Option<Vec<Record>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prepared_chart_data: Option<ChartSchema>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_result: Option<EmailResult>,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_message: Option<String>,

    #[serde(flatten)]
    terminal: Option<TerminalResult>,
}

impl NetworkState {
    /// Fresh store seeded with the user's request
    pub fn for_request(user_request: impl Into<String>) -> Self {
        Self {
            user_request: Some(user_request.into()),
            ..Self::default()
        }
    }

    /// Whether `key` currently holds a value. Flags count as present when true.
    pub fn has(&self, key: StateKey) -> bool {
        match key {
            StateKey::UserRequest => self.user_request.is_some(),
            StateKey::RoutedTo => self.routed_to.is_some(),
            StateKey::RoutingReason => self.routing_reason.is_some(),
            StateKey::TaskCompleted => self.task_completed,
            StateKey::FinalSummary => self.final_summary.is_some(),
            StateKey::PickedChart => self.picked_chart.is_some(),
            StateKey::NeedDataGeneration => self.need_data_generation,
            StateKey::DataGenerationReason => self.data_generation_reason.is_some(),
            StateKey::DataResult => self.data_result.is_some(),
            StateKey::DataQuery => self.data_query.is_some(),
            StateKey::NeedDataCleaning => self.need_data_cleaning,
            StateKey::DataCleaningReason => self.data_cleaning_reason.is_some(),
            StateKey::Pipeline => self.pipeline.is_some(),
            StateKey::CleanedData => self.cleaned_data.is_some(),
            StateKey::PreparedChartData => self.prepared_chart_data.is_some(),
            StateKey::EmailResult => self.email_result.is_some(),
            StateKey::Completed => self.completed,
            StateKey::CompletionMessage => self.completion_message.is_some(),
            StateKey::ResultType => self.terminal.is_some(),
            StateKey::ChartResult => self.chart_result().is_some(),
            StateKey::UiResult => self.ui_result().is_some(),
            StateKey::ConversationResult => self.conversation_result().is_some(),
        }
    }

    /// Store the run's final artifact.
    ///
    /// Only one terminal result may exist per run. Writing the exact value
    /// again succeeds without change so that a repeated tool call is harmless.
    pub fn set_terminal(&mut self, result: TerminalResult) -> Result<TerminalWrite, StateError> {
        match &self.terminal {
            None => {
                self.terminal = Some(result);
                Ok(TerminalWrite::Stored)
            }
            Some(existing) if *existing == result => Ok(TerminalWrite::Unchanged),
            Some(existing) => Err(StateError::TerminalAlreadySet {
                existing: existing.key(),
                attempted: result.key(),
            }),
        }
    }

    pub fn terminal(&self) -> Option<&TerminalResult> {
        self.terminal.as_ref()
    }

    pub fn has_terminal(&self) -> bool {
        self.terminal.is_some()
    }

    pub fn result_type(&self) -> Option<ResultType> {
        self.terminal.as_ref().map(TerminalResult::result_type)
    }

    pub fn chart_result(&self) -> Option<&ChartSpec> {
        match &self.terminal {
            Some(TerminalResult::Chart(spec)) => Some(spec),
            _ => None,
        }
    }

    pub fn ui_result(&self) -> Option<&UiSpec> {
        match &self.terminal {
            Some(TerminalResult::Ui(spec)) => Some(spec),
            _ => None,
        }
    }

    pub fn conversation_result(&self) -> Option<&ConversationSpec> {
        match &self.terminal {
            Some(TerminalResult::Conversation(spec)) => Some(spec),
            _ => None,
        }
    }

    /// Record a worker's `done` call
    pub fn mark_completed(&mut self, message: impl Into<String>) {
        self.completed = true;
        self.completion_message = Some(message.into());
    }

    /// JSON rendering of everything currently set
    pub fn snapshot(&self) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or(Value::Null);
        if let (Some(result_type), Value::Object(map)) = (self.result_type(), &mut value) {
            map.insert(
                StateKey::ResultType.as_str().to_string(),
                serde_json::to_value(result_type).unwrap_or(Value::Null),
            );
        }
        value
    }
}
