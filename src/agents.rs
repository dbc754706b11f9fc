//! Workers of the network
//!
//! An [`Agent`] is a stateless descriptor: a routing name, an instruction
//! profile and a tool set. One turn is one completion request followed by the
//! dispatch of every tool call in the response, in order.

pub mod prompts;

use crate::llm::{
    AnthropicModel, ContentBlock, LlmMessage, LlmRequest, LlmResponse, MessageRole, SystemContent,
};
use crate::network::{History, Turn};
use crate::state::NetworkState;
use crate::tools::{
    CleanDataPlaceholderTool, CreatePipelineTool, DoneTool, DraftEmailTool, GenerateChartTool,
    GenerateDataPlaceholderTool, GenerateUiTool, GetConversationHistoryTool, ListChannelsTool,
    NoDataNeededTool, PickChartTool, PrepareChartDataTool, ProvideDataTool, RouteToAgentTool,
    SearchEmailTool, SendEmailTool, SupervisorDoneTool, ToolCall, ToolContext, ToolSet,
    TransformDataTool,
};
use std::fmt::Write;

/// Longest tool output repeated to later workers
const DIGEST_OUTPUT_CHARS: usize = 600;

pub const ROUTER: &str = "router";
pub const CHART_PICKER: &str = "chart_picker";
pub const DATA: &str = "data";
pub const DATA_CLEANER: &str = "data_cleaner";
pub const CHART: &str = "chart";
pub const UI: &str = "ui";
pub const EMAIL: &str = "email";
pub const SLACK: &str = "slack";

#[derive(Debug, Clone)]
pub struct Agent {
    pub name: String,
    pub description: String,
    pub system_prompt: String,
    pub tools: ToolSet,
    /// Preferred model id; `None` uses the registry default
    pub model: Option<String>,
    /// Output cap below the network-wide `max_tokens`
    pub max_tokens: Option<u32>,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        system_prompt: impl Into<String>,
        tools: ToolSet,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            system_prompt: system_prompt.into(),
            tools,
            model: None,
            max_tokens: None,
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Completion request for this worker's next turn
    pub fn request(&self, history: &History, state: &NetworkState, max_tokens: u32) -> LlmRequest {
        let snapshot = serde_json::to_string_pretty(&state.snapshot()).unwrap_or_default();

        let mut messages: Vec<LlmMessage> = history
            .messages()
            .iter()
            .map(|m| match m.role {
                MessageRole::User => LlmMessage::user(m.content.clone()),
                MessageRole::Assistant => LlmMessage::assistant(m.content.clone()),
            })
            .collect();

        if let Some(digest) = progress_digest(history) {
            // the request always ends with a user message
            if let Some(last) = messages.last_mut() {
                last.content.push(ContentBlock::text(digest));
            }
        }

        LlmRequest {
            model: self.model.clone(),
            system: vec![
                SystemContent::cached(self.system_prompt.clone()),
                SystemContent::new(format!("Current network state:\n{snapshot}")),
            ],
            messages,
            tools: self.tools.definitions(),
            max_tokens: Some(self.max_tokens.map_or(max_tokens, |cap| cap.min(max_tokens))),
        }
    }

    /// Dispatch the tool calls of `response` and record the turn
    pub async fn apply(&self, response: &LlmResponse, ctx: &mut ToolContext<'_>) -> Turn {
        let mut invocations = Vec::new();
        for tool_use in response.tool_uses() {
            let call = ToolCall {
                id: tool_use.id.to_string(),
                name: tool_use.name.to_string(),
                input: tool_use.input.clone(),
            };
            invocations.push(self.tools.dispatch(call, ctx).await);
        }
        Turn::completed(self.name.clone(), response.text(), invocations)
    }
}

/// What earlier workers did in this run, for the next worker's context
fn progress_digest(history: &History) -> Option<String> {
    if history.turns().is_empty() {
        return None;
    }
    let mut digest = String::from("Work done so far on this request:");
    for turn in history.turns() {
        let _ = write!(digest, "\n\n[{}]", turn.agent);
        if let Some(content) = &turn.content {
            let _ = write!(digest, " {content}");
        }
        for inv in &turn.invocations {
            let output: String = inv.output.chars().take(DIGEST_OUTPUT_CHARS).collect();
            let _ = write!(digest, "\n- {} ({:?}): {output}", inv.name, inv.status);
        }
    }
    Some(digest)
}

/// Workers by routing name, in registration order
#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    agents: Vec<Agent>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `agent`, replacing any worker of the same name
    #[must_use]
    pub fn with(mut self, agent: Agent) -> Self {
        match self.agents.iter().position(|a| a.name == agent.name) {
            Some(idx) => self.agents[idx] = agent,
            None => self.agents.push(agent),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.agents.iter().map(|a| a.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// The supervisor plus every specialist
    pub fn standard() -> Self {
        let specialists = vec![
            Agent::new(
                CHART_PICKER,
                "Chooses the chart type and schema for a visualization request",
                prompts::specialist(prompts::CHART_PICKER),
                ToolSet::new()
                    .with(PickChartTool)
                    .with(GenerateDataPlaceholderTool)
                    .with(DoneTool),
            ),
            Agent::new(
                DATA,
                "Supplies the data rows a picked chart needs",
                prompts::specialist(prompts::DATA),
                ToolSet::new()
                    .with(ProvideDataTool)
                    .with(NoDataNeededTool)
                    .with(CleanDataPlaceholderTool)
                    .with(DoneTool),
            )
            .with_max_tokens(2048),
            Agent::new(
                DATA_CLEANER,
                "Normalizes raw data into the picked chart's schema",
                prompts::specialist(prompts::DATA_CLEANER),
                ToolSet::new()
                    .with(CreatePipelineTool)
                    .with(TransformDataTool)
                    .with(PrepareChartDataTool)
                    .with(DoneTool),
            )
            .with_max_tokens(2048),
            Agent::new(
                CHART,
                "Renders the final chart from prepared data",
                prompts::specialist(prompts::CHART),
                ToolSet::new().with(GenerateChartTool).with(DoneTool),
            ),
            Agent::new(
                UI,
                "Generates UI components: forms, cards, dashboards, tables",
                prompts::specialist(prompts::UI),
                ToolSet::new().with(GenerateUiTool).with(DoneTool),
            ),
            Agent::new(
                EMAIL,
                "Searches, drafts and sends email",
                prompts::specialist(prompts::EMAIL),
                ToolSet::new()
                    .with(SearchEmailTool)
                    .with(DraftEmailTool)
                    .with(SendEmailTool)
                    .with(DoneTool),
            ),
            Agent::new(
                SLACK,
                "Retrieves chat channel history",
                prompts::specialist(prompts::SLACK),
                ToolSet::new()
                    .with(ListChannelsTool)
                    .with(GetConversationHistoryTool)
                    .with(DoneTool),
            ),
        ];

        let supervisor = Agent::new(
            ROUTER,
            "Routes each request to the right specialist",
            prompts::supervisor(
                specialists
                    .iter()
                    .map(|a| (a.name.as_str(), a.description.as_str())),
            ),
            ToolSet::new()
                .with(RouteToAgentTool::new(specialists.iter().map(|a| a.name.clone())))
                .with(SupervisorDoneTool),
        )
        .with_model(AnthropicModel::Haiku45.model_id())
        .with_max_tokens(1000);

        specialists
            .into_iter()
            .fold(Self::new().with(supervisor), Self::with)
    }
}
