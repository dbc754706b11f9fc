//! Mock implementations for testing
//!
//! Scripted completion responses and in-memory collaborators, so whole runs
//! can be exercised without network access.

use super::traits::LlmClient;
use crate::llm::{ContentBlock, LlmError, LlmRequest, LlmResponse, StopReason, Usage};
use crate::services::{
    Channel, CreatedPipeline, DataTransformer, EmailGateway, EmailSummary, HistorySource,
    OutgoingEmail, ServiceError,
};
use crate::state::payload::ConversationMessage;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Mock LLM Client
// ============================================================================

/// Mock LLM client that returns queued responses
#[derive(Default)]
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    delay: Option<Duration>,
    /// Record of all requests made
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Client that sleeps before answering each request
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::invalid_request("No mock response queued")))
    }
}

/// Response containing only text
pub fn text_response(text: &str) -> LlmResponse {
    LlmResponse {
        content: vec![ContentBlock::text(text)],
        stop_reason: StopReason::EndTurn,
        usage: Usage::default(),
    }
}

/// Response calling `calls` in order
pub fn tool_response(calls: &[(&str, Value)]) -> LlmResponse {
    LlmResponse {
        content: calls
            .iter()
            .enumerate()
            .map(|(i, (name, input))| ContentBlock::tool_use(format!("toolu_{i}"), *name, input.clone()))
            .collect(),
        stop_reason: StopReason::ToolUse,
        usage: Usage {
            input_tokens: 100,
            output_tokens: 20,
            ..Usage::default()
        },
    }
}

/// Completions for a full bar-chart request: supervisor, then the four
/// pipeline stages
pub fn chart_pipeline_script() -> Vec<LlmResponse> {
    let rows = json!([
        {"region": "North", "revenue": 120_000},
        {"region": "South", "revenue": "95,500"},
        {"region": "East", "revenue": 87_250},
        {"region": "West", "revenue": 143_900}
    ]);
    let cleaned = json!([
        {"region": "North", "revenue": 120_000},
        {"region": "South", "revenue": 95_500},
        {"region": "East", "revenue": 87_250},
        {"region": "West", "revenue": 143_900}
    ]);

    vec![
        tool_response(&[(
            "route_to_agent",
            json!({"agent": "chart_picker", "reasoning": "Visualization request"}),
        )]),
        tool_response(&[
            (
                "pick_chart",
                json!({
                    "chartType": "bar",
                    "reasoning": "Comparing revenue across regions",
                    "schema": {
                        "type": "bar",
                        "title": "Revenue by Region",
                        "data": [{"region": "North", "revenue": 100}],
                        "xKey": "region",
                        "yKey": "revenue",
                        "config": {"revenue": {"label": "Revenue", "color": "hsl(var(--chart-1))"}}
                    },
                    "dataRequirements": {
                        "minimumDataPoints": 2,
                        "requiredFields": ["region", "revenue"],
                        "dataExample": [{"region": "North", "revenue": 100}]
                    }
                }),
            ),
            ("done", json!({"message": "Picked a bar chart."})),
        ]),
        tool_response(&[
            (
                "provide_data",
                json!({
                    "query": "quarterly revenue by region",
                    "data": rows,
                    "metadata": {"description": "Revenue per region", "suggestedVisualization": "bar"}
                }),
            ),
            ("done", json!({"message": "Provided 4 rows."})),
        ]),
        tool_response(&[
            ("create_pipeline_from_state", json!({"confirmCreation": true})),
            ("transform_data_from_state", json!({"confirmTransform": true})),
            ("prepare_chart_data_from_state", json!({"confirmPreparation": true})),
            ("done", json!({"message": "Data cleaned."})),
        ]),
        tool_response(&[
            (
                "generate_chart",
                json!({
                    "type": "bar",
                    "title": "Revenue by Region",
                    "data": cleaned,
                    "xKey": "region",
                    "yKey": "revenue"
                }),
            ),
            ("done", json!({"message": "Your revenue chart is ready."})),
        ]),
    ]
}

// ============================================================================
// Mock collaborators
// ============================================================================

/// Transformer returning a fixed output and recording every call
pub struct MockTransformer {
    output: Value,
    pipelines: Mutex<u32>,
    transforms: Mutex<Vec<(String, String)>>,
}

impl MockTransformer {
    pub fn new(output: Value) -> Self {
        Self {
            output,
            pipelines: Mutex::new(0),
            transforms: Mutex::new(Vec::new()),
        }
    }

    pub fn pipelines_created(&self) -> u32 {
        *self.pipelines.lock().unwrap()
    }

    pub fn reference_ids(&self) -> Vec<String> {
        self.transforms.lock().unwrap().iter().map(|(r, _)| r.clone()).collect()
    }

    pub fn transform_inputs(&self) -> Vec<String> {
        self.transforms.lock().unwrap().iter().map(|(_, i)| i.clone()).collect()
    }
}

#[async_trait]
impl DataTransformer for MockTransformer {
    async fn create_pipeline(
        &self,
        _name: &str,
        _output_schema: &Value,
    ) -> Result<CreatedPipeline, ServiceError> {
        *self.pipelines.lock().unwrap() += 1;
        Ok(CreatedPipeline {
            id: "mock-pipeline".to_string(),
            inbox_email: Some("mock-pipeline@inbox.example.com".to_string()),
        })
    }

    async fn transform(
        &self,
        _pipeline_id: &str,
        reference_id: &str,
        input: &str,
    ) -> Result<Value, ServiceError> {
        self.transforms
            .lock()
            .unwrap()
            .push((reference_id.to_string(), input.to_string()));
        Ok(self.output.clone())
    }
}

/// Email gateway that accepts everything
#[derive(Default)]
pub struct MockEmailGateway {
    sent: Mutex<Vec<OutgoingEmail>>,
    drafts: Mutex<Vec<OutgoingEmail>>,
    last_search_limit: Mutex<Option<u32>>,
}

impl MockEmailGateway {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn drafts(&self) -> Vec<OutgoingEmail> {
        self.drafts.lock().unwrap().clone()
    }

    pub fn last_search_limit(&self) -> Option<u32> {
        *self.last_search_limit.lock().unwrap()
    }
}

#[async_trait]
impl EmailGateway for MockEmailGateway {
    async fn send(&self, email: &OutgoingEmail) -> Result<String, ServiceError> {
        let mut sent = self.sent.lock().unwrap();
        sent.push(email.clone());
        Ok(format!("msg-{}", sent.len()))
    }

    async fn draft(&self, email: &OutgoingEmail) -> Result<String, ServiceError> {
        let mut drafts = self.drafts.lock().unwrap();
        drafts.push(email.clone());
        Ok(format!("draft-{}", drafts.len()))
    }

    async fn search(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<EmailSummary>, ServiceError> {
        *self.last_search_limit.lock().unwrap() = Some(max_results);
        Ok(vec![EmailSummary {
            id: "m1".to_string(),
            thread_id: "t1".to_string(),
            from: Some("sam@example.com".to_string()),
            subject: Some(format!("Re: {query}")),
            snippet: "Sounds good".to_string(),
        }])
    }
}

/// History source with two channels and a short conversation
pub struct MockHistorySource {
    channels: Vec<Channel>,
    messages: Vec<ConversationMessage>,
}

impl Default for MockHistorySource {
    fn default() -> Self {
        let message = |author: &str, text: &str, timestamp: &str| ConversationMessage {
            author: author.to_string(),
            text: text.to_string(),
            timestamp: timestamp.to_string(),
        };
        Self {
            channels: vec![
                Channel {
                    id: "C1".to_string(),
                    name: "general".to_string(),
                },
                Channel {
                    id: "C2".to_string(),
                    name: "random".to_string(),
                },
            ],
            messages: vec![
                message("alex", "Deploy is out", "2026-01-05T09:00:00+00:00"),
                message("sam", "Nice, metrics look good", "2026-01-05T09:05:00+00:00"),
                message("alex", "Closing the incident", "2026-01-05T09:20:00+00:00"),
            ],
        }
    }
}

#[async_trait]
impl HistorySource for MockHistorySource {
    async fn list_channels(&self) -> Result<Vec<Channel>, ServiceError> {
        Ok(self.channels.clone())
    }

    async fn history(
        &self,
        channel: &str,
        limit: u32,
    ) -> Result<Vec<ConversationMessage>, ServiceError> {
        if !self.channels.iter().any(|c| c.name == channel || c.id == channel) {
            return Err(ServiceError::Rejected {
                service: "mock-history",
                message: "channel_not_found".to_string(),
            });
        }
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let skip = self.messages.len().saturating_sub(limit);
        Ok(self.messages.iter().skip(skip).cloned().collect())
    }
}
