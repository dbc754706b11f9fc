//! Run loop
//!
//! `Init -> Routing -> WorkerTurn -> (Routing | Terminated)`. Each worker turn
//! runs against a staged copy of the state that replaces the live state only
//! when the turn finishes inside its time budget.

use super::router::{route, RouteReason, RoutingDecision};
use super::traits::LlmClient;
use super::turn::{History, RunRequest, Turn};
use crate::agents::{Agent, AgentRegistry};
use crate::config::NetworkConfig;
use crate::llm::{LlmError, LlmRequest, LlmResponse, Usage};
use crate::services::Services;
use crate::state::payload::{ResultPayload, TerminalResult};
use crate::state::NetworkState;
use crate::tools::ToolContext;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

const FALLBACK_MESSAGE: &str = "I've completed your request.";
const CANCELLED_MESSAGE: &str = "The request was cancelled before it finished.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    /// The router still wanted to route when the turn budget ran out
    IterationLimit,
    Cancelled,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("{agent} could not get a completion: {source}")]
    Upstream {
        agent: String,
        #[source]
        source: LlmError,
    },
}

/// Outcome of one run
#[derive(Debug, Clone)]
pub struct RunResult {
    pub run_id: String,
    pub status: RunStatus,
    /// Always present, even when the run failed to produce a result
    pub message: String,
    /// Present only when a terminal result was recorded
    pub payload: Option<ResultPayload>,
    pub state: NetworkState,
    pub turns: Vec<Turn>,
    /// Tokens billed across every completion, including discarded turns
    pub usage: Usage,
}

/// Drives runs over a fixed registry, collaborator set and config.
///
/// Holds no per-run state, so one runner serves concurrent runs.
pub struct NetworkRunner<L: LlmClient> {
    llm: L,
    agents: Arc<AgentRegistry>,
    services: Services,
    config: NetworkConfig,
}

impl<L: LlmClient> NetworkRunner<L> {
    pub fn new(
        llm: L,
        agents: Arc<AgentRegistry>,
        services: Services,
        config: NetworkConfig,
    ) -> Self {
        Self {
            llm,
            agents,
            services,
            config,
        }
    }

    pub fn agents(&self) -> &AgentRegistry {
        &self.agents
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub async fn run(
        &self,
        request: &RunRequest,
        cancel: &CancellationToken,
    ) -> Result<RunResult, RunError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let started = Instant::now();
        let mut state = NetworkState::for_request(request.user_request());
        let mut history = History::new(request);
        let mut usage = Usage::default();

        tracing::info!(run_id = %run_id, request = %request.user_request(), "Run started");

        let status = loop {
            if cancel.is_cancelled() {
                tracing::info!(run_id = %run_id, "Run cancelled");
                break RunStatus::Cancelled;
            }

            let (decision, reason) = route(
                &self.agents,
                &self.config.entry_agent,
                &state,
                history.last_turn(),
            );
            let iteration = history.turns().len();
            tracing::debug!(run_id = %run_id, iteration, reason = %reason, decision = ?decision, "Routing decision");

            let next = match decision {
                RoutingDecision::Terminate => {
                    if matches!(reason, RouteReason::TerminalResult { .. }) {
                        state.completed = true;
                        state.task_completed = true;
                    }
                    if let RouteReason::UnknownWorker { name } = &reason {
                        tracing::warn!(run_id = %run_id, worker = %name, "Routing target is not registered");
                    }
                    break RunStatus::Completed;
                }
                RoutingDecision::Next(names) => names,
            };

            if iteration >= self.config.max_iterations {
                tracing::warn!(run_id = %run_id, max_iterations = self.config.max_iterations, "Iteration limit reached");
                break RunStatus::IterationLimit;
            }

            // route() only names registered workers
            let Some(agent) = next.first().and_then(|name| self.agents.get(name)) else {
                break RunStatus::Completed;
            };
            let turn = self
                .worker_turn(&run_id, agent, &history, &mut state, &mut usage)
                .await?;
            history.push(turn);
        };

        let message = final_message(status, &state, &history, self.config.max_iterations);
        let payload = state.terminal().map(TerminalResult::to_payload);

        tracing::info!(
            run_id = %run_id,
            status = ?status,
            iterations = history.turns().len(),
            result_type = ?state.result_type(),
            input_tokens = usage.prompt_tokens(),
            output_tokens = usage.output_tokens,
            duration_ms = %started.elapsed().as_millis(),
            "Run finished"
        );

        Ok(RunResult {
            run_id,
            status,
            message,
            payload,
            state,
            turns: history.into_turns(),
            usage,
        })
    }

    /// One turn of `agent`, committed only if it finishes in time
    async fn worker_turn(
        &self,
        run_id: &str,
        agent: &Agent,
        history: &History,
        state: &mut NetworkState,
        usage: &mut Usage,
    ) -> Result<Turn, RunError> {
        let started = Instant::now();
        let mut staged = state.clone();

        let outcome = tokio::time::timeout(
            self.config.turn_timeout,
            self.staged_turn(run_id, agent, history, &mut staged, usage),
        )
        .await;

        match outcome {
            Ok(Ok(turn)) => {
                *state = staged;
                tracing::info!(
                    run_id,
                    agent = %agent.name,
                    tool_calls = turn.invocations.len(),
                    failed_calls = turn.invocations.iter().filter(|i| !i.succeeded()).count(),
                    duration_ms = %started.elapsed().as_millis(),
                    "Turn finished"
                );
                Ok(turn)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                tracing::warn!(
                    run_id,
                    agent = %agent.name,
                    timeout_secs = self.config.turn_timeout.as_secs_f64(),
                    "Turn timed out, discarding its changes"
                );
                Ok(Turn::timed_out(agent.name.clone()))
            }
        }
    }

    async fn staged_turn(
        &self,
        run_id: &str,
        agent: &Agent,
        history: &History,
        state: &mut NetworkState,
        usage: &mut Usage,
    ) -> Result<Turn, RunError> {
        let request = agent.request(history, state, self.config.max_tokens);
        let response = self.complete_with_retry(run_id, &agent.name, &request).await?;
        *usage += response.usage;
        if response.truncated() {
            tracing::warn!(
                run_id,
                agent = %agent.name,
                max_tokens = ?request.max_tokens,
                "Completion hit the output limit; trailing tool calls may be missing"
            );
        }
        let mut ctx = ToolContext::new(run_id, &agent.name, state, &self.services);
        Ok(agent.apply(&response, &mut ctx).await)
    }

    async fn complete_with_retry(
        &self,
        run_id: &str,
        agent: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse, RunError> {
        let mut attempt = 0;
        loop {
            match self.llm.complete(request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.kind.is_retryable() && attempt < self.config.llm_max_retries => {
                    let delay = e
                        .retry_after
                        .unwrap_or_else(|| self.config.retry_delay(attempt));
                    tracing::warn!(
                        run_id,
                        agent,
                        attempt = attempt + 1,
                        delay_ms = %delay.as_millis(),
                        error = %e,
                        "Retrying completion"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(source) => {
                    return Err(RunError::Upstream {
                        agent: agent.to_string(),
                        source,
                    })
                }
            }
        }
    }
}

/// Completion message, then supervisor summary, then the last turn's text
fn final_message(
    status: RunStatus,
    state: &NetworkState,
    history: &History,
    max_iterations: usize,
) -> String {
    match status {
        RunStatus::IterationLimit => format!(
            "I could not complete the request within {max_iterations} steps. Please try rephrasing it."
        ),
        RunStatus::Cancelled => CANCELLED_MESSAGE.to_string(),
        RunStatus::Completed => state
            .completion_message
            .clone()
            .or_else(|| state.final_summary.clone())
            .or_else(|| history.last_turn().and_then(|t| t.content.clone()))
            .unwrap_or_else(|| FALLBACK_MESSAGE.to_string()),
    }
}
