//! Property-based tests for routing and the run loop
//!
//! These tests verify key invariants hold across generated states and turns.

use super::router::{route, RouteReason, RoutingDecision, CHART_PIPELINE};
use super::testing::{tool_response, MockLlmClient};
use super::{NetworkRunner, RunRequest, RunStatus, Turn};
use crate::agents::{Agent, AgentRegistry};
use crate::config::NetworkConfig;
use crate::services::Services;
use crate::state::payload::{
    ChartKind, ChartSchema, ChartSpec, ConversationSpec, DataResult, PickedChart,
    DataRequirements, TerminalResult, UiLayout, UiSpec, UiTheme,
};
use crate::state::{NetworkState, StateKey};
use crate::tools::test_support::context;
use crate::tools::{
    ControlSignal, GenerateChartTool, InvocationStatus, RouteToAgentTool, ToolCall,
    ToolInvocation, ToolSet,
};
use proptest::prelude::*;
use serde_json::{json, Map};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Test Helpers
// ============================================================================

const KNOWN: [&str; 8] = [
    "router",
    "chart_picker",
    "data",
    "data_cleaner",
    "chart",
    "ui",
    "email",
    "slack",
];

fn schema() -> ChartSchema {
    ChartSchema {
        kind: "bar".to_string(),
        title: "t".to_string(),
        data: vec![],
        x_key: "x".to_string(),
        y_key: "y".to_string(),
        config: Map::new(),
        variant: None,
    }
}

fn picked() -> PickedChart {
    PickedChart {
        chart_type: ChartKind::Bar,
        reasoning: "r".to_string(),
        schema: schema(),
        data_requirements: DataRequirements {
            minimum_data_points: 1,
            required_fields: vec!["x".to_string(), "y".to_string()],
            optional_fields: None,
            data_example: vec![],
        },
    }
}

fn terminal(which: u8) -> TerminalResult {
    match which % 3 {
        0 => TerminalResult::Chart(ChartSpec {
            kind: ChartKind::Line,
            title: "t".to_string(),
            data: vec![],
            x_key: "x".to_string(),
            y_key: "y".to_string(),
            config: BTreeMap::new(),
        }),
        1 => TerminalResult::Ui(UiSpec {
            action: "generate_card".to_string(),
            title: "t".to_string(),
            components: vec![],
            layout: UiLayout::Grid,
            theme: UiTheme::Dark,
        }),
        _ => TerminalResult::Conversation(ConversationSpec {
            channel: "general".to_string(),
            messages: vec![],
        }),
    }
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

/// State with any combination of the pipeline keys set
fn arb_state() -> impl Strategy<Value = NetworkState> {
    (any::<[bool; 3]>(), proptest::option::of(any::<u8>())).prop_map(|(keys, term)| {
        let mut state = NetworkState::for_request("request");
        if keys[0] {
            state.picked_chart = Some(picked());
        }
        if keys[1] {
            state.data_result = Some(DataResult::NotNeeded {
                reason: "r".to_string(),
            });
        }
        if keys[2] {
            state.prepared_chart_data = Some(schema());
        }
        if let Some(which) = term {
            let _ = state.set_terminal(terminal(which));
        }
        state
    })
}

fn arb_agent_name() -> impl Strategy<Value = String> {
    prop_oneof![
        proptest::sample::select(KNOWN.to_vec()).prop_map(str::to_string),
        "[a-z_]{1,12}",
    ]
}

fn arb_invocation() -> impl Strategy<Value = ToolInvocation> {
    (
        prop_oneof![
            Just(InvocationStatus::Ok),
            Just(InvocationStatus::HandlerFailed),
            Just(InvocationStatus::ValidationFailed),
        ],
        prop_oneof![
            Just(None),
            arb_agent_name().prop_map(|agent| Some(ControlSignal::RouteTo { agent })),
            "[a-z ]{0,10}".prop_map(|message| Some(ControlSignal::Done { message })),
        ],
    )
        .prop_map(|(status, signal)| ToolInvocation {
            id: "tu".to_string(),
            name: "tool".to_string(),
            input: json!({}),
            output: String::new(),
            status,
            signal,
        })
}

fn arb_turn() -> impl Strategy<Value = Option<Turn>> {
    proptest::option::of(
        (arb_agent_name(), proptest::collection::vec(arb_invocation(), 0..4))
            .prop_map(|(agent, invocations)| Turn::completed(agent, None, invocations)),
    )
}

/// Standard registry with a random subset of workers removed
fn arb_registry() -> impl Strategy<Value = AgentRegistry> {
    any::<[bool; 8]>().prop_map(|keep| {
        AgentRegistry::standard()
            .iter()
            .zip(keep)
            .filter(|(_, keep)| *keep)
            .map(|(agent, _)| agent.clone())
            .fold(AgentRegistry::new(), AgentRegistry::with)
    })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn router_only_names_registered_workers(
        registry in arb_registry(),
        entry in arb_agent_name(),
        state in arb_state(),
        turn in arb_turn(),
    ) {
        let (decision, _) = route(&registry, &entry, &state, turn.as_ref());
        if let RoutingDecision::Next(names) = decision {
            prop_assert_eq!(names.len(), 1);
            prop_assert!(registry.contains(&names[0]));
        }
    }

    #[test]
    fn terminal_state_always_terminates(
        registry in arb_registry(),
        state in arb_state(),
        turn in arb_turn(),
    ) {
        prop_assume!(turn.is_some() && state.has_terminal());
        let (decision, reason) = route(&registry, "router", &state, turn.as_ref());
        prop_assert_eq!(decision, RoutingDecision::Terminate);
        let is_terminal_reason = matches!(reason, RouteReason::TerminalResult { .. });
        prop_assert!(is_terminal_reason);
    }

    #[test]
    fn pipeline_routes_to_the_stage_after_a_finished_one(
        state in arb_state(),
        turn in arb_turn(),
    ) {
        prop_assume!(turn.is_some() && !state.has_terminal());
        let registry = AgentRegistry::standard();
        let expected = CHART_PIPELINE.windows(2).find_map(|pair| {
            let ((_, done_key), (next_worker, next_key)) = (pair[0], pair[1]);
            (state.has(done_key) && !state.has(next_key)).then_some((next_worker, done_key))
        });
        prop_assume!(expected.is_some());
        let (next_worker, done_key) = expected.unwrap();

        let (decision, reason) = route(&registry, "router", &state, turn.as_ref());
        prop_assert_eq!(decision, RoutingDecision::Next(vec![next_worker.to_string()]));
        prop_assert_eq!(reason, RouteReason::Pipeline { completed: done_key });
    }

    #[test]
    fn picked_chart_without_data_goes_to_data_whatever_was_signalled(
        prepared in any::<bool>(),
        turn in arb_turn(),
    ) {
        prop_assume!(turn.is_some());
        let mut state = NetworkState::for_request("chart it");
        state.picked_chart = Some(picked());
        if prepared {
            state.prepared_chart_data = Some(schema());
        }

        let (decision, _) = route(&AgentRegistry::standard(), "router", &state, turn.as_ref());
        prop_assert_eq!(decision, RoutingDecision::Next(vec!["data".to_string()]));
    }

    #[test]
    fn at_most_one_terminal_result(writes in proptest::collection::vec(any::<u8>(), 1..6)) {
        let mut state = NetworkState::default();
        let first = terminal(writes[0]);
        for which in &writes {
            let _ = state.set_terminal(terminal(*which));
        }
        let present = StateKey::TERMINAL.iter().filter(|k| state.has(**k)).count();
        prop_assert_eq!(present, 1);
        prop_assert_eq!(state.terminal(), Some(&first));
    }

    #[test]
    fn chart_generation_is_idempotent(
        title in "[A-Za-z ]{1,20}",
        points in proptest::collection::vec(0i64..1000, 0..6),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let services = Services::offline();
        let tools = ToolSet::new().with(GenerateChartTool);
        let data: Vec<_> = points.iter().enumerate().map(|(i, v)| json!({"x": i, "y": v})).collect();
        let call = ToolCall {
            id: "tu".to_string(),
            name: "generate_chart".to_string(),
            input: json!({"type": "bar", "title": title, "data": data, "xKey": "x", "yKey": "y"}),
        };

        let mut state = NetworkState::default();
        rt.block_on(tools.dispatch(call.clone(), &mut context(&mut state, &services)));
        let once = state.clone();
        let again = rt.block_on(tools.dispatch(call, &mut context(&mut state, &services)));

        prop_assert!(again.succeeded());
        prop_assert_eq!(state, once);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn run_stops_exactly_at_the_bound(max_iterations in 1usize..8) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
        let registry = AgentRegistry::new().with(Agent::new(
            "looper",
            "routes to itself",
            "loop",
            ToolSet::new().with(RouteToAgentTool::new(["looper"])),
        ));
        let llm = Arc::new(MockLlmClient::new());
        for _ in 0..max_iterations + 2 {
            llm.queue_response(tool_response(&[(
                "route_to_agent",
                json!({"agent": "looper", "reasoning": "again"}),
            )]));
        }
        let config = NetworkConfig {
            max_iterations,
            entry_agent: "looper".to_string(),
            retry_base_delay: Duration::from_millis(1),
            ..NetworkConfig::default()
        };
        let runner = NetworkRunner::new(llm, Arc::new(registry), Services::offline(), config);

        let result = rt
            .block_on(runner.run(&RunRequest::from_text("spin").unwrap(), &CancellationToken::new()))
            .unwrap();

        prop_assert_eq!(result.status, RunStatus::IterationLimit);
        prop_assert_eq!(result.turns.len(), max_iterations);
    }
}
