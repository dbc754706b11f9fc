//! Routing decisions
//!
//! [`route`] is a pure function of the registry, the state and the last turn.
//! Checks run in priority order: entry worker, terminal result, chart
//! pipeline stages, explicit routing, worker completion.

use super::turn::Turn;
use crate::agents::{self, AgentRegistry};
use crate::state::{NetworkState, StateKey};
use crate::tools::ControlSignal;
use std::fmt;

/// Stages of the chart pipeline with the key each one produces
pub const CHART_PIPELINE: [(&str, StateKey); 4] = [
    (agents::CHART_PICKER, StateKey::PickedChart),
    (agents::DATA, StateKey::DataResult),
    (agents::DATA_CLEANER, StateKey::PreparedChartData),
    (agents::CHART, StateKey::ChartResult),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingDecision {
    /// Workers to run next; always exactly one
    Next(Vec<String>),
    Terminate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteReason {
    /// First turn of the run
    Entry,
    TerminalResult { key: StateKey },
    /// `completed` names the key of the finished stage
    Pipeline { completed: StateKey },
    Explicit,
    UnknownWorker { name: String },
    WorkerDone,
    NoSignal,
}

impl fmt::Display for RouteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteReason::Entry => f.write_str("entry"),
            RouteReason::TerminalResult { key } => write!(f, "terminal result {key}"),
            RouteReason::Pipeline { completed } => write!(f, "pipeline after {completed}"),
            RouteReason::Explicit => f.write_str("explicit route"),
            RouteReason::UnknownWorker { name } => write!(f, "unknown worker '{name}'"),
            RouteReason::WorkerDone => f.write_str("worker done"),
            RouteReason::NoSignal => f.write_str("no signal"),
        }
    }
}

fn next(name: &str, reason: RouteReason) -> (RoutingDecision, RouteReason) {
    (RoutingDecision::Next(vec![name.to_string()]), reason)
}

/// Decide what happens after `last_turn` (or at the start when `None`)
pub fn route(
    registry: &AgentRegistry,
    entry: &str,
    state: &NetworkState,
    last_turn: Option<&Turn>,
) -> (RoutingDecision, RouteReason) {
    let Some(last_turn) = last_turn else {
        return if registry.contains(entry) {
            next(entry, RouteReason::Entry)
        } else {
            (
                RoutingDecision::Terminate,
                RouteReason::UnknownWorker {
                    name: entry.to_string(),
                },
            )
        };
    };

    if let Some(key) = StateKey::TERMINAL.into_iter().find(|k| state.has(*k)) {
        return (RoutingDecision::Terminate, RouteReason::TerminalResult { key });
    }

    for pair in CHART_PIPELINE.windows(2) {
        let (_, done_key) = pair[0];
        let (next_worker, next_key) = pair[1];
        if state.has(done_key) && !state.has(next_key) && registry.contains(next_worker) {
            return next(next_worker, RouteReason::Pipeline { completed: done_key });
        }
    }

    let signals: Vec<&ControlSignal> = last_turn
        .successful()
        .filter_map(|inv| inv.signal.as_ref())
        .collect();

    let explicit = signals.iter().find_map(|s| match s {
        ControlSignal::RouteTo { agent } => Some(agent.as_str()),
        ControlSignal::Done { .. } => None,
    });
    if let Some(target) = explicit {
        return if registry.contains(target) {
            next(target, RouteReason::Explicit)
        } else {
            (
                RoutingDecision::Terminate,
                RouteReason::UnknownWorker {
                    name: target.to_string(),
                },
            )
        };
    }

    if signals.iter().any(|s| matches!(s, ControlSignal::Done { .. })) {
        return (RoutingDecision::Terminate, RouteReason::WorkerDone);
    }

    (RoutingDecision::Terminate, RouteReason::NoSignal)
}
