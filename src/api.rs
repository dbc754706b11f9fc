//! HTTP API
//!
//! `POST /api/chat` runs the network on a conversation; `GET /api/agents`
//! lists the registered workers.

mod handlers;
mod types;

pub use handlers::create_router;

use crate::network::{LlmClient, NetworkRunner};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<NetworkRunner<Arc<dyn LlmClient>>>,
    /// Cancelled on shutdown; every run gets a child token
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(runner: NetworkRunner<Arc<dyn LlmClient>>, shutdown: CancellationToken) -> Self {
        Self {
            runner: Arc::new(runner),
            shutdown,
        }
    }
}
