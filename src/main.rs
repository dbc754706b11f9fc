//! Agent network - supervisor-routed multi-agent service
//!
//! A router worker dispatches each chat request across specialist workers
//! (chart picking, data, cleaning, charts, UI, email, Slack history) that
//! share one run state, and the HTTP API returns the final artifact.

mod agents;
mod api;
mod config;
mod llm;
mod network;
mod services;
mod state;
mod tools;

use agents::AgentRegistry;
use api::{create_router, AppState};
use config::{NetworkConfig, ServerConfig, ServicesConfig};
use llm::{LlmConfig, ModelRegistry};
use network::{LlmClient, NetworkRunner, RegistryLlmClient};
use services::Services;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "agent_network=info,tower_http=debug";

/// JSON logs, filtered by `RUST_LOG` when set
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let json = tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(false)
        .with_span_list(false);
    tracing_subscriber::registry().with(filter).with(json).init();
}

fn llm_client() -> Arc<dyn LlmClient> {
    let registry = ModelRegistry::new(&LlmConfig::from_env());
    if registry.has_models() {
        tracing::info!(
            models = ?registry.available_models(),
            default = %registry.default_model_id(),
            "Completion models registered"
        );
    } else {
        tracing::warn!("No completion model configured; set ANTHROPIC_API_KEY or LLM_GATEWAY");
    }
    Arc::new(RegistryLlmClient::new(Arc::new(registry)))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let server_config = ServerConfig::from_env();
    let network_config = NetworkConfig::from_env();
    let llm = llm_client();

    let services = Services::from_config(&ServicesConfig::from_env())?;

    let agents = Arc::new(AgentRegistry::standard());
    if !agents.contains(&network_config.entry_agent) {
        tracing::warn!(
            entry = %network_config.entry_agent,
            registered = ?agents.names(),
            "Entry agent is not registered; every run will end immediately"
        );
    }
    tracing::info!(
        agents = ?agents.names(),
        max_iterations = network_config.max_iterations,
        "Agent registry ready"
    );

    let runner = NetworkRunner::new(llm, agents, services, network_config);

    // Cancelled on ctrl-c; in-flight runs see it through child tokens
    let shutdown = CancellationToken::new();
    let state = AppState::new(runner, shutdown.clone());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(compression);

    let addr = SocketAddr::from(([0, 0, 0, 0], server_config.port));
    tracing::info!("Agent network listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutting down");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
