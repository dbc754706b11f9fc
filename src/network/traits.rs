//! Decision provider abstraction
//!
//! The run loop talks to the reasoning backend through [`LlmClient`] so tests
//! can drive it with scripted responses.

use crate::llm::{LlmError, LlmRequest, LlmResponse, ModelRegistry};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// Client for completion requests
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;
}

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for Arc<T> {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        (**self).complete(request).await
    }
}

// ============================================================================
// Production Adapter
// ============================================================================

/// Resolves each request's model hint against the registry and logs the
/// completion
pub struct RegistryLlmClient {
    registry: Arc<ModelRegistry>,
}

impl RegistryLlmClient {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl LlmClient for RegistryLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let service = self.registry.resolve(request.model.as_deref())?;
        let started = Instant::now();
        let result = service.complete(request).await;
        let elapsed_ms = started.elapsed().as_millis();

        match &result {
            Ok(response) => tracing::info!(
                model = service.model_id(),
                duration_ms = %elapsed_ms,
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                cache_read_tokens = response.usage.cache_read_tokens,
                stop_reason = ?response.stop_reason,
                tool_calls = response.tool_uses().count(),
                "Completion finished"
            ),
            Err(e) => tracing::warn!(
                model = service.model_id(),
                duration_ms = %elapsed_ms,
                kind = ?e.kind,
                error = %e,
                "Completion failed"
            ),
        }
        result
    }
}
