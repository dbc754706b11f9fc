//! Completion providers
//!
//! Workers reach the reasoning backend through [`LlmService`]. Only the
//! Anthropic Messages API is implemented; [`ModelRegistry`] holds one
//! service per configured model and resolves worker model hints.

mod anthropic;
mod error;
mod registry;
mod types;

pub use anthropic::{AnthropicModel, AnthropicService, Endpoint};
pub use error::{LlmError, LlmErrorKind};
pub use registry::{LlmConfig, ModelRegistry};
pub use types::*;

use async_trait::async_trait;

#[async_trait]
pub trait LlmService: Send + Sync {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Short id agents use as a model hint
    fn model_id(&self) -> &str;
}
