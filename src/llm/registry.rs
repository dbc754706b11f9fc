//! Configured models, keyed by short id

use super::{AnthropicModel, AnthropicService, Endpoint, LlmError, LlmService};
use std::collections::BTreeMap;
use std::sync::Arc;

const PREFERRED_DEFAULT: &str = "claude-4.5-sonnet";

#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub anthropic_api_key: Option<String>,
    /// Gateway base URL; takes precedence over the API key
    pub gateway: Option<String>,
    pub default_model: Option<String>,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            anthropic_api_key: var("ANTHROPIC_API_KEY"),
            gateway: var("LLM_GATEWAY"),
            default_model: var("DEFAULT_MODEL"),
        }
    }

    fn endpoint(&self) -> Option<Endpoint> {
        if let Some(base_url) = &self.gateway {
            return Some(Endpoint::Gateway {
                base_url: base_url.clone(),
            });
        }
        self.anthropic_api_key
            .as_ref()
            .filter(|key| !key.is_empty())
            .map(|key| Endpoint::Direct {
                api_key: key.clone(),
            })
    }
}

pub struct ModelRegistry {
    services: BTreeMap<String, Arc<dyn LlmService>>,
    default_model: String,
}

impl ModelRegistry {
    pub fn new(config: &LlmConfig) -> Self {
        let services = config
            .endpoint()
            .map(|endpoint| {
                AnthropicModel::ALL
                    .into_iter()
                    .filter_map(|model| match AnthropicService::new(endpoint.clone(), model) {
                        Ok(service) => Some(Arc::new(service) as Arc<dyn LlmService>),
                        Err(e) => {
                            tracing::warn!(model = model.model_id(), error = %e, "Skipping model");
                            None
                        }
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let default_model = config
            .default_model
            .clone()
            .unwrap_or_else(|| PREFERRED_DEFAULT.to_string());
        Self::with_services(services, default_model)
    }

    /// Registry over explicit services
    pub fn with_services(
        services: impl IntoIterator<Item = Arc<dyn LlmService>>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            services: services
                .into_iter()
                .map(|s| (s.model_id().to_string(), s))
                .collect(),
            default_model: default_model.into(),
        }
    }

    pub fn get(&self, model_id: &str) -> Option<Arc<dyn LlmService>> {
        self.services.get(model_id).cloned()
    }

    /// Service for a worker's model hint, or the default when it has none
    pub fn resolve(&self, hint: Option<&str>) -> Result<Arc<dyn LlmService>, LlmError> {
        if !self.has_models() {
            return Err(LlmError::auth(
                "No completion model configured; set ANTHROPIC_API_KEY or LLM_GATEWAY",
            ));
        }
        let wanted = hint.unwrap_or(&self.default_model);
        self.get(wanted).ok_or_else(|| {
            LlmError::invalid_request(format!(
                "Model '{wanted}' is not available (have: {})",
                self.available_models().join(", ")
            ))
        })
    }

    pub fn default_model_id(&self) -> &str {
        &self.default_model
    }

    /// Model ids in sorted order
    pub fn available_models(&self) -> Vec<String> {
        self.services.keys().cloned().collect()
    }

    pub fn has_models(&self) -> bool {
        !self.services.is_empty()
    }
}
