//! Environment-driven configuration
//!
//! Every setting has a default, so an empty environment yields a working
//! (offline) configuration. Unparseable values fall back to the default with
//! a warning rather than aborting startup.

use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MAX_ITERATIONS: usize = 10;
pub const DEFAULT_TURN_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_LLM_RETRIES: u32 = 2;
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_ENTRY_AGENT: &str = "router";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_BEM_BASE_URL: &str = "https://api.bem.ai/v1-beta";
pub const DEFAULT_PORT: u16 = 8000;

/// Parse `key` from `lookup`, falling back to `default` when absent or invalid
fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Ignoring unparseable setting");
            default
        }),
        None => default,
    }
}

/// Non-empty string setting
fn text(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

// ============================================================================
// Run loop
// ============================================================================

/// Limits and defaults for one network run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Upper bound on worker turns per run
    pub max_iterations: usize,
    pub turn_timeout: Duration,
    /// Retries after the first failed completion, for retryable errors only
    pub llm_max_retries: u32,
    pub retry_base_delay: Duration,
    /// Worker that takes the first turn
    pub entry_agent: String,
    pub max_tokens: u32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            turn_timeout: DEFAULT_TURN_TIMEOUT,
            llm_max_retries: DEFAULT_LLM_RETRIES,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            entry_agent: DEFAULT_ENTRY_AGENT.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl NetworkConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let max_iterations = parsed(&lookup, "AGENT_NETWORK_MAX_ITERATIONS", DEFAULT_MAX_ITERATIONS).max(1);
        let timeout_secs = parsed(
            &lookup,
            "AGENT_NETWORK_TURN_TIMEOUT_SECS",
            DEFAULT_TURN_TIMEOUT.as_secs(),
        );
        Self {
            max_iterations,
            turn_timeout: Duration::from_secs(timeout_secs.max(1)),
            llm_max_retries: parsed(&lookup, "AGENT_NETWORK_LLM_RETRIES", DEFAULT_LLM_RETRIES),
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            entry_agent: text(&lookup, "AGENT_NETWORK_ENTRY_AGENT")
                .unwrap_or_else(|| DEFAULT_ENTRY_AGENT.to_string()),
            max_tokens: parsed(&lookup, "AGENT_NETWORK_MAX_TOKENS", DEFAULT_MAX_TOKENS),
        }
    }

    /// Delay before retry number `attempt` (0-based): base, 2x base, 4x base...
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        self.retry_base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

// ============================================================================
// External collaborators
// ============================================================================

/// Credentials for the external collaborators. Missing ones fall back to
/// local or unconfigured implementations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicesConfig {
    pub bem_api_key: Option<String>,
    pub bem_base_url: String,
    pub gmail_access_token: Option<String>,
    pub slack_bot_token: Option<String>,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            bem_api_key: None,
            bem_base_url: DEFAULT_BEM_BASE_URL.to_string(),
            gmail_access_token: None,
            slack_bot_token: None,
        }
    }
}

impl ServicesConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            bem_api_key: text(&lookup, "BEM_API_KEY"),
            bem_base_url: text(&lookup, "BEM_BASE_URL")
                .map_or_else(|| DEFAULT_BEM_BASE_URL.to_string(), |u| u.trim_end_matches('/').to_string()),
            gmail_access_token: text(&lookup, "GMAIL_ACCESS_TOKEN"),
            slack_bot_token: text(&lookup, "SLACK_BOT_TOKEN"),
        }
    }
}

// ============================================================================
// HTTP server
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            port: parsed(&lookup, "AGENT_NETWORK_PORT", DEFAULT_PORT),
        }
    }
}
