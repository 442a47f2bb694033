//! Summarization backends.
//!
//! Supports:
//! - **Workers AI**: Cloudflare's hosted models over REST
//! - **OpenAI**: any chat-completions endpoint, via rig-core
//! - **Anthropic**: the Messages API, via rig-core
//!
//! The two rig-backed providers go through [`RigAdapter`], which bridges
//! rig's `CompletionModel` to our [`LlmProvider`] trait. Every backend is
//! tried in configured order by `pipeline::summarizer`.

pub mod provider;
mod rig_adapter;
pub mod workers_ai;

pub use provider::{ChatMessage, LlmProvider, Unconfigured};
pub use rig_adapter::RigAdapter;
pub use workers_ai::WorkersAiProvider;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use rig::client::CompletionClient;
use secrecy::{ExposeSecret, SecretString};

use crate::error::{ConfigError, LlmError};

/// Supported summarization backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    WorkersAi,
    OpenAi,
    Anthropic,
}

/// Default OpenAI model.
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";
/// Default Anthropic model.
pub const ANTHROPIC_DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";

/// Timeout applied to a provider call when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

impl LlmBackend {
    /// Chain order used when none is configured.
    pub const DEFAULT_ORDER: [LlmBackend; 3] =
        [LlmBackend::WorkersAi, LlmBackend::OpenAi, LlmBackend::Anthropic];

    pub fn as_str(&self) -> &'static str {
        match self {
            LlmBackend::WorkersAi => "workers_ai",
            LlmBackend::OpenAi => "openai",
            LlmBackend::Anthropic => "anthropic",
        }
    }
}

impl fmt::Display for LlmBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LlmBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "workers_ai" | "cloudflare" => Ok(LlmBackend::WorkersAi),
            "openai" => Ok(LlmBackend::OpenAi),
            "anthropic" => Ok(LlmBackend::Anthropic),
            other => Err(ConfigError::InvalidValue {
                key: "SUMMARY_PROVIDERS".into(),
                message: format!(
                    "unknown provider {other:?} (expected workers_ai, openai, or anthropic)"
                ),
            }),
        }
    }
}

/// Configuration for one provider in the chain.
///
/// A missing credential does not remove the provider: it stays in the chain
/// and reports `NotConfigured` when its turn comes.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: Option<SecretString>,
    pub model: String,
    /// Override the backend's API root (tests, proxies, compatible vendors).
    pub base_url: Option<String>,
    /// Cloudflare account id (Workers AI only).
    pub account_id: Option<String>,
    /// Upper bound on one call to this provider.
    pub timeout: Duration,
}

impl LlmConfig {
    /// A config with the backend's default model and no credentials.
    pub fn new(backend: LlmBackend) -> Self {
        let model = match backend {
            LlmBackend::WorkersAi => workers_ai::DEFAULT_MODEL,
            LlmBackend::OpenAi => OPENAI_DEFAULT_MODEL,
            LlmBackend::Anthropic => ANTHROPIC_DEFAULT_MODEL,
        };
        Self {
            backend,
            api_key: None,
            model: model.to_string(),
            base_url: None,
            account_id: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Create a provider from configuration.
///
/// `client` carries the Workers AI requests; the rig-backed providers own
/// their HTTP transport. A backend without its credential still gets a slot
/// in the chain and reports `NotConfigured` when tried.
pub fn create_provider(
    config: &LlmConfig,
    client: reqwest::Client,
) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let provider: Arc<dyn LlmProvider> = match (config.backend, &config.api_key) {
        (LlmBackend::WorkersAi, api_key) => {
            let p = WorkersAiProvider::new(
                client,
                config.account_id.clone(),
                api_key.clone(),
                config.model.as_str(),
            );
            Arc::new(match &config.base_url {
                Some(url) => p.with_base_url(url.as_str()),
                None => p,
            })
        }
        (LlmBackend::OpenAi, Some(api_key)) => create_openai_provider(config, api_key)?,
        (LlmBackend::Anthropic, Some(api_key)) => create_anthropic_provider(config, api_key)?,
        (LlmBackend::OpenAi, None) => Arc::new(Unconfigured::new(
            "openai",
            config.model.as_str(),
            "OPENAI_API_KEY",
        )),
        (LlmBackend::Anthropic, None) => Arc::new(Unconfigured::new(
            "anthropic",
            config.model.as_str(),
            "ANTHROPIC_API_KEY",
        )),
    };

    tracing::debug!(
        provider = %config.backend,
        model = %config.model,
        configured = config.api_key.is_some(),
        "Summary provider registered"
    );
    Ok(provider)
}

fn create_anthropic_provider(
    config: &LlmConfig,
    api_key: &SecretString,
) -> Result<Arc<dyn LlmProvider>, LlmError> {
    use rig::providers::anthropic;

    let mut builder = anthropic::Client::builder().api_key(api_key.expose_secret());
    if let Some(url) = &config.base_url {
        builder = builder.base_url(url.as_str());
    }
    let client: rig::client::Client<anthropic::client::AnthropicExt> =
        builder.build().map_err(|e| LlmError::RequestFailed {
            provider: "anthropic".to_string(),
            reason: format!("Failed to create Anthropic client: {}", e),
        })?;

    let model = client.completion_model(&config.model);
    Ok(Arc::new(RigAdapter::new(
        "anthropic",
        model,
        &config.model,
        config.timeout,
    )))
}

fn create_openai_provider(
    config: &LlmConfig,
    api_key: &SecretString,
) -> Result<Arc<dyn LlmProvider>, LlmError> {
    use rig::providers::openai;

    let mut builder = openai::Client::builder().api_key(api_key.expose_secret());
    if let Some(url) = &config.base_url {
        builder = builder.base_url(url.as_str());
    }
    let client: rig::client::Client<openai::client::OpenAIResponsesExt> =
        builder.build().map_err(|e| LlmError::RequestFailed {
            provider: "openai".to_string(),
            reason: format!("Failed to create OpenAI client: {}", e),
        })?;

    // Chat completions rather than the Responses API, so OPENAI_BASE_URL
    // can point at any compatible vendor.
    let model = client.completions_api().completion_model(&config.model);
    Ok(Arc::new(RigAdapter::new(
        "openai",
        model,
        &config.model,
        config.timeout,
    )))
}

/// Create the ordered provider chain.
pub fn create_chain(
    configs: &[LlmConfig],
    client: &reqwest::Client,
) -> Result<Vec<Arc<dyn LlmProvider>>, LlmError> {
    configs
        .iter()
        .map(|config| create_provider(config, client.clone()))
        .collect()
}
