//! Error types for mail-digest.

use std::time::Duration;

use crate::channels::DispatchHandle;

/// Errors building the pipeline at start-up.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// MIME walking / decoding errors.
///
/// Never escapes [`crate::mime::normalize`]; any of these switches the
/// normalizer to its raw-prefix fallback.
#[derive(Debug, thiserror::Error)]
pub enum MimeError {
    #[error("No blank line separates headers from body")]
    MissingSeparator,

    #[error("Declared boundary {boundary:?} never appears in the body")]
    BoundaryNotFound { boundary: String },

    #[error("Multipart nesting deeper than {max} levels")]
    TooDeep { max: usize },
}

/// Summarization provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} is not configured (missing {key})")]
    NotConfigured { provider: String, key: String },

    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Provider {provider} returned an empty summary")]
    EmptyResponse { provider: String },

    #[error("Model {model} not available on provider {provider}")]
    ModelNotAvailable { provider: String, model: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },
}

/// Notification channel errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to send on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Channel {name} rejected the payload ({status}): {body}")]
    Rejected {
        name: String,
        status: u16,
        body: String,
    },

    #[error("Channel {name} delivery task aborted: {reason}")]
    TaskFailed { name: String, reason: String },
}

/// Mailbox forwarding errors.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("Invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("SMTP relay error: {0}")]
    Smtp(String),

    #[error("Forward task failed: {0}")]
    Task(String),
}

/// Errors surfaced by [`crate::pipeline::MessageProcessor::process`].
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Forwarding is the one step without a fallback. Notifications were
    /// already spawned and are handed back so the caller can still drain them.
    #[error("Forwarding to {destination} failed: {source}")]
    Forward {
        destination: String,
        #[source]
        source: ForwardError,
        deliveries: DispatchHandle,
    },
}

impl PipelineError {
    /// Take the in-flight notification deliveries out of the error.
    pub fn into_deliveries(self) -> DispatchHandle {
        match self {
            PipelineError::Forward { deliveries, .. } => deliveries,
        }
    }
}
