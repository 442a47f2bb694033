//! Provider trait shared by every summarization backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::LlmError;
use crate::pipeline::types::SummaryRequest;

/// A summarization backend.
///
/// Implementations translate the shared system prompt and request into
/// their own wire format and return the model's text. Transport, auth,
/// and format problems must come back as `Err`, never as an empty string.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Backend id, e.g. `"workers_ai"`.
    fn name(&self) -> &str;

    /// Model identifier sent to the backend.
    fn model_name(&self) -> &str;

    /// `name/model`, used to tag results and failures.
    fn id(&self) -> String {
        format!("{}/{}", self.name(), self.model_name())
    }

    async fn invoke(
        &self,
        system_prompt: &str,
        request: &SummaryRequest,
    ) -> Result<String, LlmError>;
}

/// Placeholder for a backend whose credential is missing.
///
/// Keeps the chain in its configured order; the gap shows up as a
/// `NotConfigured` failure when this backend's turn comes.
pub struct Unconfigured {
    provider: &'static str,
    model: String,
    key: &'static str,
}

impl Unconfigured {
    pub fn new(provider: &'static str, model: impl Into<String>, key: &'static str) -> Self {
        Self {
            provider,
            model: model.into(),
            key,
        }
    }
}

#[async_trait]
impl LlmProvider for Unconfigured {
    fn name(&self) -> &str {
        self.provider
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn invoke(
        &self,
        _system_prompt: &str,
        _request: &SummaryRequest,
    ) -> Result<String, LlmError> {
        Err(LlmError::NotConfigured {
            provider: self.provider.to_string(),
            key: self.key.to_string(),
        })
    }
}

/// Role-tagged chat message, the shape OpenAI-style APIs accept.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

/// System + user messages for a request.
pub fn chat_messages(system_prompt: &str, request: &SummaryRequest) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user(request.user_prompt()),
    ]
}

/// Longest error body we echo back into a failure reason.
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Send a request and decode a JSON success body, mapping HTTP failures to
/// [`LlmError`] variants.
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: &str,
    model: &str,
    request: reqwest::RequestBuilder,
) -> Result<T, LlmError> {
    let response = request.send().await.map_err(|e| LlmError::RequestFailed {
        provider: provider.to_string(),
        reason: e.to_string(),
    })?;

    let status = response.status();
    if !status.is_success() {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response.text().await.unwrap_or_default();
        return Err(status_error(provider, model, status, retry_after, &body));
    }

    response.json::<T>().await.map_err(|e| LlmError::InvalidResponse {
        provider: provider.to_string(),
        reason: e.to_string(),
    })
}

fn status_error(
    provider: &str,
    model: &str,
    status: StatusCode,
    retry_after: Option<Duration>,
    body: &str,
) -> LlmError {
    let provider = provider.to_string();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::AuthFailed { provider },
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited {
            provider,
            retry_after,
        },
        StatusCode::NOT_FOUND => LlmError::ModelNotAvailable {
            provider,
            model: model.to_string(),
        },
        _ => LlmError::RequestFailed {
            provider,
            reason: format!(
                "HTTP {status}: {}",
                crate::mime::truncate_chars(body.trim(), MAX_ERROR_BODY_CHARS)
            ),
        },
    }
}

/// Reject blank completions.
pub(crate) fn non_empty(provider: &str, text: String) -> Result<String, LlmError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(LlmError::EmptyResponse {
            provider: provider.to_string(),
        });
    }
    Ok(trimmed.to_string())
}
