//! Adapter from rig's `CompletionModel` to [`LlmProvider`].
//!
//! rig owns the wire format for OpenAI and Anthropic. It reports HTTP
//! failures as text, so the status is recovered from the vendor's error
//! body before it is mapped onto [`LlmError`].

use std::time::Duration;

use async_trait::async_trait;
use rig::completion::{CompletionError, CompletionModel};
use rig::message::AssistantContent;

use crate::error::LlmError;
use crate::llm::provider::{LlmProvider, non_empty};
use crate::pipeline::types::SummaryRequest;

/// Summaries should be factual, not creative.
const TEMPERATURE: f64 = 0.2;
const MAX_TOKENS: u64 = 1024;

/// Longest vendor error text echoed into a failure reason.
const MAX_REASON_CHARS: usize = 300;

const AUTH_MARKERS: &[&str] = &[
    "authentication_error",
    "permission_error",
    "invalid_api_key",
    "invalid x-api-key",
    "incorrect api key",
    "unauthorized",
];
const RATE_LIMIT_MARKERS: &[&str] = &["rate_limit", "rate limit", "too many requests"];
const MODEL_MARKERS: &[&str] = &["model_not_found", "not_found_error"];

/// Wraps any rig completion model as a summary provider.
pub struct RigAdapter<M> {
    provider: &'static str,
    model: M,
    model_name: String,
    timeout: Duration,
}

impl<M: CompletionModel> RigAdapter<M> {
    pub fn new(provider: &'static str, model: M, model_name: &str, timeout: Duration) -> Self {
        Self {
            provider,
            model,
            model_name: model_name.to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl<M> LlmProvider for RigAdapter<M>
where
    M: CompletionModel + 'static,
{
    fn name(&self) -> &str {
        self.provider
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn invoke(
        &self,
        system_prompt: &str,
        request: &SummaryRequest,
    ) -> Result<String, LlmError> {
        let attempt = self
            .model
            .completion_request(request.user_prompt())
            .preamble(system_prompt.to_string())
            .temperature(TEMPERATURE)
            .max_tokens(MAX_TOKENS)
            .send();

        let response = tokio::time::timeout(self.timeout, attempt)
            .await
            .map_err(|_| LlmError::RequestFailed {
                provider: self.provider.to_string(),
                reason: format!("timed out after {}s", self.timeout.as_secs()),
            })?
            .map_err(|e| completion_error(self.provider, &self.model_name, e))?;

        let text = response
            .choice
            .into_iter()
            .filter_map(|content| match content {
                AssistantContent::Text(text) => Some(text.text),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("");

        non_empty(self.provider, text)
    }
}

fn completion_error(provider: &str, model: &str, err: CompletionError) -> LlmError {
    let reason = err.to_string();
    let lower = reason.to_ascii_lowercase();
    let contains_any = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));
    let provider = provider.to_string();

    if contains_any(AUTH_MARKERS) {
        LlmError::AuthFailed { provider }
    } else if contains_any(RATE_LIMIT_MARKERS) {
        LlmError::RateLimited {
            provider,
            retry_after: None,
        }
    } else if contains_any(MODEL_MARKERS) {
        LlmError::ModelNotAvailable {
            provider,
            model: model.to_string(),
        }
    } else if matches!(
        err,
        CompletionError::JsonError(_) | CompletionError::ResponseError(_)
    ) {
        LlmError::InvalidResponse {
            provider,
            reason: crate::mime::truncate_chars(&reason, MAX_REASON_CHARS).to_string(),
        }
    } else {
        LlmError::RequestFailed {
            provider,
            reason: crate::mime::truncate_chars(&reason, MAX_REASON_CHARS).to_string(),
        }
    }
}
