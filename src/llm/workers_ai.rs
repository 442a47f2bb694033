//! Cloudflare Workers AI over its REST endpoint.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::llm::provider::{ChatMessage, LlmProvider, chat_messages, non_empty, send_json};
use crate::pipeline::types::SummaryRequest;

pub const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com/client/v4";
pub const DEFAULT_MODEL: &str = "@cf/mistral/mistral-7b-instruct-v0.2";

const PROVIDER: &str = "workers_ai";

#[derive(Serialize)]
struct RunRequest<'a> {
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct RunEnvelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    result: Option<RunResult>,
    #[serde(default)]
    errors: Vec<ApiMessage>,
}

#[derive(Deserialize)]
struct RunResult {
    #[serde(default)]
    response: Option<String>,
}

#[derive(Deserialize)]
struct ApiMessage {
    #[serde(default)]
    message: String,
}

/// `POST {base}/accounts/{account}/ai/run/{model}`.
pub struct WorkersAiProvider {
    client: reqwest::Client,
    account_id: Option<String>,
    api_token: Option<SecretString>,
    model: String,
    base_url: String,
}

impl WorkersAiProvider {
    pub fn new(
        client: reqwest::Client,
        account_id: Option<String>,
        api_token: Option<SecretString>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            account_id,
            api_token,
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn run_url(&self, account_id: &str) -> String {
        format!(
            "{}/accounts/{account_id}/ai/run/{}",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl LlmProvider for WorkersAiProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn invoke(
        &self,
        system_prompt: &str,
        request: &SummaryRequest,
    ) -> Result<String, LlmError> {
        let account_id = self
            .account_id
            .as_deref()
            .ok_or_else(|| LlmError::NotConfigured {
                provider: PROVIDER.into(),
                key: "CF_ACCOUNT_ID".into(),
            })?;
        let token = self.api_token.as_ref().ok_or_else(|| LlmError::NotConfigured {
            provider: PROVIDER.into(),
            key: "CF_API_TOKEN".into(),
        })?;

        let messages = chat_messages(system_prompt, request);
        let http = self
            .client
            .post(self.run_url(account_id))
            .bearer_auth(token.expose_secret())
            .json(&RunRequest {
                messages: &messages,
            });

        let envelope: RunEnvelope = send_json(PROVIDER, &self.model, http).await?;

        if envelope.success == Some(false) {
            let reason = envelope
                .errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(LlmError::RequestFailed {
                provider: PROVIDER.into(),
                reason: if reason.is_empty() {
                    "success=false".into()
                } else {
                    reason
                },
            });
        }

        let text = envelope
            .result
            .and_then(|r| r.response)
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: PROVIDER.into(),
                reason: "missing result.response".into(),
            })?;

        non_empty(PROVIDER, text)
    }
}
