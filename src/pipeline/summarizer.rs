//! Ordered, first-success-wins summarization over a provider chain.
//!
//! Providers are tried strictly in order, each attempt fully awaited before
//! the next. A provider that errors is recorded and skipped; once one
//! succeeds, no later provider runs. If all fail, the collected reasons
//! become the summary text instead of an error.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::llm::LlmProvider;
use crate::pipeline::types::{ProviderFailure, SummaryRequest, SummaryResult};

/// Audit-and-summarize instruction shared by every provider.
pub const SYSTEM_PROMPT: &str = "你是邮件安全审计专家。请用【简体中文】执行：
1. 内容摘要：是谁发的？什么事？
2. ⚡️抓取关键数据：列出【验证码】、【OTP】、【金额】、【截止日期】。
只输出纯文本，不要使用 Markdown 表格或代码块，不要复述原文，全文不超过 300 字。";

pub struct SummaryOrchestrator {
    providers: Vec<Arc<dyn LlmProvider>>,
    system_prompt: String,
}

impl SummaryOrchestrator {
    pub fn new(providers: Vec<Arc<dyn LlmProvider>>) -> Self {
        Self {
            providers,
            system_prompt: SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn providers(&self) -> &[Arc<dyn LlmProvider>] {
        &self.providers
    }

    /// Run the chain for one request.
    pub async fn summarize(&self, request: &SummaryRequest) -> SummaryResult {
        let mut failures = Vec::new();

        for provider in &self.providers {
            let id = provider.id();
            debug!(provider = %id, "Requesting summary");

            match provider.invoke(&self.system_prompt, request).await {
                Ok(text) if !text.trim().is_empty() => {
                    info!(provider = %id, chars = text.chars().count(), "Summary produced");
                    return SummaryResult::Summarized { text, provider: id };
                }
                Ok(_) => {
                    warn!(provider = %id, "Provider returned an empty summary");
                    failures.push(ProviderFailure {
                        provider: id,
                        reason: "empty response".into(),
                    });
                }
                Err(e) => {
                    warn!(provider = %id, error = %e, "Provider failed, trying next");
                    failures.push(ProviderFailure {
                        provider: id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        warn!(attempts = failures.len(), "Every summary provider failed");
        SummaryResult::Exhausted { failures }
    }
}
