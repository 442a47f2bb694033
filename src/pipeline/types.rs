//! Shared types for the message processing pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::mime::truncate_chars;

/// Default cap on the body characters sent to a summarization provider.
pub const DEFAULT_MAX_BODY_CHARS: usize = 4000;

/// Subject shown when the message has none.
pub const NO_SUBJECT: &str = "无主题";

// ── Summary request ─────────────────────────────────────────────────

/// Input shared unchanged by every provider in the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRequest {
    /// Envelope sender, as displayed.
    pub sender: String,
    /// Subject line (or [`NO_SUBJECT`]).
    pub subject: String,
    /// Normalized body, already truncated.
    pub body: String,
}

impl SummaryRequest {
    /// Build a request, truncating `body` to `max_body_chars` characters.
    pub fn new(
        sender: impl Into<String>,
        subject: impl Into<String>,
        body: &str,
        max_body_chars: usize,
    ) -> Self {
        Self {
            sender: sender.into(),
            subject: subject.into(),
            body: truncate_chars(body, max_body_chars).to_string(),
        }
    }

    /// The user-turn payload every provider sends.
    pub fn user_prompt(&self) -> String {
        format!(
            "发件人: {}\n主题: {}\n内容:\n{}",
            self.sender, self.subject, self.body
        )
    }
}

// ── Summary result ──────────────────────────────────────────────────

/// One provider attempt that did not produce a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFailure {
    /// Provider id, e.g. `workers_ai/@cf/mistral/mistral-7b-instruct-v0.2`.
    pub provider: String,
    /// Human-readable reason.
    pub reason: String,
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.provider, self.reason)
    }
}

/// Outcome of running the provider chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SummaryResult {
    /// A provider produced a usable summary.
    Summarized { text: String, provider: String },
    /// Every provider failed; one entry per attempt, in chain order.
    Exhausted { failures: Vec<ProviderFailure> },
}

impl SummaryResult {
    /// Text to show the user: the summary, or the failure report.
    pub fn text(&self) -> String {
        match self {
            SummaryResult::Summarized { text, .. } => text.clone(),
            SummaryResult::Exhausted { failures } if failures.is_empty() => {
                "AI 摘要失败: 未配置任何摘要服务".to_string()
            }
            SummaryResult::Exhausted { failures } => {
                let mut text = format!("AI 摘要失败 ({} 个服务均不可用):", failures.len());
                for failure in failures {
                    text.push_str("\n- ");
                    text.push_str(&failure.to_string());
                }
                text
            }
        }
    }

    /// Id of the provider that succeeded.
    pub fn provider(&self) -> Option<&str> {
        match self {
            SummaryResult::Summarized { provider, .. } => Some(provider),
            SummaryResult::Exhausted { .. } => None,
        }
    }

    pub fn is_summarized(&self) -> bool {
        matches!(self, SummaryResult::Summarized { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            SummaryResult::Summarized { .. } => "summarized",
            SummaryResult::Exhausted { .. } => "exhausted",
        }
    }
}

// ── Notification ────────────────────────────────────────────────────

/// Channel-agnostic notification, built once and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub icon: String,
    pub sender: String,
    pub subject: String,
    pub body: String,
}

impl NotificationMessage {
    /// Headline after the icon.
    pub const TITLE: &'static str = "新邮件摘要";

    pub fn new(
        icon: impl Into<String>,
        sender: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            icon: icon.into(),
            sender: sender.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Plain-text rendering used by text-only channels.
    pub fn render(&self) -> String {
        format!(
            "{} {}\n发件人: {}\n主题: {}\n--------------------\n{}",
            self.icon,
            Self::TITLE,
            self.sender,
            self.subject,
            self.body
        )
    }
}
