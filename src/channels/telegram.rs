//! Telegram channel: pushes notifications through the Bot API `sendMessage`.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::channels::NotificationChannel;
use crate::error::ChannelError;
use crate::pipeline::types::NotificationMessage;

/// Maximum message length (in characters) for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Telegram channel bound to a single chat.
pub struct TelegramChannel {
    bot_token: SecretString,
    chat_id: String,
    client: reqwest::Client,
    api_base: String,
}

impl TelegramChannel {
    pub fn new(bot_token: SecretString, chat_id: String, client: reqwest::Client) -> Self {
        Self {
            bot_token,
            chat_id,
            client,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Point at a different Bot API host (local Bot API server, tests).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    /// The token is part of the path, so this URL must never reach a log.
    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.api_base,
            self.bot_token.expose_secret()
        )
    }

    /// Send a single chunk (≤4096 chars) as plain text.
    async fn send_message_chunk(&self, text: &str) -> Result<(), ChannelError> {
        let body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
        });

        let resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.without_url().to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ChannelError::Rejected {
                name: "telegram".into(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, message: &NotificationMessage) -> Result<(), ChannelError> {
        let chunks = split_message(&message.render(), TELEGRAM_MAX_MESSAGE_LENGTH);
        for chunk in &chunks {
            self.send_message_chunk(chunk).await?;
        }
        tracing::info!(chunks = chunks.len(), "Telegram notification delivered");
        Ok(())
    }
}

/// Split text into chunks of at most `max_chars` characters, preferring a
/// newline, then a space, as the break point.
fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        // Byte offset of the first char past the limit; None means it all fits.
        let Some(limit) = remaining.char_indices().nth(max_chars).map(|(i, _)| i) else {
            chunks.push(remaining.to_string());
            break;
        };

        let window = &remaining[..limit];
        let split_at = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .filter(|&i| i > 0)
            .unwrap_or(limit);

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    if chunks.is_empty() {
        chunks.push(String::new());
    }
    chunks
}
