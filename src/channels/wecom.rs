//! WeCom (企业微信) group-bot webhook.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::channels::NotificationChannel;
use crate::error::ChannelError;
use crate::pipeline::types::NotificationMessage;

const NAME: &str = "wecom";

/// WeCom answers 200 even on errors; the verdict is in `errcode`.
#[derive(Deserialize)]
struct WebhookReply {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

/// Posts `{"msgtype":"text","text":{"content":…}}` to a webhook URL.
pub struct WeComChannel {
    webhook_url: String,
    client: reqwest::Client,
}

impl WeComChannel {
    pub fn new(webhook_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            client,
        }
    }

    fn payload(message: &NotificationMessage) -> serde_json::Value {
        json!({
            "msgtype": "text",
            "text": { "content": message.render() }
        })
    }
}

#[async_trait]
impl NotificationChannel for WeComChannel {
    fn name(&self) -> &str {
        NAME
    }

    async fn send(&self, message: &NotificationMessage) -> Result<(), ChannelError> {
        let resp = self
            .client
            .post(&self.webhook_url)
            .json(&Self::payload(message))
            .send()
            .await
            // The webhook key rides in the query string; keep it out of errors.
            .map_err(|e| ChannelError::SendFailed {
                name: NAME.into(),
                reason: e.without_url().to_string(),
            })?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ChannelError::Rejected {
                name: NAME.into(),
                status: status.as_u16(),
                body,
            });
        }

        // An unparseable 2xx body is treated as delivered.
        if let Ok(reply) = serde_json::from_str::<WebhookReply>(&body)
            && reply.errcode != 0
        {
            return Err(ChannelError::Rejected {
                name: NAME.into(),
                status: status.as_u16(),
                body: format!("errcode {}: {}", reply.errcode, reply.errmsg),
            });
        }

        tracing::info!("WeCom notification delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_shape() {
        let msg = NotificationMessage::new("📧", "a@b.c", "Hi", "summary");
        let payload = WeComChannel::payload(&msg);
        assert_eq!(payload["msgtype"], "text");
        assert_eq!(payload["text"]["content"], msg.render());
    }

    #[test]
    fn wecom_channel_name() {
        let ch = WeComChannel::new("http://localhost/hook", reqwest::Client::new());
        assert_eq!(ch.name(), "wecom");
    }

    #[tokio::test]
    async fn unreachable_webhook_is_send_failed() {
        let ch = WeComChannel::new("http://127.0.0.1:1/hook", reqwest::Client::new());
        let msg = NotificationMessage::new("📧", "a@b.c", "Hi", "summary");
        let err = ch.send(&msg).await.unwrap_err();
        assert!(matches!(err, ChannelError::SendFailed { .. }));
    }

    #[tokio::test]
    async fn send_error_does_not_leak_webhook_key() {
        let ch = WeComChannel::new(
            "http://127.0.0.1:1/cgi-bin/webhook/send?key=SECRET-WEBHOOK-KEY",
            reqwest::Client::new(),
        );
        let msg = NotificationMessage::new("📧", "a@b.c", "Hi", "summary");
        let err = ch.send(&msg).await.unwrap_err();
        assert!(!err.to_string().contains("SECRET-WEBHOOK-KEY"), "{err}");
        assert!(!format!("{err:?}").contains("SECRET-WEBHOOK-KEY"));
    }
}
