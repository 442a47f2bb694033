//! Notification channel trait.

use async_trait::async_trait;

use crate::error::ChannelError;
use crate::pipeline::types::NotificationMessage;

/// An outbound notification destination.
///
/// Each adapter owns its endpoint, credentials, and payload shape, and is
/// responsible for its own request timeout.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Short channel id used in logs and delivery reports.
    fn name(&self) -> &str;

    /// Deliver one notification.
    async fn send(&self, message: &NotificationMessage) -> Result<(), ChannelError>;
}
