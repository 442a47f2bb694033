//! Inbound message representation and mailbox forwarding.

pub mod message;
pub mod smtp;

pub use message::RawMessage;
pub use smtp::{SmtpConfig, SmtpForwarder, SmtpSecurity};

use async_trait::async_trait;

use crate::error::ForwardError;

/// Relays a message, unchanged, to another mailbox.
#[async_trait]
pub trait MailForwarder: Send + Sync {
    async fn forward(&self, message: &RawMessage, destination: &str) -> Result<(), ForwardError>;
}
