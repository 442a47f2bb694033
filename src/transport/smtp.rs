//! Forwarding through an SMTP relay.
//!
//! The original bytes go out as-is via `send_raw`; only the envelope is
//! rewritten. lettre's `SmtpTransport` is blocking, so each send runs on
//! the blocking pool.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use lettre::address::{Address, Envelope};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{SmtpTransport, Transport};
use secrecy::{ExposeSecret, SecretString};

use crate::error::{ConfigError, ForwardError};
use crate::transport::{MailForwarder, RawMessage};

pub const DEFAULT_PORT: u16 = 587;

/// How the connection to the relay is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmtpSecurity {
    /// Plain connect, then upgrade with STARTTLS (port 587).
    #[default]
    StartTls,
    /// TLS from the first byte (port 465).
    Tls,
}

impl FromStr for SmtpSecurity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "starttls" => Ok(SmtpSecurity::StartTls),
            "tls" | "ssl" | "smtps" => Ok(SmtpSecurity::Tls),
            other => Err(ConfigError::InvalidValue {
                key: "FORWARD_SMTP_SECURITY".into(),
                message: format!("unknown mode {other:?} (expected starttls or tls)"),
            }),
        }
    }
}

impl fmt::Display for SmtpSecurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SmtpSecurity::StartTls => f.write_str("starttls"),
            SmtpSecurity::Tls => f.write_str("tls"),
        }
    }
}

/// SMTP relay settings.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub security: SmtpSecurity,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    /// MAIL FROM override; `None` keeps the original envelope sender.
    pub envelope_from: Option<String>,
    pub timeout: Duration,
}

impl SmtpConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            security: SmtpSecurity::default(),
            username: None,
            password: None,
            envelope_from: None,
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct SmtpForwarder {
    config: SmtpConfig,
}

impl SmtpForwarder {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn envelope(&self, message: &RawMessage, destination: &str) -> Result<Envelope, ForwardError> {
        let from = self
            .config
            .envelope_from
            .as_deref()
            .unwrap_or(&message.envelope_from);
        build_envelope(from, destination)
    }

    fn transport(&self) -> Result<SmtpTransport, ForwardError> {
        let cfg = &self.config;
        let builder = match cfg.security {
            SmtpSecurity::StartTls => SmtpTransport::starttls_relay(&cfg.host),
            SmtpSecurity::Tls => SmtpTransport::relay(&cfg.host),
        }
        .map_err(|e| ForwardError::Smtp(format!("relay {}: {e}", cfg.host)))?
        .port(cfg.port)
        .timeout(Some(cfg.timeout));

        let builder = match (&cfg.username, &cfg.password) {
            (Some(user), Some(pass)) => builder.credentials(Credentials::new(
                user.clone(),
                pass.expose_secret().to_string(),
            )),
            _ => builder,
        };

        Ok(builder.build())
    }
}

/// Envelope for a forwarded copy. An unparseable or empty sender becomes
/// the null sender (`<>`), as for bounces.
fn build_envelope(from: &str, destination: &str) -> Result<Envelope, ForwardError> {
    let to = Address::from_str(destination.trim()).map_err(|e| ForwardError::InvalidAddress {
        address: destination.to_string(),
        reason: e.to_string(),
    })?;

    let from = match Address::from_str(from.trim()) {
        Ok(addr) => Some(addr),
        Err(e) => {
            tracing::debug!(sender = %from, error = %e, "Sender is not a mailbox; using null sender");
            None
        }
    };

    Envelope::new(from, vec![to]).map_err(|e| ForwardError::InvalidAddress {
        address: destination.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl MailForwarder for SmtpForwarder {
    async fn forward(&self, message: &RawMessage, destination: &str) -> Result<(), ForwardError> {
        let envelope = self.envelope(message, destination)?;
        let transport = self.transport()?;
        let bytes = message.bytes().to_vec();

        tokio::task::spawn_blocking(move || transport.send_raw(&envelope, &bytes))
            .await
            .map_err(|e| ForwardError::Task(e.to_string()))?
            .map_err(|e| ForwardError::Smtp(e.to_string()))?;

        tracing::info!(
            destination = %destination,
            relay = %self.config.host,
            bytes = message.len(),
            "Message forwarded"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(sender: &str) -> RawMessage {
        RawMessage::new(b"Subject: hi\r\n\r\nbody".to_vec(), sender, Some("hi".into()))
    }

    #[test]
    fn security_parses() {
        assert_eq!("STARTTLS".parse::<SmtpSecurity>().unwrap(), SmtpSecurity::StartTls);
        assert_eq!("tls".parse::<SmtpSecurity>().unwrap(), SmtpSecurity::Tls);
        assert_eq!("smtps".parse::<SmtpSecurity>().unwrap(), SmtpSecurity::Tls);
        assert!("plain".parse::<SmtpSecurity>().is_err());
    }

    #[test]
    fn envelope_keeps_original_sender() {
        let fwd = SmtpForwarder::new(SmtpConfig::new("smtp.example.com"));
        let env = fwd.envelope(&message("alice@example.com"), "me@example.org").unwrap();
        assert_eq!(env.from().map(|a| a.to_string()).as_deref(), Some("alice@example.com"));
        assert_eq!(env.to()[0].to_string(), "me@example.org");
    }

    #[test]
    fn envelope_sender_override() {
        let mut cfg = SmtpConfig::new("smtp.example.com");
        cfg.envelope_from = Some("relay@example.org".into());
        let fwd = SmtpForwarder::new(cfg);
        let env = fwd.envelope(&message("alice@example.com"), "me@example.org").unwrap();
        assert_eq!(env.from().map(|a| a.to_string()).as_deref(), Some("relay@example.org"));
    }

    #[test]
    fn unparseable_sender_becomes_null_sender() {
        let env = build_envelope("unknown", "me@example.org").unwrap();
        assert!(env.from().is_none());
    }

    #[test]
    fn invalid_destination_is_rejected() {
        let err = build_envelope("alice@example.com", "not an address").unwrap_err();
        assert!(matches!(err, ForwardError::InvalidAddress { .. }));
    }

    #[tokio::test]
    async fn unreachable_relay_is_smtp_error() {
        let mut cfg = SmtpConfig::new("127.0.0.1");
        cfg.port = 1;
        cfg.timeout = Duration::from_secs(2);
        let fwd = SmtpForwarder::new(cfg);
        let err = fwd
            .forward(&message("alice@example.com"), "me@example.org")
            .await
            .unwrap_err();
        assert!(matches!(err, ForwardError::Smtp(_)));
    }
}
