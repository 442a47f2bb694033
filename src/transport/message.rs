//! The inbound message as handed over by the MTA.

use std::borrow::Cow;

use mail_parser::MessageParser;

use crate::pipeline::types::NO_SUBJECT;

/// A raw RFC-5322 message plus transport metadata.
///
/// The bytes are never modified; forwarding relays them as received.
#[derive(Debug, Clone)]
pub struct RawMessage {
    bytes: Vec<u8>,
    /// Envelope sender (MAIL FROM), or the `From:` address when the
    /// transport did not supply one.
    pub envelope_from: String,
    /// Decoded `Subject` header, if the message has one.
    pub subject: Option<String>,
}

impl RawMessage {
    pub fn new(bytes: Vec<u8>, envelope_from: impl Into<String>, subject: Option<String>) -> Self {
        Self {
            bytes,
            envelope_from: envelope_from.into(),
            subject,
        }
    }

    /// Pre-parse the subject and, when `envelope_from` is absent, the sender.
    ///
    /// Parsing is best effort: an unparseable message still yields a
    /// `RawMessage` with sender `unknown` and no subject.
    pub fn from_bytes(bytes: Vec<u8>, envelope_from: Option<String>) -> Self {
        let (subject, sender) = {
            let parsed = MessageParser::default().parse(bytes.as_slice());

            let subject = parsed
                .as_ref()
                .and_then(|m| m.subject())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty());

            let sender = envelope_from
                .filter(|s| !s.trim().is_empty())
                .or_else(|| {
                    parsed
                        .as_ref()
                        .and_then(|m| m.from())
                        .and_then(|addr| addr.first())
                        .and_then(|a| a.address())
                        .map(|s| s.to_string())
                })
                .unwrap_or_else(|| "unknown".into());

            (subject, sender)
        };

        Self {
            bytes,
            envelope_from: sender,
            subject,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The message as text; invalid UTF-8 is replaced, not rejected.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    pub fn subject_or_default(&self) -> &str {
        self.subject.as_deref().unwrap_or(NO_SUBJECT)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
