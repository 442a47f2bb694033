//! Mail Digest: inbound e-mail → AI summary → chat notifications.

pub mod channels;
pub mod config;
pub mod error;
pub mod llm;
pub mod mime;
pub mod pipeline;
pub mod transport;
