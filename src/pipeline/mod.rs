//! Message processing pipeline.
//!
//! Every inbound message flows through:
//! 1. `mime::normalize()`: raw message to plain text
//! 2. `SummaryOrchestrator::summarize()`: ordered provider chain
//! 3. `Classifier::classify()`: keyword rules pick an icon (no LLM)
//! 4. `NotificationDispatcher::dispatch()`: background fan-out
//! 5. `MailForwarder::forward()`: awaited, the only step that can fail

pub mod processor;
pub mod rules;
pub mod summarizer;
pub mod types;

pub use processor::{MessageProcessor, ProcessOutcome};
pub use rules::{ClassifyRule, Classifier};
pub use summarizer::SummaryOrchestrator;
pub use types::{NotificationMessage, ProviderFailure, SummaryRequest, SummaryResult};
