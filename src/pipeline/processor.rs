//! Message processor: one inbound message, processed exactly once.
//!
//! Flow:
//! 1. Normalize the raw message to plain text (never fails)
//! 2. Summarize through the provider chain (never fails; degrades to an
//!    explanation of what went wrong)
//! 3. Classify the summary to pick an icon
//! 4. Dispatch the notification to every channel in the background
//! 5. Forward the original bytes, if a destination is configured, and wait
//!    for that to finish
//!
//! Only step 5 can fail the invocation.

use std::sync::Arc;

use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::channels::{
    DispatchHandle, NotificationChannel, NotificationDispatcher, TelegramChannel, WeComChannel,
};
use crate::config::AppConfig;
use crate::error::{Error, PipelineError};
use crate::llm::create_chain;
use crate::mime::normalize;
use crate::pipeline::rules::Classifier;
use crate::pipeline::summarizer::SummaryOrchestrator;
use crate::pipeline::types::{
    DEFAULT_MAX_BODY_CHARS, NotificationMessage, SummaryRequest, SummaryResult,
};
use crate::transport::{MailForwarder, RawMessage, SmtpForwarder};

/// What happened to one message.
#[derive(Debug)]
pub struct ProcessOutcome {
    pub summary: SummaryResult,
    pub notification: Arc<NotificationMessage>,
    /// Notification deliveries, possibly still in flight.
    pub deliveries: DispatchHandle,
    /// Destination the message was forwarded to, if any.
    pub forwarded_to: Option<String>,
}

pub struct MessageProcessor {
    summarizer: SummaryOrchestrator,
    classifier: Classifier,
    dispatcher: NotificationDispatcher,
    forwarder: Option<Arc<dyn MailForwarder>>,
    forward_to: Option<String>,
    max_body_chars: usize,
}

impl MessageProcessor {
    pub fn new(
        summarizer: SummaryOrchestrator,
        classifier: Classifier,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        Self {
            summarizer,
            classifier,
            dispatcher,
            forwarder: None,
            forward_to: None,
            max_body_chars: DEFAULT_MAX_BODY_CHARS,
        }
    }

    /// Forward every processed message to `destination` through `forwarder`.
    pub fn with_forwarding(
        mut self,
        forwarder: Arc<dyn MailForwarder>,
        destination: impl Into<String>,
    ) -> Self {
        self.forwarder = Some(forwarder);
        self.forward_to = Some(destination.into());
        self
    }

    pub fn with_max_body_chars(mut self, max: usize) -> Self {
        self.max_body_chars = max;
        self
    }

    /// Wire providers, channels, and forwarding from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let client = config.http_client()?;

        let summarizer = SummaryOrchestrator::new(create_chain(&config.providers, &client)?);

        let mut channels: Vec<Arc<dyn NotificationChannel>> = Vec::new();
        if let Some(url) = &config.wecom_webhook_url {
            channels.push(Arc::new(WeComChannel::new(url.as_str(), client.clone())));
        }
        if let Some(tg) = &config.telegram {
            let channel = TelegramChannel::new(
                tg.bot_token.clone(),
                tg.chat_id.clone(),
                client.clone(),
            );
            channels.push(Arc::new(match &tg.api_base {
                Some(base) => channel.with_api_base(base.as_str()),
                None => channel,
            }));
        }

        let processor = Self::new(
            summarizer,
            Classifier::default_rules(),
            NotificationDispatcher::new(channels),
        )
        .with_max_body_chars(config.max_body_chars);

        Ok(match (&config.forward_to, &config.smtp) {
            (Some(destination), Some(smtp)) => processor.with_forwarding(
                Arc::new(SmtpForwarder::new(smtp.clone())),
                destination.as_str(),
            ),
            _ => processor,
        })
    }

    /// Process one message.
    ///
    /// Returns once the summary is dispatched and forwarding (if configured)
    /// has finished. Notification deliveries may still be running; they are
    /// handed back in the outcome, or in the error on a forwarding failure.
    pub async fn process(&self, message: &RawMessage) -> Result<ProcessOutcome, PipelineError> {
        let span = info_span!("message", id = %Uuid::new_v4());
        self.run(message).instrument(span).await
    }

    async fn run(&self, message: &RawMessage) -> Result<ProcessOutcome, PipelineError> {
        let subject = message.subject_or_default();
        info!(
            sender = %message.envelope_from,
            subject = %subject,
            bytes = message.len(),
            "Processing inbound message"
        );

        let text = normalize(&message.text());
        let request = SummaryRequest::new(
            message.envelope_from.as_str(),
            subject,
            &text,
            self.max_body_chars,
        );

        let summary = self.summarizer.summarize(&request).await;
        let summary_text = summary.text();
        let icon = self.classifier.classify(&summary_text).to_string();

        let notification = Arc::new(NotificationMessage::new(
            icon,
            message.envelope_from.as_str(),
            subject,
            summary_text,
        ));
        let deliveries = self.dispatcher.dispatch(Arc::clone(&notification));

        let forwarded_to = match (&self.forwarder, &self.forward_to) {
            (Some(forwarder), Some(destination)) => {
                if let Err(source) = forwarder.forward(message, destination).await {
                    error!(destination = %destination, error = %source, "Forwarding failed");
                    return Err(PipelineError::Forward {
                        destination: destination.clone(),
                        source,
                        deliveries,
                    });
                }
                Some(destination.clone())
            }
            _ => {
                warn!("No forwarding destination configured; message not forwarded");
                None
            }
        };

        info!(
            outcome = summary.label(),
            icon = %notification.icon,
            channels = deliveries.len(),
            "Message processed"
        );

        Ok(ProcessOutcome {
            summary,
            notification,
            deliveries,
            forwarded_to,
        })
    }
}
