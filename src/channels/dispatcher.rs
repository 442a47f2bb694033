//! Fan-out of one notification to every configured channel.
//!
//! Each channel gets its own spawned task, so a slow or failing endpoint
//! neither delays nor affects the others. `dispatch` returns immediately
//! with a [`DispatchHandle`]; callers that care about outcomes can
//! [`wait`](DispatchHandle::wait) on it, and callers that don't can drop it.
//! Dropping detaches the tasks rather than cancelling them.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{Instrument, info, warn};

use crate::channels::NotificationChannel;
use crate::error::ChannelError;
use crate::pipeline::types::NotificationMessage;

/// Outcome of one channel's delivery.
#[derive(Debug)]
pub struct DeliveryReport {
    pub channel: String,
    pub outcome: Result<(), ChannelError>,
}

impl DeliveryReport {
    pub fn is_delivered(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// In-flight deliveries for one notification.
pub struct DispatchHandle {
    tasks: Vec<(String, JoinHandle<Result<(), ChannelError>>)>,
}

impl DispatchHandle {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|(name, _)| name.as_str())
    }

    /// Wait up to `timeout` (shared across all channels) for the deliveries.
    ///
    /// Channels still running at the deadline are reported as failed and
    /// left to finish on their own.
    pub async fn wait(self, timeout: Duration) -> Vec<DeliveryReport> {
        let deadline = Instant::now() + timeout;
        let mut reports = Vec::with_capacity(self.tasks.len());

        for (channel, mut handle) in self.tasks {
            let outcome = match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(result)) => result,
                Ok(Err(join_err)) => Err(ChannelError::TaskFailed {
                    name: channel.clone(),
                    reason: join_err.to_string(),
                }),
                Err(_) => Err(ChannelError::TaskFailed {
                    name: channel.clone(),
                    reason: format!("still pending after {}s", timeout.as_secs()),
                }),
            };
            reports.push(DeliveryReport { channel, outcome });
        }

        reports
    }
}

impl fmt::Debug for DispatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchHandle")
            .field("channels", &self.channels().collect::<Vec<_>>())
            .finish()
    }
}

/// Pushes notifications to a fixed set of channels.
#[derive(Clone, Default)]
pub struct NotificationDispatcher {
    channels: Vec<Arc<dyn NotificationChannel>>,
}

impl NotificationDispatcher {
    pub fn new(channels: Vec<Arc<dyn NotificationChannel>>) -> Self {
        Self { channels }
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Start one delivery task per channel and return without waiting.
    ///
    /// Must be called from within a tokio runtime.
    pub fn dispatch(&self, message: Arc<NotificationMessage>) -> DispatchHandle {
        if self.channels.is_empty() {
            warn!("No notification channels configured; summary not pushed");
        }

        let tasks = self
            .channels
            .iter()
            .map(|channel| {
                let name = channel.name().to_string();
                let channel = Arc::clone(channel);
                let message = Arc::clone(&message);
                let task_name = name.clone();

                let handle = tokio::spawn(
                    async move {
                        let result = channel.send(&message).await;
                        match &result {
                            Ok(()) => info!(channel = %task_name, "Notification sent"),
                            Err(e) => {
                                warn!(channel = %task_name, error = %e, "Notification failed")
                            }
                        }
                        result
                    }
                    .in_current_span(),
                );
                (name, handle)
            })
            .collect();

        DispatchHandle { tasks }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    struct StubChannel {
        name: &'static str,
        fail: bool,
        delay: Duration,
        sent: AtomicUsize,
    }

    impl StubChannel {
        fn new(name: &'static str, fail: bool) -> Arc<Self> {
            Self::slow(name, fail, Duration::ZERO)
        }

        fn slow(name: &'static str, fail: bool, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                name,
                fail,
                delay,
                sent: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl NotificationChannel for StubChannel {
        fn name(&self) -> &str {
            self.name
        }

        async fn send(&self, _message: &NotificationMessage) -> Result<(), ChannelError> {
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(ChannelError::SendFailed {
                    name: self.name.into(),
                    reason: "stub failure".into(),
                });
            }
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn message() -> Arc<NotificationMessage> {
        Arc::new(NotificationMessage::new("📧", "a@b.c", "Hi", "summary"))
    }

    #[tokio::test]
    async fn failing_channel_does_not_block_others() {
        let bad = StubChannel::new("bad", true);
        let good = StubChannel::new("good", false);
        let channels: Vec<Arc<dyn NotificationChannel>> = vec![bad, good.clone()];
        let dispatcher = NotificationDispatcher::new(channels);

        let reports = dispatcher
            .dispatch(message())
            .wait(Duration::from_secs(5))
            .await;

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].channel, "bad");
        assert!(!reports[0].is_delivered());
        assert_eq!(reports[1].channel, "good");
        assert!(reports[1].is_delivered());
        assert_eq!(good.sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_channels_is_an_empty_handle() {
        let dispatcher = NotificationDispatcher::default();
        let handle = dispatcher.dispatch(message());
        assert!(handle.is_empty());
        assert!(handle.wait(Duration::from_millis(10)).await.is_empty());
    }

    #[tokio::test]
    async fn dropped_handle_still_delivers() {
        let good = StubChannel::slow("good", false, Duration::from_millis(20));
        let channels: Vec<Arc<dyn NotificationChannel>> = vec![good.clone()];
        let dispatcher = NotificationDispatcher::new(channels);

        drop(dispatcher.dispatch(message()));
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(good.sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn wait_reports_pending_channels_at_deadline() {
        let slow = StubChannel::slow("slow", false, Duration::from_secs(10));
        let fast = StubChannel::new("fast", false);
        let channels: Vec<Arc<dyn NotificationChannel>> = vec![slow, fast];
        let dispatcher = NotificationDispatcher::new(channels);

        let reports = dispatcher
            .dispatch(message())
            .wait(Duration::from_millis(100))
            .await;

        assert!(matches!(
            reports[0].outcome,
            Err(ChannelError::TaskFailed { .. })
        ));
        assert!(reports[1].is_delivered());
    }

    #[tokio::test]
    async fn handle_debug_lists_channels() {
        let channels: Vec<Arc<dyn NotificationChannel>> = vec![StubChannel::new("wecom", false)];
        let dispatcher = NotificationDispatcher::new(channels);
        let handle = dispatcher.dispatch(message());
        assert_eq!(format!("{handle:?}"), r#"DispatchHandle { channels: ["wecom"] }"#);
    }
}
