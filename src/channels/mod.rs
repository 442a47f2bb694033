//! Notification channels and the dispatcher that fans out to them.

pub mod channel;
pub mod dispatcher;
pub mod telegram;
pub mod wecom;

pub use channel::NotificationChannel;
pub use dispatcher::{DeliveryReport, DispatchHandle, NotificationDispatcher};
pub use telegram::TelegramChannel;
pub use wecom::WeComChannel;
