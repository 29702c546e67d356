//! Notification delivery targets

use async_trait::async_trait;
use log::info;
use std::time::Duration;
use tokio::sync::mpsc;

use super::model::Reminder;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("notification sink offline: {0}")]
    Offline(String),

    #[error("notification permission denied")]
    PermissionDenied,

    #[error("delivery timed out after {0:?}")]
    TimedOut(Duration),

    #[error("delivery failed: {0}")]
    Failed(String),
}

/// Where due reminders go. Implemented by whatever surface shows them.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, reminder: &Reminder) -> Result<(), DeliveryError>;
}

/// Writes deliveries to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, reminder: &Reminder) -> Result<(), DeliveryError> {
        info!(
            "⏰ [{}] {}: {}",
            reminder.priority, reminder.title, reminder.message
        );
        Ok(())
    }
}

/// Forwards deliveries to a channel drained by a UI host
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<Reminder>,
}

impl ChannelSink {
    pub fn new(sender: mpsc::UnboundedSender<Reminder>) -> Self {
        Self { sender }
    }

    /// Sink plus the receiving end
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Reminder>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl NotificationSink for ChannelSink {
    async fn deliver(&self, reminder: &Reminder) -> Result<(), DeliveryError> {
        self.sender
            .send(reminder.clone())
            .map_err(|_| DeliveryError::Offline("receiver dropped".to_string()))
    }
}
