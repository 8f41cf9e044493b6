//! Delivery boundary between the scheduler and whatever surfaces
//! reminders to the user.

use crate::domain::ReminderEvent;
use crate::error::{RemindrError, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Receives fired reminder events.
///
/// The scheduler calls this from its dispatch task, one event at a
/// time and in fire order, so a slow sink backs up the queue but
/// never blocks arming or timers.
#[async_trait]
pub trait NotificationSink: Send + Sync + 'static {
    async fn deliver(&self, event: ReminderEvent) -> Result<()>;
}

/// Sink that writes each event to the tracing log. Useful as a
/// default when embedding the scheduler without a UI.
#[derive(Debug, Default, Clone)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, event: ReminderEvent) -> Result<()> {
        tracing::info!(
            task_id = %event.task_id,
            stage = %event.stage,
            title = %event.title,
            "{}",
            event.message
        );
        Ok(())
    }
}

/// Sink that forwards events over a bounded channel to a consumer
/// task, e.g. a console printer or a desktop notifier.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<ReminderEvent>,
}

impl ChannelSink {
    /// Create the sink together with the receiving half. A zero
    /// capacity is raised to one.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ReminderEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl NotificationSink for ChannelSink {
    async fn deliver(&self, event: ReminderEvent) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|e| RemindrError::Delivery(format!("notification channel closed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Task;
    use chrono::NaiveDate;

    fn event() -> ReminderEvent {
        let task = Task::new("t1", "Water plants");
        let fired_at = NaiveDate::from_ymd_opt(2024, 1, 10)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap();
        ReminderEvent::main_alert(&task, fired_at)
    }

    #[tokio::test]
    async fn test_channel_sink_forwards_events() {
        let (sink, mut rx) = ChannelSink::new(4);

        sink.deliver(event()).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.task_id, "t1");
        assert_eq!(received.title, "Water plants");
    }

    #[tokio::test]
    async fn test_channel_sink_zero_capacity_still_delivers() {
        let (sink, mut rx) = ChannelSink::new(0);

        sink.deliver(event()).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().task_id, "t1");
    }

    #[tokio::test]
    async fn test_channel_sink_errors_when_receiver_dropped() {
        let (sink, rx) = ChannelSink::new(4);
        drop(rx);

        let err = sink.deliver(event()).await.unwrap_err();
        assert!(matches!(err, RemindrError::Delivery(_)));
    }

    #[tokio::test]
    async fn test_log_sink_accepts_events() {
        let sink = LogSink;
        assert!(sink.deliver(event()).await.is_ok());
    }
}
