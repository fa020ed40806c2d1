//! Pipeline lifecycle notifications.
//!
//! The processor announces delivery outcomes on a broadcast channel so
//! observers (metrics, tests, operators) can watch the pipeline without
//! sitting in the hot path. Notifications are fire-and-forget: a slow or
//! absent subscriber never blocks a flush, and lagged subscribers lose old
//! notifications rather than stalling the sender.

use tokio::sync::broadcast;

/// Outcome of one flush or fallback delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineNotification {
    /// A batch payload was accepted by the sink.
    BatchDelivered { batch_id: String, event_count: usize },
    /// A batch payload was rejected by the sink; its events are dropped.
    BatchFailed {
        batch_id: String,
        event_count: usize,
        error: String,
    },
    /// A single-event fallback payload was accepted by the sink.
    FallbackDelivered { batch_id: String },
    /// A single-event fallback payload was rejected; the event is dropped.
    FallbackFailed { batch_id: String, error: String },
}

impl PipelineNotification {
    /// The payload id the notification refers to.
    pub fn batch_id(&self) -> &str {
        match self {
            PipelineNotification::BatchDelivered { batch_id, .. }
            | PipelineNotification::BatchFailed { batch_id, .. }
            | PipelineNotification::FallbackDelivered { batch_id }
            | PipelineNotification::FallbackFailed { batch_id, .. } => batch_id,
        }
    }

    /// Whether the payload reached the sink.
    pub fn is_delivered(&self) -> bool {
        matches!(
            self,
            PipelineNotification::BatchDelivered { .. }
                | PipelineNotification::FallbackDelivered { .. }
        )
    }
}

/// Broadcast fan-out for [`PipelineNotification`]s.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<PipelineNotification>,
}

impl Notifier {
    /// Create a notifier whose subscribers buffer up to `capacity`
    /// notifications before lagging.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineNotification> {
        self.tx.subscribe()
    }

    /// Publish a notification. A send error only means nobody is listening,
    /// which is fine.
    pub fn notify(&self, notification: PipelineNotification) {
        let _ = self.tx.send(notification);
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_notifications() {
        let notifier = Notifier::default();
        let mut rx = notifier.subscribe();

        notifier.notify(PipelineNotification::BatchDelivered {
            batch_id: "batch_1".to_string(),
            event_count: 3,
        });

        let received = rx.recv().await.unwrap();
        assert!(received.is_delivered());
        assert_eq!(received.batch_id(), "batch_1");
    }

    #[tokio::test]
    async fn test_notify_without_subscribers_is_a_noop() {
        let notifier = Notifier::new(4);
        notifier.notify(PipelineNotification::FallbackFailed {
            batch_id: "single_1".to_string(),
            error: "sink unavailable".to_string(),
        });
    }

    #[tokio::test]
    async fn test_lagged_subscriber_drops_old_notifications() {
        let notifier = Notifier::new(1);
        let mut rx = notifier.subscribe();

        for i in 0..3 {
            notifier.notify(PipelineNotification::BatchDelivered {
                batch_id: format!("batch_{i}"),
                event_count: 1,
            });
        }

        // The sender was never blocked; the receiver observes the lag and
        // then the newest notification.
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(_))
        ));
        let latest = rx.recv().await.unwrap();
        assert_eq!(latest.batch_id(), "batch_2");
    }

    #[test]
    fn test_failure_notifications_carry_the_error() {
        let notification = PipelineNotification::BatchFailed {
            batch_id: "batch_1".to_string(),
            event_count: 5,
            error: "queue full".to_string(),
        };
        assert!(!notification.is_delivered());
    }
}
