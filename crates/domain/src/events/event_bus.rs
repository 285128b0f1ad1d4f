use tokio::sync::broadcast;
use tracing::trace;

use super::EngineEvent;

pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Fan-out channel for [`EngineEvent`]s.
///
/// Publishing never blocks and never fails: with no subscribers the event is
/// dropped, and a subscriber that falls behind sees `RecvError::Lagged`.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Returns how many subscribers received the event
    pub fn publish(&self, event: EngineEvent) -> usize {
        let kind = event.kind();
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                trace!("no subscribers for {}", kind);
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_without_subscribers_is_not_an_error() {
        let bus = EventBus::default();
        assert_eq!(bus.publish(EngineEvent::error("test", "nobody listening")), 0);
    }

    #[tokio::test]
    async fn test_every_subscriber_receives_event() {
        let bus = EventBus::new(8);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        assert_eq!(bus.publish(EngineEvent::error("scan", "venue down")), 2);

        for rx in [&mut first, &mut second] {
            match rx.recv().await.unwrap() {
                EngineEvent::Error { context, message, .. } => {
                    assert_eq!(context, "scan");
                    assert_eq!(message, "venue down");
                }
                other => panic!("unexpected event {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();
        for i in 0..5 {
            bus.publish(EngineEvent::error("loop", i));
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(_))
        ));
    }
}
