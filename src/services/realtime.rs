//! In-process fan-out for live notification streams.

use futures::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use crate::database::models::Notification;

/// Every stored notification is published once; each subscriber keeps only
/// the ones addressed to its user.
#[derive(Clone, Debug)]
pub struct RealtimeHub {
    sender: broadcast::Sender<Notification>,
}

impl RealtimeHub {
    pub fn new(buffer: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer.max(1));
        Self { sender }
    }

    /// No-op when nobody is listening.
    pub fn publish(&self, notification: Notification) {
        let _ = self.sender.send(notification);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn subscribe(&self, user_id: Uuid) -> impl Stream<Item = Notification> + Send + 'static {
        BroadcastStream::new(self.sender.subscribe()).filter_map(move |item| async move {
            match item {
                Ok(notification) if notification.user_id == user_id => Some(notification),
                Ok(_) => None,
                Err(lagged) => {
                    tracing::warn!(%user_id, "realtime subscriber lagged: {}", lagged);
                    None
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::NotificationKind;
    use chrono::Utc;
    use std::time::Duration;

    fn notification(user_id: Uuid, title: &str) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            user_id,
            organization_id: None,
            kind: NotificationKind::TaskAssigned,
            title: title.to_string(),
            body: String::new(),
            task_id: None,
            read_at: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn subscribers_only_see_their_own() {
        let hub = RealtimeHub::new(16);
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let stream = hub.subscribe(alice);
        futures::pin_mut!(stream);
        assert_eq!(hub.subscriber_count(), 1);

        hub.publish(notification(bob, "for bob"));
        hub.publish(notification(alice, "for alice"));

        let received = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.title, "for alice");
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let hub = RealtimeHub::new(4);
        hub.publish(notification(Uuid::new_v4(), "nobody"));
        assert_eq!(hub.subscriber_count(), 0);
    }
}
