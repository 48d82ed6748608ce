//! In-app, real-time and push notifications.

use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinSet;
use uuid::Uuid;

use super::push::{PushMessage, PushSender};
use super::realtime::RealtimeHub;
use super::{Paged, ServiceError};
use crate::database::models::{DevicePlatform, DeviceToken, Notification};
use crate::database::repository::notifications::NewNotification;
use crate::database::repository::{devices, notifications};
use crate::database::Page;
use crate::domain::{Actor, Permission};

/// Stores a notification per recipient, then publishes it live and hands it
/// to push delivery. Failures are logged; callers never see them.
#[derive(Clone, Debug)]
pub struct Notifier {
    pool: PgPool,
    hub: RealtimeHub,
    push: Arc<dyn PushSender>,
    in_flight: Arc<Mutex<JoinSet<()>>>,
}

impl Notifier {
    pub fn new(pool: PgPool, hub: RealtimeHub, push: Arc<dyn PushSender>) -> Self {
        Self {
            pool,
            hub,
            push,
            in_flight: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    pub fn hub(&self) -> &RealtimeHub {
        &self.hub
    }

    pub async fn notify(&self, recipients: &[Uuid], content: NewNotification<'_>) {
        let mut recipients = recipients.to_vec();
        recipients.sort();
        recipients.dedup();
        if recipients.is_empty() {
            return;
        }

        let stored = match notifications::insert_for(&self.pool, &recipients, &content).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(kind = content.kind.as_str(), "failed to store notifications: {}", e);
                return;
            }
        };

        for notification in &stored {
            self.hub.publish(notification.clone());
        }

        let pool = self.pool.clone();
        let push = Arc::clone(&self.push);
        self.track(async move {
            deliver_push(&pool, push.as_ref(), &stored).await;
        });
    }

    /// Push runs in the background; finished deliveries are reaped here.
    fn track<F>(&self, delivery: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        while in_flight.try_join_next().is_some() {}
        in_flight.spawn(delivery);
    }

    /// Wait for every push delivery still running. Call before the runtime
    /// shuts down, or pending pushes are dropped.
    pub async fn flush(&self) {
        let mut pending = std::mem::take(&mut *self.in_flight.lock().unwrap_or_else(PoisonError::into_inner));
        while let Some(result) = pending.join_next().await {
            if let Err(e) = result {
                tracing::warn!("push delivery task failed: {}", e);
            }
        }
    }
}

async fn deliver_push(pool: &PgPool, push: &dyn PushSender, stored: &[Notification]) {
    let user_ids: Vec<Uuid> = stored.iter().map(|n| n.user_id).collect();
    let devices = match devices::for_users(pool, &user_ids).await {
        Ok(devices) => devices,
        Err(e) => {
            tracing::warn!("failed to load device tokens: {}", e);
            return;
        }
    };

    let messages = push_messages(stored, &devices);
    if messages.is_empty() {
        return;
    }

    match push.send(messages).await {
        Ok(report) => {
            tracing::debug!(delivered = report.delivered, failed = report.failed, "push batch sent");
            if !report.unregistered.is_empty() {
                match devices::delete_tokens(pool, &report.unregistered).await {
                    Ok(removed) => tracing::info!(removed, "pruned unregistered device tokens"),
                    Err(e) => tracing::warn!("failed to prune device tokens: {}", e),
                }
            }
        }
        Err(e) => tracing::warn!("push delivery failed: {}", e),
    }
}

fn push_messages(stored: &[Notification], devices: &[DeviceToken]) -> Vec<PushMessage> {
    stored
        .iter()
        .flat_map(|notification| {
            devices
                .iter()
                .filter(move |device| device.user_id == notification.user_id)
                .map(move |device| PushMessage {
                    to: device.token.clone(),
                    title: notification.title.clone(),
                    body: notification.body.clone(),
                    data: json!({
                        "notification_id": notification.id,
                        "kind": notification.kind,
                        "task_id": notification.task_id,
                    }),
                    sound: "default",
                })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct UnreadCount {
    pub unread: i64,
}

/// The caller's own inbox and devices.
pub struct NotificationService {
    pool: PgPool,
}

impl NotificationService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, actor: &Actor, unread_only: bool, page: Page) -> Result<Paged<Notification>, ServiceError> {
        actor.authorize(Permission::ViewNotifications)?;
        let user_id = actor.user_id();
        let items = notifications::list_for_user(&self.pool, user_id, unread_only, page).await?;
        let total = notifications::count_for_user(&self.pool, user_id, unread_only).await?;
        Ok(Paged::new(items, total, page))
    }

    pub async fn unread_count(&self, actor: &Actor) -> Result<UnreadCount, ServiceError> {
        actor.authorize(Permission::ViewNotifications)?;
        let unread = notifications::count_for_user(&self.pool, actor.user_id(), true).await?;
        Ok(UnreadCount { unread })
    }

    pub async fn mark_read(&self, actor: &Actor, id: Uuid) -> Result<Notification, ServiceError> {
        actor.authorize(Permission::ViewNotifications)?;
        actor.own_account()?;
        notifications::mark_read(&self.pool, actor.user_id(), id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Notification"))
    }

    pub async fn mark_all_read(&self, actor: &Actor) -> Result<u64, ServiceError> {
        actor.authorize(Permission::ViewNotifications)?;
        actor.own_account()?;
        Ok(notifications::mark_all_read(&self.pool, actor.user_id()).await?)
    }

    pub async fn register_device(
        &self,
        actor: &Actor,
        token: &str,
        platform: DevicePlatform,
    ) -> Result<DeviceToken, ServiceError> {
        actor.authorize(Permission::ViewNotifications)?;
        actor.own_account()?;
        let token = super::required_text("token", token, 512)?;
        Ok(devices::upsert(&self.pool, actor.user_id(), &token, platform).await?)
    }

    pub async fn unregister_device(&self, actor: &Actor, token: &str) -> Result<(), ServiceError> {
        actor.authorize(Permission::ViewNotifications)?;
        actor.own_account()?;
        if devices::delete_for_user(&self.pool, actor.user_id(), token.trim()).await? {
            Ok(())
        } else {
            Err(ServiceError::not_found("Device"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::NotificationKind;
    use chrono::Utc;

    fn stored(user_id: Uuid) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            user_id,
            organization_id: None,
            kind: NotificationKind::TaskApproved,
            title: "Approved".to_string(),
            body: "Nice work".to_string(),
            task_id: Some(Uuid::new_v4()),
            read_at: None,
            created_at: Utc::now(),
        }
    }

    fn device(user_id: Uuid, token: &str) -> DeviceToken {
        DeviceToken {
            token: token.to_string(),
            user_id,
            platform: DevicePlatform::Ios,
            created_at: Utc::now(),
            last_seen_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn flush_waits_for_pending_deliveries() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::time::Duration;

        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://nobody@127.0.0.1:1/none")
            .unwrap();
        let notifier = Notifier::new(pool, RealtimeHub::new(8), Arc::new(crate::services::push::NoopPushSender));

        let delivered = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&delivered);
        notifier.track(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            flag.store(true, Ordering::SeqCst);
        });

        notifier.flush().await;
        assert!(delivered.load(Ordering::SeqCst));
    }

    #[test]
    fn one_message_per_device_of_each_recipient() {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let devices = vec![device(alice, "a1"), device(alice, "a2"), device(Uuid::new_v4(), "x")];

        let messages = push_messages(&[stored(alice), stored(bob)], &devices);
        let targets: Vec<&str> = messages.iter().map(|m| m.to.as_str()).collect();
        assert_eq!(targets, vec!["a1", "a2"]);
        assert_eq!(messages[0].data["kind"], "TASK_APPROVED");
    }
}
