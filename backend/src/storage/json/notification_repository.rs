use anyhow::Result;
use async_trait::async_trait;
use log::{debug, warn};
use serde_json::json;
use shared::Notification;

use super::connection::{Filter, JsonConnection};
use crate::storage::traits::NotificationStorage;

const COLLECTION: &str = "notifications";

/// Document-store backed notification repository
#[derive(Clone)]
pub struct NotificationRepository {
    connection: JsonConnection,
}

impl NotificationRepository {
    pub fn new(connection: JsonConnection) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl NotificationStorage for NotificationRepository {
    async fn store_notification(&self, notification: &Notification) -> Result<()> {
        self.connection.set(
            COLLECTION,
            &notification.id,
            serde_json::to_value(notification)?,
        )?;
        debug!(
            "Stored {} notification {} for {}",
            notification.notification_type, notification.id, notification.recipient_id
        );
        Ok(())
    }

    async fn get_notification(&self, notification_id: &str) -> Result<Option<Notification>> {
        self.connection
            .get(COLLECTION, notification_id)?
            .map(serde_json::from_value)
            .transpose()
            .map_err(Into::into)
    }

    async fn list_notifications_for(&self, recipient_id: &str) -> Result<Vec<Notification>> {
        let documents = self
            .connection
            .query(COLLECTION, &[Filter::eq("recipientId", recipient_id)], None)?;

        Ok(documents
            .into_iter()
            .filter_map(|(id, document)| match serde_json::from_value(document) {
                Ok(notification) => Some(notification),
                Err(e) => {
                    warn!("Skipping malformed notification {}: {}", id, e);
                    None
                }
            })
            .collect())
    }

    async fn mark_read(&self, notification_id: &str) -> Result<()> {
        self.connection
            .update(COLLECTION, notification_id, json!({ "isRead": true }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::json::test_utils::{sample_notification, TestEnvironment};

    #[tokio::test]
    async fn test_store_list_and_mark_read() {
        let env = TestEnvironment::new().await.unwrap();
        let repo = NotificationRepository::new(env.connection.clone());
        repo.store_notification(&sample_notification("n1", "alice", 1)).await.unwrap();
        repo.store_notification(&sample_notification("n2", "alice", 2)).await.unwrap();
        repo.store_notification(&sample_notification("n3", "budi", 3)).await.unwrap();

        let for_alice = repo.list_notifications_for("alice").await.unwrap();
        assert_eq!(for_alice.len(), 2);
        assert!(for_alice.iter().all(|n| n.recipient_id == "alice"));

        repo.mark_read("n1").await.unwrap();
        assert!(repo.get_notification("n1").await.unwrap().unwrap().is_read);
        assert!(!repo.get_notification("n2").await.unwrap().unwrap().is_read);
    }

    #[tokio::test]
    async fn test_mark_read_missing_notification_fails() {
        let env = TestEnvironment::new().await.unwrap();
        let repo = NotificationRepository::new(env.connection.clone());
        assert!(repo.mark_read("ghost").await.is_err());
    }
}
