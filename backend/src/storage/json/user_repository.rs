use anyhow::Result;
use async_trait::async_trait;
use log::{info, warn};
use shared::UserProfile;

use super::connection::{Filter, JsonConnection, Ordering};
use crate::storage::traits::UserStorage;

const COLLECTION: &str = "users";

/// Document-store backed user profile repository
#[derive(Clone)]
pub struct UserRepository {
    connection: JsonConnection,
}

impl UserRepository {
    pub fn new(connection: JsonConnection) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl UserStorage for UserRepository {
    async fn store_user(&self, user: &UserProfile) -> Result<()> {
        self.connection
            .set(COLLECTION, &user.id, serde_json::to_value(user)?)?;
        info!("Stored profile for @{} ({})", user.username, user.id);
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>> {
        self.connection
            .get(COLLECTION, user_id)?
            .map(serde_json::from_value)
            .transpose()
            .map_err(Into::into)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserProfile>> {
        let documents = self
            .connection
            .query(COLLECTION, &[Filter::eq("username", username)], None)?;
        documents
            .into_iter()
            .next()
            .map(|(_, document)| serde_json::from_value(document))
            .transpose()
            .map_err(Into::into)
    }

    async fn search_by_username_prefix(&self, prefix: &str) -> Result<Vec<UserProfile>> {
        let documents = self.connection.query(
            COLLECTION,
            &[Filter::prefix("username", prefix)],
            Some(&Ordering::ascending("username")),
        )?;

        Ok(documents
            .into_iter()
            .filter_map(|(id, document)| match serde_json::from_value(document) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!("Skipping malformed profile {}: {}", id, e);
                    None
                }
            })
            .collect())
    }
}
