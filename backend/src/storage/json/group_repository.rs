use anyhow::Result;
use async_trait::async_trait;
use log::{info, warn};
use serde_json::Value;
use shared::Group;

use super::connection::{Filter, JsonConnection, Ordering};
use crate::storage::traits::GroupStorage;

const COLLECTION: &str = "groups";

/// Document-store backed group repository
#[derive(Clone)]
pub struct GroupRepository {
    connection: JsonConnection,
}

impl GroupRepository {
    pub fn new(connection: JsonConnection) -> Self {
        Self { connection }
    }

    fn parse_groups(documents: Vec<(String, Value)>) -> Vec<Group> {
        documents
            .into_iter()
            .filter_map(|(id, document)| match serde_json::from_value::<Group>(document) {
                Ok(group) => Some(group),
                Err(e) => {
                    warn!("Skipping malformed group document {}: {}", id, e);
                    None
                }
            })
            .collect()
    }
}

#[async_trait]
impl GroupStorage for GroupRepository {
    async fn store_group(&self, group: &Group) -> Result<()> {
        self.connection
            .set(COLLECTION, &group.id, serde_json::to_value(group)?)?;
        info!("Stored group {} ({})", group.name, group.id);
        Ok(())
    }

    async fn get_group(&self, group_id: &str) -> Result<Option<Group>> {
        self.connection
            .get(COLLECTION, group_id)?
            .map(serde_json::from_value)
            .transpose()
            .map_err(Into::into)
    }

    async fn find_groups_by_name(&self, name: &str) -> Result<Vec<Group>> {
        let documents = self.connection.query(
            COLLECTION,
            &[Filter::eq("name", name)],
            Some(&Ordering::ascending("createdAt")),
        )?;
        Ok(Self::parse_groups(documents))
    }

    async fn list_groups_for_member(&self, user_id: &str) -> Result<Vec<Group>> {
        let documents = self.connection.query(
            COLLECTION,
            &[Filter::array_contains("memberIds", user_id)],
            Some(&Ordering::descending("createdAt")),
        )?;
        Ok(Self::parse_groups(documents))
    }
}
