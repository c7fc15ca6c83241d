//! # JSON Bill Repository
//!
//! Bills live in `bills.json`, keyed by bill id. Documents use the camelCase
//! field names of [`shared::Bill`], so `involvedMemberIds` and `createdBy`
//! are directly queryable.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use serde_json::{json, Value};
use shared::{Bill, SplitStatus};

use super::connection::{Filter, JsonConnection};
use crate::storage::traits::BillStorage;

const COLLECTION: &str = "bills";

/// Document-store backed bill repository
#[derive(Clone)]
pub struct BillRepository {
    connection: JsonConnection,
}

impl BillRepository {
    pub fn new(connection: JsonConnection) -> Self {
        Self { connection }
    }

    fn parse_bills(documents: Vec<(String, Value)>) -> Vec<Bill> {
        documents
            .into_iter()
            .filter_map(|(id, document)| match serde_json::from_value::<Bill>(document) {
                Ok(bill) => Some(bill),
                Err(e) => {
                    warn!("Skipping malformed bill document {}: {}", id, e);
                    None
                }
            })
            .collect()
    }
}

#[async_trait]
impl BillStorage for BillRepository {
    async fn store_bill(&self, bill: &Bill) -> Result<()> {
        let document = serde_json::to_value(bill)?;
        self.connection.set(COLLECTION, &bill.id, document)?;
        info!("Stored bill {} with {} splits", bill.id, bill.splits.len());
        Ok(())
    }

    async fn get_bill(&self, bill_id: &str) -> Result<Option<Bill>> {
        match self.connection.get(COLLECTION, bill_id)? {
            Some(document) => Ok(Some(serde_json::from_value(document)?)),
            None => {
                debug!("Bill {} not found", bill_id);
                Ok(None)
            }
        }
    }

    async fn list_bills_involving(&self, user_id: &str) -> Result<Vec<Bill>> {
        let documents = self.connection.query(
            COLLECTION,
            &[Filter::array_contains("involvedMemberIds", user_id)],
            None,
        )?;
        Ok(Self::parse_bills(documents))
    }

    async fn list_bills_created_by(&self, user_id: &str) -> Result<Vec<Bill>> {
        let documents = self
            .connection
            .query(COLLECTION, &[Filter::eq("createdBy", user_id)], None)?;
        Ok(Self::parse_bills(documents))
    }

    async fn set_split_status(&self, bill_id: &str, uid: &str, status: SplitStatus) -> Result<Bill> {
        // Fetch the current array right before writing it back whole
        let mut bill = self
            .get_bill(bill_id)
            .await?
            .ok_or_else(|| anyhow!("Bill not found: {}", bill_id))?;

        let split = bill
            .split_for_mut(uid)
            .ok_or_else(|| anyhow!("Member {} has no split in bill {}", uid, bill_id))?;
        split.status = status;

        self.connection.update(
            COLLECTION,
            bill_id,
            json!({ "splits": serde_json::to_value(&bill.splits)? }),
        )?;

        info!("Set split status of {} in bill {} to {}", uid, bill_id, status);
        Ok(bill)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::json::test_utils::{sample_bill, TestEnvironment};

    #[tokio::test]
    async fn test_store_and_get_bill() {
        let env = TestEnvironment::new().await.unwrap();
        let repo = BillRepository::new(env.connection.clone());
        let bill = sample_bill("bill-1", "alice", &[("alice", 10000.0), ("budi", 23000.0)]);

        repo.store_bill(&bill).await.unwrap();

        let retrieved = repo.get_bill("bill-1").await.unwrap().unwrap();
        assert_eq!(retrieved, bill);
        assert!(repo.get_bill("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_bills_involving_and_created_by() {
        let env = TestEnvironment::new().await.unwrap();
        let repo = BillRepository::new(env.connection.clone());
        repo.store_bill(&sample_bill("b1", "alice", &[("budi", 1.0)])).await.unwrap();
        repo.store_bill(&sample_bill("b2", "budi", &[("cici", 1.0)])).await.unwrap();

        let involving_budi = repo.list_bills_involving("budi").await.unwrap();
        assert_eq!(involving_budi.len(), 1);
        assert_eq!(involving_budi[0].id, "b1");

        let created_by_budi = repo.list_bills_created_by("budi").await.unwrap();
        assert_eq!(created_by_budi.len(), 1);
        assert_eq!(created_by_budi[0].id, "b2");
    }

    #[tokio::test]
    async fn test_set_split_status_only_touches_one_member() {
        let env = TestEnvironment::new().await.unwrap();
        let repo = BillRepository::new(env.connection.clone());
        repo.store_bill(&sample_bill("b1", "alice", &[("budi", 5.0), ("cici", 7.0)]))
            .await
            .unwrap();

        let updated = repo.set_split_status("b1", "budi", SplitStatus::Paid).await.unwrap();
        assert_eq!(updated.split_for("budi").unwrap().status, SplitStatus::Paid);

        let stored = repo.get_bill("b1").await.unwrap().unwrap();
        assert_eq!(stored.split_for("budi").unwrap().status, SplitStatus::Paid);
        assert_eq!(stored.split_for("cici").unwrap().status, SplitStatus::Unpaid);
        assert_eq!(stored.total_amount, 12.0);
    }

    #[tokio::test]
    async fn test_set_split_status_unknown_member_fails() {
        let env = TestEnvironment::new().await.unwrap();
        let repo = BillRepository::new(env.connection.clone());
        repo.store_bill(&sample_bill("b1", "alice", &[("budi", 5.0)])).await.unwrap();

        assert!(repo.set_split_status("b1", "zaki", SplitStatus::Paid).await.is_err());
        assert!(repo.set_split_status("nope", "budi", SplitStatus::Paid).await.is_err());
    }
}
