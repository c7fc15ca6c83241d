//! Debt aggregation.
//!
//! A user owes a bill's creator the total of their own split while it is
//! unpaid. Creators never owe themselves. The overview lists the largest
//! debts first.

use anyhow::Result;
use log::info;
use shared::{Bill, DebtItem, DebtOverview, SplitStatus};
use std::collections::HashMap;
use std::sync::Arc;

use super::session::Session;
use crate::storage::{BillStorage, Connection, UserStorage};

pub const FALLBACK_CREDITOR_NAME: &str = "Member";

/// Sum the user's unpaid splits across `bills`.
///
/// The creditor name is taken from the creator's own split when the bill has
/// one and is left empty otherwise.
pub fn aggregate(user_id: &str, bills: &[Bill]) -> DebtOverview {
    let mut debts: Vec<DebtItem> = bills
        .iter()
        .filter(|bill| bill.created_by != user_id)
        .filter_map(|bill| {
            let split = bill.split_for(user_id)?;
            if split.status != SplitStatus::Unpaid {
                return None;
            }
            let creditor_name = bill
                .split_for(&bill.created_by)
                .map(|creator| creator.name.clone())
                .unwrap_or_default();
            Some(DebtItem {
                bill_id: bill.id.clone(),
                creditor_id: bill.created_by.clone(),
                creditor_name,
                amount: split.total_amount,
                group_name: bill.group_name.clone(),
                date: bill.created_at,
            })
        })
        .collect();

    debts.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    let total_unpaid = debts.iter().map(|debt| debt.amount).sum();

    DebtOverview {
        total_unpaid,
        debts,
    }
}

#[derive(Clone)]
pub struct DebtService<C: Connection> {
    bill_repository: C::BillRepository,
    user_repository: C::UserRepository,
}

impl<C: Connection> DebtService<C> {
    pub fn new(connection: Arc<C>) -> Self {
        Self {
            bill_repository: connection.create_bill_repository(),
            user_repository: connection.create_user_repository(),
        }
    }

    /// Everything `user_id` still owes, largest first
    pub async fn overview_for(&self, user_id: &str) -> Result<DebtOverview> {
        info!("Aggregating debts for {}", user_id);
        let bills = self.bill_repository.list_bills_involving(user_id).await?;
        let mut overview = aggregate(user_id, &bills);

        let mut names: HashMap<String, String> = HashMap::new();
        for debt in overview.debts.iter_mut().filter(|debt| debt.creditor_name.is_empty()) {
            if !names.contains_key(&debt.creditor_id) {
                let name = self
                    .user_repository
                    .get_user(&debt.creditor_id)
                    .await?
                    .map(|profile| profile.display_name)
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| FALLBACK_CREDITOR_NAME.to_string());
                names.insert(debt.creditor_id.clone(), name);
            }
            if let Some(name) = names.get(&debt.creditor_id) {
                debt.creditor_name = name.clone();
            }
        }

        info!(
            "{} owes {:.2} across {} bills",
            user_id,
            overview.total_unpaid,
            overview.debts.len()
        );
        Ok(overview)
    }

    pub async fn overview(&self, session: &Session) -> Result<DebtOverview> {
        self.overview_for(session.user_id()).await
    }
}
