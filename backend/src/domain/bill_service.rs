//! Bill creation and settlement.
//!
//! ## Creating a bill
//!
//! 1. Validate the orders (see [`bill_form`](super::bill_form))
//! 2. Compute every member's share
//! 3. Build the bill: members who ordered nothing get no split, the
//!    creator's split starts `paid`, everyone else starts `unpaid`
//! 4. Persist it, and only after the write succeeded
//! 5. Notify every unpaid member
//!
//! ## Settling
//!
//! A participant flips their own split to `paid`. The creator is told once;
//! repeating the call changes nothing and sends nothing.

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use shared::{
    Bill, CreateBillRequest, CreateBillResponse, Member, Order, Split, SplitStatus,
    DEFAULT_GROUP_ICON,
};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use super::bill_form;
use super::commands::bills::{HistoryQuery, MarkPaidResult};
use super::error::{DomainError, OrderValidationError};
use super::notification_service::NotificationService;
use super::receipt::Receipt;
use super::session::Session;
use super::split_calculator::{compute, SplitComputation};
use crate::storage::{BillStorage, Connection, UserStorage};

pub const FALLBACK_PAYER_NAME: &str = "Member";

/// Everyone on the bill: the creator first, then the requested members once each
fn bill_members(session: &Session, requested: &[Member]) -> Vec<Member> {
    let mut members = vec![session.self_member()];
    for member in requested {
        if !members.iter().any(|existing| existing.id == member.id) {
            members.push(member.clone());
        }
    }
    members
}

/// One order per member, in member order; orders for unknown ids are kept at the end
fn orders_for_members(members: &[Member], orders: &[Order]) -> Vec<Order> {
    let mut aligned: Vec<Order> = members
        .iter()
        .map(|member| {
            let items = orders
                .iter()
                .filter(|order| order.member_id == member.id)
                .flat_map(|order| order.items.iter().cloned())
                .collect();
            Order {
                member_id: member.id.clone(),
                member_name: member.display_name.clone(),
                items,
            }
        })
        .collect();

    let known: HashSet<&str> = members.iter().map(|member| member.id.as_str()).collect();
    aligned.extend(
        orders
            .iter()
            .filter(|order| !known.contains(order.member_id.as_str()))
            .cloned(),
    );
    aligned
}

/// Validate, compute and assemble a bill without touching storage
pub fn build(
    session: &Session,
    request: &CreateBillRequest,
    bill_id: String,
    created_at: DateTime<Utc>,
) -> Result<(Bill, SplitComputation), DomainError> {
    bill_form::validate(&request.orders, request.tax_rate_percent, request.service_charge)
        .map_err(DomainError::Validation)?;

    let members = bill_members(session, &request.members);
    let orders = orders_for_members(&members, &request.orders);
    let computation = compute(&orders, request.tax_rate_percent, request.service_charge);
    // Orders merged per member can still overflow
    if !bill_form::totals_are_finite(&computation) {
        return Err(DomainError::Validation(vec![OrderValidationError::TotalTooLarge]));
    }

    let creator_id = session.user_id();
    let splits: Vec<Split> = computation
        .per_member
        .iter()
        .map(|share| Split {
            uid: share.member_id.clone(),
            name: share.member_name.clone(),
            avatar_ref: members
                .iter()
                .find(|member| member.id == share.member_id)
                .and_then(|member| member.avatar_ref.clone()),
            total_amount: share.total,
            status: if share.member_id == creator_id {
                SplitStatus::Paid
            } else {
                SplitStatus::Unpaid
            },
            items: share.items.clone(),
        })
        .collect();

    let group_icon = request
        .group_icon
        .as_deref()
        .map(str::trim)
        .filter(|icon| !icon.is_empty())
        .unwrap_or(DEFAULT_GROUP_ICON)
        .to_string();

    let bill = Bill {
        id: bill_id,
        group_id: request.group_id.clone(),
        group_name: request.group_name.clone(),
        group_icon,
        created_by: creator_id.to_string(),
        created_at,
        tax_rate_percent: request.tax_rate_percent,
        service_charge: request.service_charge,
        total_amount: computation.grand_total,
        involved_member_ids: splits.iter().map(|split| split.uid.clone()).collect(),
        splits,
    };
    Ok((bill, computation))
}

#[derive(Clone)]
pub struct BillService<C: Connection> {
    bill_repository: C::BillRepository,
    user_repository: C::UserRepository,
    notification_service: NotificationService<C>,
}

impl<C: Connection> BillService<C> {
    pub fn new(connection: Arc<C>, notification_service: NotificationService<C>) -> Self {
        Self {
            bill_repository: connection.create_bill_repository(),
            user_repository: connection.create_user_repository(),
            notification_service,
        }
    }

    pub async fn create_bill(&self, session: &Session, request: CreateBillRequest) -> Result<CreateBillResponse> {
        info!(
            "Creating bill in '{}' for {} with {} orders",
            request.group_name,
            session.user_id(),
            request.orders.len()
        );

        let (bill, _) = build(session, &request, Uuid::new_v4().to_string(), Utc::now())?;

        if let Err(e) = self.bill_repository.store_bill(&bill).await {
            error!("Failed to save bill {}: {}", bill.id, e);
            return Err(e);
        }

        let report = self
            .notification_service
            .notify_new_bill(&bill, &session.self_member())
            .await;

        let success_message = if report.failed == 0 {
            format!(
                "Bill for '{}' saved and sent to {} member(s)",
                bill.group_name, report.sent
            )
        } else {
            format!(
                "Bill for '{}' saved; {} of {} notifications could not be sent",
                bill.group_name,
                report.failed,
                report.sent + report.failed
            )
        };

        Ok(CreateBillResponse {
            bill,
            notifications_sent: report.sent,
            notification_failures: report.failed,
            success_message,
        })
    }

    pub async fn get_bill(&self, bill_id: &str) -> Result<Bill> {
        match self.bill_repository.get_bill(bill_id).await? {
            Some(bill) => Ok(bill),
            None => {
                warn!("Bill {} not found", bill_id);
                Err(DomainError::BillNotFound(bill_id.to_string()).into())
            }
        }
    }

    pub async fn receipt(&self, bill_id: &str) -> Result<Receipt> {
        Ok(Receipt::from_bill(&self.get_bill(bill_id).await?))
    }

    /// Flip the caller's own split to `paid` and tell the creator
    pub async fn mark_paid(&self, session: &Session, bill_id: &str) -> Result<MarkPaidResult> {
        let user_id = session.user_id();
        info!("Marking {} paid on bill {}", user_id, bill_id);

        let bill = self.get_bill(bill_id).await?;
        let split = bill.split_for(user_id).ok_or_else(|| DomainError::NotAParticipant {
            bill_id: bill_id.to_string(),
            user_id: user_id.to_string(),
        })?;

        if split.status == SplitStatus::Paid {
            info!("Split of {} on bill {} is already paid", user_id, bill_id);
            return Ok(MarkPaidResult {
                bill,
                already_paid: true,
                notification: None,
            });
        }

        let updated = self
            .bill_repository
            .set_split_status(bill_id, user_id, SplitStatus::Paid)
            .await?;

        if updated.created_by == user_id {
            return Ok(MarkPaidResult {
                bill: updated,
                already_paid: false,
                notification: None,
            });
        }

        let payer = Member {
            id: user_id.to_string(),
            display_name: self.payer_name(&updated, user_id).await,
            avatar_ref: session.user().photo_ref.clone(),
        };
        let notification = match self.notification_service.notify_payment_paid(&updated, &payer).await {
            Ok(notification) => Some(notification),
            Err(e) => {
                warn!("Bill {} settled but the creator was not notified: {}", bill_id, e);
                None
            }
        };

        Ok(MarkPaidResult {
            bill: updated,
            already_paid: false,
            notification,
        })
    }

    /// Split name on the bill, then profile display name, then "Member"
    async fn payer_name(&self, bill: &Bill, user_id: &str) -> String {
        if let Some(name) = bill
            .split_for(user_id)
            .map(|split| split.name.trim())
            .filter(|name| !name.is_empty())
        {
            return name.to_string();
        }

        match self.user_repository.get_user(user_id).await {
            Ok(Some(profile)) if !profile.display_name.trim().is_empty() => profile.display_name,
            Ok(_) => FALLBACK_PAYER_NAME.to_string(),
            Err(e) => {
                warn!("Could not load profile {}: {}", user_id, e);
                FALLBACK_PAYER_NAME.to_string()
            }
        }
    }

    /// Bills the caller is involved in or created, newest first
    pub async fn history(&self, session: &Session, query: &HistoryQuery) -> Result<Vec<Bill>> {
        let user_id = session.user_id();
        info!("Loading bill history for {}", user_id);

        let mut bills = self.bill_repository.list_bills_involving(user_id).await?;
        let mut seen: HashSet<String> = bills.iter().map(|bill| bill.id.clone()).collect();
        for bill in self.bill_repository.list_bills_created_by(user_id).await? {
            if seen.insert(bill.id.clone()) {
                bills.push(bill);
            }
        }

        if let Some(search) = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|search| !search.is_empty())
        {
            let needle = search.to_lowercase();
            bills.retain(|bill| bill.group_name.to_lowercase().contains(&needle));
        }

        bills.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bills)
    }
}
