//! Notification dispatch and click-through.
//!
//! ## Events
//!
//! - A new bill sends one `new_bill` notification to every member with an
//!   unpaid split, never to the creator
//! - Settling a split sends one `payment_paid` notification to the creator
//!
//! ## Group id recovery
//!
//! Bills created outside a group view may carry no group id or the
//! [`UNKNOWN_GROUP_ID`] sentinel. Before sending, and again when a
//! notification is opened, the group is looked up by the bill's group name.
//! If that fails too the notification keeps the sentinel and opening it
//! lands on the home view.

use anyhow::Result;
use chrono::Utc;
use log::{info, warn};
use shared::{
    is_usable_group_id, Bill, Member, Notification, NotificationType, RouteTarget, UNKNOWN_GROUP_ID,
};
use std::sync::Arc;
use uuid::Uuid;

use super::commands::bills::FanOutReport;
use super::error::DomainError;
use super::session::Session;
use crate::storage::{BillStorage, Connection, GroupStorage, NotificationStorage};

pub const BILL_MISSING_NOTICE: &str = "Bill data no longer exists.";

pub fn new_bill_message(group_name: &str) -> String {
    format!("sent you a bill in the '{}' group.", group_name)
}

pub fn payment_paid_message(group_name: &str) -> String {
    format!("has paid their part in the '{}' group.", group_name)
}

#[derive(Clone)]
pub struct NotificationService<C: Connection> {
    notification_repository: C::NotificationRepository,
    group_repository: C::GroupRepository,
    bill_repository: C::BillRepository,
}

impl<C: Connection> NotificationService<C> {
    pub fn new(connection: Arc<C>) -> Self {
        Self {
            notification_repository: connection.create_notification_repository(),
            group_repository: connection.create_group_repository(),
            bill_repository: connection.create_bill_repository(),
        }
    }

    fn build_notification(
        &self,
        bill: &Bill,
        recipient_id: &str,
        sender: &Member,
        notification_type: NotificationType,
        group_id: &str,
    ) -> Notification {
        let message = match notification_type {
            NotificationType::NewBill => new_bill_message(&bill.group_name),
            NotificationType::PaymentPaid => payment_paid_message(&bill.group_name),
        };
        Notification {
            id: Uuid::new_v4().to_string(),
            recipient_id: recipient_id.to_string(),
            sender_id: sender.id.clone(),
            sender_name: sender.display_name.clone(),
            sender_avatar: sender.avatar_ref.clone(),
            notification_type,
            group_id: group_id.to_string(),
            group_name: bill.group_name.clone(),
            bill_id: bill.id.clone(),
            message,
            is_read: false,
            created_at: Utc::now(),
        }
    }

    /// The bill's own group id, else the id of the first group with the same name, else the sentinel
    pub async fn resolve_group_id(&self, group_id: Option<&str>, group_name: &str) -> String {
        if let Some(id) = group_id.filter(|id| is_usable_group_id(id)) {
            return id.to_string();
        }

        match self.group_repository.find_groups_by_name(group_name).await {
            Ok(groups) => match groups.into_iter().next() {
                Some(group) => {
                    info!("Recovered group id {} for '{}'", group.id, group_name);
                    group.id
                }
                None => {
                    warn!("No group named '{}'; keeping {}", group_name, UNKNOWN_GROUP_ID);
                    UNKNOWN_GROUP_ID.to_string()
                }
            },
            Err(e) => {
                warn!("Group lookup for '{}' failed: {}", group_name, e);
                UNKNOWN_GROUP_ID.to_string()
            }
        }
    }

    /// Send `new_bill` to every unpaid member except the creator.
    ///
    /// Individual failures are logged and counted; they never abort the fan-out.
    pub async fn notify_new_bill(&self, bill: &Bill, sender: &Member) -> FanOutReport {
        let group_id = self
            .resolve_group_id(bill.usable_group_id(), &bill.group_name)
            .await;

        let mut report = FanOutReport::default();
        for split in bill.unpaid_splits().filter(|split| split.uid != bill.created_by) {
            let notification =
                self.build_notification(bill, &split.uid, sender, NotificationType::NewBill, &group_id);
            match self.notification_repository.store_notification(&notification).await {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    warn!("Failed to notify {} about bill {}: {}", split.uid, bill.id, e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Bill {} fan-out: {} sent, {} failed",
            bill.id, report.sent, report.failed
        );
        report
    }

    /// Tell the creator that `payer` settled their split
    pub async fn notify_payment_paid(&self, bill: &Bill, payer: &Member) -> Result<Notification> {
        let group_id = self
            .resolve_group_id(bill.usable_group_id(), &bill.group_name)
            .await;
        let notification = self.build_notification(
            bill,
            &bill.created_by,
            payer,
            NotificationType::PaymentPaid,
            &group_id,
        );
        self.notification_repository
            .store_notification(&notification)
            .await?;
        info!("Notified {} that {} paid bill {}", bill.created_by, payer.id, bill.id);
        Ok(notification)
    }

    /// Where opening `notification` should lead; never fails
    pub async fn resolve_target(&self, notification: &Notification) -> RouteTarget {
        match notification.notification_type {
            NotificationType::PaymentPaid => {
                let group_id = self
                    .resolve_group_id(Some(notification.group_id.as_str()), &notification.group_name)
                    .await;
                if is_usable_group_id(&group_id) {
                    RouteTarget::GroupDetail { group_id }
                } else {
                    RouteTarget::Home { notice: None }
                }
            }
            NotificationType::NewBill => match self.bill_repository.get_bill(&notification.bill_id).await {
                Ok(Some(_)) => RouteTarget::BillDetail {
                    bill_id: notification.bill_id.clone(),
                },
                Ok(None) => {
                    warn!("Bill {} behind notification {} is gone", notification.bill_id, notification.id);
                    RouteTarget::Home {
                        notice: Some(BILL_MISSING_NOTICE.to_string()),
                    }
                }
                Err(e) => {
                    warn!("Could not load bill {}: {}", notification.bill_id, e);
                    RouteTarget::Home {
                        notice: Some(BILL_MISSING_NOTICE.to_string()),
                    }
                }
            },
        }
    }

    /// The caller's notifications, newest first
    pub async fn list_for_user(&self, session: &Session) -> Result<Vec<Notification>> {
        let mut notifications = self
            .notification_repository
            .list_notifications_for(session.user_id())
            .await?;
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    pub async fn unread_count(&self, session: &Session) -> Result<usize> {
        Ok(self
            .notification_repository
            .list_notifications_for(session.user_id())
            .await?
            .iter()
            .filter(|notification| !notification.is_read)
            .count())
    }

    async fn own_notification(&self, session: &Session, notification_id: &str) -> Result<Notification> {
        match self.notification_repository.get_notification(notification_id).await? {
            Some(notification) if notification.recipient_id == session.user_id() => Ok(notification),
            _ => Err(DomainError::NotificationNotFound(notification_id.to_string()).into()),
        }
    }

    /// Mark as read; already-read notifications are left untouched
    pub async fn mark_read(&self, session: &Session, notification_id: &str) -> Result<Notification> {
        let mut notification = self.own_notification(session, notification_id).await?;
        if !notification.is_read {
            self.notification_repository.mark_read(notification_id).await?;
            notification.is_read = true;
        }
        Ok(notification)
    }

    /// Mark read, then resolve where the notification leads.
    ///
    /// A failed mark-read is logged and does not block navigation.
    pub async fn open(&self, session: &Session, notification_id: &str) -> Result<RouteTarget> {
        let mut notification = self.own_notification(session, notification_id).await?;
        if !notification.is_read {
            match self.notification_repository.mark_read(notification_id).await {
                Ok(()) => notification.is_read = true,
                Err(e) => warn!("Could not mark notification {} read: {}", notification_id, e),
            }
        }
        Ok(self.resolve_target(&notification).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::CurrentUser;
    use crate::storage::json::test_utils::{
        sample_bill, sample_group, sample_notification, TestEnvironment,
    };
    use crate::storage::JsonConnection;

    fn session(id: &str) -> Session {
        Session::new(CurrentUser {
            id: id.to_string(),
            display_name: id.to_string(),
            photo_ref: None,
        })
    }

    fn member(id: &str, name: &str) -> Member {
        Member {
            id: id.to_string(),
            display_name: name.to_string(),
            avatar_ref: None,
        }
    }

    async fn setup() -> (TestEnvironment, NotificationService<JsonConnection>) {
        let env = TestEnvironment::new().await.unwrap();
        let service = NotificationService::new(Arc::new(env.connection.clone()));
        (env, service)
    }

    #[tokio::test]
    async fn test_new_bill_fans_out_to_unpaid_members_only() {
        let (env, service) = setup().await;
        let bill = sample_bill("b1", "alice", &[("alice", 5.0), ("budi", 7.0), ("cici", 9.0)]);

        let report = service.notify_new_bill(&bill, &member("alice", "Alice")).await;
        assert_eq!(report, FanOutReport { sent: 2, failed: 0 });

        let repo = env.connection.create_notification_repository();
        assert!(repo.list_notifications_for("alice").await.unwrap().is_empty());
        let for_budi = repo.list_notifications_for("budi").await.unwrap();
        assert_eq!(for_budi.len(), 1);
        assert_eq!(for_budi[0].notification_type, NotificationType::NewBill);
        assert_eq!(for_budi[0].sender_name, "Alice");
        assert_eq!(for_budi[0].message, "sent you a bill in the 'Trip Bali' group.");
        assert_eq!(for_budi[0].group_id, "group-1");
    }

    #[tokio::test]
    async fn test_fan_out_continues_past_failed_writes() {
        let (env, service) = setup().await;
        env.fail_writes_to("notifications").unwrap();
        let bill = sample_bill("b1", "alice", &[("budi", 7.0), ("cici", 9.0)]);

        let report = service.notify_new_bill(&bill, &member("alice", "Alice")).await;
        assert_eq!(report, FanOutReport { sent: 0, failed: 2 });
    }

    #[tokio::test]
    async fn test_payment_paid_recovers_group_id_by_name() {
        let (env, service) = setup().await;
        env.connection
            .create_group_repository()
            .store_group(&sample_group("g-real", "Trip Bali", &["alice", "budi"]))
            .await
            .unwrap();

        let mut bill = sample_bill("b1", "alice", &[("budi", 7.0)]);
        bill.group_id = Some(UNKNOWN_GROUP_ID.to_string());

        let sent = service
            .notify_payment_paid(&bill, &member("budi", "Budi"))
            .await
            .unwrap();
        assert_eq!(sent.recipient_id, "alice");
        assert_eq!(sent.group_id, "g-real");
        assert_eq!(sent.message, "has paid their part in the 'Trip Bali' group.");
    }

    #[tokio::test]
    async fn test_unknown_group_resolves_lazily_or_falls_back_home() {
        let (env, service) = setup().await;
        let mut notification = sample_notification("n1", "alice", 0);
        notification.notification_type = NotificationType::PaymentPaid;
        notification.group_id = UNKNOWN_GROUP_ID.to_string();

        assert_eq!(
            service.resolve_target(&notification).await,
            RouteTarget::Home { notice: None }
        );

        env.connection
            .create_group_repository()
            .store_group(&sample_group("g-real", "Trip Bali", &["alice"]))
            .await
            .unwrap();
        assert_eq!(
            service.resolve_target(&notification).await,
            RouteTarget::GroupDetail {
                group_id: "g-real".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_new_bill_target_depends_on_bill_existing() {
        let (env, service) = setup().await;
        let notification = sample_notification("n1", "budi", 0);

        assert_eq!(
            service.resolve_target(&notification).await,
            RouteTarget::Home {
                notice: Some(BILL_MISSING_NOTICE.to_string())
            }
        );

        env.connection
            .create_bill_repository()
            .store_bill(&sample_bill("bill-1", "alice", &[("budi", 1.0)]))
            .await
            .unwrap();
        assert_eq!(
            service.resolve_target(&notification).await,
            RouteTarget::BillDetail {
                bill_id: "bill-1".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_list_sorted_newest_first_and_mark_read_is_idempotent() {
        let (env, service) = setup().await;
        let repo = env.connection.create_notification_repository();
        repo.store_notification(&sample_notification("n1", "budi", 5)).await.unwrap();
        repo.store_notification(&sample_notification("n2", "budi", 30)).await.unwrap();
        repo.store_notification(&sample_notification("n3", "budi", 10)).await.unwrap();

        let listed = service.list_for_user(&session("budi")).await.unwrap();
        let ids: Vec<_> = listed.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["n2", "n3", "n1"]);
        assert_eq!(service.unread_count(&session("budi")).await.unwrap(), 3);

        service.mark_read(&session("budi"), "n1").await.unwrap();
        let again = service.mark_read(&session("budi"), "n1").await.unwrap();
        assert!(again.is_read);
        assert_eq!(service.unread_count(&session("budi")).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_open_marks_read_and_rejects_other_recipients() {
        let (env, service) = setup().await;
        let repo = env.connection.create_notification_repository();
        repo.store_notification(&sample_notification("n1", "budi", 0)).await.unwrap();

        let err = service.open(&session("cici"), "n1").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DomainError>(),
            Some(DomainError::NotificationNotFound(_))
        ));

        let target = service.open(&session("budi"), "n1").await.unwrap();
        assert!(matches!(target, RouteTarget::Home { .. }));
        assert!(repo.get_notification("n1").await.unwrap().unwrap().is_read);
    }

    #[tokio::test]
    async fn test_open_navigates_even_if_mark_read_fails() {
        let (env, service) = setup().await;
        let repo = env.connection.create_notification_repository();
        repo.store_notification(&sample_notification("n1", "budi", 0)).await.unwrap();
        env.connection
            .create_bill_repository()
            .store_bill(&sample_bill("bill-1", "alice", &[("budi", 1.0)]))
            .await
            .unwrap();
        env.fail_writes_to("notifications").unwrap();

        assert_eq!(
            service.open(&session("budi"), "n1").await.unwrap(),
            RouteTarget::BillDetail {
                bill_id: "bill-1".to_string()
            }
        );
        assert!(!repo.get_notification("n1").await.unwrap().unwrap().is_read);
    }
}
