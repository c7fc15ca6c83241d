//! Test utilities for the JSON store
//!
//! `TestEnvironment` keeps its temp directory alive for the test's duration
//! and removes it on drop, even when the test panics.

use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use shared::{
    Bill, Group, Item, Member, Notification, NotificationType, Split, SplitStatus, UserProfile,
    DEFAULT_GROUP_ICON,
};
use tempfile::TempDir;

use super::connection::JsonConnection;

pub struct TestEnvironment {
    pub connection: JsonConnection,
    /// Base directory path for manual inspection if needed
    pub base_path: std::path::PathBuf,
    _temp_dir: TempDir,
}

impl TestEnvironment {
    pub async fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let connection = JsonConnection::new(temp_dir.path())?;
        Ok(Self {
            connection,
            base_path: temp_dir.path().to_path_buf(),
            _temp_dir: temp_dir,
        })
    }

    /// Make every later write to `collection` fail; reads keep working.
    ///
    /// A directory occupies the temp file path the store writes through.
    pub fn fail_writes_to(&self, collection: &str) -> Result<()> {
        std::fs::create_dir_all(self.base_path.join(format!("{}.json.tmp", collection)))?;
        Ok(())
    }
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 10, 12, 0, 0).unwrap()
}

/// A bill in "Trip Bali" with one split per `(uid, amount)` pair.
///
/// The creator's own split, if listed, is already paid.
pub fn sample_bill(id: &str, creator: &str, splits: &[(&str, f64)]) -> Bill {
    let splits: Vec<Split> = splits
        .iter()
        .map(|(uid, amount)| Split {
            uid: uid.to_string(),
            name: uid.to_string(),
            avatar_ref: None,
            total_amount: *amount,
            status: if *uid == creator {
                SplitStatus::Paid
            } else {
                SplitStatus::Unpaid
            },
            items: vec![Item::new("Nasi goreng", *amount, 1)],
        })
        .collect();

    Bill {
        id: id.to_string(),
        group_id: Some("group-1".to_string()),
        group_name: "Trip Bali".to_string(),
        group_icon: DEFAULT_GROUP_ICON.to_string(),
        created_by: creator.to_string(),
        created_at: base_time(),
        tax_rate_percent: 0.0,
        service_charge: 0.0,
        total_amount: splits.iter().map(|split| split.total_amount).sum(),
        involved_member_ids: splits.iter().map(|split| split.uid.clone()).collect(),
        splits,
    }
}

pub fn sample_group(id: &str, name: &str, member_ids: &[&str]) -> Group {
    Group {
        id: id.to_string(),
        name: name.to_string(),
        icon: DEFAULT_GROUP_ICON.to_string(),
        color: "#C8E6C9".to_string(),
        members: member_ids
            .iter()
            .map(|member_id| Member {
                id: member_id.to_string(),
                display_name: member_id.to_string(),
                avatar_ref: None,
            })
            .collect(),
        member_ids: member_ids.iter().map(|member_id| member_id.to_string()).collect(),
        created_by: member_ids.first().unwrap_or(&"alice").to_string(),
        created_at: base_time(),
    }
}

/// An unread new-bill notification created `minutes` after the base time
pub fn sample_notification(id: &str, recipient: &str, minutes: i64) -> Notification {
    Notification {
        id: id.to_string(),
        recipient_id: recipient.to_string(),
        sender_id: "sender".to_string(),
        sender_name: "Sender".to_string(),
        sender_avatar: None,
        notification_type: NotificationType::NewBill,
        group_id: "group-1".to_string(),
        group_name: "Trip Bali".to_string(),
        bill_id: "bill-1".to_string(),
        message: "sent you a bill in the 'Trip Bali' group.".to_string(),
        is_read: false,
        created_at: base_time() + Duration::minutes(minutes),
    }
}

pub fn sample_user(id: &str, username: &str, display_name: &str) -> UserProfile {
    UserProfile {
        id: id.to_string(),
        username: username.to_string(),
        display_name: display_name.to_string(),
        email: None,
        photo_ref: None,
        bank_account: None,
        e_wallet: None,
        created_at: base_time(),
    }
}
