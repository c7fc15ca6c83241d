use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Group id stored when a bill's real group reference was not captured
pub const UNKNOWN_GROUP_ID: &str = "UNKNOWN";

/// Whether `group_id` names a real group rather than the sentinel or nothing
pub fn is_usable_group_id(group_id: &str) -> bool {
    !group_id.is_empty() && group_id != UNKNOWN_GROUP_ID
}

/// Icon used for groups and bills that were created without one
pub const DEFAULT_GROUP_ICON: &str = "🧾";

/// A participant in a group or bill. Identity is issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub display_name: String,
    /// Photo URL or storage reference; `None` renders the placeholder avatar
    #[serde(default)]
    pub avatar_ref: Option<String>,
}

/// A single ordered line: `quantity` units of `name` at `unit_price` each.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub name: String,
    pub unit_price: f64,
    pub quantity: u32,
}

impl Item {
    pub fn new(name: impl Into<String>, unit_price: f64, quantity: u32) -> Self {
        Self {
            name: name.into(),
            unit_price,
            quantity,
        }
    }

    /// Price of the whole line, unrounded
    pub fn line_total(&self) -> f64 {
        self.unit_price * self.quantity as f64
    }
}

/// Everything one member ordered for one bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub member_id: String,
    pub member_name: String,
    pub items: Vec<Item>,
}

/// Payment status of a single split. Only ever moves from `Unpaid` to `Paid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitStatus {
    Paid,
    Unpaid,
}

impl fmt::Display for SplitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitStatus::Paid => write!(f, "paid"),
            SplitStatus::Unpaid => write!(f, "unpaid"),
        }
    }
}

/// One member's share of a bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Split {
    pub uid: String,
    pub name: String,
    #[serde(default)]
    pub avatar_ref: Option<String>,
    /// Subtotal + tax + service share for this member
    pub total_amount: f64,
    pub status: SplitStatus,
    /// Itemized detail; older bills were persisted without it
    #[serde(default)]
    pub items: Vec<Item>,
}

/// The persisted settlement unit.
///
/// Immutable after creation except for `splits[i].status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: String,
    /// May be missing or [`UNKNOWN_GROUP_ID`] on bills created outside a group view
    #[serde(default)]
    pub group_id: Option<String>,
    pub group_name: String,
    #[serde(default = "default_group_icon")]
    pub group_icon: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub tax_rate_percent: f64,
    pub service_charge: f64,
    pub splits: Vec<Split>,
    pub total_amount: f64,
    pub involved_member_ids: Vec<String>,
}

impl Bill {
    /// The stored group id, unless it is missing or the sentinel.
    pub fn usable_group_id(&self) -> Option<&str> {
        self.group_id
            .as_deref()
            .filter(|id| is_usable_group_id(id))
    }

    pub fn split_for(&self, uid: &str) -> Option<&Split> {
        self.splits.iter().find(|split| split.uid == uid)
    }

    pub fn split_for_mut(&mut self, uid: &str) -> Option<&mut Split> {
        self.splits.iter_mut().find(|split| split.uid == uid)
    }

    pub fn unpaid_splits(&self) -> impl Iterator<Item = &Split> {
        self.splits
            .iter()
            .filter(|split| split.status == SplitStatus::Unpaid)
    }
}

fn default_group_icon() -> String {
    DEFAULT_GROUP_ICON.to_string()
}

/// Kind of event a notification reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    NewBill,
    PaymentPaid,
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationType::NewBill => write!(f, "new_bill"),
            NotificationType::PaymentPaid => write!(f, "payment_paid"),
        }
    }
}

/// A message addressed to one recipient about one bill event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub recipient_id: String,
    pub sender_id: String,
    pub sender_name: String,
    #[serde(default)]
    pub sender_avatar: Option<String>,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    /// A group id or [`UNKNOWN_GROUP_ID`]
    pub group_id: String,
    pub group_name: String,
    pub bill_id: String,
    /// Rendered after the sender's name, e.g. "sent you a bill in the 'Trip' group."
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// A social group that bills are split within.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub name: String,
    pub icon: String,
    /// Background colour as a `#RRGGBB` string
    pub color: String,
    pub members: Vec<Member>,
    pub member_ids: Vec<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Profile document stored in the `users` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    /// Lower-case handle friends search for
    pub username: String,
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub photo_ref: Option<String>,
    #[serde(default)]
    pub bank_account: Option<String>,
    #[serde(default)]
    pub e_wallet: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One outstanding split the user owes to a bill creator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtItem {
    pub bill_id: String,
    pub creditor_id: String,
    pub creditor_name: String,
    pub amount: f64,
    pub group_name: String,
    pub date: DateTime<Utc>,
}

/// A user's unpaid position, largest debts first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtOverview {
    pub total_unpaid: f64,
    pub debts: Vec<DebtItem>,
}

/// Where clicking a notification leads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum RouteTarget {
    BillDetail { bill_id: String },
    GroupDetail { group_id: String },
    Home { notice: Option<String> },
}

/// Request to split and persist a new bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBillRequest {
    #[serde(default)]
    pub group_id: Option<String>,
    pub group_name: String,
    #[serde(default)]
    pub group_icon: Option<String>,
    /// Members other than the signed-in user; the creator is added automatically
    pub members: Vec<Member>,
    pub orders: Vec<Order>,
    pub tax_rate_percent: f64,
    pub service_charge: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBillResponse {
    pub bill: Bill,
    /// Notifications that were written successfully
    pub notifications_sent: usize,
    /// Notifications that failed; the bill itself was still saved
    pub notification_failures: usize,
    pub success_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color_index: usize,
    /// Selected friends; the creator is added automatically
    pub friends: Vec<Member>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub bank_account: Option<String>,
    pub e_wallet: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_bill(group_id: Option<&str>) -> Bill {
        Bill {
            id: "bill-1".to_string(),
            group_id: group_id.map(str::to_string),
            group_name: "Trip Bali".to_string(),
            group_icon: DEFAULT_GROUP_ICON.to_string(),
            created_by: "a".to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 11, 10, 12, 0, 0).unwrap(),
            tax_rate_percent: 10.0,
            service_charge: 3000.0,
            splits: vec![Split {
                uid: "b".to_string(),
                name: "Budi".to_string(),
                avatar_ref: None,
                total_amount: 23000.0,
                status: SplitStatus::Unpaid,
                items: vec![Item::new("Nasi goreng", 20000.0, 1)],
            }],
            total_amount: 23000.0,
            involved_member_ids: vec!["b".to_string()],
        }
    }

    #[test]
    fn test_usable_group_id_rejects_sentinel_and_missing() {
        assert_eq!(sample_bill(Some("g1")).usable_group_id(), Some("g1"));
        assert_eq!(sample_bill(Some(UNKNOWN_GROUP_ID)).usable_group_id(), None);
        assert_eq!(sample_bill(Some("")).usable_group_id(), None);
        assert_eq!(sample_bill(None).usable_group_id(), None);
    }

    #[test]
    fn test_bill_serializes_with_document_field_names() {
        let value = serde_json::to_value(sample_bill(Some("g1"))).unwrap();
        assert_eq!(value["createdBy"], "a");
        assert_eq!(value["involvedMemberIds"][0], "b");
        assert_eq!(value["splits"][0]["status"], "unpaid");
        assert_eq!(value["splits"][0]["items"][0]["unitPrice"], 20000.0);
    }

    #[test]
    fn test_split_without_items_deserializes() {
        let split: Split = serde_json::from_value(serde_json::json!({
            "uid": "b",
            "name": "Budi",
            "totalAmount": 12000.0,
            "status": "paid"
        }))
        .unwrap();
        assert!(split.items.is_empty());
        assert_eq!(split.status, SplitStatus::Paid);
    }

    #[test]
    fn test_notification_type_uses_wire_names() {
        let value = serde_json::to_value(NotificationType::PaymentPaid).unwrap();
        assert_eq!(value, "payment_paid");
        assert_eq!(NotificationType::NewBill.to_string(), "new_bill");
    }

    #[test]
    fn test_item_line_total() {
        assert_eq!(Item::new("Es teh", 5000.0, 2).line_total(), 10000.0);
    }
}
