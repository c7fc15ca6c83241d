//! # Storage Traits
//!
//! This module defines the storage abstraction traits that allow different
//! storage backends to be used interchangeably in the domain layer. The
//! calculation code never sees these; services fetch through them and hand
//! plain data to the pure functions.

use anyhow::Result;
use async_trait::async_trait;
use shared::{Bill, Group, Notification, SplitStatus, UserProfile};

use crate::domain::session::IdentityProvider;

/// Trait defining the interface for bill storage operations
#[async_trait]
pub trait BillStorage: Send + Sync {
    /// Store a new bill under its own id
    async fn store_bill(&self, bill: &Bill) -> Result<()>;

    /// Retrieve a specific bill by ID
    async fn get_bill(&self, bill_id: &str) -> Result<Option<Bill>>;

    /// Bills whose `involvedMemberIds` contains the user
    async fn list_bills_involving(&self, user_id: &str) -> Result<Vec<Bill>>;

    /// Bills created by the user
    async fn list_bills_created_by(&self, user_id: &str) -> Result<Vec<Bill>>;

    /// Overwrite the stored split array of a bill with a new status for one member.
    ///
    /// Implementations read the current array immediately before writing so
    /// other members' concurrent changes are only lost in a true race.
    async fn set_split_status(&self, bill_id: &str, uid: &str, status: SplitStatus) -> Result<Bill>;
}

/// Trait defining the interface for group storage operations
#[async_trait]
pub trait GroupStorage: Send + Sync {
    async fn store_group(&self, group: &Group) -> Result<()>;

    async fn get_group(&self, group_id: &str) -> Result<Option<Group>>;

    /// Groups whose name is exactly `name`
    async fn find_groups_by_name(&self, name: &str) -> Result<Vec<Group>>;

    /// Groups the user is a member of
    async fn list_groups_for_member(&self, user_id: &str) -> Result<Vec<Group>>;
}

/// Trait defining the interface for notification storage operations
#[async_trait]
pub trait NotificationStorage: Send + Sync {
    async fn store_notification(&self, notification: &Notification) -> Result<()>;

    async fn get_notification(&self, notification_id: &str) -> Result<Option<Notification>>;

    /// All notifications addressed to the recipient, in no particular order
    async fn list_notifications_for(&self, recipient_id: &str) -> Result<Vec<Notification>>;

    /// Set `isRead = true`
    async fn mark_read(&self, notification_id: &str) -> Result<()>;
}

/// Trait defining the interface for user profile storage operations
#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Insert or replace a profile
    async fn store_user(&self, user: &UserProfile) -> Result<()>;

    async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserProfile>>;

    /// Profiles whose username starts with `prefix`, ordered by username
    async fn search_by_username_prefix(&self, prefix: &str) -> Result<Vec<UserProfile>>;
}

/// Trait defining the interface for storage connections
///
/// This trait abstracts away the specific connection type and provides
/// factory methods for creating repositories, so services can be built over
/// any backend without knowing the implementation details.
pub trait Connection: Send + Sync + Clone {
    type BillRepository: BillStorage + Clone;
    type GroupRepository: GroupStorage + Clone;
    type NotificationRepository: NotificationStorage + Clone;
    type UserRepository: UserStorage + Clone;
    type IdentityProvider: IdentityProvider + Clone;

    fn create_bill_repository(&self) -> Self::BillRepository;
    fn create_group_repository(&self) -> Self::GroupRepository;
    fn create_notification_repository(&self) -> Self::NotificationRepository;
    fn create_user_repository(&self) -> Self::UserRepository;
    fn create_identity_provider(&self) -> Self::IdentityProvider;
}
