//! # JSON Storage Module
//!
//! File-backed implementation of the storage traits. Every collection is one
//! JSON document map on disk, so a data directory can be inspected and edited
//! by hand.
//!
//! ## Collections
//!
//! - `users`: profiles keyed by user id
//! - `groups`: groups keyed by group id
//! - `bills`: bills keyed by bill id, splits embedded
//! - `notifications`: one document per recipient per event
//! - `credentials`: salted password digests for local sign-in
//! - `sessions`: the currently signed-in user

pub mod bill_repository;
pub mod connection;
pub mod group_repository;
pub mod identity;
pub mod notification_repository;
pub mod user_repository;

#[cfg(test)]
pub mod test_utils;

pub use bill_repository::BillRepository;
pub use connection::{Filter, JsonConnection, Ordering, PREFIX_RANGE_END};
pub use group_repository::GroupRepository;
pub use identity::LocalIdentityProvider;
pub use notification_repository::NotificationRepository;
pub use user_repository::UserRepository;
