//! # Storage Module
//!
//! Storage traits consumed by the domain services, plus the JSON document
//! store that implements them.

pub mod json;
pub mod traits;

pub use json::JsonConnection;
pub use traits::{BillStorage, Connection, GroupStorage, NotificationStorage, UserStorage};
