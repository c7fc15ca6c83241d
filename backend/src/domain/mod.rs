//! # Domain Module
//!
//! Bill splitting and settlement logic. The calculation modules
//! (`money`, `bill_form`, `split_calculator`, `receipt`, and the pure
//! halves of `bill_service` and `debt_service`) never touch storage; the
//! services fetch through the storage traits and hand plain data to them.

pub mod bill_form;
pub mod bill_service;
pub mod commands;
pub mod debt_service;
pub mod error;
pub mod group_service;
pub mod money;
pub mod notification_service;
pub mod receipt;
pub mod session;
pub mod split_calculator;
pub mod user_service;

pub use bill_service::BillService;
pub use debt_service::DebtService;
pub use error::{DomainError, OrderValidationError};
pub use group_service::GroupService;
pub use notification_service::NotificationService;
pub use session::{IdentityProvider, Session, SessionEvent};
pub use user_service::UserService;
