use thiserror::Error;

/// Reasons a set of orders cannot be finalized into a bill.
///
/// Item positions are zero-based indices into the member's item list.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrderValidationError {
    #[error("No items were ordered")]
    NoOrders,
    #[error("Item {item} of {member} has no name")]
    EmptyItemName { member: String, item: usize },
    #[error("Item {item} of {member} must have a price greater than 0")]
    NonPositivePrice { member: String, item: usize },
    #[error("Item {item} of {member} must have a quantity of at least 1")]
    NonPositiveQuantity { member: String, item: usize },
    #[error("Tax rate must not be negative")]
    NegativeTaxRate,
    #[error("Service charge must not be negative")]
    NegativeServiceCharge,
    #[error("Item {item} of {member} is too large to total")]
    LineTotalTooLarge { member: String, item: usize },
    #[error("Bill total is too large")]
    TotalTooLarge,
}

/// Categorised failures surfaced by the domain services.
///
/// Services return `anyhow::Result`; callers that need to branch on the kind
/// of failure use `err.downcast_ref::<DomainError>()`.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Bill cannot be finalized: {}", format_validation(.0))]
    Validation(Vec<OrderValidationError>),
    #[error("Bill not found: {0}")]
    BillNotFound(String),
    #[error("Group not found: {0}")]
    GroupNotFound(String),
    #[error("Notification not found: {0}")]
    NotificationNotFound(String),
    #[error("User {user_id} is not part of bill {bill_id}")]
    NotAParticipant { bill_id: String, user_id: String },
    #[error("No user is signed in")]
    NotSignedIn,
    #[error("Invalid username: {0}")]
    InvalidUsername(String),
    #[error("Username is already taken: {0}")]
    UsernameTaken(String),
    #[error("Invalid group: {0}")]
    InvalidGroup(String),
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Registration failed: {0}")]
    InvalidRegistration(String),
}

fn format_validation(errors: &[OrderValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
