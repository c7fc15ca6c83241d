//! Domain-level command and query types.
//!
//! These are used between services and their callers inside the backend.
//! Public request/response DTOs live in the `shared` crate.

pub mod bills {
    use shared::{Bill, Notification};

    /// Query for the signed-in user's bill history
    #[derive(Debug, Clone, Default)]
    pub struct HistoryQuery {
        /// Case-insensitive substring of the group name
        pub search: Option<String>,
    }

    /// Result of settling the caller's own split.
    #[derive(Debug, Clone)]
    pub struct MarkPaidResult {
        pub bill: Bill,
        /// The split was already paid; nothing was written
        pub already_paid: bool,
        /// Notification delivered to the creator, if one was sent
        pub notification: Option<Notification>,
    }

    /// Outcome of a notification fan-out
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct FanOutReport {
        pub sent: usize,
        pub failed: usize,
    }
}

pub mod users {
    /// Input for the friend search box
    #[derive(Debug, Clone, Default)]
    pub struct SearchFriendsQuery {
        pub query: String,
        /// Ids already picked for the group being created
        pub selected_ids: Vec<String>,
    }
}
