use serde::{Deserialize, Serialize};

pub mod actions;
pub mod disputes;
pub mod orders;
pub mod users;

pub use actions::{DisputeAction, DisputeDecision, TrafficEdit};
pub use disputes::{Dispute, DisputesPage, DISPUTE_STATUSES};
pub use orders::{Order, OrdersPage, ORDER_STATUSES};
pub use users::{User, UserRole, UsersPage};

/// Pagination block returned next to every paged collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageInfo {
    #[serde(default)]
    pub current_page: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_items: u64,
}

/// Error body shape the backend uses for non-2xx responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn detail(&self) -> Option<&str> {
        self.message
            .as_deref()
            .or(self.error.as_deref())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}
