use serde::{Deserialize, Serialize};

use crate::PageInfo;

pub const DISPUTE_STATUSES: &[&str] = &["PENDING", "ACCEPTED", "REJECTED", "FROZEN"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dispute {
    pub id: String,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub trader_id: Option<String>,
    #[serde(default)]
    pub merchant_id: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    /// Instant at which the dispute is accepted automatically.
    #[serde(default)]
    pub accept_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisputesPage {
    #[serde(default)]
    pub disputes: Vec<Dispute>,
    #[serde(default)]
    pub pagination: PageInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_disputes_without_pagination() {
        let input = r#"{"disputes":[{"id":"d-1","order_id":"o-7","status":"PENDING","accept_at":"2024-03-05T10:15:00.000Z"}]}"#;
        let page: DisputesPage = serde_json::from_str(input).unwrap();
        assert_eq!(page.disputes[0].order_id.as_deref(), Some("o-7"));
        assert_eq!(page.pagination, PageInfo::default());
    }
}
