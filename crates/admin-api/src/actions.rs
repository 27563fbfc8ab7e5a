use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisputeAction {
    Accept,
    Reject,
    Freeze,
}

impl DisputeAction {
    pub fn path(&self) -> &'static str {
        match self {
            DisputeAction::Accept => "/admin/disputes/accept",
            DisputeAction::Reject => "/admin/disputes/reject",
            DisputeAction::Freeze => "/admin/disputes/freeze",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DisputeAction::Accept => "accept",
            DisputeAction::Reject => "reject",
            DisputeAction::Freeze => "freeze",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DisputeDecision {
    pub dispute_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Body of `PATCH /admin/traffic/edit`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrafficEdit {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_uses_camel_case_and_skips_empty_comment() {
        let body = DisputeDecision {
            dispute_id: "d-1".to_string(),
            comment: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"disputeId": "d-1"})
        );
    }

    #[test]
    fn traffic_edit_serializes_only_changed_fields() {
        let body = TrafficEdit {
            id: "tr-1".to_string(),
            priority: Some(3),
            is_active: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"id": "tr-1", "priority": 3})
        );
    }
}
