use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Trader,
    TeamLead,
    Merchant,
}

impl UserRole {
    pub const ALL: [UserRole; 3] = [UserRole::Trader, UserRole::TeamLead, UserRole::Merchant];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Trader => "TRADER",
            UserRole::TeamLead => "TEAM_LEAD",
            UserRole::Merchant => "MERCHANT",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<UserRole>,
    #[serde(default)]
    pub balance: Option<f64>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl User {
    pub fn display_name(&self) -> &str {
        self.username
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(self.id.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsersPage {
    #[serde(default)]
    pub users: Vec<User>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_role_variants() {
        assert_eq!(UserRole::parse("team-lead"), Some(UserRole::TeamLead));
        assert_eq!(UserRole::parse(" trader "), Some(UserRole::Trader));
        assert_eq!(UserRole::parse("all"), None);
    }

    #[test]
    fn decodes_user_role() {
        let user: User =
            serde_json::from_str(r#"{"id":"u-1","email":"a@b.c","role":"TEAM_LEAD"}"#).unwrap();
        assert_eq!(user.role, Some(UserRole::TeamLead));
        assert_eq!(user.display_name(), "a@b.c");
    }
}
