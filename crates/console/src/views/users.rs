use std::collections::HashSet;

use admin_api::{User, UserRole};
use api_client::AdminClient;
use async_trait::async_trait;
use futures_util::future::try_join3;
use sync_engine::filters::{format_amount, is_unconstrained};
use sync_engine::{FilterSet, Page, QueryParams, ViewSource, ALL};

use super::{Column, RowView, SavedFilters, TableSource, TabKind};

const FIELDS: &[&str] = &["role", "search"];

/// The users endpoint is unpaged and only filters by role; `search` and
/// paging are applied locally over the fetched list.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UserFilters {
    pub(crate) role: String,
    pub(crate) search: String,
}

impl Default for UserFilters {
    fn default() -> Self {
        Self {
            role: ALL.to_string(),
            search: String::new(),
        }
    }
}

impl FilterSet for UserFilters {
    fn fields(&self) -> &'static [&'static str] {
        FIELDS
    }

    fn set(&mut self, field: &str, value: &str) -> anyhow::Result<()> {
        let value = value.trim();
        match field {
            "role" => {
                self.role = if is_unconstrained(value) {
                    ALL.to_string()
                } else {
                    UserRole::parse(value)
                        .map(|role| role.as_str().to_string())
                        .ok_or_else(|| {
                            anyhow::anyhow!(
                                "role must be all, TRADER, TEAM_LEAD or MERCHANT, got {value:?}"
                            )
                        })?
                };
            }
            "search" => self.search = value.to_string(),
            other => anyhow::bail!(
                "unknown users filter {other:?} (expected one of {})",
                FIELDS.join(", ")
            ),
        }
        Ok(())
    }

    fn values(&self) -> Vec<(&'static str, String)> {
        vec![("role", self.role.clone()), ("search", self.search.clone())]
    }

    fn apply(&self, query: &mut QueryParams) {
        query.push_choice("role", &self.role);
        query.push_text("search", &self.search);
    }
}

pub(crate) struct UsersSource {
    client: AdminClient,
}

impl UsersSource {
    pub(crate) fn new(client: AdminClient) -> Self {
        Self { client }
    }

    async fn fetch_roles(&self, role: Option<UserRole>) -> anyhow::Result<Vec<User>> {
        match role {
            Some(role) => Ok(self.client.list_users(role).await?.users),
            None => {
                let (traders, leads, merchants) = try_join3(
                    self.client.list_users(UserRole::Trader),
                    self.client.list_users(UserRole::TeamLead),
                    self.client.list_users(UserRole::Merchant),
                )
                .await?;
                Ok(merge_users([traders.users, leads.users, merchants.users]))
            }
        }
    }
}

#[async_trait]
impl ViewSource for UsersSource {
    type Item = User;
    type Filters = UserFilters;

    async fn fetch(&self, query: QueryParams) -> anyhow::Result<Page<User>> {
        let role = query.get("role").and_then(UserRole::parse);
        let mut users = self.fetch_roles(role).await?;
        if let Some(search) = query.get("search") {
            users.retain(|user| matches_search(user, search));
        }
        let page = query
            .get("page")
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(1);
        let limit = query
            .get("limit")
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(users.len().max(1));
        Ok(page_slice(users, page, limit))
    }
}

/// Concatenates per-role lists, dropping users listed under more than one.
fn merge_users<const N: usize>(lists: [Vec<User>; N]) -> Vec<User> {
    let mut seen = HashSet::new();
    lists
        .into_iter()
        .flatten()
        .filter(|user| seen.insert(user.id.clone()))
        .collect()
}

fn matches_search(user: &User, search: &str) -> bool {
    let needle = search.to_lowercase();
    [Some(user.id.as_str()), user.username.as_deref(), user.email.as_deref()]
        .into_iter()
        .flatten()
        .any(|value| value.to_lowercase().contains(&needle))
}

fn page_slice(items: Vec<User>, page: usize, limit: usize) -> Page<User> {
    let total_items = items.len() as u64;
    let limit = limit.max(1);
    let start = page.saturating_sub(1).saturating_mul(limit);
    let items = items.into_iter().skip(start).take(limit).collect();
    Page { items, total_items }
}

const COLUMNS: &[Column] = &[
    Column::new("id", 14),
    Column::new("name", 18),
    Column::new("role", 10),
    Column::new("balance", 12),
    Column::new("traffic", 8),
    Column::new("email", 24),
];

impl TableSource for UsersSource {
    const KIND: TabKind = TabKind::Users;

    fn columns() -> &'static [Column] {
        COLUMNS
    }

    fn row(item: &User) -> RowView {
        let traffic = match item.is_active {
            Some(true) => "on",
            Some(false) => "off",
            None => "",
        };
        RowView {
            id: item.id.clone(),
            cells: vec![
                item.id.clone(),
                item.display_name().to_string(),
                item.role.map(|role| role.as_str()).unwrap_or_default().to_string(),
                item.balance.map(format_amount).unwrap_or_default(),
                traffic.to_string(),
                item.email.clone().unwrap_or_default(),
            ],
            remaining: None,
            is_active: item.is_active,
        }
    }

    fn load_filters(saved: &SavedFilters) -> UserFilters {
        saved.users.clone()
    }

    fn store_filters(filters: UserFilters, saved: &mut SavedFilters) {
        saved.users = filters;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, name: &str) -> User {
        User {
            id: id.to_string(),
            username: Some(name.to_string()),
            email: None,
            role: None,
            balance: None,
            is_active: None,
            created_at: None,
        }
    }

    #[test]
    fn merges_role_lists_without_duplicates() {
        let merged = merge_users([
            vec![user("u-1", "alice"), user("u-2", "bob")],
            vec![user("u-2", "bob")],
            vec![user("u-3", "carol")],
        ]);
        let ids: Vec<_> = merged.iter().map(|user| user.id.as_str()).collect();
        assert_eq!(ids, ["u-1", "u-2", "u-3"]);
    }

    #[test]
    fn slices_pages_locally() {
        let users: Vec<_> = (1..=25).map(|n| user(&format!("u-{n}"), "x")).collect();
        let page = page_slice(users.clone(), 3, 10);
        assert_eq!(page.total_items, 25);
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.items[0].id, "u-21");
        assert!(page_slice(users, 4, 10).items.is_empty());
    }

    #[test]
    fn normalizes_role_filter() {
        let mut filters = UserFilters::default();
        filters.set("role", "team-lead").unwrap();
        assert_eq!(filters.role, "TEAM_LEAD");
        filters.set("role", "").unwrap();
        assert_eq!(filters.role, ALL);
        assert!(filters.set("role", "ADMIN").is_err());

        let mut query = QueryParams::new();
        filters.apply(&mut query);
        assert!(query.is_empty());
    }

    #[test]
    fn searches_name_and_email() {
        let mut bob = user("u-2", "Bob");
        bob.email = Some("bob@desk.example".to_string());
        assert!(matches_search(&bob, "bob"));
        assert!(matches_search(&bob, "DESK"));
        assert!(!matches_search(&bob, "alice"));
    }
}
