//! Tab-level glue between the console and `sync_engine::ViewRuntime`.

mod deals;
mod disputes;
mod users;

use chrono::{DateTime, Utc};
use sync_engine::{
    filters::is_unconstrained, FilterSet, PaginationState, ViewContext, ViewRuntime, ViewSource,
    ALL,
};

pub(crate) use deals::{DealFilters, DealsSource};
pub(crate) use disputes::{DisputeFilters, DisputesSource};
pub(crate) use users::{UserFilters, UsersSource};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum TabKind {
    #[default]
    Deals,
    Disputes,
    Users,
}

impl TabKind {
    pub(crate) const ALL: [TabKind; 3] = [TabKind::Deals, TabKind::Disputes, TabKind::Users];

    pub(crate) fn title(self) -> &'static str {
        match self {
            TabKind::Deals => "Deals",
            TabKind::Disputes => "Disputes",
            TabKind::Users => "Users",
        }
    }

    /// Scope name used for the view context, logs and notifications.
    pub(crate) fn scope(self) -> &'static str {
        match self {
            TabKind::Deals => "deals",
            TabKind::Disputes => "disputes",
            TabKind::Users => "users",
        }
    }

    pub(crate) fn next(self) -> Self {
        match self {
            TabKind::Deals => TabKind::Disputes,
            TabKind::Disputes => TabKind::Users,
            TabKind::Users => TabKind::Deals,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Column {
    pub(crate) title: &'static str,
    pub(crate) width: usize,
}

impl Column {
    pub(crate) const fn new(title: &'static str, width: usize) -> Self {
        Self { title, width }
    }
}

/// One rendered row; `remaining` is filled from the countdown state.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct RowView {
    pub(crate) id: String,
    pub(crate) cells: Vec<String>,
    pub(crate) remaining: Option<u64>,
    pub(crate) is_active: Option<bool>,
}

/// Filter records kept across tab switches.
#[derive(Clone, Debug, Default)]
pub(crate) struct SavedFilters {
    pub(crate) deals: DealFilters,
    pub(crate) disputes: DisputeFilters,
    pub(crate) users: UserFilters,
}

pub(crate) trait TableSource: ViewSource {
    const KIND: TabKind;

    fn columns() -> &'static [Column];

    fn countdown_header() -> Option<&'static str> {
        None
    }

    fn row(item: &Self::Item) -> RowView;

    fn load_filters(saved: &SavedFilters) -> Self::Filters;

    fn store_filters(filters: Self::Filters, saved: &mut SavedFilters);
}

pub(crate) struct TabSnapshot {
    pub(crate) kind: TabKind,
    pub(crate) columns: &'static [Column],
    pub(crate) countdown_header: Option<&'static str>,
    pub(crate) rows: Vec<RowView>,
    pub(crate) pagination: PaginationState,
    pub(crate) filters: Vec<(&'static str, String)>,
    pub(crate) polling: bool,
    pub(crate) fetched_at: Option<DateTime<Utc>>,
}

/// Object-safe surface of a mounted tab.
pub(crate) trait Tab {
    fn kind(&self) -> TabKind;
    fn snapshot(&self) -> TabSnapshot;
    fn filter_fields(&self) -> &'static [&'static str];
    fn set_filter(&self, field: &str, value: &str) -> anyhow::Result<()>;
    fn clear_filters(&self);
    fn next_page(&self) -> bool;
    fn prev_page(&self) -> bool;
    fn refresh_now(&self);
    fn toggle_polling(&self) -> anyhow::Result<bool>;
    fn context(&self) -> &ViewContext;
    fn save_filters(&self, saved: &mut SavedFilters);
    fn teardown(&self);
}

impl<S: TableSource> Tab for ViewRuntime<S> {
    fn kind(&self) -> TabKind {
        S::KIND
    }

    fn snapshot(&self) -> TabSnapshot {
        let collection = self.current();
        let timers = self.timers();
        let rows = collection
            .items
            .iter()
            .map(|item| {
                let mut row = S::row(item);
                row.remaining = timers.get(&row.id).copied();
                row
            })
            .collect();
        TabSnapshot {
            kind: S::KIND,
            columns: S::columns(),
            countdown_header: S::countdown_header(),
            rows,
            pagination: self.pagination(),
            filters: self.filters().values(),
            polling: self.is_polling(),
            fetched_at: collection.fetched_at,
        }
    }

    fn filter_fields(&self) -> &'static [&'static str] {
        self.filters().fields()
    }

    fn set_filter(&self, field: &str, value: &str) -> anyhow::Result<()> {
        ViewRuntime::set_filter(self, field, value)
    }

    fn clear_filters(&self) {
        ViewRuntime::clear_filters(self)
    }

    fn next_page(&self) -> bool {
        ViewRuntime::next_page(self)
    }

    fn prev_page(&self) -> bool {
        ViewRuntime::prev_page(self)
    }

    fn refresh_now(&self) {
        ViewRuntime::refresh_now(self)
    }

    fn toggle_polling(&self) -> anyhow::Result<bool> {
        ViewRuntime::toggle_polling(self)
    }

    fn context(&self) -> &ViewContext {
        ViewRuntime::context(self)
    }

    fn save_filters(&self, saved: &mut SavedFilters) {
        S::store_filters(self.filters(), saved);
    }

    fn teardown(&self) {
        ViewRuntime::teardown(self)
    }
}

/// Normalizes an enumerated filter value; the sentinel and empty input both
/// mean "no constraint".
pub(crate) fn choice(field: &str, value: &str, allowed: &[&str]) -> anyhow::Result<String> {
    if is_unconstrained(value) {
        return Ok(ALL.to_string());
    }
    let normalized = value.trim().to_ascii_uppercase();
    if allowed.contains(&normalized.as_str()) {
        Ok(normalized)
    } else {
        anyhow::bail!("{field} must be all or one of {}", allowed.join(", "))
    }
}
