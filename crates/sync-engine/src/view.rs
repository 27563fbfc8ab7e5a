use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::countdown::{CountdownEngine, TimedEntity, TimerState};
use crate::debounce::Debouncer;
use crate::filters::{FilterSet, QueryParams};
use crate::notify::Notifier;
use crate::pagination::PaginationState;
use crate::polling::{FetchFn, Poller};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Lifecycle handle of one mounted view.
#[derive(Clone)]
pub struct ViewContext {
    name: Arc<str>,
    token: CancellationToken,
    notifier: Notifier,
}

impl ViewContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_parent(name, &CancellationToken::new())
    }

    /// Context that also ends when `parent` (e.g. app shutdown) is cancelled.
    pub fn with_parent(name: impl Into<String>, parent: &CancellationToken) -> Self {
        let name: String = name.into();
        Self {
            notifier: Notifier::new(name.clone()),
            name: Arc::from(name),
            token: parent.child_token(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }

    pub fn teardown(&self) {
        if self.is_active() {
            info!(event = "view.teardown", view = %self.name, "view torn down");
        }
        self.token.cancel();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_items: u64,
}

/// Collection currently displayed by a view.
#[derive(Debug, Clone)]
pub struct Collection<T> {
    pub items: Vec<T>,
    pub total_items: u64,
    /// Sequence number of the request whose response is displayed; 0 before
    /// the first response.
    pub request_seq: u64,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total_items: 0,
            request_seq: 0,
            fetched_at: None,
        }
    }
}

/// Backend half of a view: how to fetch one page and which deadline each
/// row carries.
#[async_trait]
pub trait ViewSource: Send + Sync + 'static {
    type Item: Clone + Send + Sync + 'static;
    type Filters: FilterSet;

    async fn fetch(&self, query: QueryParams) -> anyhow::Result<Page<Self::Item>>;

    fn timed_entity(&self, _item: &Self::Item) -> Option<TimedEntity> {
        None
    }
}

#[derive(Debug, Clone)]
pub struct ViewOptions {
    pub page_size: u32,
    pub debounce: Duration,
    pub poll_interval: Duration,
    pub poll_on_mount: bool,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            debounce: DEFAULT_DEBOUNCE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_on_mount: true,
        }
    }
}

/// Filter record plus page cursor; together they define the next request.
#[derive(Debug, Clone)]
pub struct QueryState<F> {
    pub filters: F,
    pub pagination: PaginationState,
}

impl<F: FilterSet> QueryState<F> {
    pub fn new(filters: F, page_size: u32) -> Self {
        Self {
            filters,
            pagination: PaginationState::new(page_size),
        }
    }

    pub fn to_query(&self) -> QueryParams {
        let mut query = QueryParams::new();
        self.filters.apply(&mut query);
        query.push("page", self.pagination.page());
        query.push("limit", self.pagination.page_size());
        query
    }
}

/// One mounted view: filters, pagination, debounced fetches, polling and
/// countdowns, all torn down together.
pub struct ViewRuntime<S: ViewSource> {
    shared: Arc<Shared<S>>,
    debouncer: Debouncer<QueryParams>,
    poller: Poller,
    options: ViewOptions,
}

struct Shared<S: ViewSource> {
    ctx: ViewContext,
    source: S,
    query: Mutex<QueryState<S::Filters>>,
    store: watch::Sender<Collection<S::Item>>,
    clock: Arc<dyn Clock>,
    countdown: CountdownEngine,
    next_seq: AtomicU64,
    applied_seq: AtomicU64,
}

impl<S: ViewSource> ViewRuntime<S> {
    pub fn new(ctx: ViewContext, source: S, options: ViewOptions, clock: Arc<dyn Clock>) -> Self {
        Self::with_filters(ctx, source, options, clock, S::Filters::default())
    }

    pub fn with_filters(
        ctx: ViewContext,
        source: S,
        options: ViewOptions,
        clock: Arc<dyn Clock>,
        filters: S::Filters,
    ) -> Self {
        let (store, _) = watch::channel(Collection::default());
        let countdown = CountdownEngine::new(Arc::clone(&clock), ctx.child_token());
        let shared = Arc::new(Shared {
            query: Mutex::new(QueryState::new(filters, options.page_size)),
            ctx: ctx.clone(),
            source,
            store,
            clock,
            countdown,
            next_seq: AtomicU64::new(0),
            applied_seq: AtomicU64::new(0),
        });
        let debounce_target = Arc::clone(&shared);
        let debouncer = Debouncer::new(options.debounce, ctx.token(), move |query| {
            Arc::clone(&debounce_target).fetch_reporting(query).boxed()
        });
        let poller = Poller::new(ctx.name(), ctx.child_token(), ctx.notifier().clone());
        Self {
            shared,
            debouncer,
            poller,
            options,
        }
    }

    /// Initial fetch, then polling when configured.
    pub fn mount(&self) -> anyhow::Result<()> {
        info!(event = "view.mount", view = %self.shared.ctx.name(), "view mounted");
        self.refresh_now();
        if self.options.poll_on_mount {
            self.enable_polling(self.options.poll_interval)?;
        }
        Ok(())
    }

    pub fn set_filter(&self, field: &str, value: &str) -> anyhow::Result<()> {
        let query = {
            let mut state = self.shared.lock_query();
            state.filters.set(field, value)?;
            state.pagination.reset();
            state.to_query()
        };
        self.debouncer.schedule(query);
        Ok(())
    }

    pub fn replace_filters(&self, filters: S::Filters) {
        let query = {
            let mut state = self.shared.lock_query();
            state.filters = filters;
            state.pagination.reset();
            state.to_query()
        };
        self.debouncer.schedule(query);
    }

    pub fn clear_filters(&self) {
        self.replace_filters(S::Filters::default());
    }

    pub fn go_to_page(&self, page: u32) -> bool {
        self.navigate(|pagination| pagination.go_to(page))
    }

    pub fn next_page(&self) -> bool {
        self.navigate(PaginationState::next)
    }

    pub fn prev_page(&self) -> bool {
        self.navigate(PaginationState::prev)
    }

    /// Immediate fetch outside the debounce window (mount, manual refresh,
    /// after a mutation).
    pub fn refresh_now(&self) {
        if !self.shared.ctx.is_active() {
            return;
        }
        let query = self.shared.current_query();
        tokio::spawn(Arc::clone(&self.shared).fetch_reporting(query));
    }

    pub fn enable_polling(&self, interval: Duration) -> anyhow::Result<()> {
        let shared = Arc::clone(&self.shared);
        let fetch: FetchFn = Arc::new(move || {
            let shared = Arc::clone(&shared);
            async move {
                let query = shared.current_query();
                shared.fetch_settled(query).await
            }
            .boxed()
        });
        self.poller.enable(interval, fetch)
    }

    pub fn disable_polling(&self) {
        self.poller.disable();
    }

    /// Returns whether polling is enabled afterwards.
    pub fn toggle_polling(&self) -> anyhow::Result<bool> {
        if self.poller.is_enabled() {
            self.poller.disable();
            Ok(false)
        } else {
            self.enable_polling(self.options.poll_interval)?;
            Ok(true)
        }
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_enabled()
    }

    /// Cancels countdown, polling and debounce; discards timer state. Late
    /// responses are dropped.
    pub fn teardown(&self) {
        self.shared.ctx.teardown();
        self.debouncer.cancel();
        self.poller.disable();
        self.shared.countdown.clear();
    }

    pub fn is_active(&self) -> bool {
        self.shared.ctx.is_active()
    }

    pub fn subscribe(&self) -> watch::Receiver<Collection<S::Item>> {
        self.shared.store.subscribe()
    }

    pub fn current(&self) -> Collection<S::Item> {
        self.shared.store.borrow().clone()
    }

    pub fn timers(&self) -> TimerState {
        self.shared.countdown.snapshot()
    }

    pub fn remaining(&self, id: &str) -> Option<u64> {
        self.shared.countdown.remaining(id)
    }

    pub fn countdown(&self) -> &CountdownEngine {
        &self.shared.countdown
    }

    pub fn pagination(&self) -> PaginationState {
        self.shared.lock_query().pagination
    }

    pub fn filters(&self) -> S::Filters {
        self.shared.lock_query().filters.clone()
    }

    pub fn query(&self) -> QueryParams {
        self.shared.current_query()
    }

    pub fn context(&self) -> &ViewContext {
        &self.shared.ctx
    }

    pub fn source(&self) -> &S {
        &self.shared.source
    }

    fn navigate(&self, step: impl FnOnce(&mut PaginationState) -> bool) -> bool {
        let query = {
            let mut state = self.shared.lock_query();
            if !step(&mut state.pagination) {
                return false;
            }
            state.to_query()
        };
        self.debouncer.schedule(query);
        true
    }
}

impl<S: ViewSource> Drop for ViewRuntime<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<S: ViewSource> Shared<S> {
    fn lock_query(&self) -> MutexGuard<'_, QueryState<S::Filters>> {
        self.query.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_query(&self) -> QueryParams {
        self.lock_query().to_query()
    }

    async fn fetch_reporting(self: Arc<Self>, query: QueryParams) {
        if let Err(err) = self.fetch_settled(query).await {
            if self.ctx.is_active() {
                self.ctx.notifier().error(
                    format!("Failed to load {}", self.ctx.name()),
                    Some(format!("{err:#}")),
                );
            }
        }
    }

    /// Fetches and applies; when the response pulled the page back inside
    /// the range, fetches the clamped page too.
    async fn fetch_settled(&self, mut query: QueryParams) -> anyhow::Result<()> {
        while let Some(clamped) = self.fetch_and_apply(query).await? {
            debug!(
                event = "view.page_clamped",
                view = %self.ctx.name(),
                "page out of range after refresh, refetching"
            );
            query = clamped;
        }
        Ok(())
    }

    /// Returns the query for the clamped page when the current page no
    /// longer exists.
    async fn fetch_and_apply(&self, query: QueryParams) -> anyhow::Result<Option<QueryParams>> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            event = "view.fetch",
            view = %self.ctx.name(),
            seq = seq,
            query = %query.to_query_string(),
            "fetching collection"
        );
        let page = self.source.fetch(query).await?;
        if !self.ctx.is_active() {
            debug!(
                event = "view.response_dropped",
                view = %self.ctx.name(),
                seq = seq,
                "view torn down before response"
            );
            return Ok(None);
        }

        let previous = self.applied_seq.swap(seq, Ordering::SeqCst);
        if previous > seq {
            debug!(
                event = "view.out_of_order",
                view = %self.ctx.name(),
                seq = seq,
                newer_seq = previous,
                "older response arrived last and replaces newer data"
            );
        }

        let entities: Vec<TimedEntity> = page
            .items
            .iter()
            .filter_map(|item| self.source.timed_entity(item))
            .collect();
        let clamped = {
            let mut state = self.lock_query();
            if state.pagination.apply_total(page.total_items) {
                Some(state.to_query())
            } else {
                None
            }
        };
        self.store.send_replace(Collection {
            items: page.items,
            total_items: page.total_items,
            request_seq: seq,
            fetched_at: Some(self.clock.now()),
        });
        self.countdown.start(&entities);
        Ok(clamped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TokioClock;
    use crate::filters::ALL;
    use chrono::TimeZone;
    use std::sync::atomic::AtomicUsize;

    #[derive(Clone, Default, Debug)]
    struct StatusFilters {
        status: String,
        search: String,
    }

    impl FilterSet for StatusFilters {
        fn fields(&self) -> &'static [&'static str] {
            &["status", "search"]
        }

        fn set(&mut self, field: &str, value: &str) -> anyhow::Result<()> {
            match field {
                "status" => self.status = value.to_string(),
                "search" => self.search = value.to_string(),
                other => anyhow::bail!("unknown filter field {other}"),
            }
            Ok(())
        }

        fn values(&self) -> Vec<(&'static str, String)> {
            vec![("status", self.status.clone()), ("search", self.search.clone())]
        }

        fn apply(&self, query: &mut QueryParams) {
            query.push_choice("status", &self.status);
            query.push_text("search", &self.search);
        }
    }

    #[derive(Clone, Debug)]
    struct Row {
        id: String,
        deadline: Option<String>,
    }

    struct FakeSource {
        queries: Arc<Mutex<Vec<QueryParams>>>,
        calls: Arc<AtomicUsize>,
        fail_calls: Vec<usize>,
        total_items: Arc<AtomicU64>,
        rows: Vec<Row>,
        delay: Duration,
    }

    impl FakeSource {
        fn new(total_items: u64) -> Self {
            Self {
                queries: Arc::new(Mutex::new(Vec::new())),
                calls: Arc::new(AtomicUsize::new(0)),
                fail_calls: Vec::new(),
                total_items: Arc::new(AtomicU64::new(total_items)),
                rows: Vec::new(),
                delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl ViewSource for FakeSource {
        type Item = Row;
        type Filters = StatusFilters;

        async fn fetch(&self, query: QueryParams) -> anyhow::Result<Page<Row>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.queries.lock().unwrap().push(query);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail_calls.contains(&call) {
                anyhow::bail!("HTTP 502");
            }
            Ok(Page {
                items: self.rows.clone(),
                total_items: self.total_items.load(Ordering::SeqCst),
            })
        }

        fn timed_entity(&self, item: &Row) -> Option<TimedEntity> {
            Some(TimedEntity::from_raw(item.id.clone(), item.deadline.as_deref()))
        }
    }

    fn options(poll_on_mount: bool) -> ViewOptions {
        ViewOptions {
            page_size: 10,
            debounce: Duration::from_millis(500),
            poll_interval: Duration::from_secs(10),
            poll_on_mount,
        }
    }

    fn clock() -> Arc<dyn Clock> {
        Arc::new(TokioClock::anchored_at(
            Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap(),
        ))
    }

    fn runtime(source: FakeSource, poll_on_mount: bool) -> ViewRuntime<FakeSource> {
        ViewRuntime::new(ViewContext::new("deals"), source, options(poll_on_mount), clock())
    }

    #[tokio::test(start_paused = true)]
    async fn mount_fetches_once_without_debounce() {
        let source = FakeSource::new(95);
        let queries = Arc::clone(&source.queries);
        let view = runtime(source, false);
        view.mount().unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let queries = queries.lock().unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].get("page"), Some("1"));
        assert_eq!(queries[0].get("limit"), Some("10"));
        assert_eq!(view.pagination().total_pages(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn fetched_at_follows_the_view_clock() {
        let mut source = FakeSource::new(5);
        source.delay = Duration::from_secs(2);
        let view = runtime(source, false);
        view.mount().unwrap();
        tokio::time::sleep(Duration::from_millis(2_100)).await;
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 2).unwrap();
        assert_eq!(view.current().fetched_at, Some(expected));
    }

    #[tokio::test(start_paused = true)]
    async fn filter_burst_issues_one_fetch_with_last_value() {
        let source = FakeSource::new(95);
        let queries = Arc::clone(&source.queries);
        let view = runtime(source, false);
        for value in ["PE", "PEN", "PEND", "PENDING"] {
            view.set_filter("status", value).unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        tokio::time::sleep(Duration::from_secs(2)).await;
        let queries = queries.lock().unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].get("status"), Some("PENDING"));
    }

    #[tokio::test(start_paused = true)]
    async fn sentinel_is_never_sent() {
        let source = FakeSource::new(5);
        let queries = Arc::clone(&source.queries);
        let view = runtime(source, false);
        view.set_filter("status", ALL).unwrap();
        view.set_filter("search", "o-1").unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        let queries = queries.lock().unwrap();
        assert_eq!(queries.len(), 1);
        assert!(!queries[0].contains("status"));
        assert_eq!(queries[0].get("search"), Some("o-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn filter_change_resets_page() {
        let source = FakeSource::new(95);
        let queries = Arc::clone(&source.queries);
        let view = runtime(source, false);
        view.mount().unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(view.go_to_page(4));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(queries.lock().unwrap().last().unwrap().get("page"), Some("4"));

        view.set_filter("status", "COMPLETED").unwrap();
        assert_eq!(view.pagination().page(), 1);
        tokio::time::sleep(Duration::from_secs(1)).await;
        let queries = queries.lock().unwrap();
        let last = queries.last().unwrap();
        assert_eq!(last.get("page"), Some("1"));
        assert_eq!(last.get("status"), Some("COMPLETED"));
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_range_navigation_is_ignored() {
        let source = FakeSource::new(95);
        let calls = Arc::clone(&source.calls);
        let view = runtime(source, false);
        view.mount().unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!view.go_to_page(11));
        assert!(!view.go_to_page(0));
        assert!(!view.prev_page());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_field_is_rejected_without_fetch() {
        let source = FakeSource::new(5);
        let calls = Arc::clone(&source.calls);
        let view = runtime(source, false);
        assert!(view.set_filter("colour", "red").is_err());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn polling_survives_failure_and_reports_it() {
        let mut source = FakeSource::new(5);
        source.fail_calls = vec![2];
        let calls = Arc::clone(&source.calls);
        let view = runtime(source, true);
        view.mount().unwrap();
        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(view.context().notifier().len(), 1);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(view.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_keeps_previous_collection() {
        let mut source = FakeSource::new(1);
        source.rows = vec![Row {
            id: "o-1".to_string(),
            deadline: None,
        }];
        source.fail_calls = vec![2];
        let view = runtime(source, false);
        view.mount().unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        view.refresh_now();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(view.current().items.len(), 1);
        assert_eq!(view.current().request_seq, 1);
        let latest = view.context().notifier().latest().unwrap();
        assert_eq!(latest.text(), "Failed to load deals: HTTP 502");
    }

    #[tokio::test(start_paused = true)]
    async fn derives_countdowns_from_rows() {
        let mut source = FakeSource::new(2);
        source.rows = vec![
            Row {
                id: "o-1".to_string(),
                deadline: Some("2024-03-05T10:02:05Z".to_string()),
            },
            Row {
                id: "o-2".to_string(),
                deadline: Some("garbage".to_string()),
            },
        ];
        let view = runtime(source, false);
        view.mount().unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(view.remaining("o-1"), Some(125_000));
        assert_eq!(view.remaining("o-2"), None);
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(view.remaining("o-1"), Some(119_000));
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_cancels_every_timer() {
        let mut source = FakeSource::new(1);
        source.rows = vec![Row {
            id: "o-1".to_string(),
            deadline: Some("2024-03-05T11:00:00Z".to_string()),
        }];
        let calls = Arc::clone(&source.calls);
        let view = runtime(source, true);
        view.mount().unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(view.countdown().is_ticking());

        view.set_filter("status", "PENDING").unwrap();
        view.teardown();
        let mut store = view.subscribe();
        store.borrow_and_update();

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!view.is_polling());
        assert!(!view.countdown().is_ticking());
        assert!(view.timers().is_empty());
        assert!(!store.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn response_after_teardown_is_dropped() {
        let mut source = FakeSource::new(1);
        source.delay = Duration::from_secs(3);
        source.rows = vec![Row {
            id: "o-1".to_string(),
            deadline: None,
        }];
        let view = runtime(source, false);
        view.mount().unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        view.teardown();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(view.current().items.is_empty());
        assert_eq!(view.current().request_seq, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shrinking_total_refetches_last_page() {
        let source = FakeSource::new(95);
        let queries = Arc::clone(&source.queries);
        let total = Arc::clone(&source.total_items);
        let view = runtime(source, false);
        view.mount().unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(view.go_to_page(10));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(view.pagination().page(), 10);

        total.store(35, Ordering::SeqCst);
        view.refresh_now();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(view.pagination().page(), 4);
        let queries = queries.lock().unwrap();
        assert_eq!(queries.len(), 4);
        assert_eq!(queries.last().unwrap().get("page"), Some("4"));
    }
}
