use std::sync::Arc;

use admin_api::{DisputeAction, DisputeDecision, TrafficEdit};
use api_client::{AdminClient, ApiError};
use ratatui::widgets::ListState;
use sync_engine::{Clock, Notification, ViewContext, ViewOptions, ViewRuntime};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::DeskConfig;
use crate::views::{
    DealsSource, DisputesSource, SavedFilters, Tab, TabKind, TabSnapshot, TableSource, UsersSource,
};

/// Results of background mutations, delivered to the UI loop.
#[derive(Debug)]
pub(crate) enum UiEvent {
    MutationDone {
        tab: TabKind,
        message: String,
    },
    MutationFailed {
        tab: TabKind,
        message: String,
        detail: Option<String>,
    },
}

#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum InputMode {
    #[default]
    Normal,
    FilterEdit,
}

pub(crate) struct AppState {
    client: AdminClient,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
    options: TabOptions,
    saved: SavedFilters,
    ui_tx: mpsc::UnboundedSender<UiEvent>,
    tab: Box<dyn Tab>,
    pub(crate) selected: usize,
    pub(crate) list_state: ListState,
    pub(crate) input_mode: InputMode,
    pub(crate) input: String,
    pub(crate) confirm_quit: bool,
}

struct TabOptions {
    deals: ViewOptions,
    disputes: ViewOptions,
    users: ViewOptions,
}

impl AppState {
    pub(crate) fn new(
        config: &DeskConfig,
        client: AdminClient,
        clock: Arc<dyn Clock>,
        shutdown: CancellationToken,
        ui_tx: mpsc::UnboundedSender<UiEvent>,
    ) -> anyhow::Result<Self> {
        let options = TabOptions {
            deals: config.deals.clone(),
            disputes: config.disputes.clone(),
            users: config.users.clone(),
        };
        let saved = SavedFilters::default();
        let tab = mount_tab(
            TabKind::default(),
            &client,
            &clock,
            &shutdown,
            &options,
            &saved,
        )?;
        Ok(Self {
            client,
            clock,
            shutdown,
            options,
            saved,
            ui_tx,
            tab,
            selected: 0,
            list_state: ListState::default(),
            input_mode: InputMode::Normal,
            input: String::new(),
            confirm_quit: false,
        })
    }

    pub(crate) fn tab_kind(&self) -> TabKind {
        self.tab.kind()
    }

    pub(crate) fn snapshot(&self) -> TabSnapshot {
        self.tab.snapshot()
    }

    pub(crate) fn filter_fields(&self) -> &'static [&'static str] {
        self.tab.filter_fields()
    }

    pub(crate) fn latest_notification(&self) -> Option<Notification> {
        self.tab.context().notifier().latest()
    }

    pub(crate) fn dismiss_notification(&self) -> bool {
        self.tab.context().notifier().dismiss_latest()
    }

    /// Tears down the current tab's timers and mounts `kind` with the
    /// filters it had when last left.
    pub(crate) fn switch_tab(&mut self, kind: TabKind) -> anyhow::Result<()> {
        if kind == self.tab.kind() {
            return Ok(());
        }
        self.tab.save_filters(&mut self.saved);
        self.tab.teardown();
        self.tab = mount_tab(
            kind,
            &self.client,
            &self.clock,
            &self.shutdown,
            &self.options,
            &self.saved,
        )?;
        self.selected = 0;
        self.list_state = ListState::default();
        Ok(())
    }

    pub(crate) fn next_tab(&mut self) -> anyhow::Result<()> {
        self.switch_tab(self.tab.kind().next())
    }

    pub(crate) fn next_page(&mut self) {
        if self.tab.next_page() {
            self.selected = 0;
        }
    }

    pub(crate) fn prev_page(&mut self) {
        if self.tab.prev_page() {
            self.selected = 0;
        }
    }

    pub(crate) fn refresh(&self) {
        self.tab.refresh_now();
    }

    pub(crate) fn toggle_polling(&self) {
        match self.tab.toggle_polling() {
            Ok(true) => {
                self.tab.context().notifier().info("Auto-refresh on");
            }
            Ok(false) => {
                self.tab.context().notifier().info("Auto-refresh paused");
            }
            Err(err) => {
                self.tab
                    .context()
                    .notifier()
                    .error("Failed to toggle auto-refresh", Some(format!("{err:#}")));
            }
        }
    }

    pub(crate) fn clear_filters(&mut self) {
        self.tab.clear_filters();
        self.selected = 0;
    }

    pub(crate) fn begin_filter_edit(&mut self) {
        self.input_mode = InputMode::FilterEdit;
        self.input.clear();
        self.confirm_quit = false;
    }

    pub(crate) fn cancel_filter_edit(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input.clear();
    }

    /// Applies the `field=value` line typed by the operator.
    pub(crate) fn submit_filter_edit(&mut self) {
        let line = std::mem::take(&mut self.input);
        self.input_mode = InputMode::Normal;
        let result = parse_filter_edit(&line)
            .and_then(|(field, value)| self.tab.set_filter(field, value));
        match result {
            Ok(()) => self.selected = 0,
            Err(err) => {
                self.tab
                    .context()
                    .notifier()
                    .error("Invalid filter", Some(format!("{err:#}")));
            }
        }
    }

    pub(crate) fn select_next(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        self.selected = (self.selected + 1) % len;
    }

    pub(crate) fn select_prev(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        self.selected = if self.selected == 0 {
            len - 1
        } else {
            self.selected - 1
        };
    }

    /// Keeps the selection inside the rows currently displayed.
    pub(crate) fn sync_selection(&mut self, len: usize) {
        if len == 0 {
            self.selected = 0;
            self.list_state.select(None);
        } else {
            self.selected = self.selected.min(len - 1);
            self.list_state.select(Some(self.selected));
        }
    }

    pub(crate) fn dispute_action(&self, action: DisputeAction) {
        if self.tab.kind() != TabKind::Disputes {
            return;
        }
        let Some(row) = self.tab.snapshot().rows.into_iter().nth(self.selected) else {
            return;
        };
        let client = self.client.clone();
        let ui_tx = self.ui_tx.clone();
        let decision = DisputeDecision {
            dispute_id: row.id,
            comment: None,
        };
        info!(
            event = "dispute.action",
            action = action.label(),
            dispute_id = %decision.dispute_id,
            "submitting dispute decision"
        );
        tokio::spawn(async move {
            let result = client.dispute_action(action, &decision).await;
            let event = mutation_event(
                TabKind::Disputes,
                result,
                format!("Dispute {} {}", decision.dispute_id, past_tense(action)),
                format!("Failed to {} dispute {}", action.label(), decision.dispute_id),
            );
            let _ = ui_tx.send(event);
        });
    }

    /// Flips traffic for the selected user.
    pub(crate) fn toggle_traffic(&self) {
        if self.tab.kind() != TabKind::Users {
            return;
        }
        let Some(row) = self.tab.snapshot().rows.into_iter().nth(self.selected) else {
            return;
        };
        let enable = !row.is_active.unwrap_or(false);
        let edit = TrafficEdit {
            id: row.id,
            priority: None,
            is_active: Some(enable),
        };
        let client = self.client.clone();
        let ui_tx = self.ui_tx.clone();
        let state = if enable { "enabled" } else { "disabled" };
        info!(
            event = "traffic.edit",
            id = %edit.id,
            is_active = enable,
            "submitting traffic change"
        );
        tokio::spawn(async move {
            let result = client.edit_traffic(&edit).await;
            let event = mutation_event(
                TabKind::Users,
                result,
                format!("Traffic {state} for {}", edit.id),
                format!("Failed to update traffic for {}", edit.id),
            );
            let _ = ui_tx.send(event);
        });
    }

    /// Mutations refetch the tab they came from, if it is still mounted.
    pub(crate) fn handle_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::MutationDone { tab, message } => {
                if tab == self.tab.kind() {
                    self.tab.context().notifier().info(message);
                    self.tab.refresh_now();
                }
            }
            UiEvent::MutationFailed {
                tab,
                message,
                detail,
            } => {
                if tab == self.tab.kind() {
                    self.tab.context().notifier().error(message, detail);
                }
            }
        }
    }

    pub(crate) fn close(&self) {
        self.tab.teardown();
        self.shutdown.cancel();
    }
}

fn mount_tab(
    kind: TabKind,
    client: &AdminClient,
    clock: &Arc<dyn Clock>,
    shutdown: &CancellationToken,
    options: &TabOptions,
    saved: &SavedFilters,
) -> anyhow::Result<Box<dyn Tab>> {
    match kind {
        TabKind::Deals => mount_source(
            DealsSource::new(client.clone()),
            clock,
            shutdown,
            &options.deals,
            saved,
        ),
        TabKind::Disputes => mount_source(
            DisputesSource::new(client.clone()),
            clock,
            shutdown,
            &options.disputes,
            saved,
        ),
        TabKind::Users => mount_source(
            UsersSource::new(client.clone()),
            clock,
            shutdown,
            &options.users,
            saved,
        ),
    }
}

fn mount_source<S: TableSource>(
    source: S,
    clock: &Arc<dyn Clock>,
    shutdown: &CancellationToken,
    options: &ViewOptions,
    saved: &SavedFilters,
) -> anyhow::Result<Box<dyn Tab>> {
    let ctx = ViewContext::with_parent(S::KIND.scope(), shutdown);
    let runtime = ViewRuntime::with_filters(
        ctx,
        source,
        options.clone(),
        Arc::clone(clock),
        S::load_filters(saved),
    );
    runtime.mount()?;
    Ok(Box::new(runtime))
}

fn mutation_event(
    tab: TabKind,
    result: Result<(), ApiError>,
    done: String,
    failed: String,
) -> UiEvent {
    match result {
        Ok(()) => UiEvent::MutationDone { tab, message: done },
        Err(err) => UiEvent::MutationFailed {
            tab,
            message: failed,
            detail: Some(err.detail().map(str::to_string).unwrap_or_else(|| err.to_string())),
        },
    }
}

fn past_tense(action: DisputeAction) -> &'static str {
    match action {
        DisputeAction::Accept => "accepted",
        DisputeAction::Reject => "rejected",
        DisputeAction::Freeze => "frozen",
    }
}

pub(crate) fn parse_filter_edit(line: &str) -> anyhow::Result<(&str, &str)> {
    let (field, value) = line
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("expected field=value, got {:?}", line.trim()))?;
    let field = field.trim();
    if field.is_empty() {
        anyhow::bail!("filter field is empty");
    }
    Ok((field, value.trim()))
}
