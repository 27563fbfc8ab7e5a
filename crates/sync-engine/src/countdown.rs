use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::clock::Clock;

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);
pub const EXPIRED_LABEL: &str = "expired";
pub const NO_DEADLINE_LABEL: &str = "-";

const CRITICAL_BELOW_MS: u64 = 5 * 60 * 1000;
const WARNING_BELOW_MS: u64 = 15 * 60 * 1000;

/// Remaining milliseconds per tracked entity id.
pub type TimerState = HashMap<String, u64>;

/// A record with an optional deadline (deal expiry, dispute auto-accept).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedEntity {
    pub id: String,
    pub deadline_at: Option<DateTime<Utc>>,
}

impl TimedEntity {
    pub fn new(id: impl Into<String>, deadline_at: Option<DateTime<Utc>>) -> Self {
        Self {
            id: id.into(),
            deadline_at,
        }
    }

    /// Unparseable timestamps become "no deadline".
    pub fn from_raw(id: impl Into<String>, raw: Option<&str>) -> Self {
        Self::new(id, raw.and_then(parse_deadline))
    }
}

pub fn parse_deadline(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

pub fn remaining_ms(deadline: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    (deadline - now).num_milliseconds().max(0) as u64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Normal,
    Warning,
    Critical,
}

impl Urgency {
    pub fn from_remaining(remaining_ms: u64) -> Self {
        if remaining_ms < CRITICAL_BELOW_MS {
            Urgency::Critical
        } else if remaining_ms < WARNING_BELOW_MS {
            Urgency::Warning
        } else {
            Urgency::Normal
        }
    }
}

/// `HH:MM:SS` from one hour up, `MM:SS` below. Partial seconds round up, so
/// a live deadline never reads `00:00`.
pub fn format_clock(remaining_ms: u64) -> String {
    if remaining_ms == 0 {
        return EXPIRED_LABEL.to_string();
    }
    let total_secs = remaining_ms.div_ceil(1000);
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

/// Short form (`2m 5s`, `2h 1m`) for headers and narrow cells.
pub fn format_compact(remaining_ms: u64) -> String {
    if remaining_ms == 0 {
        return EXPIRED_LABEL.to_string();
    }
    let total_secs = remaining_ms.div_ceil(1000);
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

pub fn display_remaining(remaining: Option<u64>) -> String {
    match remaining {
        Some(ms) => format_clock(ms),
        None => NO_DEADLINE_LABEL.to_string(),
    }
}

/// Per-view countdown ticker.
///
/// Remaining time is always recomputed from the fixed deadline and the
/// clock; the tick task ends on its own once every tracked entry is zero.
#[derive(Clone)]
pub struct CountdownEngine {
    inner: Arc<CountdownInner>,
}

struct CountdownInner {
    clock: Arc<dyn Clock>,
    parent: CancellationToken,
    deadlines: Mutex<HashMap<String, DateTime<Utc>>>,
    ticker: Mutex<TickerSlot>,
    state: watch::Sender<TimerState>,
}

#[derive(Default)]
struct TickerSlot {
    generation: u64,
    token: Option<CancellationToken>,
}

impl CountdownEngine {
    pub fn new(clock: Arc<dyn Clock>, parent: CancellationToken) -> Self {
        let (state, _) = watch::channel(TimerState::new());
        Self {
            inner: Arc::new(CountdownInner {
                clock,
                parent,
                deadlines: Mutex::new(HashMap::new()),
                ticker: Mutex::new(TickerSlot::default()),
                state,
            }),
        }
    }

    /// Replaces the tracked set. Ids missing from `entities` are dropped.
    pub fn start(&self, entities: &[TimedEntity]) {
        if self.inner.parent.is_cancelled() {
            return;
        }
        {
            let mut deadlines = self.lock_deadlines();
            deadlines.clear();
            for entity in entities {
                if let Some(deadline) = entity.deadline_at {
                    deadlines.insert(entity.id.clone(), deadline);
                }
            }
        }
        if self.recompute() {
            self.ensure_ticking();
        } else {
            self.stop();
        }
    }

    pub fn stop(&self) {
        let mut slot = self.lock_ticker();
        if let Some(token) = slot.token.take() {
            token.cancel();
        }
    }

    /// Stops ticking and discards the timer map.
    pub fn clear(&self) {
        self.stop();
        self.lock_deadlines().clear();
        self.inner.state.send_replace(TimerState::new());
    }

    pub fn is_ticking(&self) -> bool {
        self.lock_ticker()
            .token
            .as_ref()
            .map(|token| !token.is_cancelled())
            .unwrap_or(false)
    }

    pub fn remaining(&self, id: &str) -> Option<u64> {
        self.inner.state.borrow().get(id).copied()
    }

    pub fn snapshot(&self) -> TimerState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TimerState> {
        self.inner.state.subscribe()
    }

    /// Publishes a fresh TimerState; returns whether any entry is still running.
    fn recompute(&self) -> bool {
        let now = self.inner.clock.now();
        let state: TimerState = self
            .lock_deadlines()
            .iter()
            .map(|(id, deadline)| (id.clone(), remaining_ms(*deadline, now)))
            .collect();
        let live = state.values().any(|remaining| *remaining > 0);
        self.inner.state.send_replace(state);
        live
    }

    fn ensure_ticking(&self) {
        let mut slot = self.lock_ticker();
        if let Some(token) = slot.token.as_ref() {
            if !token.is_cancelled() {
                return;
            }
        }
        let token = self.inner.parent.child_token();
        slot.generation += 1;
        slot.token = Some(token.clone());
        let generation = slot.generation;
        drop(slot);

        let engine = self.clone();
        tokio::spawn(async move {
            engine.tick_loop(token, generation).await;
        });
    }

    async fn tick_loop(self, token: CancellationToken, generation: u64) {
        let mut ticker = interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    if !self.tick_once(&token, generation) {
                        debug!(event = "countdown.idle", "all countdowns reached zero");
                        break;
                    }
                }
            }
        }
    }

    /// Recomputes under the slot lock so a concurrent `start` either sees
    /// this ticker alive or spawns a new one. Returns false once idle.
    fn tick_once(&self, token: &CancellationToken, generation: u64) -> bool {
        let mut slot = self.lock_ticker();
        if self.recompute() {
            return true;
        }
        token.cancel();
        if slot.generation == generation {
            slot.token = None;
        }
        false
    }

    fn lock_deadlines(&self) -> std::sync::MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        self.inner
            .deadlines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_ticker(&self) -> std::sync::MutexGuard<'_, TickerSlot> {
        self.inner
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
