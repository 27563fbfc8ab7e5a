use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::notify::Notifier;

pub type FetchFn = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Recurring best-effort refresh for one view.
///
/// At most one loop is active; enabling again replaces it. Every tick spawns
/// its fetch independently, so a slow response never delays the next tick and
/// a failed one never stops the loop.
pub struct Poller {
    view: Arc<str>,
    parent: CancellationToken,
    notifier: Notifier,
    active: Mutex<Option<Subscription>>,
}

struct Subscription {
    token: CancellationToken,
    interval: Duration,
}

impl Poller {
    pub fn new(view: impl Into<String>, parent: CancellationToken, notifier: Notifier) -> Self {
        Self {
            view: Arc::from(view.into()),
            parent,
            notifier,
            active: Mutex::new(None),
        }
    }

    /// Starts polling; the first fetch fires one `interval` from now.
    pub fn enable(&self, interval: Duration, fetch: FetchFn) -> anyhow::Result<()> {
        if interval.is_zero() {
            anyhow::bail!("poll interval must be greater than zero");
        }
        let mut active = self.lock();
        if let Some(previous) = active.take() {
            previous.token.cancel();
        }
        if self.parent.is_cancelled() {
            return Ok(());
        }
        let token = self.parent.child_token();
        info!(
            event = "poll.enabled",
            view = %self.view,
            interval_ms = interval.as_millis() as u64,
            "polling enabled"
        );
        tokio::spawn(run_poll_loop(
            Arc::clone(&self.view),
            interval,
            fetch,
            self.notifier.clone(),
            token.clone(),
        ));
        *active = Some(Subscription { token, interval });
        Ok(())
    }

    pub fn disable(&self) {
        if let Some(previous) = self.lock().take() {
            previous.token.cancel();
            info!(event = "poll.disabled", view = %self.view, "polling disabled");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.lock()
            .as_ref()
            .map(|subscription| !subscription.token.is_cancelled())
            .unwrap_or(false)
    }

    pub fn interval(&self) -> Option<Duration> {
        self.lock()
            .as_ref()
            .filter(|subscription| !subscription.token.is_cancelled())
            .map(|subscription| subscription.interval)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Subscription>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.disable();
    }
}

async fn run_poll_loop(
    view: Arc<str>,
    interval: Duration,
    fetch: FetchFn,
    notifier: Notifier,
    token: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut tick: u64 = 0;
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                tick += 1;
                let attempt = fetch();
                let view = Arc::clone(&view);
                let notifier = notifier.clone();
                tokio::spawn(async move {
                    if let Err(err) = attempt.await {
                        let detail = format!("{err:#}");
                        debug!(
                            event = "poll.fetch_failed",
                            view = %view,
                            tick = tick,
                            error = %detail,
                            "poll refresh failed"
                        );
                        notifier.error("Failed to refresh data", Some(detail));
                    }
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_fetch(calls: Arc<AtomicUsize>, fail_first: bool) -> FetchFn {
        Arc::new(move || {
            let calls = Arc::clone(&calls);
            async move {
                let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if fail_first && attempt == 1 {
                    anyhow::bail!("backend unavailable");
                }
                Ok::<(), anyhow::Error>(())
            }
            .boxed()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn does_not_fetch_on_enable() {
        let calls = Arc::new(AtomicUsize::new(0));
        let poller = Poller::new("deals", CancellationToken::new(), Notifier::new("deals"));
        poller
            .enable(Duration::from_secs(10), counting_fetch(Arc::clone(&calls), false))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(9_900)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn survives_a_failed_tick() {
        let calls = Arc::new(AtomicUsize::new(0));
        let notifier = Notifier::new("deals");
        let poller = Poller::new("deals", CancellationToken::new(), notifier.clone());
        poller
            .enable(Duration::from_secs(10), counting_fetch(Arc::clone(&calls), true))
            .unwrap();

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.len(), 1);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(notifier.len(), 1);
        assert!(poller.is_enabled());
    }

    #[tokio::test(start_paused = true)]
    async fn reenable_replaces_previous_loop() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let poller = Poller::new("disputes", CancellationToken::new(), Notifier::new("disputes"));
        poller
            .enable(Duration::from_secs(10), counting_fetch(Arc::clone(&first), false))
            .unwrap();
        poller
            .enable(Duration::from_secs(10), counting_fetch(Arc::clone(&second), false))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30_500)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn disable_is_idempotent_and_stops_ticks() {
        let calls = Arc::new(AtomicUsize::new(0));
        let poller = Poller::new("users", CancellationToken::new(), Notifier::new("users"));
        poller.disable();
        poller
            .enable(Duration::from_secs(30), counting_fetch(Arc::clone(&calls), false))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30_500)).await;
        poller.disable();
        poller.disable();
        assert!(!poller.is_enabled());
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn parent_cancellation_stops_ticks() {
        let calls = Arc::new(AtomicUsize::new(0));
        let parent = CancellationToken::new();
        let poller = Poller::new("deals", parent.clone(), Notifier::new("deals"));
        poller
            .enable(Duration::from_secs(10), counting_fetch(Arc::clone(&calls), false))
            .unwrap();
        parent.cancel();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!poller.is_enabled());
    }

    #[test]
    fn rejects_zero_interval() {
        let poller = Poller::new("deals", CancellationToken::new(), Notifier::new("deals"));
        let fetch: FetchFn = Arc::new(|| async { Ok::<(), anyhow::Error>(()) }.boxed());
        assert!(poller.enable(Duration::ZERO, fetch).is_err());
    }
}
