use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Trailing debounce: the action runs once with the last value scheduled
/// after `window` passes without a new value.
pub struct Debouncer<T> {
    tx: mpsc::UnboundedSender<T>,
    token: CancellationToken,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new<F>(window: Duration, parent: &CancellationToken, action: F) -> Self
    where
        F: Fn(T) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let token = parent.child_token();
        tokio::spawn(run_debounce(rx, window, token.clone(), action));
        Self { tx, token }
    }

    /// Cancels any pending value and restarts the quiet window.
    pub fn schedule(&self, value: T) {
        if self.token.is_cancelled() {
            return;
        }
        let _ = self.tx.send(value);
    }

    /// Drops the pending value; nothing fires afterwards.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn run_debounce<T, F>(
    mut rx: mpsc::UnboundedReceiver<T>,
    window: Duration,
    token: CancellationToken,
    action: F,
) where
    T: Send + 'static,
    F: Fn(T) -> BoxFuture<'static, ()> + Send + Sync + 'static,
{
    loop {
        let mut latest = tokio::select! {
            _ = token.cancelled() => return,
            value = rx.recv() => match value {
                Some(value) => value,
                None => return,
            },
        };
        let mut coalesced: u32 = 0;
        let quiet = sleep(window);
        tokio::pin!(quiet);
        loop {
            tokio::select! {
                _ = token.cancelled() => return,
                value = rx.recv() => match value {
                    Some(value) => {
                        latest = value;
                        coalesced += 1;
                        quiet.as_mut().reset(Instant::now() + window);
                    }
                    None => return,
                },
                _ = &mut quiet => break,
            }
        }
        debug!(event = "debounce.fire", coalesced = coalesced, "debounce window elapsed");
        tokio::spawn(action(latest));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use std::sync::{Arc, Mutex};

    fn recording(window: Duration, parent: &CancellationToken) -> (Debouncer<String>, Arc<Mutex<Vec<String>>>) {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&fired);
        let debouncer = Debouncer::new(window, parent, move |value: String| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().unwrap().push(value);
            }
            .boxed()
        });
        (debouncer, fired)
    }

    #[tokio::test(start_paused = true)]
    async fn coalesces_a_burst_into_the_last_value() {
        let parent = CancellationToken::new();
        let (debouncer, fired) = recording(Duration::from_millis(500), &parent);
        for value in ["PE", "PEN", "PEND", "PENDING"] {
            debouncer.schedule(value.to_string());
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(fired.lock().unwrap().is_empty());
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(*fired.lock().unwrap(), vec!["PENDING".to_string()]);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn separate_bursts_fire_separately() {
        let parent = CancellationToken::new();
        let (debouncer, fired) = recording(Duration::from_millis(500), &parent);
        debouncer.schedule("a".to_string());
        tokio::time::sleep(Duration::from_millis(700)).await;
        debouncer.schedule("b".to_string());
        tokio::time::sleep(Duration::from_millis(700)).await;
        assert_eq!(*fired.lock().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_value() {
        let parent = CancellationToken::new();
        let (debouncer, fired) = recording(Duration::from_millis(500), &parent);
        debouncer.schedule("stale".to_string());
        tokio::time::sleep(Duration::from_millis(100)).await;
        parent.cancel();
        tokio::time::sleep(Duration::from_secs(2)).await;
        debouncer.schedule("late".to_string());
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(fired.lock().unwrap().is_empty());
        assert!(debouncer.is_cancelled());
    }
}
