//! Debounced refresh with stale-response protection.
//!
//! A [`Refresher`] owns a background task that turns bursts of refresh
//! triggers into single fetches. Triggers arriving within the quiet period of
//! each other are coalesced; the fetch starts once no trigger has arrived for
//! the whole period, or [`MAX_WAIT_WINDOWS`] periods after the first trigger of
//! the burst, whichever comes first. Steady triggering therefore still fetches.
//!
//! Every fetch is stamped with a generation from a [`GenerationGuard`]. A
//! result is delivered only if no newer fetch has started since, so a slow
//! response can never overwrite fresher state.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::{ApiError, Result};

/// Default quiet period before a fetch starts.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Longest a burst can postpone its fetch, in quiet periods.
pub const MAX_WAIT_WINDOWS: u32 = 4;

/// Issues monotonically increasing generations and tells stale ones apart.
#[derive(Debug, Default)]
pub struct GenerationGuard {
    latest: AtomicU64,
}

impl GenerationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation, making every earlier one stale.
    pub fn begin(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Latest generation issued, 0 before the first.
    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.latest() == generation
    }
}

/// Outcome of one refresh cycle.
#[derive(Debug)]
pub enum RefreshEvent<T> {
    Applied { generation: u64, value: T },
    Failed { generation: u64, error: ApiError },
}

impl<T> RefreshEvent<T> {
    pub fn generation(&self) -> u64 {
        match self {
            RefreshEvent::Applied { generation, .. } | RefreshEvent::Failed { generation, .. } => {
                *generation
            }
        }
    }
}

/// Debounced, generation-guarded fetch loop.
///
/// Dropping the refresher aborts the background task and any fetch still in
/// flight.
pub struct Refresher<T> {
    triggers: mpsc::UnboundedSender<()>,
    events: mpsc::UnboundedReceiver<RefreshEvent<T>>,
    guard: Arc<GenerationGuard>,
    task: JoinHandle<()>,
}

impl<T: Send + 'static> Refresher<T> {
    /// Spawn the background loop on the current runtime.
    pub fn spawn<F, Fut>(debounce: Duration, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let guard = Arc::new(GenerationGuard::new());

        let task = tokio::spawn(run(
            debounce,
            fetch,
            trigger_rx,
            event_tx,
            Arc::clone(&guard),
        ));

        Self {
            triggers: trigger_tx,
            events: event_rx,
            guard,
            task,
        }
    }

    /// Request a refresh. Bursts collapse into one fetch.
    pub fn trigger(&self) {
        if self.triggers.send(()).is_err() {
            warn!("refresh loop has stopped, trigger ignored");
        }
    }

    /// Wait for the next delivered result. Cancel safe.
    pub async fn next_event(&mut self) -> Option<RefreshEvent<T>> {
        self.events.recv().await
    }

    /// Latest generation started.
    pub fn generation(&self) -> u64 {
        self.guard.latest()
    }
}

impl<T> Drop for Refresher<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run<T, F, Fut>(
    debounce: Duration,
    fetch: F,
    mut triggers: mpsc::UnboundedReceiver<()>,
    events: mpsc::UnboundedSender<RefreshEvent<T>>,
    guard: Arc<GenerationGuard>,
) where
    T: Send + 'static,
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            trigger = triggers.recv() => {
                if trigger.is_none() {
                    break;
                }

                let mut coalesced = 1usize;
                let max_wait = Instant::now() + debounce.saturating_mul(MAX_WAIT_WINDOWS);
                loop {
                    let quiet_until = (Instant::now() + debounce).min(max_wait);
                    match tokio::time::timeout_at(quiet_until, triggers.recv()).await {
                        Ok(Some(())) => coalesced += 1,
                        Ok(None) => return,
                        Err(_) => break,
                    }
                }

                let generation = guard.begin();
                debug!(generation, coalesced, "starting refresh");

                let request = fetch();
                let events = events.clone();
                let guard = Arc::clone(&guard);
                in_flight.spawn(async move {
                    let result = request.await;
                    if !guard.is_current(generation) {
                        debug!(
                            generation,
                            latest = guard.latest(),
                            "discarding stale refresh result"
                        );
                        return;
                    }
                    let event = match result {
                        Ok(value) => RefreshEvent::Applied { generation, value },
                        Err(error) => RefreshEvent::Failed { generation, error },
                    };
                    // Receiver gone means the refresher is being dropped.
                    let _ = events.send(event);
                });
            }
            Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
        }
    }
}
