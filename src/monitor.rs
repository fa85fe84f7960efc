//! Dispatch monitor: keeps the countdown in step with the backend.
//!
//! Two independent triggers call the same [`DispatchMonitor::refresh`]:
//! a periodic poll and realtime events on the dispatch channel. Events never
//! carry state; they only cause an early re-poll. `refresh` is guarded so
//! overlapping triggers never put two requests in flight at once.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;

use crate::countdown::CountdownSetter;
use crate::dispatch::{Dispatch, DispatchApi};
use crate::errors::CountdownError;
use crate::realtime::{RealtimeEvent, Subscription};

/// Default poll cadence for the dispatch-status endpoint.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Result of one refresh attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// The backend answered; carries the active dispatch, if any.
    Updated(Option<Dispatch>),
    /// Another refresh was already in flight.
    Skipped,
    /// The request failed; the countdown was left as it was.
    Failed,
}

/// Holds the in-flight flag for as long as it lives.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct DispatchMonitor {
    api: Arc<dyn DispatchApi>,
    countdown: CountdownSetter,
    in_flight: AtomicBool,
    latest: watch::Sender<Option<Dispatch>>,
}

impl DispatchMonitor {
    pub fn new(api: Arc<dyn DispatchApi>, countdown: CountdownSetter) -> Self {
        let (latest, _rx) = watch::channel(None);
        Self {
            api,
            countdown,
            in_flight: AtomicBool::new(false),
            latest,
        }
    }

    /// Receiver for the most recently fetched dispatch.
    pub fn latest(&self) -> watch::Receiver<Option<Dispatch>> {
        self.latest.subscribe()
    }

    pub fn is_refreshing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Fetch the active dispatch and retarget the countdown.
    pub async fn refresh(&self) -> RefreshOutcome {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            tracing::debug!("Dispatch refresh already in flight; skipping");
            return RefreshOutcome::Skipped;
        };

        match self.api.active_dispatch().await {
            Ok(dispatch) => {
                self.apply(dispatch.as_ref());
                self.latest.send_replace(dispatch.clone());
                RefreshOutcome::Updated(dispatch)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Dispatch refresh failed");
                RefreshOutcome::Failed
            }
        }
    }

    fn apply(&self, dispatch: Option<&Dispatch>) {
        let target = dispatch.and_then(Dispatch::countdown_target);
        match self.countdown.set_target_str(target) {
            Ok(()) => {}
            Err(e @ CountdownError::InvalidTimestamp { .. }) => {
                tracing::warn!(error = %e, "Dispatch has an unreadable scheduled time; clearing countdown");
                if let Err(e) = self.countdown.set_target(None) {
                    tracing::warn!(error = %e, "Failed to clear countdown");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to update countdown");
            }
        }
    }

    /// Run both triggers in the background until the handle is shut down.
    ///
    /// The subscription, if any, is held by the background task and
    /// released when it stops.
    pub fn spawn(
        self: Arc<Self>,
        subscription: Option<Subscription>,
        poll_interval: Duration,
    ) -> MonitorHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run_triggers(self, subscription, poll_interval, shutdown_rx));
        MonitorHandle {
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }
}

async fn next_event(subscription: &mut Option<Subscription>) -> Option<RealtimeEvent> {
    match subscription {
        Some(sub) => sub.recv().await,
        None => std::future::pending().await,
    }
}

async fn run_triggers(
    monitor: Arc<DispatchMonitor>,
    mut subscription: Option<Subscription>,
    poll_interval: Duration,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut refreshes = JoinSet::new();

    loop {
        tokio::select! {
            _ = &mut shutdown => break,

            _ = ticker.tick() => {
                let monitor = Arc::clone(&monitor);
                refreshes.spawn(async move { monitor.refresh().await });
            }

            event = next_event(&mut subscription) => match event {
                Some(event) if event.triggers_refresh() => {
                    tracing::debug!(%event, "Realtime event; refreshing dispatch");
                    let monitor = Arc::clone(&monitor);
                    refreshes.spawn(async move { monitor.refresh().await });
                }
                Some(event) => {
                    tracing::trace!(%event, "Ignoring realtime event");
                }
                None => {
                    tracing::warn!("Realtime channel closed; continuing with polling only");
                    subscription = None;
                }
            },

            Some(_) = refreshes.join_next(), if !refreshes.is_empty() => {}
        }
    }

    refreshes.abort_all();
    drop(subscription);
    tracing::debug!("Dispatch monitor stopped");
}

/// Controls a running monitor. Dropping it stops the monitor.
pub struct MonitorHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    /// Stop both triggers and wait for in-flight work to be cancelled.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
