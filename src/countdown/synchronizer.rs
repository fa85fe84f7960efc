//! The live countdown synchronizer.
//!
//! A [`Countdown`] owns the target instant and derives [`Remaining`] from it
//! once per second. Producers update the target through a
//! [`CountdownSetter`]; displays read through a [`CountdownReader`]. The
//! owner is the only value that can dispose the synchronizer, and dropping
//! it cancels the running cycle.
//!
//! Every call to `set_target` bumps a generation number before starting a
//! new cycle. A tick only writes while its generation is current, so a
//! cycle that was cancelled can never publish a stale value even if its
//! task has not been reaped yet.

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::clock::Clock;
use super::remaining::Remaining;
use super::timestamp::parse_timestamp;
use crate::errors::CountdownError;

/// Recomputation cadence.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

struct Shared {
    clock: Arc<dyn Clock>,
    state: Mutex<State>,
    tx: watch::Sender<Remaining>,
}

#[derive(Default)]
struct State {
    target: Option<DateTime<Utc>>,
    generation: u64,
    ticker: Option<JoinHandle<()>>,
    disposed: bool,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_target(self: &Arc<Self>, target: Option<DateTime<Utc>>) -> Result<(), CountdownError> {
        let mut state = self.lock();
        if state.disposed {
            return Err(CountdownError::Disposed);
        }

        let now = self.clock.now();
        let remaining = Remaining::between(target, now);
        let runtime = if matches!(remaining, Remaining::Seconds(n) if n > 0) {
            Some(tokio::runtime::Handle::try_current().map_err(|_| CountdownError::NoRuntime)?)
        } else {
            None
        };

        if let Some(ticker) = state.ticker.take() {
            ticker.abort();
        }
        state.generation += 1;
        state.target = target;
        self.tx.send_replace(remaining);

        if let Some(runtime) = runtime {
            let weak = Arc::downgrade(self);
            let anchor = Anchor {
                wall: now,
                instant: Instant::now(),
            };
            state.ticker = Some(runtime.spawn(run_cycle(weak, state.generation, anchor)));
            tracing::debug!(?target, %remaining, generation = state.generation, "Countdown cycle started");
        } else {
            tracing::debug!(?target, %remaining, "Countdown target set without cycle");
        }

        Ok(())
    }

    fn dispose(&self) {
        let mut state = self.lock();
        if state.disposed {
            return;
        }
        state.disposed = true;
        state.generation += 1;
        if let Some(ticker) = state.ticker.take() {
            ticker.abort();
        }
        tracing::debug!("Countdown disposed");
    }

    fn is_ticking(&self) -> bool {
        self.lock()
            .ticker
            .as_ref()
            .is_some_and(|ticker| !ticker.is_finished())
    }
}

/// Wall-clock reading paired with the timer instant it was taken at.
///
/// Ticks derive "now" from the anchor plus the tick's scheduled offset, so a
/// wakeup that lands a few milliseconds late still sees a whole number of
/// elapsed seconds and never floors past a value.
#[derive(Clone, Copy)]
struct Anchor {
    wall: DateTime<Utc>,
    instant: Instant,
}

impl Anchor {
    fn wall_at(&self, scheduled: Instant) -> DateTime<Utc> {
        let offset = TimeDelta::from_std(scheduled.saturating_duration_since(self.instant))
            .unwrap_or_else(|_| TimeDelta::zero());
        self.wall + offset
    }
}

/// One recomputation cycle. Exits when the target is reached, when a newer
/// cycle supersedes it, or when the synchronizer is gone.
async fn run_cycle(shared: Weak<Shared>, generation: u64, anchor: Anchor) {
    let mut ticker = tokio::time::interval_at(anchor.instant + TICK_INTERVAL, TICK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let scheduled = ticker.tick().await;

        let Some(shared) = shared.upgrade() else {
            return;
        };
        let mut state = shared.lock();
        if state.disposed || state.generation != generation {
            return;
        }

        let remaining = Remaining::between(state.target, anchor.wall_at(scheduled));
        shared.tx.send_if_modified(|current| {
            if *current == remaining {
                false
            } else {
                *current = remaining;
                true
            }
        });

        if !matches!(remaining, Remaining::Seconds(n) if n > 0) {
            // Dropping our own handle detaches it; the task ends right after.
            state.ticker = None;
            tracing::debug!(generation, "Countdown reached target");
            return;
        }
    }
}

/// Owner of a countdown synchronizer.
///
/// Create one per consuming view tree, hand out setters and readers, and
/// call [`Countdown::dispose`] (or drop it) when the view tree goes away.
pub struct Countdown {
    shared: Arc<Shared>,
}

impl Countdown {
    pub fn new(clock: impl Clock) -> Self {
        Self::with_clock(Arc::new(clock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let (tx, _rx) = watch::channel(Remaining::Unknown);
        Self {
            shared: Arc::new(Shared {
                clock,
                state: Mutex::new(State::default()),
                tx,
            }),
        }
    }

    /// Handle for producers that update the target.
    pub fn setter(&self) -> CountdownSetter {
        CountdownSetter {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Read-only handle for displays.
    pub fn subscribe(&self) -> CountdownReader {
        CountdownReader {
            rx: self.shared.tx.subscribe(),
        }
    }

    pub fn set_target(&self, target: Option<DateTime<Utc>>) -> Result<(), CountdownError> {
        self.shared.set_target(target)
    }

    pub fn set_target_str(&self, target: Option<&str>) -> Result<(), CountdownError> {
        self.setter().set_target_str(target)
    }

    pub fn remaining(&self) -> Remaining {
        *self.shared.tx.borrow()
    }

    pub fn target(&self) -> Option<DateTime<Utc>> {
        self.shared.lock().target
    }

    /// Whether a recomputation cycle is currently scheduled.
    pub fn is_ticking(&self) -> bool {
        self.shared.is_ticking()
    }

    /// Cancel any running cycle and refuse further targets.
    pub fn dispose(self) {
        self.shared.dispose();
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.shared.dispose();
    }
}

/// Cloneable handle that can change the countdown target.
#[derive(Clone)]
pub struct CountdownSetter {
    shared: Arc<Shared>,
}

impl CountdownSetter {
    /// Replace the target and recompute immediately.
    ///
    /// `None` clears the countdown to [`Remaining::Unknown`].
    pub fn set_target(&self, target: Option<DateTime<Utc>>) -> Result<(), CountdownError> {
        self.shared.set_target(target)
    }

    /// Parse and set an ISO-8601 target. On a parse error the current
    /// target is left as it was.
    pub fn set_target_str(&self, target: Option<&str>) -> Result<(), CountdownError> {
        let parsed = target.map(parse_timestamp).transpose()?;
        self.shared.set_target(parsed)
    }

    pub fn remaining(&self) -> Remaining {
        *self.shared.tx.borrow()
    }
}

/// Read-only view of the remaining time.
#[derive(Clone)]
pub struct CountdownReader {
    rx: watch::Receiver<Remaining>,
}

impl CountdownReader {
    pub fn remaining(&self) -> Remaining {
        *self.rx.borrow()
    }

    /// Wait for the next recomputed value. Returns `None` once the
    /// synchronizer and all setters are gone.
    pub async fn changed(&mut self) -> Option<Remaining> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }

    /// Whether a value has been published since the last `changed` call.
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    pub fn mark_seen(&mut self) {
        self.rx.mark_unchanged();
    }
}
