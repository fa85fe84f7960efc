//! In-process channel service over `tokio::sync::broadcast`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, mpsc};

use super::event::RealtimeEvent;
use super::subscription::Subscription;
use super::ChannelService;
use crate::errors::RealtimeError;

/// Per-channel buffer. Slow subscribers skip what they miss.
const CHANNEL_CAPACITY: usize = 64;

/// Membership transitions reported to a listener (the socket client uses
/// these to join and leave channels on the server).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelChange {
    Joined(String),
    Left(String),
}

struct ChannelEntry {
    tx: broadcast::Sender<RealtimeEvent>,
    subscribers: usize,
}

#[derive(Default)]
struct HubInner {
    channels: Mutex<HashMap<String, ChannelEntry>>,
    changes: Option<mpsc::UnboundedSender<ChannelChange>>,
}

impl HubInner {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, ChannelEntry>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, change: ChannelChange) {
        if let Some(changes) = &self.changes {
            // Listener gone means nobody needs membership updates.
            let _ = changes.send(change);
        }
    }

    /// Drop one subscriber. Membership changes are reported while the lock
    /// is held so the listener sees joins and leaves in the order they
    /// happened.
    fn release(&self, channel: &str) {
        let mut channels = self.lock();
        let Some(entry) = channels.get_mut(channel) else {
            return;
        };
        entry.subscribers = entry.subscribers.saturating_sub(1);
        if entry.subscribers == 0 {
            channels.remove(channel);
            tracing::debug!(channel, "Last subscriber left channel");
            self.notify(ChannelChange::Left(channel.to_string()));
        }
    }
}

/// Fan-out of named events to scoped subscribers, keyed by channel name.
#[derive(Clone, Default)]
pub struct BroadcastHub {
    inner: Arc<HubInner>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hub that reports first-join and last-leave of each channel.
    pub fn with_change_listener(changes: mpsc::UnboundedSender<ChannelChange>) -> Self {
        Self {
            inner: Arc::new(HubInner {
                channels: Mutex::new(HashMap::new()),
                changes: Some(changes),
            }),
        }
    }

    pub fn subscribe(&self, channel: &str) -> Result<Subscription, RealtimeError> {
        if channel.trim().is_empty() {
            return Err(RealtimeError::EmptyChannel);
        }

        let rx = {
            let mut channels = self.inner.lock();
            let entry = channels
                .entry(channel.to_string())
                .or_insert_with(|| ChannelEntry {
                    tx: broadcast::channel(CHANNEL_CAPACITY).0,
                    subscribers: 0,
                });
            entry.subscribers += 1;
            let rx = entry.tx.subscribe();
            if entry.subscribers == 1 {
                tracing::debug!(channel, "First subscriber joined channel");
                self.inner.notify(ChannelChange::Joined(channel.to_string()));
            }
            rx
        };

        let inner = Arc::clone(&self.inner);
        let name = channel.to_string();
        Ok(Subscription::new(channel.to_string(), rx, move || {
            inner.release(&name)
        }))
    }

    /// Deliver an event to every current subscriber of `channel`.
    /// Returns how many subscribers received it.
    pub fn publish(&self, channel: &str, event: RealtimeEvent) -> usize {
        let channels = self.inner.lock();
        match channels.get(channel) {
            Some(entry) => entry.tx.send(event).unwrap_or(0),
            None => 0,
        }
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.inner
            .lock()
            .get(channel)
            .map_or(0, |entry| entry.subscribers)
    }

    /// Names of channels with at least one subscriber.
    pub fn active_channels(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.lock().keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl ChannelService for BroadcastHub {
    async fn subscribe(&self, channel: &str) -> Result<Subscription, RealtimeError> {
        BroadcastHub::subscribe(self, channel)
    }
}
