use tokio::sync::broadcast;

use super::event::RealtimeEvent;

type Release = Box<dyn FnOnce() + Send + Sync>;

/// A live registration on a realtime channel.
///
/// The registration is released exactly once: on [`Subscription::unsubscribe`]
/// or when the value is dropped, whichever comes first. Holding the guard in
/// a scope ties the channel registration to that scope on every exit path.
pub struct Subscription {
    channel: String,
    rx: broadcast::Receiver<RealtimeEvent>,
    release: Option<Release>,
}

impl Subscription {
    pub(crate) fn new(
        channel: String,
        rx: broadcast::Receiver<RealtimeEvent>,
        release: impl FnOnce() + Send + Sync + 'static,
    ) -> Self {
        Self {
            channel,
            rx,
            release: Some(Box::new(release)),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Next event on the channel, or `None` once the channel service has
    /// shut down. Events missed while lagging are skipped.
    pub async fn recv(&mut self) -> Option<RealtimeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(channel = %self.channel, missed, "Realtime subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(release) = self.release.take() {
            tracing::debug!(channel = %self.channel, "Releasing realtime subscription");
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.channel)
            .field("released", &self.release.is_none())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counted(counter: &Arc<AtomicUsize>) -> (broadcast::Sender<RealtimeEvent>, Subscription) {
        let (tx, rx) = broadcast::channel(4);
        let counter = Arc::clone(counter);
        let sub = Subscription::new("dispatch".to_string(), rx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (tx, sub)
    }

    #[test]
    fn test_drop_releases_once() {
        let releases = Arc::new(AtomicUsize::new(0));
        let (_tx, sub) = counted(&releases);
        drop(sub);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_then_drop_releases_once() {
        let releases = Arc::new(AtomicUsize::new(0));
        let (_tx, sub) = counted(&releases);
        sub.unsubscribe();
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_release_runs_on_error_path() {
        fn failing_scope(sub: Subscription) -> Result<(), String> {
            let _sub = sub;
            Err("refresh failed".to_string())
        }

        let releases = Arc::new(AtomicUsize::new(0));
        let (_tx, sub) = counted(&releases);
        assert!(failing_scope(sub).is_err());
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recv_delivers_and_ends_on_close() {
        let releases = Arc::new(AtomicUsize::new(0));
        let (tx, mut sub) = counted(&releases);
        tx.send(RealtimeEvent::DispatchUpdated).unwrap();
        assert_eq!(sub.recv().await, Some(RealtimeEvent::DispatchUpdated));
        drop(tx);
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn test_recv_skips_lagged_events() {
        let releases = Arc::new(AtomicUsize::new(0));
        let (tx, mut sub) = counted(&releases);
        for _ in 0..6 {
            tx.send(RealtimeEvent::Other("noise".into())).unwrap();
        }
        tx.send(RealtimeEvent::DispatchFinalized).unwrap();
        let mut last = None;
        while let Ok(Some(event)) =
            tokio::time::timeout(std::time::Duration::from_millis(50), sub.recv()).await
        {
            last = Some(event);
        }
        assert_eq!(last, Some(RealtimeEvent::DispatchFinalized));
    }
}
