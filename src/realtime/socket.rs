//! Websocket client for the secondary socket server.
//!
//! The server pushes [`EventEnvelope`] frames for the channels this client
//! has joined. Local subscribers attach to an internal [`BroadcastHub`]; the
//! connection task joins a channel on the server when its first local
//! subscriber appears and leaves it when the last one is released. On
//! disconnect it reconnects with exponential backoff and re-joins every
//! channel that still has subscribers.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use super::event::{ControlFrame, EventEnvelope};
use super::hub::{BroadcastHub, ChannelChange};
use super::subscription::Subscription;
use super::ChannelService;
use crate::errors::RealtimeError;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

fn next_backoff(current: Duration) -> Duration {
    (current * 2).min(MAX_BACKOFF)
}

/// Realtime channel backed by a websocket connection.
pub struct SocketChannel {
    hub: BroadcastHub,
    task: JoinHandle<()>,
}

impl SocketChannel {
    /// Start the connection task. Returns immediately; the first connection
    /// attempt happens in the background.
    pub fn connect(url: impl Into<String>) -> Self {
        let url = url.into();
        let (changes_tx, changes_rx) = mpsc::unbounded_channel();
        let hub = BroadcastHub::with_change_listener(changes_tx);
        let task = tokio::spawn(socket_loop(url, hub.clone(), changes_rx));
        Self { hub, task }
    }

    pub fn subscribe(&self, channel: &str) -> Result<Subscription, RealtimeError> {
        if self.task.is_finished() {
            return Err(RealtimeError::Closed);
        }
        self.hub.subscribe(channel)
    }

    pub fn shutdown(self) {
        self.task.abort();
    }
}

impl Drop for SocketChannel {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[async_trait]
impl ChannelService for SocketChannel {
    async fn subscribe(&self, channel: &str) -> Result<Subscription, RealtimeError> {
        SocketChannel::subscribe(self, channel)
    }
}

fn apply_change(joined: &mut BTreeSet<String>, change: &ChannelChange) {
    match change {
        ChannelChange::Joined(channel) => {
            joined.insert(channel.clone());
        }
        ChannelChange::Left(channel) => {
            joined.remove(channel);
        }
    }
}

fn control_message(change: &ChannelChange) -> Result<Message, RealtimeError> {
    let frame = match change {
        ChannelChange::Joined(channel) => ControlFrame::Subscribe(channel.clone()),
        ChannelChange::Left(channel) => ControlFrame::Unsubscribe(channel.clone()),
    };
    Ok(Message::text(serde_json::to_string(&frame)?))
}

async fn socket_loop(
    url: String,
    hub: BroadcastHub,
    mut changes: mpsc::UnboundedReceiver<ChannelChange>,
) {
    let mut joined = BTreeSet::new();
    let mut backoff = INITIAL_BACKOFF;

    loop {
        while let Ok(change) = changes.try_recv() {
            apply_change(&mut joined, &change);
        }

        match run_session(&url, &hub, &mut joined, &mut changes).await {
            Ok(()) => {
                tracing::warn!(url = %url, "Socket server disconnected");
                backoff = INITIAL_BACKOFF;
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Socket session failed");
            }
        }

        tokio::time::sleep(backoff).await;
        backoff = next_backoff(backoff);
    }
}

/// One connection. Returns `Ok` when the server goes away; the owning task
/// only stops when [`SocketChannel`] aborts it.
async fn run_session(
    url: &str,
    hub: &BroadcastHub,
    joined: &mut BTreeSet<String>,
    changes: &mut mpsc::UnboundedReceiver<ChannelChange>,
) -> Result<(), RealtimeError> {
    let (ws, _) = connect_async(url)
        .await
        .map_err(|source| RealtimeError::Connect {
            url: url.to_string(),
            source: Box::new(source),
        })?;
    tracing::info!(url, "Connected to socket server");

    let (mut sink, mut stream) = ws.split();
    for channel in joined.iter() {
        let msg = control_message(&ChannelChange::Joined(channel.clone()))?;
        if sink.send(msg).await.is_err() {
            return Ok(());
        }
    }

    loop {
        tokio::select! {
            // The hub inside this task keeps the sender alive.
            Some(change) = changes.recv() => {
                apply_change(joined, &change);
                if sink.send(control_message(&change)?).await.is_err() {
                    return Ok(());
                }
            }

            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<EventEnvelope>(text.as_str()) {
                            Ok(envelope) => {
                                let event = envelope.to_event();
                                tracing::debug!(channel = %envelope.channel, %event, "Realtime event received");
                                hub.publish(&envelope.channel, event);
                            }
                            Err(e) => {
                                tracing::debug!(error = %e, "Ignoring malformed socket frame");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return Ok(()),
                    Some(Ok(_)) => {
                        // Ping/pong are answered by tungstenite; binary frames are not used.
                    }
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "Socket read error");
                        return Ok(());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::RealtimeEvent;
    use axum::Router;
    use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
    use axum::extract::State;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use tokio::sync::broadcast;

    /// Pushed through `outgoing` to make the server drop the connection.
    const CLOSE: &str = "close";

    #[derive(Clone)]
    struct ServerState {
        /// Frames the server received from the client.
        received: mpsc::UnboundedSender<String>,
        /// Frames to push to the client.
        outgoing: broadcast::Sender<String>,
    }

    async fn ws_handler(ws: WebSocketUpgrade, State(state): State<ServerState>) -> impl IntoResponse {
        ws.on_upgrade(move |socket| handle_socket(socket, state))
    }

    async fn handle_socket(socket: WebSocket, state: ServerState) {
        let (mut sender, mut receiver) = socket.split();
        let mut outgoing = state.outgoing.subscribe();
        loop {
            tokio::select! {
                msg = receiver.next() => match msg {
                    Some(Ok(WsMessage::Text(text))) => {
                        let _ = state.received.send(text.as_str().to_owned());
                    }
                    Some(Ok(_)) => {}
                    _ => break,
                },
                out = outgoing.recv() => match out {
                    Ok(text) if text == CLOSE => {
                        let _ = sender.send(WsMessage::Close(None)).await;
                        break;
                    }
                    Ok(text) => {
                        if sender.send(WsMessage::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                },
            }
        }
    }

    async fn spawn_server() -> (
        String,
        mpsc::UnboundedReceiver<String>,
        broadcast::Sender<String>,
    ) {
        let (received_tx, received_rx) = mpsc::unbounded_channel();
        let (outgoing, _) = broadcast::channel(16);
        let state = ServerState {
            received: received_tx,
            outgoing: outgoing.clone(),
        };
        let app = Router::new().route("/ws", get(ws_handler)).with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("ws://{}/ws", addr), received_rx, outgoing)
    }

    async fn next_frame(rx: &mut mpsc::UnboundedReceiver<String>) -> ControlFrame {
        let text = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for control frame")
            .expect("server closed");
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        assert_eq!(next_backoff(Duration::from_secs(1)), Duration::from_secs(2));
        assert_eq!(next_backoff(Duration::from_secs(16)), Duration::from_secs(30));
        assert_eq!(next_backoff(MAX_BACKOFF), MAX_BACKOFF);
    }

    #[test]
    fn test_apply_change_tracks_membership() {
        let mut joined = BTreeSet::new();
        apply_change(&mut joined, &ChannelChange::Joined("dispatch".into()));
        assert!(joined.contains("dispatch"));
        apply_change(&mut joined, &ChannelChange::Left("dispatch".into()));
        assert!(joined.is_empty());
    }

    #[tokio::test]
    async fn test_socket_channel_joins_forwards_and_leaves() {
        let (url, mut received, outgoing) = spawn_server().await;
        let channel = SocketChannel::connect(url);

        let mut sub = channel.subscribe("dispatch").unwrap();
        assert_eq!(
            next_frame(&mut received).await,
            ControlFrame::Subscribe("dispatch".into())
        );

        let envelope = EventEnvelope::new("dispatch", &RealtimeEvent::DispatchUpdated);
        outgoing
            .send(serde_json::to_string(&envelope).unwrap())
            .unwrap();
        let event = tokio::time::timeout(Duration::from_secs(5), sub.recv())
            .await
            .unwrap();
        assert_eq!(event, Some(RealtimeEvent::DispatchUpdated));

        drop(sub);
        assert_eq!(
            next_frame(&mut received).await,
            ControlFrame::Unsubscribe("dispatch".into())
        );
        channel.shutdown();
    }

    #[tokio::test]
    async fn test_socket_channel_rejoins_after_server_disconnect() {
        let (url, mut received, outgoing) = spawn_server().await;
        let channel = SocketChannel::connect(url);

        let mut sub = channel.subscribe("dispatch").unwrap();
        assert_eq!(
            next_frame(&mut received).await,
            ControlFrame::Subscribe("dispatch".into())
        );

        outgoing.send(CLOSE.to_string()).unwrap();
        assert_eq!(
            next_frame(&mut received).await,
            ControlFrame::Subscribe("dispatch".into())
        );

        let envelope = EventEnvelope::new("dispatch", &RealtimeEvent::DispatchUpdated);
        outgoing
            .send(serde_json::to_string(&envelope).unwrap())
            .unwrap();
        let event = tokio::time::timeout(Duration::from_secs(5), sub.recv())
            .await
            .unwrap();
        assert_eq!(event, Some(RealtimeEvent::DispatchUpdated));
        assert!(!channel.task.is_finished());
        channel.shutdown();
    }
}
