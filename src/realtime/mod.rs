//! Realtime channel subscriptions.
//!
//! Subscriptions are scoped guards: acquiring one registers interest in a
//! channel and dropping it releases that registration. Two backends
//! implement [`ChannelService`]:
//!
//! - [`BroadcastHub`]: in-process fan-out, also used as the local side of
//!   the socket client
//! - [`SocketChannel`]: websocket connection to the socket server

pub mod event;
pub mod hub;
pub mod socket;
pub mod subscription;

use async_trait::async_trait;

use crate::errors::RealtimeError;

pub use event::{ControlFrame, EventEnvelope, RealtimeEvent};
pub use hub::{BroadcastHub, ChannelChange};
pub use socket::SocketChannel;
pub use subscription::Subscription;

/// A source of named realtime events, organised by channel.
#[async_trait]
pub trait ChannelService: Send + Sync {
    async fn subscribe(&self, channel: &str) -> Result<Subscription, RealtimeError>;
}
