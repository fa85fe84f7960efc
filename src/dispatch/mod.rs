//! Dispatch-status API.

pub mod client;
pub mod models;

use async_trait::async_trait;

use crate::errors::ApiError;

pub use client::HttpDispatchApi;
pub use models::{Dispatch, parse_status_body};

/// Source of the currently active dispatch.
#[async_trait]
pub trait DispatchApi: Send + Sync {
    /// The active dispatch for this client, or `None` when there is none.
    async fn active_dispatch(&self) -> Result<Option<Dispatch>, ApiError>;
}
