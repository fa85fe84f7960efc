use async_trait::async_trait;
use std::time::Duration;

use super::DispatchApi;
use super::models::{Dispatch, parse_status_body};
use crate::config::ApiSection;
use crate::errors::ApiError;

/// HTTP client for the dispatch-status endpoint.
#[derive(Debug, Clone)]
pub struct HttpDispatchApi {
    client: reqwest::Client,
    url: reqwest::Url,
    token: Option<String>,
}

impl HttpDispatchApi {
    pub fn new(
        base_url: &str,
        status_path: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let url = join_url(base_url, status_path)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("trike/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, url, token })
    }

    pub fn from_config(api: &ApiSection) -> Result<Self, ApiError> {
        Self::new(
            &api.base_url,
            &api.status_path,
            api.token.clone(),
            Duration::from_secs(api.timeout_secs),
        )
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }
}

fn join_url(base_url: &str, path: &str) -> Result<reqwest::Url, ApiError> {
    let joined = format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    reqwest::Url::parse(&joined).map_err(|_| ApiError::InvalidUrl(joined))
}

#[async_trait]
impl DispatchApi for HttpDispatchApi {
    async fn active_dispatch(&self) -> Result<Option<Dispatch>, ApiError> {
        let mut request = self
            .client
            .get(self.url.clone())
            .header("Accept", "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(url = %self.url, bytes = body.len(), "Dispatch status fetched");
        parse_status_body(&body)
    }
}
