//! Third-party API integrations.
//!
//! - TON Index v3 (toncenter.com) for paginated transaction history
//! - TonAPI (tonapi.io) for balances, fiat rates and raw transactions
//! - Tonhub v4 (mainnet-v4.tonhubapi.com) for block lookups and pool getters
//!
//! All clients share `ApiHttp`, which applies the timeout, the user agent and
//! optional request/response tracing.

pub mod tonapi;
pub mod toncenter;
pub mod tonhub;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::types::{BlockRef, MemberBalance};

pub const USER_AGENT: &str = concat!("ton-ledger/", env!("CARGO_PKG_VERSION"));

/// Abstraction over a block API that can answer pool getters at a given block.
///
/// Implemented by `TonhubClient`; mocked in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// The most recent masterchain block.
    async fn latest_block(&self) -> Result<BlockRef>;

    /// The block at (or just before) a unix time. `None` if the API has none.
    async fn block_by_utime(&self, unix_time: i64) -> Result<Option<BlockRef>>;

    /// Run the pool's `get_member` getter at `seqno`.
    /// `None` when the getter returns fewer than four values.
    async fn get_member(
        &self,
        seqno: u64,
        pool_address: &str,
        member_address: &str,
    ) -> Result<Option<MemberBalance>>;
}

/// Shared HTTP plumbing for the API clients.
#[derive(Clone)]
pub struct ApiHttp {
    client: Client,
    /// Log every request and response at INFO instead of DEBUG.
    trace: bool,
}

impl ApiHttp {
    pub fn new(timeout: Duration, trace: bool) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .pool_max_idle_per_host(5)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, trace })
    }

    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        Self::new(
            Duration::from_secs(cfg.api.timeout_secs),
            cfg.debug_info.enable_tracing,
        )
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url).header("accept", "application/json")
    }

    /// Send a request and decode a JSON body. Non-2xx statuses are errors.
    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let request = request.build().context("Failed to build request")?;
        let method = request.method().clone();
        let url = request.url().clone();

        if self.trace {
            info!(%method, %url, "Sending request");
        } else {
            debug!(%method, %url, "Sending request");
        }

        let resp = self
            .client
            .execute(request)
            .await
            .with_context(|| format!("Request failed: {method} {url}"))?;

        let status = resp.status();
        if self.trace {
            info!(status = status.as_u16(), %url, "Received response");
        } else {
            debug!(status = status.as_u16(), %url, "Received response");
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("HTTP error {status} from {url}: {body}");
        }

        resp.json::<T>()
            .await
            .with_context(|| format!("Failed to parse JSON response from {url}"))
    }
}

/// Join a base URL and a path, tolerating a trailing slash on the base.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
