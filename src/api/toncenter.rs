//! TON Index API v3 client (toncenter.com).
//!
//! API docs: https://toncenter.com/api/v3/
//! Auth: optional, `X-API-Key` header. Without a key the public rate limit
//! is roughly one request per second, hence the delay between pages.

use anyhow::Result;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{join_url, ApiHttp};
use crate::types::IndexTransaction;

pub const BASE_URL: &str = "https://toncenter.com/api/v3";

/// Page size used when the caller doesn't specify one.
pub const DEFAULT_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
struct TransactionsResponse {
    #[serde(default)]
    transactions: Vec<Value>,
}

/// Parameters for a paginated transaction query.
#[derive(Debug, Clone)]
pub struct TransactionQuery {
    pub account: String,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub limit: u32,
    pub offset: u32,
}

impl TransactionQuery {
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            start: None,
            end: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }

    /// Restrict to the `days` days ending at `end`.
    pub fn last_days(mut self, end: DateTime<Utc>, days: i64) -> Self {
        self.start = Some(end - chrono::Duration::days(days));
        self.end = Some(end);
        self
    }
}

/// TON Index v3 client.
pub struct IndexClient {
    http: ApiHttp,
    base_url: String,
    api_key: Option<SecretString>,
    page_delay: Duration,
}

impl IndexClient {
    pub fn new(http: ApiHttp, api_key: Option<SecretString>, page_delay: Duration) -> Self {
        Self::with_base_url(http, BASE_URL, api_key, page_delay)
    }

    pub fn with_base_url(
        http: ApiHttp,
        base_url: &str,
        api_key: Option<SecretString>,
        page_delay: Duration,
    ) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
            api_key,
            page_delay,
        }
    }

    async fn fetch_page(&self, query: &TransactionQuery, offset: u32) -> Result<Vec<Value>> {
        let mut params: Vec<(&str, String)> = vec![
            ("account", query.account.clone()),
            ("limit", query.limit.to_string()),
            ("offset", offset.to_string()),
            ("sort", "desc".to_string()),
        ];
        if let Some(start) = query.start {
            params.push(("start_utime", start.timestamp().to_string()));
        }
        if let Some(end) = query.end {
            params.push(("end_utime", end.timestamp().to_string()));
        }

        let mut req = self
            .http
            .get(&join_url(&self.base_url, "transactions"))
            .query(&params);
        if let Some(key) = &self.api_key {
            req = req.header("X-API-Key", key.expose_secret().as_str());
        }

        let resp: TransactionsResponse = self.http.send_json(req).await?;
        Ok(resp.transactions)
    }

    /// Fetch every transaction matching `query`, following offsets until a
    /// short or empty page.
    ///
    /// If a later page fails, the pages already collected are returned and
    /// the failure is logged. A failure on the first page is an error.
    pub async fn get_transactions_v3(&self, query: &TransactionQuery) -> Result<Vec<Value>> {
        if query.limit == 0 {
            anyhow::bail!("Transaction page limit must be positive");
        }

        let mut all = Vec::new();
        let mut offset = query.offset;

        loop {
            let page = match self.fetch_page(query, offset).await {
                Ok(page) => page,
                Err(e) if !all.is_empty() => {
                    warn!(error = %e, offset, collected = all.len(), "Stopping pagination after error");
                    break;
                }
                Err(e) => return Err(e),
            };

            debug!(offset, count = page.len(), "Fetched transaction page");
            if page.is_empty() {
                break;
            }

            let count = page.len();
            all.extend(page);
            offset += count as u32;

            if count < query.limit as usize {
                break;
            }
            tokio::time::sleep(self.page_delay).await;
        }

        info!(account = %query.account, count = all.len(), "TON Index v3 transactions retrieved");
        Ok(all)
    }
}

/// Decode raw transactions into the typed subset, skipping any that don't fit.
pub fn typed_transactions(raw: &[Value]) -> Vec<IndexTransaction> {
    raw.iter()
        .filter_map(|v| match serde_json::from_value::<IndexTransaction>(v.clone()) {
            Ok(tx) => Some(tx),
            Err(e) => {
                warn!(error = %e, "Skipping undecodable transaction");
                None
            }
        })
        .collect()
}
