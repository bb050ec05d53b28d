//! TonAPI client (tonapi.io).
//!
//! API docs: https://docs.tonconsole.com/tonapi/rest-api
//! Base URL: https://tonapi.io/v2
//! Auth: not required for low volume; `Authorization: Bearer {key}` otherwise.

use anyhow::{Context, Result};
use reqwest::RequestBuilder;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use super::{join_url, ApiHttp};
use crate::types::nano_to_ton;

pub const BASE_URL: &str = "https://tonapi.io/v2";

#[derive(Debug, Deserialize)]
struct AccountResponse {
    /// Nanotons.
    balance: u128,
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: HashMap<String, TokenRates>,
}

#[derive(Debug, Deserialize)]
struct TokenRates {
    #[serde(default)]
    prices: HashMap<String, Decimal>,
}

#[derive(Debug, Deserialize)]
struct TransactionsResponse {
    #[serde(default)]
    transactions: Vec<Value>,
}

/// Sort order for account transaction listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// TonAPI client.
pub struct TonApiClient {
    http: ApiHttp,
    base_url: String,
    api_key: Option<SecretString>,
}

impl TonApiClient {
    pub fn new(http: ApiHttp, api_key: Option<SecretString>) -> Self {
        Self::with_base_url(http, BASE_URL, api_key)
    }

    pub fn with_base_url(http: ApiHttp, base_url: &str, api_key: Option<SecretString>) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
            api_key,
        }
    }

    fn request(&self, path: &str) -> RequestBuilder {
        let req = self.http.get(&join_url(&self.base_url, path));
        match &self.api_key {
            Some(key) => req.bearer_auth(key.expose_secret()),
            None => req,
        }
    }

    /// Recent transactions for an account, as returned by the API.
    pub async fn account_transactions(
        &self,
        account: &str,
        limit: u32,
        sort_order: SortOrder,
    ) -> Result<Vec<Value>> {
        let path = format!("blockchain/accounts/{}/transactions", urlencoding::encode(account));
        let req = self.request(&path).query(&[
            ("limit", limit.to_string()),
            ("sort_order", sort_order.as_str().to_string()),
        ]);
        let resp: TransactionsResponse = self.http.send_json(req).await?;
        debug!(account, count = resp.transactions.len(), "TonAPI transactions retrieved");
        Ok(resp.transactions)
    }

    /// Wallet balance in TON.
    pub async fn balance(&self, account: &str) -> Result<Decimal> {
        let path = format!("accounts/{}", urlencoding::encode(account));
        let resp: AccountResponse = self
            .http
            .send_json(self.request(&path))
            .await
            .context("Failed to fetch TON balance")?;
        nano_to_ton(resp.balance)
            .with_context(|| format!("TonAPI balance out of range: {}", resp.balance))
    }

    /// Price of one TON in `ticker` (e.g. "jpy", "usd").
    pub async fn rate(&self, ticker: &str) -> Result<Decimal> {
        let ticker_lower = ticker.to_lowercase();
        let req = self.request("rates").query(&[
            ("tokens", "ton".to_string()),
            ("currencies", format!("ton,{ticker_lower}")),
        ]);
        let resp: RatesResponse = self
            .http
            .send_json(req)
            .await
            .context("Failed to fetch TON rate")?;

        let ticker_upper = ticker.to_uppercase();
        resp.rates
            .get("TON")
            .and_then(|r| r.prices.get(&ticker_upper))
            .copied()
            .with_context(|| format!("TonAPI returned no TON price in {ticker_upper}"))
    }
}
