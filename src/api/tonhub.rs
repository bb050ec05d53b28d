//! Tonhub v4 block API client (mainnet-v4.tonhubapi.com).
//!
//! Used for block lookups by time and for running the TON Whales pool
//! `get_member` getter against a historical block.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;
use tracing::debug;

use super::{join_url, ApiHttp, BlockSource};
use crate::types::{nano_to_ton, BlockRef, MemberBalance};

pub const BASE_URL: &str = "https://mainnet-v4.tonhubapi.com";

#[derive(Debug, Deserialize)]
struct LatestResponse {
    last: SeqnoRef,
    now: i64,
}

#[derive(Debug, Deserialize)]
struct SeqnoRef {
    seqno: u64,
}

#[derive(Debug, Deserialize)]
struct UtimeResponse {
    exist: bool,
    #[serde(default)]
    block: Option<UtimeBlock>,
}

#[derive(Debug, Deserialize)]
struct UtimeBlock {
    #[serde(default)]
    shards: Vec<ShardRef>,
}

#[derive(Debug, Deserialize)]
struct ShardRef {
    seqno: u64,
    #[serde(default)]
    timestamp: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RunResponse {
    #[serde(default)]
    result: Vec<StackEntry>,
}

#[derive(Debug, Deserialize)]
struct StackEntry {
    #[serde(default)]
    value: Option<String>,
}

/// Tonhub v4 client.
pub struct TonhubClient {
    http: ApiHttp,
    base_url: String,
}

impl TonhubClient {
    pub fn new(http: ApiHttp) -> Self {
        Self::with_base_url(http, BASE_URL)
    }

    pub fn with_base_url(http: ApiHttp, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
        }
    }
}

fn utc_from_unix(secs: i64) -> Result<chrono::DateTime<chrono::Utc>> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| anyhow!("Invalid unix time {secs}"))
}

/// Decode the first four stack values of `get_member` into TON amounts.
fn member_from_stack(stack: &[StackEntry]) -> Result<Option<MemberBalance>> {
    if stack.len() < 4 {
        return Ok(None);
    }
    let mut amounts = [rust_decimal::Decimal::ZERO; 4];
    for (i, entry) in stack.iter().take(4).enumerate() {
        let raw = entry
            .value
            .as_deref()
            .ok_or_else(|| anyhow!("get_member result {i} has no value"))?;
        let nanos: u128 = raw
            .parse()
            .with_context(|| format!("get_member result {i} is not an amount: {raw}"))?;
        amounts[i] = nano_to_ton(nanos)
            .ok_or_else(|| anyhow!("get_member result {i} is out of range: {raw}"))?;
    }
    Ok(Some(MemberBalance {
        staked: amounts[0],
        pending_deposit: amounts[1],
        pending_withdraw: amounts[2],
        withdraw_available: amounts[3],
    }))
}

#[async_trait]
impl BlockSource for TonhubClient {
    async fn latest_block(&self) -> Result<BlockRef> {
        let resp: LatestResponse = self
            .http
            .send_json(self.http.get(&join_url(&self.base_url, "block/latest")))
            .await
            .context("Failed to fetch latest block")?;
        Ok(BlockRef {
            seqno: resp.last.seqno,
            timestamp: utc_from_unix(resp.now)?,
        })
    }

    async fn block_by_utime(&self, unix_time: i64) -> Result<Option<BlockRef>> {
        let url = join_url(&self.base_url, &format!("block/utime/{unix_time}"));
        let resp: UtimeResponse = self.http.send_json(self.http.get(&url)).await?;
        if !resp.exist {
            debug!(unix_time, "No block at time");
            return Ok(None);
        }
        let Some(shard) = resp.block.as_ref().and_then(|b| b.shards.first()) else {
            return Ok(None);
        };
        Ok(Some(BlockRef {
            seqno: shard.seqno,
            timestamp: utc_from_unix(shard.timestamp.unwrap_or(unix_time))?,
        }))
    }

    async fn get_member(
        &self,
        seqno: u64,
        pool_address: &str,
        member_address: &str,
    ) -> Result<Option<MemberBalance>> {
        let url = join_url(
            &self.base_url,
            &format!(
                "block/{seqno}/{}/run/get_member/{}",
                urlencoding::encode(pool_address),
                urlencoding::encode(member_address),
            ),
        );
        let resp: RunResponse = self.http.send_json(self.http.get(&url)).await?;
        member_from_stack(&resp.result)
    }
}
