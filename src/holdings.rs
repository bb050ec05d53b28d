//! Current holdings: wallet balance plus pool stake, valued in fiat.

use anyhow::Result;
use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

use crate::api::tonapi::TonApiClient;
use crate::api::BlockSource;
use crate::types::{format_ton, MemberBalance};

/// Symbol shown before fiat prices. Unknown tickers fall back to `"<TICKER> "`.
pub fn currency_symbol(ticker: &str) -> String {
    match ticker.to_uppercase().as_str() {
        "JPY" => "¥".to_string(),
        "USD" => "$".to_string(),
        "EUR" => "€".to_string(),
        "GBP" => "£".to_string(),
        other => format!("{other} "),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HoldingsReport {
    pub seqno: u64,
    pub block_time_utc: DateTime<Utc>,
    pub block_time_local: DateTime<FixedOffset>,
    /// `None` when the pool getter returned no data.
    pub staking: Option<MemberBalance>,
    pub balance: Decimal,
    pub rate: Decimal,
    pub counter: String,
}

impl HoldingsReport {
    pub fn staked_total(&self) -> Option<Decimal> {
        self.staking.as_ref().map(MemberBalance::total)
    }

    pub fn hold_ton(&self) -> Option<Decimal> {
        self.staked_total().map(|s| s + self.balance)
    }

    pub fn price(&self) -> Option<Decimal> {
        self.hold_ton().map(|h| (h * self.rate).round_dp(2))
    }
}

impl fmt::Display for HoldingsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "seqno: {} / utc:{} / local:{}",
            self.seqno, self.block_time_utc, self.block_time_local
        )?;
        let (Some(total), Some(hold), Some(price)) =
            (self.staked_total(), self.hold_ton(), self.price())
        else {
            return write!(f, "Failed to get staking info.");
        };
        writeln!(f, "Timestamp: {}", self.block_time_local.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(f, "Total Staked Amount: {}", format_ton(total))?;
        writeln!(f, "Balance: {}", format_ton(self.balance))?;
        writeln!(f, "Hold TON: {}", format_ton(hold))?;
        writeln!(f, "Rate: {:.2}", self.rate)?;
        write!(
            f,
            "My account hold TON price: {}{:.2}",
            currency_symbol(&self.counter),
            price
        )
    }
}

/// Everything `fetch_holdings` needs besides the clients.
#[derive(Debug, Clone)]
pub struct HoldingsQuery<'a> {
    pub wallet: &'a str,
    pub pool_address: &'a str,
    pub member_address: &'a str,
    pub counter: &'a str,
    pub offset: FixedOffset,
}

/// Resolve the latest block, then fetch stake, balance and rate concurrently.
pub async fn fetch_holdings(
    blocks: &dyn BlockSource,
    tonapi: &TonApiClient,
    q: &HoldingsQuery<'_>,
) -> Result<HoldingsReport> {
    let latest = blocks.latest_block().await?;

    let (staking, balance, rate) = tokio::join!(
        blocks.get_member(latest.seqno, q.pool_address, q.member_address),
        tonapi.balance(q.wallet),
        tonapi.rate(q.counter),
    );
    let staking = staking?;
    if staking.is_none() {
        warn!(seqno = latest.seqno, pool = q.pool_address, "Pool returned no member data");
    }

    let report = HoldingsReport {
        seqno: latest.seqno,
        block_time_utc: latest.timestamp,
        block_time_local: latest.timestamp.with_timezone(&q.offset),
        staking,
        balance: balance?,
        rate: rate?,
        counter: q.counter.to_uppercase(),
    };
    info!(seqno = report.seqno, balance = %report.balance, rate = %report.rate, "Holdings fetched");
    Ok(report)
}
