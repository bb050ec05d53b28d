//! Staking history and reward estimation.
//!
//! TON transactions carry no per-member reward entry for pool staking, so
//! rewards are inferred: the member's staked amount is sampled once a day
//! and each small positive step between consecutive samples is booked as a
//! reward. Steps above the adjust value are deposits.

pub mod history;

use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::export::OutputDir;
use crate::types::{cryptact_timestamp, format_ton, CryptactRow, StakingSnapshot, CRYPTACT_HEADERS};

pub use history::{fetch_history, HistoryRequest};

pub const HISTORY_HEADERS: [&str; 6] = [
    "Timestamp",
    "Seqno",
    "Staked Amount",
    "Pending Deposit",
    "Pending Withdraw",
    "Withdraw Available",
];

/// Infer reward rows from consecutive snapshots.
///
/// A step `d = staked[i] - staked[i-1]` is a reward when `0 < d <= adjust_val`.
pub fn calculate_rewards(
    snapshots: &[StakingSnapshot],
    adjust_val: Decimal,
    counter: &str,
) -> Vec<CryptactRow> {
    snapshots
        .windows(2)
        .filter_map(|pair| {
            let (prev, cur) = (&pair[0], &pair[1]);
            let diff = cur.balance.staked - prev.balance.staked;
            if diff > Decimal::ZERO && diff <= adjust_val {
                Some(CryptactRow::staking(
                    cryptact_timestamp(&cur.timestamp),
                    diff,
                    counter,
                    format!("Seqno Segment:{} - {}", prev.seqno, cur.seqno),
                ))
            } else {
                if diff > adjust_val {
                    debug!(from = prev.seqno, to = cur.seqno, %diff, "Step above adjust value, treated as deposit");
                }
                None
            }
        })
        .collect()
}

#[derive(Debug, Serialize)]
struct HistoryCsvRow {
    timestamp: String,
    seqno: u64,
    staked: String,
    pending_deposit: String,
    pending_withdraw: String,
    withdraw_available: String,
}

impl From<&StakingSnapshot> for HistoryCsvRow {
    fn from(s: &StakingSnapshot) -> Self {
        Self {
            timestamp: s.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            seqno: s.seqno,
            staked: format_ton(s.balance.staked),
            pending_deposit: format_ton(s.balance.pending_deposit),
            pending_withdraw: format_ton(s.balance.pending_withdraw),
            withdraw_available: format_ton(s.balance.withdraw_available),
        }
    }
}

pub fn history_filename(count: usize, today: NaiveDate) -> String {
    format!("ton_whales_staking_amount_history_N={count}_{today}.csv")
}

pub fn rewards_filename(
    start: NaiveDate,
    end: NaiveDate,
    adjust_val: Decimal,
    count: usize,
    today: NaiveDate,
) -> String {
    format!("staking_history_{start}_to_{end}_adj{adjust_val}_N{count}_{today}.csv")
}

/// Write the raw staking-amount history.
pub fn write_history_csv(
    out: &OutputDir,
    snapshots: &[StakingSnapshot],
    today: NaiveDate,
) -> Result<Option<PathBuf>> {
    let rows: Vec<HistoryCsvRow> = snapshots.iter().map(HistoryCsvRow::from).collect();
    out.write_csv(&HISTORY_HEADERS, &rows, &history_filename(rows.len(), today))
}

/// Write the inferred reward ledger.
pub fn write_rewards_csv(
    out: &OutputDir,
    rows: &[CryptactRow],
    start: NaiveDate,
    end: NaiveDate,
    adjust_val: Decimal,
    today: NaiveDate,
) -> Result<Option<PathBuf>> {
    let filename = rewards_filename(start, end, adjust_val, rows.len(), today);
    let path = out.write_csv(&CRYPTACT_HEADERS, rows, &filename)?;
    if let Some(p) = &path {
        info!(path = %p.display(), rewards = rows.len(), "Staking compensation history saved");
    }
    Ok(path)
}
