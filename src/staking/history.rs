//! Daily staking-amount sampling against a block API.

use anyhow::{bail, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::api::BlockSource;
use crate::types::StakingSnapshot;

/// Concurrent block/getter lookups in flight at once.
const HISTORY_CONCURRENCY: usize = 8;

/// Longest range accepted in one request.
pub const MAX_HISTORY_DAYS: i64 = 366;

/// One staking-history query.
#[derive(Debug, Clone)]
pub struct HistoryRequest {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Local hour of day (0-23) at which each day is sampled.
    pub hour: u32,
    pub pool_address: String,
    pub member_address: String,
    pub offset: FixedOffset,
}

impl HistoryRequest {
    pub fn validate(&self) -> Result<()> {
        if self.hour > 23 {
            bail!("Hour must be between 0 and 23");
        }
        if self.start > self.end {
            bail!("Start date {} is after end date {}", self.start, self.end);
        }
        let days = (self.end - self.start).num_days() + 1;
        if days > MAX_HISTORY_DAYS {
            bail!("Date range of {days} days exceeds the {MAX_HISTORY_DAYS}-day limit");
        }
        if self.pool_address.trim().is_empty() || self.member_address.trim().is_empty() {
            bail!("Pool address and member address are required");
        }
        Ok(())
    }

    /// Sample instants: `hour:00` local time on each day from start to end inclusive.
    pub fn targets(&self) -> Vec<DateTime<Utc>> {
        self.start
            .iter_days()
            .take_while(|d| *d <= self.end)
            .filter_map(|d| d.and_hms_opt(self.hour, 0, 0))
            .filter_map(|naive| self.offset.from_local_datetime(&naive).single())
            .map(|t| t.with_timezone(&Utc))
            .collect()
    }
}

async fn sample(
    source: &dyn BlockSource,
    target: DateTime<Utc>,
    req: &HistoryRequest,
) -> Result<Option<StakingSnapshot>> {
    let Some(block) = source.block_by_utime(target.timestamp()).await? else {
        return Ok(None);
    };
    let member = source
        .get_member(block.seqno, &req.pool_address, &req.member_address)
        .await?;
    Ok(member.map(|balance| StakingSnapshot {
        timestamp: block.timestamp.with_timezone(&req.offset),
        seqno: block.seqno,
        balance,
    }))
}

/// Fetch one snapshot per day. Days without data are dropped.
pub async fn fetch_history(
    source: &dyn BlockSource,
    req: &HistoryRequest,
) -> Result<Vec<StakingSnapshot>> {
    req.validate()?;
    let targets = req.targets();

    let results: Vec<(DateTime<Utc>, Result<Option<StakingSnapshot>>)> = stream::iter(targets)
        .map(|target| async move { (target, sample(source, target, req).await) })
        .buffered(HISTORY_CONCURRENCY)
        .collect()
        .await;

    let mut snapshots = Vec::with_capacity(results.len());
    for (target, result) in results {
        match result {
            Ok(Some(s)) => snapshots.push(s),
            Ok(None) => warn!(%target, "No staking data for day"),
            Err(e) => warn!(%target, error = %e, "Staking lookup failed"),
        }
    }
    snapshots.sort_by_key(|s| s.timestamp);

    info!(
        start = %req.start,
        end = %req.end,
        hour = req.hour,
        count = snapshots.len(),
        "Staking history fetched"
    );
    Ok(snapshots)
}
