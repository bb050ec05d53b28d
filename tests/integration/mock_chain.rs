//! In-memory chain for integration testing.
//!
//! Provides a deterministic `BlockSource` with one block per day and a
//! scripted staked amount per block. No network access.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::DateTime;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use ton_ledger::api::BlockSource;
use ton_ledger::types::{BlockRef, MemberBalance};

/// 2024-01-01T00:00:00Z
pub const GENESIS: i64 = 1_704_067_200;
pub const DAY: i64 = 86_400;

pub struct MockChain {
    /// Staked amount by seqno. Seqno `n` is produced at `GENESIS + n * DAY`.
    staked: BTreeMap<u64, Decimal>,
    pool: String,
    /// Seqnos whose getter call fails.
    failing: Arc<Mutex<Vec<u64>>>,
    calls: Arc<Mutex<usize>>,
}

impl MockChain {
    pub fn new(pool: &str, staked: &[Decimal]) -> Self {
        Self {
            staked: staked
                .iter()
                .enumerate()
                .map(|(i, amount)| (i as u64, *amount))
                .collect(),
            pool: pool.to_string(),
            failing: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn fail_at(&self, seqno: u64) {
        self.failing.lock().unwrap().push(seqno);
    }

    pub fn getter_calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    fn block(seqno: u64) -> BlockRef {
        BlockRef {
            seqno,
            timestamp: DateTime::from_timestamp(GENESIS + seqno as i64 * DAY, 0).unwrap(),
        }
    }
}

#[async_trait]
impl BlockSource for MockChain {
    async fn latest_block(&self) -> Result<BlockRef> {
        let seqno = self
            .staked
            .keys()
            .next_back()
            .copied()
            .ok_or_else(|| anyhow!("empty chain"))?;
        Ok(Self::block(seqno))
    }

    async fn block_by_utime(&self, unix_time: i64) -> Result<Option<BlockRef>> {
        if unix_time < GENESIS {
            return Ok(None);
        }
        let seqno = ((unix_time - GENESIS) / DAY) as u64;
        Ok(self.staked.contains_key(&seqno).then(|| Self::block(seqno)))
    }

    async fn get_member(
        &self,
        seqno: u64,
        pool_address: &str,
        _member_address: &str,
    ) -> Result<Option<MemberBalance>> {
        *self.calls.lock().unwrap() += 1;
        if self.failing.lock().unwrap().contains(&seqno) {
            return Err(anyhow!("getter failed at {seqno}"));
        }
        if pool_address != self.pool {
            return Ok(None);
        }
        Ok(self.staked.get(&seqno).map(|staked| MemberBalance {
            staked: *staked,
            ..Default::default()
        }))
    }
}
