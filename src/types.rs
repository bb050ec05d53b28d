//! Shared types for ton-ledger.
//!
//! These form the data model passed between the API clients, the
//! exporters, the staking estimator and the dashboard.

use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Decimal places in one TON.
pub const TON_DECIMALS: u32 = 9;

/// Convert nanotons to TON without rounding.
///
/// `None` when the amount does not fit a 96-bit `Decimal` mantissa.
pub fn nano_to_ton(nanos: u128) -> Option<Decimal> {
    let nanos = i128::try_from(nanos).ok()?;
    Decimal::try_from_i128_with_scale(nanos, TON_DECIMALS).ok()
}

/// Parse an API integer string (nanotons) into TON.
pub fn parse_nano(value: &str) -> Option<Decimal> {
    value.trim().parse::<u128>().ok().and_then(nano_to_ton)
}

/// Format a TON amount with a fixed 9 decimal places.
pub fn format_ton(amount: Decimal) -> String {
    format!("{:.9}", amount)
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// The subset of a TON Index v3 transaction that the ledger needs.
///
/// The full JSON is kept alongside for raw dumps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexTransaction {
    #[serde(default)]
    pub hash: String,
    /// Block time (unix seconds).
    #[serde(default)]
    pub now: Option<i64>,
    #[serde(default)]
    pub in_msg: Option<InMessage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMessage {
    /// Nanotons, as a decimal string.
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

impl IndexTransaction {
    /// Incoming value in nanotons, if present and well-formed.
    pub fn incoming_nanos(&self) -> Option<u128> {
        self.in_msg
            .as_ref()?
            .value
            .as_deref()?
            .trim()
            .parse()
            .ok()
    }

    pub fn block_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.now?, 0)
    }
}

// ---------------------------------------------------------------------------
// Blocks and staking
// ---------------------------------------------------------------------------

/// A masterchain block resolved by seqno.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRef {
    pub seqno: u64,
    pub timestamp: DateTime<Utc>,
}

/// A member's balances inside a staking pool, in TON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberBalance {
    pub staked: Decimal,
    pub pending_deposit: Decimal,
    pub pending_withdraw: Decimal,
    pub withdraw_available: Decimal,
}

impl MemberBalance {
    pub fn total(&self) -> Decimal {
        self.staked + self.pending_deposit + self.pending_withdraw + self.withdraw_available
    }
}

/// One point of staking history: a member's balances at a given block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingSnapshot {
    /// Block time in the configured local offset.
    pub timestamp: DateTime<FixedOffset>,
    pub seqno: u64,
    #[serde(flatten)]
    pub balance: MemberBalance,
}

impl StakingSnapshot {
    pub fn total(&self) -> Decimal {
        self.balance.total()
    }
}

impl fmt::Display for StakingSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] seqno {} staked {} (total {})",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.seqno,
            format_ton(self.balance.staked),
            format_ton(self.total()),
        )
    }
}

// ---------------------------------------------------------------------------
// Cryptact ledger
// ---------------------------------------------------------------------------

pub const CRYPTACT_HEADERS: [&str; 10] = [
    "Timestamp", "Action", "Source", "Base", "Volume", "Price", "Counter", "Fee", "FeeCcy",
    "Comment",
];

/// One row of a Cryptact custom-format CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptactRow {
    /// Prefixed with `'` so spreadsheets keep it as text.
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Action")]
    pub action: String,
    #[serde(rename = "Source")]
    pub source: String,
    #[serde(rename = "Base")]
    pub base: String,
    #[serde(rename = "Volume")]
    pub volume: String,
    #[serde(rename = "Price")]
    pub price: String,
    #[serde(rename = "Counter")]
    pub counter: String,
    #[serde(rename = "Fee")]
    pub fee: u32,
    #[serde(rename = "FeeCcy")]
    pub fee_ccy: String,
    #[serde(rename = "Comment")]
    pub comment: String,
}

impl CryptactRow {
    /// A staking reward credited to the TON wallet.
    pub fn staking(timestamp: String, volume: Decimal, counter: &str, comment: String) -> Self {
        Self {
            timestamp,
            action: "STAKING".to_string(),
            source: "TON_WALLET".to_string(),
            base: "TON".to_string(),
            volume: format_ton(volume),
            price: String::new(),
            counter: counter.to_string(),
            fee: 0,
            fee_ccy: "TON".to_string(),
            comment,
        }
    }
}

/// Cryptact timestamp spelling: `'YYYY/MM/DD HH:MM:SS`.
pub fn cryptact_timestamp<Tz: chrono::TimeZone>(t: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    format!("'{}", t.format("%Y/%m/%d %H:%M:%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_nano_to_ton_exact() {
        assert_eq!(nano_to_ton(1_000_000_000), Some(dec!(1)));
        assert_eq!(nano_to_ton(1), Some(dec!(0.000000001)));
        assert_eq!(nano_to_ton(123_456_789_012), Some(dec!(123.456789012)));
        assert_eq!(format_ton(nano_to_ton(2_500_000_000).unwrap()), "2.500000000");
    }

    #[test]
    fn test_parse_nano() {
        assert_eq!(parse_nano("1500000000"), Some(dec!(1.5)));
        assert_eq!(parse_nano("-5"), None);
        assert_eq!(parse_nano("abc"), None);
    }

    #[test]
    fn test_nano_to_ton_out_of_range() {
        assert_eq!(nano_to_ton(u128::MAX), None);
        assert_eq!(nano_to_ton(10u128.pow(30)), None);
        assert_eq!(parse_nano("340282366920938463463374607431768211455"), None);
        assert_eq!(parse_nano("1000000000000000000000000000000"), None);

        // Largest 96-bit mantissa still converts
        let max = (1u128 << 96) - 1;
        assert_eq!(nano_to_ton(max), Some(Decimal::from_i128_with_scale(max as i128, 9)));
    }

    #[test]
    fn test_incoming_nanos() {
        let tx: IndexTransaction = serde_json::from_value(serde_json::json!({
            "hash": "h", "now": 1628097600, "in_msg": {"value": "1000000000"}
        }))
        .unwrap();
        assert_eq!(tx.incoming_nanos(), Some(1_000_000_000));
        assert_eq!(tx.block_time().unwrap().timestamp(), 1628097600);

        let no_msg: IndexTransaction =
            serde_json::from_value(serde_json::json!({"hash": "h", "in_msg": null})).unwrap();
        assert_eq!(no_msg.incoming_nanos(), None);
        assert_eq!(no_msg.block_time(), None);
    }

    #[test]
    fn test_member_total() {
        let b = MemberBalance {
            staked: dec!(100),
            pending_deposit: dec!(1.5),
            pending_withdraw: dec!(0.5),
            withdraw_available: dec!(2),
        };
        assert_eq!(b.total(), dec!(104));
    }

    #[test]
    fn test_staking_row_defaults() {
        let row = CryptactRow::staking("'2024/01/01 00:00:00".into(), dec!(0.05), "JPY", "c".into());
        assert_eq!(row.action, "STAKING");
        assert_eq!(row.volume, "0.050000000");
        assert_eq!(row.price, "");
        assert_eq!(row.fee, 0);
    }

    #[test]
    fn test_cryptact_timestamp() {
        let t = DateTime::from_timestamp(1628097600, 0).unwrap();
        assert_eq!(cryptact_timestamp(&t), "'2021/08/04 17:20:00");
    }
}
