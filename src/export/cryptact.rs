//! Cryptact custom-format ledger built from incoming wallet transactions.
//!
//! Every incoming transfer with a non-zero value is booked as a `STAKING`
//! receipt. Timestamps are rendered in the configured IANA zone.

use anyhow::Result;
use chrono::NaiveDate;
use chrono_tz::Tz;
use std::path::PathBuf;
use tracing::{info, warn};

use super::OutputDir;
use crate::types::{cryptact_timestamp, nano_to_ton, CryptactRow, IndexTransaction, CRYPTACT_HEADERS};

/// Convert one transaction into a ledger row.
///
/// Returns `None` when the transaction has no incoming message, no value,
/// a zero or out-of-range value, or no block time.
pub fn from_transaction(tx: &IndexTransaction, tz: &Tz, counter: &str) -> Option<CryptactRow> {
    let nanos = tx.incoming_nanos().filter(|&n| n != 0)?;
    let Some(volume) = nano_to_ton(nanos) else {
        warn!(hash = %tx.hash, nanos = %nanos, "Skipping transaction with out-of-range value");
        return None;
    };
    let local = tx.block_time()?.with_timezone(tz);

    Some(CryptactRow::staking(
        cryptact_timestamp(&local),
        volume,
        counter,
        format!("TON_TXN_HASH: {}", tx.hash),
    ))
}

pub fn rows_from_transactions(txs: &[IndexTransaction], tz: &Tz, counter: &str) -> Vec<CryptactRow> {
    txs.iter()
        .filter_map(|tx| from_transaction(tx, tz, counter))
        .collect()
}

/// Sort by the rendered timestamp. The fixed-width format sorts chronologically.
pub fn sort_rows(rows: &mut [CryptactRow], ascending: bool) {
    if ascending {
        rows.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    } else {
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    }
}

pub fn csv_filename(stem: &str, count: usize, today: NaiveDate) -> String {
    if stem.is_empty() {
        format!("transactions_N={count}_{today}.csv")
    } else {
        format!("transactions_{stem}_N={count}_{today}.csv")
    }
}

/// Write the ledger. Returns `None` when there was nothing to write or the
/// overwrite was declined.
pub fn write_custom_csv(
    out: &OutputDir,
    mut rows: Vec<CryptactRow>,
    ascending: bool,
    stem: &str,
    today: NaiveDate,
) -> Result<Option<PathBuf>> {
    if rows.is_empty() {
        warn!("No valid transactions found. CSV file not created.");
        return Ok(None);
    }

    sort_rows(&mut rows, ascending);
    let filename = csv_filename(stem, rows.len(), today);
    let path = out.write_csv(&CRYPTACT_HEADERS, &rows, &filename)?;
    if let Some(p) = &path {
        info!(path = %p.display(), rows = rows.len(), "Cryptact CSV saved");
    }
    Ok(path)
}
