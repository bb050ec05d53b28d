//! Staking history → reward ledger → CSV, end to end on a mock chain.

use chrono::{FixedOffset, NaiveDate};
use rust_decimal_macros::dec;

use ton_ledger::export::{OutputDir, OverwritePolicy};
use ton_ledger::staking::{self, HistoryRequest};

use crate::mock_chain::MockChain;

fn request(start_day: u32, end_day: u32) -> HistoryRequest {
    HistoryRequest {
        start: NaiveDate::from_ymd_opt(2024, 1, start_day).unwrap(),
        end: NaiveDate::from_ymd_opt(2024, 1, end_day).unwrap(),
        hour: 9,
        pool_address: "EQpool".into(),
        member_address: "EQmember".into(),
        offset: FixedOffset::east_opt(9 * 3600).unwrap(),
    }
}

#[tokio::test]
async fn test_history_to_rewards_csv() {
    // Day 3 is a deposit, day 4 a withdrawal
    let chain = MockChain::new(
        "EQpool",
        &[dec!(100), dec!(100.04), dec!(100.09), dec!(150.09), dec!(140), dec!(140.03)],
    );
    let snapshots = staking::fetch_history(&chain, &request(1, 6)).await.unwrap();
    assert_eq!(snapshots.len(), 6);
    assert_eq!(chain.getter_calls(), 6);

    let rows = staking::calculate_rewards(&snapshots, dec!(0.1), "JPY");
    let comments: Vec<&str> = rows.iter().map(|r| r.comment.as_str()).collect();
    assert_eq!(
        comments,
        ["Seqno Segment:0 - 1", "Seqno Segment:1 - 2", "Seqno Segment:4 - 5"]
    );

    let tmp = tempfile::tempdir().unwrap();
    let out = OutputDir::new(tmp.path(), OverwritePolicy::Always);
    let today = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 1, 6).unwrap();
    let path = staking::write_rewards_csv(&out, &rows, start, end, dec!(0.1), today)
        .unwrap()
        .unwrap();
    assert_eq!(
        path.file_name().unwrap().to_str().unwrap(),
        "staking_history_2024-01-01_to_2024-01-06_adj0.1_N3_2024-02-01.csv"
    );

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(
        lines[0],
        "Timestamp,Action,Source,Base,Volume,Price,Counter,Fee,FeeCcy,Comment"
    );
    assert_eq!(
        lines[1],
        "'2024/01/02 09:00:00,STAKING,TON_WALLET,TON,0.040000000,,JPY,0,TON,Seqno Segment:0 - 1"
    );
}

#[tokio::test]
async fn test_history_skips_failed_and_missing_days() {
    let chain = MockChain::new("EQpool", &[dec!(1), dec!(1.01), dec!(1.02)]);
    chain.fail_at(1);

    // Day 4 and 5 are past the end of the chain
    let snapshots = staking::fetch_history(&chain, &request(1, 5)).await.unwrap();
    let seqnos: Vec<u64> = snapshots.iter().map(|s| s.seqno).collect();
    assert_eq!(seqnos, [0, 2]);

    // The gap is bridged: 1 → 1.02 is still a single reward step
    let rows = staking::calculate_rewards(&snapshots, dec!(0.1), "USD");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].volume, "0.020000000");
}

#[tokio::test]
async fn test_wrong_pool_yields_no_history() {
    let chain = MockChain::new("EQpool", &[dec!(1), dec!(2)]);
    let mut req = request(1, 2);
    req.pool_address = "EQother".into();
    let snapshots = staking::fetch_history(&chain, &req).await.unwrap();
    assert!(snapshots.is_empty());
}
