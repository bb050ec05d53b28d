//! HTTP clients against stubbed APIs, feeding the export pipeline.

use chrono::{FixedOffset, NaiveDate};
use rust_decimal_macros::dec;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ton_ledger::api::toncenter::{self, IndexClient, TransactionQuery};
use ton_ledger::api::tonhub::TonhubClient;
use ton_ledger::api::ApiHttp;
use ton_ledger::export::{cryptact, OutputDir, OverwritePolicy};
use ton_ledger::staking::{self, HistoryRequest};

fn http() -> ApiHttp {
    ApiHttp::new(Duration::from_secs(5), false).unwrap()
}

#[tokio::test]
async fn test_index_pages_to_cryptact_csv() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/transactions"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "transactions": [
                {"hash": "h1", "now": 1_704_067_200, "in_msg": {"value": "1500000000", "source": "EQa"}},
                {"hash": "h2", "now": 1_704_153_600, "in_msg": {"value": "0"}},
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/transactions"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "transactions": [
                {"hash": "h3", "now": 1_703_980_800, "in_msg": {"value": "250000000"}},
            ]
        })))
        .mount(&server)
        .await;

    let client = IndexClient::with_base_url(
        http(),
        &format!("{}/api/v3", server.uri()),
        None,
        Duration::ZERO,
    );
    let mut query = TransactionQuery::new("EQwallet");
    query.limit = 2;
    let raw = client.get_transactions_v3(&query).await.unwrap();
    assert_eq!(raw.len(), 3);

    let txs = toncenter::typed_transactions(&raw);
    let rows = cryptact::rows_from_transactions(&txs, &chrono_tz::Asia::Tokyo, "JPY");
    assert_eq!(rows.len(), 2);

    let tmp = tempfile::tempdir().unwrap();
    let out = OutputDir::new(tmp.path(), OverwritePolicy::Always);
    let today = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
    let path = cryptact::write_custom_csv(&out, rows, true, "tonindex_v3", today)
        .unwrap()
        .unwrap();
    assert_eq!(
        path.file_name().unwrap().to_str().unwrap(),
        "transactions_tonindex_v3_N=2_2024-01-10.csv"
    );

    let text = std::fs::read_to_string(path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    // Ascending: h3 (2023-12-31 09:00 JST) before h1 (2024-01-01 09:00 JST)
    assert!(lines[1].starts_with("'2023/12/31 09:00:00,"));
    assert!(lines[1].ends_with("TON_TXN_HASH: h3"));
    assert!(lines[2].contains(",1.500000000,"));
}

#[tokio::test]
async fn test_tonhub_history_end_to_end() {
    let server = MockServer::start().await;
    for (utime, seqno) in [(1_704_067_200i64, 100u64), (1_704_153_600, 200)] {
        Mock::given(method("GET"))
            .and(path(format!("/block/utime/{utime}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "exist": true,
                "block": {"shards": [{"seqno": seqno, "timestamp": utime}]}
            })))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path_regex(r"^/block/100/.+/run/get_member/.+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": [
                {"value": "5000000000"}, {"value": "0"}, {"value": "0"}, {"value": "0"}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/block/200/.+/run/get_member/.+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": [
                {"value": "5001000000"}, {"value": "0"}, {"value": "0"}, {"value": "0"}
            ]
        })))
        .mount(&server)
        .await;

    let client = TonhubClient::with_base_url(http(), &server.uri());
    let req = HistoryRequest {
        start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        end: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        hour: 0,
        pool_address: "EQpool".into(),
        member_address: "EQmember".into(),
        offset: FixedOffset::east_opt(0).unwrap(),
    };
    let snapshots = staking::fetch_history(&client, &req).await.unwrap();
    assert_eq!(snapshots.len(), 2);
    assert_eq!(snapshots[0].balance.staked, dec!(5));

    let rows = staking::calculate_rewards(&snapshots, dec!(0.1), "JPY");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].volume, "0.001000000");
    assert_eq!(rows[0].comment, "Seqno Segment:100 - 200");
}
