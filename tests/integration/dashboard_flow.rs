//! Dashboard API driven through the router against a mock chain.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::FixedOffset;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

use ton_ledger::dashboard::{build_router, DashboardDefaults, DashboardState};

use crate::mock_chain::MockChain;

fn app(dir: &Path) -> Router {
    let chain = MockChain::new("EQpool", &[dec!(10), dec!(10.02), dec!(10.05), dec!(20)]);
    let state = Arc::new(DashboardState::new(
        Arc::new(chain),
        DashboardDefaults {
            pool_address: "EQpool".into(),
            member_address: "EQmember".into(),
            adjust_val: dec!(0.1),
            hour: 9,
            basic_address: Some("EQCjk1hh952vWaE9bRguFkAhDAL5jj3xj9p0uPWrFBq_GEMS".into()),
        },
        FixedOffset::east_opt(9 * 3600).unwrap(),
        "JPY".into(),
        true,
        dir.to_path_buf(),
    ));
    build_router(state)
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), 1_000_000).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn history_form(start: &str, end: &str) -> Value {
    json!({
        "pool_address": "EQpool",
        "member_address": "EQmember",
        "start_date": start,
        "end_date": end,
        "hour": 9,
    })
}

#[tokio::test]
async fn test_fetch_then_save_rewards() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(tmp.path());

    let (status, body) = call(
        &app,
        "POST",
        "/api/staking-history",
        Some(history_form("2024-01-01", "2024-01-04")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["records"].as_array().unwrap().len(), 4);
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("Data fetched successfully. 4 records retrieved."));
    assert!(message.contains("Data saved to"));

    let (_, stored) = call(&app, "GET", "/api/staking-history", None).await;
    assert_eq!(stored.as_array().unwrap().len(), 4);

    let form = json!({"adjust_val": 0.1, "start_date": "2024-01-01", "end_date": "2024-01-04"});
    let (status, body) = call(&app, "POST", "/api/rewards", Some(form.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["confirm_overwrite"], false);
    assert_eq!(body["rewards"], 2);
    let path = body["path"].as_str().unwrap().to_string();
    assert!(Path::new(&path).exists());
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Staking compensation history is saved in"));

    // Same file again: the client must confirm first
    let (status, body) = call(&app, "POST", "/api/rewards", Some(form)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["confirm_overwrite"], true);
    assert!(body["path"].is_null());

    let form = json!({
        "adjust_val": 0.1,
        "start_date": "2024-01-01",
        "end_date": "2024-01-04",
        "overwrite": true,
    });
    let (_, body) = call(&app, "POST", "/api/rewards", Some(form)).await;
    assert_eq!(body["confirm_overwrite"], false);
    assert_eq!(body["path"].as_str().unwrap(), path);
}

#[tokio::test]
async fn test_rewards_before_fetch_conflict() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(tmp.path());
    let form = json!({"adjust_val": 0.1, "start_date": "2024-01-01", "end_date": "2024-01-04"});
    let (status, body) = call(&app, "POST", "/api/rewards", Some(form)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].as_str().unwrap().starts_with("Error:"));
}

#[tokio::test]
async fn test_fetch_errors() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(tmp.path());

    let (status, body) = call(
        &app,
        "POST",
        "/api/staking-history",
        Some(history_form("2024-01-05", "2024-01-01")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().starts_with("Error:"));

    // Before the first block
    let (status, body) = call(
        &app,
        "POST",
        "/api/staking-history",
        Some(history_form("2023-06-01", "2023-06-03")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body["message"],
        "Error: No staking history data retrieved. Please check the input parameters and try again."
    );
}

#[tokio::test]
async fn test_staking_stats_url() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(tmp.path());
    let (status, body) = call(&app, "GET", "/api/staking-stats-url", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["url"],
        "https://tonwhales.com/staking/address/EQCjk1hh952vWaE9bRguFkAhDAL5jj3xj9p0uPWrFBq_GEMS"
    );
}
