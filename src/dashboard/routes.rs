//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{FixedOffset, Local, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::api::BlockSource;
use crate::export::{OutputDir, OverwritePolicy};
use crate::staking::{self, HistoryRequest};
use crate::types::StakingSnapshot;

pub const TON_WHALES_STAKING_URL: &str = "https://tonwhales.com/staking/address";

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Values pre-filled into the dashboard form.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardDefaults {
    pub pool_address: String,
    pub member_address: String,
    pub adjust_val: Decimal,
    pub hour: u32,
    /// Bounceable URL-safe wallet address, if one is configured.
    pub basic_address: Option<String>,
}

/// The last successful fetch and the range it covered.
#[derive(Debug, Clone)]
pub struct FetchedHistory {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub snapshots: Vec<StakingSnapshot>,
}

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub source: Arc<dyn BlockSource>,
    pub defaults: DashboardDefaults,
    pub offset: FixedOffset,
    pub counter: String,
    /// Write the raw history CSV after each fetch.
    pub save_history: bool,
    pub output: OutputDir,
    pub history: RwLock<Option<FetchedHistory>>,
}

impl DashboardState {
    pub fn new(
        source: Arc<dyn BlockSource>,
        defaults: DashboardDefaults,
        offset: FixedOffset,
        counter: String,
        save_history: bool,
        output_dir: std::path::PathBuf,
    ) -> Self {
        Self {
            source,
            defaults,
            offset,
            counter,
            save_history,
            // Handlers decide about overwrites themselves; never block on stdin.
            output: OutputDir::new(output_dir, OverwritePolicy::Always),
            history: RwLock::new(None),
        }
    }

    fn today(&self) -> NaiveDate {
        Local::now().with_timezone(&self.offset).date_naive()
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryForm {
    pub pool_address: String,
    pub member_address: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub hour: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    pub records: Vec<StakingSnapshot>,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RewardsForm {
    pub adjust_val: Decimal,
    /// Defaults to the range of the last fetch.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub overwrite: bool,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct RewardsResponse {
    /// The target file exists; resend with `overwrite: true` to replace it.
    pub confirm_overwrite: bool,
    pub message: String,
    pub path: Option<String>,
    pub rewards: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsUrlResponse {
    pub url: String,
}

/// Error body: `{"message": "Error: ..."}`.
#[derive(Debug)]
pub struct ApiError(StatusCode, String);

impl ApiError {
    fn new(status: StatusCode, msg: impl std::fmt::Display) -> Self {
        Self(status, format!("Error: {msg}"))
    }
}

/// Unwrap a JSON body, turning extractor rejections into 400 `Error: ...`.
fn json_form<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(form)| form)
        .map_err(|rejection| ApiError::new(StatusCode::BAD_REQUEST, rejection.body_text()))
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({ "message": self.1 }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/defaults
pub async fn get_defaults(State(state): State<AppState>) -> Json<DashboardDefaults> {
    Json(state.defaults.clone())
}

/// POST /api/staking-history
pub async fn fetch_history(
    State(state): State<AppState>,
    payload: Result<Json<HistoryForm>, JsonRejection>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let form = json_form(payload)?;
    let req = HistoryRequest {
        start: form.start_date,
        end: form.end_date,
        hour: form.hour,
        pool_address: form.pool_address.trim().to_string(),
        member_address: form.member_address.trim().to_string(),
        offset: state.offset,
    };
    req.validate()
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e))?;

    let snapshots = staking::fetch_history(state.source.as_ref(), &req)
        .await
        .map_err(|e| ApiError::new(StatusCode::BAD_GATEWAY, e))?;

    if snapshots.is_empty() {
        return Err(ApiError::new(
            StatusCode::NOT_FOUND,
            "No staking history data retrieved. Please check the input parameters and try again.",
        ));
    }

    let mut message = format!(
        "Data fetched successfully. {} records retrieved.",
        snapshots.len()
    );
    if state.save_history {
        match staking::write_history_csv(&state.output, &snapshots, state.today()) {
            Ok(Some(path)) => message.push_str(&format!(" Data saved to {}", path.display())),
            Ok(None) => {}
            Err(e) => {
                error!(error = %e, "Failed to save staking history");
                message.push_str(&format!(" Error saving data: {e}"));
            }
        }
    }

    *state.history.write().await = Some(FetchedHistory {
        start: req.start,
        end: req.end,
        snapshots: snapshots.clone(),
    });
    info!(records = snapshots.len(), "Dashboard history updated");

    Ok(Json(HistoryResponse {
        records: snapshots,
        message,
    }))
}

/// GET /api/staking-history
pub async fn get_history(State(state): State<AppState>) -> Json<Vec<StakingSnapshot>> {
    let history = state.history.read().await;
    Json(
        history
            .as_ref()
            .map(|h| h.snapshots.clone())
            .unwrap_or_default(),
    )
}

/// POST /api/rewards
pub async fn save_rewards(
    State(state): State<AppState>,
    payload: Result<Json<RewardsForm>, JsonRejection>,
) -> Result<Json<RewardsResponse>, ApiError> {
    let form = json_form(payload)?;
    if form.adjust_val <= Decimal::ZERO {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Adjust value must be positive"));
    }

    let (snapshots, start, end) = {
        let history = state.history.read().await;
        match history.as_ref() {
            Some(h) => (
                h.snapshots.clone(),
                form.start_date.unwrap_or(h.start),
                form.end_date.unwrap_or(h.end),
            ),
            None => {
                return Err(ApiError::new(
                    StatusCode::CONFLICT,
                    "No staking data loaded. Fetch data first.",
                ))
            }
        }
    };

    let rows = staking::calculate_rewards(&snapshots, form.adjust_val, &state.counter);
    let today = state.today();
    let filename = staking::rewards_filename(
        start,
        end,
        form.adjust_val,
        rows.len(),
        today,
    );

    if state.output.join(&filename).exists() && !form.overwrite {
        return Ok(Json(RewardsResponse {
            confirm_overwrite: true,
            rewards: rows.len(),
            ..Default::default()
        }));
    }

    let path = staking::write_rewards_csv(
        &state.output,
        &rows,
        start,
        end,
        form.adjust_val,
        today,
    )
    .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e))?
    .ok_or_else(|| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "File not saved"))?;

    Ok(Json(RewardsResponse {
        confirm_overwrite: false,
        message: format!("Staking compensation history is saved in {}.", path.display()),
        path: Some(path.display().to_string()),
        rewards: rows.len(),
    }))
}

/// GET /api/staking-stats-url
pub async fn staking_stats_url(
    State(state): State<AppState>,
) -> Result<Json<StatsUrlResponse>, ApiError> {
    let addr = state.defaults.basic_address.as_deref().ok_or_else(|| {
        ApiError::new(StatusCode::NOT_FOUND, "No wallet address configured")
    })?;
    Ok(Json(StatsUrlResponse {
        url: format!("{TON_WHALES_STAKING_URL}/{addr}"),
    }))
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
