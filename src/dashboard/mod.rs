//! Dashboard: Axum web server for staking-amount history.
//!
//! Serves a JSON API and a self-contained HTML page that charts the
//! fetched history in the browser. CORS is open for local use.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method},
    response::Html,
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

pub use routes::{AppState, DashboardDefaults, DashboardState};

/// The embedded dashboard HTML (compiled into the binary).
const DASHBOARD_HTML: &str = include_str!("templates/index.html");

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_static("*"))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/defaults", get(routes::get_defaults))
        .route(
            "/api/staking-history",
            get(routes::get_history).post(routes::fetch_history),
        )
        .route("/api/rewards", axum::routing::post(routes::save_rewards))
        .route("/api/staking-stats-url", get(routes::staking_stats_url))
        .route("/health", get(routes::health))
        .route("/", get(serve_dashboard))
        .layer(cors)
        .with_state(state)
}

/// Serve the dashboard until Ctrl+C.
pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind dashboard port {port}"))?;

    info!(port, "Dashboard server starting on http://localhost:{port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received.");
        })
        .await
        .context("Dashboard server error")
}

/// Serve the embedded HTML dashboard.
async fn serve_dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
