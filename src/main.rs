//! TON ledger
//!
//! Entry point. Loads `.env` and configuration, initialises structured
//! logging, and runs the requested subcommand.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use ton_ledger::cli::{self, Cli};
use ton_ledger::config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    let cfg = AppConfig::discover(cli.config.as_deref())?;

    init_logging(&cfg);
    info!(
        config_dir = %cfg.base_dir.display(),
        output_dir = %cfg.output_dir().display(),
        tracing = cfg.debug_info.enable_tracing,
        "ton-ledger starting"
    );

    cli::run(cli.command, &cfg).await
}

/// Initialise the `tracing` subscriber.
fn init_logging(cfg: &AppConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if cfg.debug_info.enable_tracing { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ton_ledger={default_level}")));

    let json_logging = std::env::var("TON_LEDGER_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
