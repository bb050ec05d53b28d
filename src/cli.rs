//! Command-line interface: argument parsing and subcommand dispatch.

use anyhow::{bail, Context, Result};
use chrono::{FixedOffset, Local, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::address::TonAddress;
use crate::api::tonapi::{SortOrder, TonApiClient};
use crate::api::toncenter::{self, IndexClient, TransactionQuery};
use crate::api::tonhub::TonhubClient;
use crate::api::ApiHttp;
use crate::config::AppConfig;
use crate::dashboard::{self, DashboardDefaults, DashboardState};
use crate::export::{self, cryptact, OutputDir, OverwritePolicy};
use crate::holdings::{self, HoldingsQuery};
use crate::staking::{self, HistoryRequest};

/// Transactions requested from TonAPI in one call.
const TONAPI_TX_LIMIT: u32 = 100;

/// File stem used for exports built from the TON Index v3 API.
const INDEX_SOURCE: &str = "tonindex_v3";

#[derive(Debug, Parser)]
#[command(name = "ton-ledger", version, about = "TON transaction export and staking reward ledger")]
pub struct Cli {
    /// Path to config.toml. Searched upward from the working directory if omitted.
    #[arg(long, global = true, env = "TON_LEDGER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print every representation of the configured wallet address.
    Address,
    /// Fetch recent transactions and optionally dump the raw JSON.
    Transactions {
        #[arg(long, value_enum, default_value_t = TxSource::Toncenter)]
        source: TxSource,
        /// Days of history. Defaults to `transaction_history_period`.
        #[arg(long)]
        days: Option<i64>,
    },
    /// Write incoming transfers as a Cryptact custom CSV.
    Cryptact {
        /// Newest rows first.
        #[arg(long)]
        descending: bool,
        /// Overwrite an existing file without asking.
        #[arg(long)]
        force: bool,
    },
    /// Report wallet balance, pool stake and their fiat value.
    Holdings,
    /// Sample the pool stake daily and write the reward ledger.
    Staking {
        /// First day (YYYY-MM-DD), inclusive.
        #[arg(long)]
        start: NaiveDate,
        /// Last day (YYYY-MM-DD), inclusive.
        #[arg(long)]
        end: NaiveDate,
        /// Local hour at which each day is sampled.
        #[arg(long)]
        hour: Option<u32>,
        /// Largest daily increase still counted as a reward, in TON.
        #[arg(long)]
        adjust: Option<Decimal>,
        #[arg(long)]
        force: bool,
    },
    /// Serve the staking dashboard until Ctrl+C.
    Dashboard {
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TxSource {
    Toncenter,
    Tonapi,
}

impl TxSource {
    fn dump_name(self) -> &'static str {
        match self {
            TxSource::Toncenter => INDEX_SOURCE,
            TxSource::Tonapi => "tonapi",
        }
    }
}

/// Local hour that corresponds to 00:00 UTC. Whole hours only.
pub fn utc_midnight_hour(offset: &FixedOffset) -> u32 {
    (offset.local_minus_utc() / 3600).rem_euclid(24) as u32
}

fn overwrite_policy(force: bool) -> OverwritePolicy {
    if force {
        OverwritePolicy::Always
    } else {
        OverwritePolicy::Prompt
    }
}

fn require<'a>(value: &'a str, key: &str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        bail!("Please set '{key}' in the config.toml file.");
    }
    Ok(value)
}

fn today(offset: &FixedOffset) -> NaiveDate {
    Local::now().with_timezone(offset).date_naive()
}

fn index_client(cfg: &AppConfig, http: ApiHttp) -> IndexClient {
    IndexClient::new(
        http,
        AppConfig::resolve_secret(cfg.api.toncenter_api_key_env.as_deref()),
        Duration::from_millis(cfg.api.page_delay_ms),
    )
}

fn tonapi_client(cfg: &AppConfig, http: ApiHttp) -> TonApiClient {
    TonApiClient::new(
        http,
        AppConfig::resolve_secret(cfg.api.tonapi_api_key_env.as_deref()),
    )
}

/// Save the raw API payload when JSON dumps are enabled.
fn dump_raw(cfg: &AppConfig, out: &OutputDir, source: &str, raw: &[Value], today: NaiveDate) -> Result<()> {
    if !cfg.file_save_option.save_allow_json {
        return Ok(());
    }
    if raw.is_empty() {
        warn!(source, "No transactions to save");
        return Ok(());
    }
    let filename = export::raw_dump_filename(source, raw.len(), today);
    if let Some(path) = out.save_json(raw, &filename)? {
        println!("Saved raw transactions to {}", path.display());
    }
    Ok(())
}

/// Run one subcommand against a loaded configuration.
pub async fn run(command: Command, cfg: &AppConfig) -> Result<()> {
    let offset = cfg.staking_info.offset()?;
    let http = ApiHttp::from_config(cfg)?;
    let out_dir = cfg.output_dir();

    match command {
        Command::Address => {
            let address: TonAddress = cfg
                .require_address()?
                .parse()
                .context("Configured wallet address is invalid")?;
            for (label, value) in address.variations() {
                println!("{label}: {value}");
            }
        }

        Command::Transactions { source, days } => {
            let account = cfg.require_address()?;
            let days = days.unwrap_or(cfg.ton_info.transaction_history_period);
            let raw = match source {
                TxSource::Toncenter => {
                    let query = TransactionQuery::new(account).last_days(Utc::now(), days);
                    index_client(cfg, http).get_transactions_v3(&query).await?
                }
                TxSource::Tonapi => {
                    tonapi_client(cfg, http)
                        .account_transactions(account, TONAPI_TX_LIMIT, SortOrder::Desc)
                        .await?
                }
            };
            println!("Retrieved {} transactions from {}", raw.len(), source.dump_name());
            let out = OutputDir::new(out_dir, OverwritePolicy::Prompt);
            dump_raw(cfg, &out, source.dump_name(), &raw, today(&offset))?;
        }

        Command::Cryptact { descending, force } => {
            if !cfg.file_save_option.save_allow_csv {
                info!("CSV export disabled (save_allow_csv = false)");
                return Ok(());
            }
            let account = cfg.require_address()?;
            let tz = cfg.cryptact_info.tz()?;
            let query = TransactionQuery::new(account)
                .last_days(Utc::now(), cfg.ton_info.transaction_history_period);
            let raw = index_client(cfg, http).get_transactions_v3(&query).await?;

            let out = OutputDir::new(out_dir, overwrite_policy(force));
            let day = today(&offset);
            dump_raw(cfg, &out, INDEX_SOURCE, &raw, day)?;

            let txs = toncenter::typed_transactions(&raw);
            let rows = cryptact::rows_from_transactions(&txs, &tz, &cfg.cryptact_info.counter);
            if let Some(path) = cryptact::write_custom_csv(&out, rows, !descending, INDEX_SOURCE, day)? {
                println!("Cryptact CSV saved to {}", path.display());
            }
        }

        Command::Holdings => {
            let q = HoldingsQuery {
                wallet: cfg.require_address()?,
                pool_address: require(&cfg.ton_info.pool_address, "pool_address")?,
                member_address: require(&cfg.ton_info.get_member_use_address, "get_member_use_address")?,
                counter: &cfg.cryptact_info.counter,
                offset,
            };
            let blocks = TonhubClient::new(http.clone());
            let report = holdings::fetch_holdings(&blocks, &tonapi_client(cfg, http), &q).await?;
            println!("{report}");
        }

        Command::Staking { start, end, hour, adjust, force } => {
            let adjust_val = adjust.unwrap_or(cfg.staking_info.staking_calculation_adjustment_value);
            if adjust_val <= Decimal::ZERO {
                bail!("Adjust value must be positive");
            }
            let req = HistoryRequest {
                start,
                end,
                hour: hour.unwrap_or_else(|| utc_midnight_hour(&offset)),
                pool_address: cfg.ton_info.pool_address.clone(),
                member_address: cfg.ton_info.get_member_use_address.clone(),
                offset,
            };
            let snapshots = staking::fetch_history(&TonhubClient::new(http), &req).await?;
            if snapshots.is_empty() {
                bail!("No staking history data retrieved. Please check the input parameters and try again.");
            }

            let out = OutputDir::new(out_dir, overwrite_policy(force));
            let day = today(&offset);
            if cfg.file_save_option.save_allow_stkrwd {
                if let Some(path) = staking::write_history_csv(&out, &snapshots, day)? {
                    println!("Staking amount history saved to {}", path.display());
                }
            }

            let rows = staking::calculate_rewards(&snapshots, adjust_val, &cfg.cryptact_info.counter);
            info!(snapshots = snapshots.len(), rewards = rows.len(), %adjust_val, "Rewards calculated");
            if let Some(path) = staking::write_rewards_csv(&out, &rows, start, end, adjust_val, day)? {
                println!("Staking compensation history is saved in {}.", path.display());
            }
        }

        Command::Dashboard { port } => {
            let address: TonAddress = cfg
                .require_address()?
                .parse()
                .context("Configured wallet address is invalid")?;
            let defaults = DashboardDefaults {
                pool_address: cfg.ton_info.pool_address.clone(),
                member_address: cfg.ton_info.get_member_use_address.clone(),
                adjust_val: cfg.staking_info.staking_calculation_adjustment_value,
                hour: utc_midnight_hour(&offset),
                basic_address: Some(address.basic_workchain_address()),
            };
            let state = Arc::new(DashboardState::new(
                Arc::new(TonhubClient::new(http)),
                defaults,
                offset,
                cfg.cryptact_info.counter.clone(),
                cfg.file_save_option.save_allow_stkrwd,
                out_dir,
            ));
            dashboard::serve(state, port.unwrap_or(cfg.dashboard.port)).await?;
        }
    }
    Ok(())
}
