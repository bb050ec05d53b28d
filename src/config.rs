//! Configuration loading from TOML with environment variable resolution.
//!
//! `config.toml` is located by walking up from the working directory.
//! API keys are referenced by env-var name in the config and resolved at
//! runtime, wrapped in `secrecy::SecretString` so they never hit the logs.

use anyhow::{anyhow, Context, Result};
use chrono::FixedOffset;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub ton_info: TonInfoConfig,
    pub file_save_option: FileSaveConfig,
    pub staking_info: StakingInfoConfig,
    pub cryptact_info: CryptactConfig,
    pub debug_info: DebugConfig,
    pub api: ApiConfig,
    pub dashboard: DashboardConfig,
    pub output: OutputConfig,

    /// Directory containing the loaded config file. Relative paths resolve here.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TonInfoConfig {
    pub user_friendly_address: String,
    pub pool_address: String,
    /// Member address passed to the pool's `get_member` getter.
    pub get_member_use_address: String,
    /// Days of transaction history to fetch.
    pub transaction_history_period: i64,
}

impl Default for TonInfoConfig {
    fn default() -> Self {
        Self {
            user_friendly_address: String::new(),
            pool_address: String::new(),
            get_member_use_address: String::new(),
            transaction_history_period: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct FileSaveConfig {
    pub save_allow_json: bool,
    pub save_allow_csv: bool,
    pub save_allow_stkrwd: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StakingInfoConfig {
    /// Largest staked-amount increase (TON) still counted as a reward.
    pub staking_calculation_adjustment_value: Decimal,
    /// Local offset from UTC in hours. Fractional offsets are allowed.
    pub local_timezone: f64,
}

impl Default for StakingInfoConfig {
    fn default() -> Self {
        Self {
            staking_calculation_adjustment_value: dec!(0.1),
            local_timezone: 0.0,
        }
    }
}

impl StakingInfoConfig {
    pub fn offset(&self) -> Result<FixedOffset> {
        offset_from_hours(self.local_timezone)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CryptactConfig {
    pub counter: String,
    /// IANA zone used for ledger timestamps.
    pub timezone: String,
}

impl Default for CryptactConfig {
    fn default() -> Self {
        Self {
            counter: "JPY".to_string(),
            timezone: "Asia/Tokyo".to_string(),
        }
    }
}

impl CryptactConfig {
    pub fn tz(&self) -> Result<chrono_tz::Tz> {
        self.timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|e| anyhow!("Invalid cryptact timezone '{}': {e}", self.timezone))
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct DebugConfig {
    pub enable_tracing: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub toncenter_api_key_env: Option<String>,
    pub tonapi_api_key_env: Option<String>,
    pub page_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            toncenter_api_key_env: None,
            tonapi_api_key_env: None,
            page_delay_ms: 1000,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self { port: 8050 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from("output") }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config = Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Load from an explicit path, or search upward from the working directory.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let cwd = std::env::current_dir().context("Failed to read working directory")?;
                Self::load(&find_config_file(CONFIG_FILE_NAME, &cwd)?)
            }
        }
    }

    /// Output directory, resolved against the config file's directory.
    pub fn output_dir(&self) -> PathBuf {
        if self.output.dir.is_absolute() {
            self.output.dir.clone()
        } else {
            self.base_dir.join(&self.output.dir)
        }
    }

    /// The wallet address, or an error naming the missing key.
    pub fn require_address(&self) -> Result<&str> {
        let addr = self.ton_info.user_friendly_address.trim();
        if addr.is_empty() {
            anyhow::bail!("Please set 'user_friendly_address' in the config.toml file.");
        }
        Ok(addr)
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }

    /// Resolve an optional secret. A configured but unset variable is treated as absent.
    pub fn resolve_secret(env_name: Option<&str>) -> Option<SecretString> {
        env_name
            .and_then(|name| Self::resolve_env(name).ok())
            .filter(|v| !v.is_empty())
            .map(SecretString::new)
    }
}

/// Walk from `start` up to the filesystem root looking for `file_name`.
pub fn find_config_file(file_name: &str, start: &Path) -> Result<PathBuf> {
    for dir in start.ancestors() {
        let candidate = dir.join(file_name);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    anyhow::bail!(
        "Configuration file '{file_name}' not found in the project directory or its parents."
    )
}

/// Convert an hour offset such as `9` or `5.5` into a `FixedOffset`.
pub fn offset_from_hours(hours: f64) -> Result<FixedOffset> {
    let secs = (hours * 3600.0).round();
    if !secs.is_finite() || secs.abs() >= 86_400.0 {
        anyhow::bail!("Timezone offset out of range: {hours} hours");
    }
    FixedOffset::east_opt(secs as i32)
        .ok_or_else(|| anyhow!("Timezone offset out of range: {hours} hours"))
}
