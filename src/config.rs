// src/config.rs
//! TOML configuration with `${VAR}` environment substitution.
//!
//! Loaded once at startup; any problem here is fatal before the loop starts.
//! Secrets stay out of the file via `${VAR}` placeholders resolved from the
//! environment (`.env` is loaded by the binary first).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "config/alerter.toml";
pub const ENV_CONFIG_PATH: &str = "ALERTER_CONFIG_PATH";
pub const ENV_API_BASE_URL: &str = "API_BASE_URL";
pub const ENV_STATE_FILE: &str = "STATE_FILE";

fn default_timeout_secs() -> u64 {
    30
}
fn default_fetch_limit() -> usize {
    100
}
fn default_state_path() -> PathBuf {
    PathBuf::from("state/poll_state.json")
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiCfg,
    pub polling: PollingCfg,
    #[serde(default)]
    pub watched: WatchedCfg,
    pub telegram: TelegramCfg,
    #[serde(default)]
    pub state: StateCfg,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCfg {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingCfg {
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WatchedCfg {
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub event_types: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramCfg {
    pub bot_token: String,
    pub chat_ids: Vec<String>,
    /// Forum-topic thread for group chats that use them.
    #[serde(default)]
    pub thread_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StateCfg {
    #[serde(default = "default_state_path")]
    pub path: PathBuf,
}

impl Default for StateCfg {
    fn default() -> Self {
        Self {
            path: default_state_path(),
        }
    }
}

impl Config {
    /// Load from `$ALERTER_CONFIG_PATH` or the default path.
    pub fn load_default() -> Result<Self> {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let substituted = substitute_env_vars(&raw)?;
        let mut cfg: Config = toml::from_str(&substituted)
            .with_context(|| format!("parsing config {}", path.display()))?;
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deployment overrides that beat the file (Docker/production).
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(ENV_API_BASE_URL) {
            if !url.is_empty() {
                self.api.base_url = url;
            }
        }
        if let Ok(p) = std::env::var(ENV_STATE_FILE) {
            if !p.is_empty() {
                self.state.path = PathBuf::from(p);
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            bail!("api.base_url must not be empty");
        }
        if self.polling.interval_secs == 0 {
            bail!("polling.interval_secs must be at least 1");
        }
        if self.telegram.bot_token.trim().is_empty() {
            bail!("telegram.bot_token must not be empty");
        }
        if self.telegram.chat_ids.is_empty() {
            bail!("telegram.chat_ids must list at least one chat");
        }
        Ok(())
    }
}

/// Replace `${VAR}` placeholders with environment values before parsing.
/// A placeholder with no matching variable is a configuration error.
fn substitute_env_vars(raw: &str) -> Result<String> {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

    let mut out = String::with_capacity(raw.len());
    let mut last = 0;
    for caps in re.captures_iter(raw) {
        let whole = caps.get(0).expect("capture 0 always present");
        let name = &caps[1];
        let value =
            std::env::var(name).map_err(|_| anyhow!("environment variable {name} not set"))?;
        out.push_str(&raw[last..whole.start()]);
        out.push_str(&value);
        last = whole.end();
    }
    out.push_str(&raw[last..]);
    Ok(out)
}
