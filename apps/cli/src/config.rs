use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context};
use contribution::FailureDisplay;
use indexer::ScanConfig;
use serde::Deserialize;
use shared::domain::{Address, AssetDescriptor};
use url::Url;
use wallet::abi::ContractAbi;

pub const DEFAULT_CONFIG_FILE: &str = "homeshare.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// No URL means no wallet provider on this host.
    pub rpc_url: Option<Url>,
    pub abi_path: PathBuf,
    pub campaign: Option<Address>,
    pub native_symbol: String,
    /// Accepted in addition to the native coin.
    pub tokens: Vec<AssetDescriptor>,
    pub reload_delay: Duration,
    pub failure_display: FailureDisplay,
    pub confirmation_timeout: Duration,
    pub scan: ScanConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rpc_url: None,
            abi_path: PathBuf::from("blockchain/abi/PropertyCrowdfund.json"),
            campaign: None,
            native_symbol: "MON".into(),
            tokens: Vec::new(),
            reload_delay: Duration::from_millis(1500),
            failure_display: FailureDisplay::default(),
            confirmation_timeout: Duration::from_secs(120),
            scan: ScanConfig::default(),
        }
    }
}

impl Settings {
    /// The native coin first, then configured tokens.
    pub fn accepted_assets(&self) -> Vec<AssetDescriptor> {
        std::iter::once(AssetDescriptor::native(self.native_symbol.clone()))
            .chain(self.tokens.iter().cloned())
            .collect()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileSettings {
    rpc_url: Option<String>,
    abi_path: Option<PathBuf>,
    campaign: Option<Address>,
    native_symbol: Option<String>,
    tokens: Vec<AssetDescriptor>,
    reload_delay_ms: Option<u64>,
    failure_display: Option<FailureDisplay>,
    confirmation_timeout_secs: Option<u64>,
    scan: Option<ScanConfig>,
}

pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    load_settings_with(config_path, |key| std::env::var(key).ok())
}

/// Defaults, then the TOML file, then environment variables. An explicit
/// `config_path` must exist; the default file is optional.
pub fn load_settings_with(
    config_path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let raw = match config_path {
        Some(path) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("failed to read config file '{}'", path.display()))?,
        ),
        None => fs::read_to_string(DEFAULT_CONFIG_FILE).ok(),
    };
    if let Some(raw) = raw {
        let file_cfg: FileSettings = toml::from_str(&raw).context("invalid config file")?;
        apply_file(&mut settings, file_cfg)?;
    }

    apply_env(&mut settings, env)?;
    Ok(settings)
}

fn apply_file(settings: &mut Settings, file_cfg: FileSettings) -> anyhow::Result<()> {
    if let Some(v) = file_cfg.rpc_url {
        settings.rpc_url = parse_rpc_url(&v)?;
    }
    if let Some(v) = file_cfg.abi_path {
        settings.abi_path = v;
    }
    if let Some(v) = file_cfg.campaign {
        settings.campaign = Some(v);
    }
    if let Some(v) = file_cfg.native_symbol {
        settings.native_symbol = v;
    }
    if !file_cfg.tokens.is_empty() {
        if let Some(native) = file_cfg.tokens.iter().find(|asset| asset.is_native()) {
            bail!("token list may not contain the native asset ({})", native.symbol);
        }
        settings.tokens = file_cfg.tokens;
    }
    if let Some(v) = file_cfg.reload_delay_ms {
        settings.reload_delay = Duration::from_millis(v);
    }
    if let Some(v) = file_cfg.failure_display {
        settings.failure_display = v;
    }
    if let Some(v) = file_cfg.confirmation_timeout_secs {
        settings.confirmation_timeout = Duration::from_secs(v);
    }
    if let Some(v) = file_cfg.scan {
        settings.scan = v;
    }
    Ok(())
}

fn apply_env(
    settings: &mut Settings,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(v) = env("MONAD_RPC_URL") {
        settings.rpc_url = parse_rpc_url(&v)?;
    }
    if let Some(v) = env("APP__RPC_URL") {
        settings.rpc_url = parse_rpc_url(&v)?;
    }
    if let Some(v) = env("APP__ABI_PATH") {
        settings.abi_path = PathBuf::from(v);
    }
    if let Some(v) = env("APP__CAMPAIGN") {
        settings.campaign = Some(v.parse().context("APP__CAMPAIGN is not an address")?);
    }
    if let Some(v) = env("APP__RELOAD_DELAY_MS") {
        settings.reload_delay = Duration::from_millis(parse_number("APP__RELOAD_DELAY_MS", &v)?);
    }
    if let Some(v) = env("APP__FAILURE_DISPLAY") {
        settings.failure_display = v.parse().map_err(anyhow::Error::msg)?;
    }
    if let Some(v) = env("APP__CONFIRMATION_TIMEOUT_SECS") {
        settings.confirmation_timeout =
            Duration::from_secs(parse_number("APP__CONFIRMATION_TIMEOUT_SECS", &v)?);
    }
    if let Some(v) = env("MAX_BLOCK_RANGE") {
        settings.scan.batch_size = parse_number("MAX_BLOCK_RANGE", &v)?;
    }
    if let Some(v) = env("POLL_INTERVAL") {
        settings.scan.poll_interval = Duration::from_secs(parse_number("POLL_INTERVAL", &v)?);
    }
    if let Some(v) = env("RESET_FROM_BLOCK") {
        settings.scan.reset = matches!(v.trim(), "1" | "true");
    }
    Ok(())
}

/// Blank disables the provider; a trailing slash is dropped.
fn parse_rpc_url(raw: &str) -> anyhow::Result<Option<Url>> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(None);
    }
    let url = Url::parse(trimmed).with_context(|| format!("invalid rpc url '{trimmed}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("rpc url '{trimmed}' must use http or https");
    }
    Ok(Some(url))
}

fn parse_number(key: &str, raw: &str) -> anyhow::Result<u64> {
    raw.trim()
        .parse()
        .with_context(|| format!("{key} must be a non-negative integer, got '{raw}'"))
}

pub fn load_abi(path: &Path) -> anyhow::Result<ContractAbi> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read contract abi '{}'", path.display()))?;
    ContractAbi::from_json_str(&raw)
        .with_context(|| format!("invalid contract abi '{}'", path.display()))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
