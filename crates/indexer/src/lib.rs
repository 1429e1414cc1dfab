//! Reads `Contribution` / `TokenContribution` events back off the chain so
//! recorded contributions can be reconciled with what the UI submitted.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use wallet::WalletError;

mod ledger;
mod scanner;

pub use ledger::{ContributedAsset, ContributionLedger, ContributionRecord};
pub use scanner::{ContributionScanner, ScanReport};

pub const DEFAULT_BATCH_SIZE: u64 = 200;
pub const DEFAULT_FOLLOW_WINDOW: u64 = 20;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("fetching the chain tip failed: {0}")]
    Tip(#[source] WalletError),
    #[error("fetching logs for blocks {from}..={to} failed: {source}")]
    Logs {
        from: u64,
        to: u64,
        #[source]
        source: WalletError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Blocks per `eth_getLogs` request before any halving.
    pub batch_size: u64,
    /// Blocks per request while following the tip.
    pub follow_window: u64,
    #[serde(with = "seconds")]
    pub poll_interval: Duration,
    pub start_block: u64,
    /// Rescan from `start_block` instead of resuming after the last record.
    pub reset: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            follow_window: DEFAULT_FOLLOW_WINDOW,
            poll_interval: DEFAULT_POLL_INTERVAL,
            start_block: 0,
            reset: false,
        }
    }
}

mod seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
