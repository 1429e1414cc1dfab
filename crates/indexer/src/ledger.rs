use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::domain::{format_units, Address, TxHash, NATIVE_DECIMALS};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContributedAsset {
    Native,
    /// `symbol` and `decimals` are set when the token is a known asset.
    Token {
        token: Address,
        symbol: Option<String>,
        decimals: Option<u8>,
    },
}

impl ContributedAsset {
    /// Currency label for display: the token symbol, or its address when
    /// the token is unknown.
    pub fn label(&self, native_symbol: &str) -> String {
        match self {
            ContributedAsset::Native => native_symbol.to_string(),
            ContributedAsset::Token {
                symbol: Some(symbol),
                ..
            } => symbol.clone(),
            ContributedAsset::Token { token, .. } => format!("token {token}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContributionRecord {
    pub campaign: Address,
    pub tx_hash: TxHash,
    pub block: u64,
    pub investor: Address,
    pub asset: ContributedAsset,
    /// Base units of `asset`.
    pub amount: u128,
    pub recorded_at: DateTime<Utc>,
}

impl ContributionRecord {
    /// Whole units of the asset; an unknown token's amount stays in base
    /// units.
    pub fn display_amount(&self) -> String {
        match self.asset {
            ContributedAsset::Native => format_units(self.amount, NATIVE_DECIMALS),
            ContributedAsset::Token {
                decimals: Some(decimals),
                ..
            } => format_units(self.amount, decimals),
            ContributedAsset::Token { decimals: None, .. } => self.amount.to_string(),
        }
    }
}

/// Contributions keyed by transaction hash; a hash is recorded once.
#[derive(Debug, Clone, Default)]
pub struct ContributionLedger {
    records: HashMap<TxHash, ContributionRecord>,
}

impl ContributionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the transaction was already recorded.
    pub fn insert(&mut self, record: ContributionRecord) -> bool {
        if self.records.contains_key(&record.tx_hash) {
            return false;
        }
        self.records.insert(record.tx_hash, record);
        true
    }

    pub fn contains(&self, tx_hash: &TxHash) -> bool {
        self.records.contains_key(tx_hash)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last_block(&self, campaign: Address) -> Option<u64> {
        self.records
            .values()
            .filter(|r| r.campaign == campaign)
            .map(|r| r.block)
            .max()
    }

    /// Ordered by block, then hash.
    pub fn records_for(&self, campaign: Address) -> Vec<&ContributionRecord> {
        let mut records: Vec<_> = self
            .records
            .values()
            .filter(|r| r.campaign == campaign)
            .collect();
        records.sort_by_key(|r| (r.block, r.tx_hash.0));
        records
    }

    pub fn native_total(&self, campaign: Address) -> u128 {
        self.records_for(campaign)
            .into_iter()
            .filter(|r| r.asset == ContributedAsset::Native)
            .fold(0u128, |total, r| total.saturating_add(r.amount))
    }
}
