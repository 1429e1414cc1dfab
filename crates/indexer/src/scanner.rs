use std::{collections::HashMap, future::Future, sync::Arc};

use chrono::Utc;
use shared::{
    domain::{Address, AssetDescriptor, AssetKind},
    protocol::{LogEntry, LogFilter},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};
use wallet::{
    abi::{
        decode_words, event_topic, word_to_address, word_to_uint, AbiError, WORD_LEN,
        CONTRIBUTION_EVENT, TOKEN_CONTRIBUTION_EVENT,
    },
    WalletProvider,
};

use crate::{
    ledger::{ContributedAsset, ContributionLedger, ContributionRecord},
    IndexerError, ScanConfig,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub from: u64,
    pub to: u64,
    pub requests: usize,
    pub recorded: usize,
    pub skipped_blocks: Vec<u64>,
}

pub struct ContributionScanner {
    provider: Arc<dyn WalletProvider>,
    config: ScanConfig,
    native_topic: String,
    token_topic: String,
    tokens: HashMap<Address, AssetDescriptor>,
    ledger: Mutex<ContributionLedger>,
    cursors: Mutex<HashMap<Address, u64>>,
    events: broadcast::Sender<ContributionRecord>,
}

impl ContributionScanner {
    pub fn new(provider: Arc<dyn WalletProvider>, config: ScanConfig) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            provider,
            config,
            native_topic: event_topic(CONTRIBUTION_EVENT),
            token_topic: event_topic(TOKEN_CONTRIBUTION_EVENT),
            tokens: HashMap::new(),
            ledger: Mutex::new(ContributionLedger::new()),
            cursors: Mutex::new(HashMap::new()),
            events,
        }
    }

    /// Tokens whose symbol and decimals are attached to recorded
    /// contributions. Native descriptors are ignored.
    pub fn with_tokens(mut self, assets: impl IntoIterator<Item = AssetDescriptor>) -> Self {
        for asset in assets {
            if let AssetKind::Erc20 { token } = asset.kind {
                self.tokens.insert(token, asset);
            }
        }
        self
    }

    /// Newly recorded contributions, as they are found.
    pub fn subscribe(&self) -> broadcast::Receiver<ContributionRecord> {
        self.events.subscribe()
    }

    pub async fn ledger(&self) -> ContributionLedger {
        self.ledger.lock().await.clone()
    }

    /// Scans from after the campaign's last recorded block (or from
    /// `start_block` on reset) up to the current tip.
    pub async fn scan_campaign(&self, campaign: Address) -> Result<ScanReport, IndexerError> {
        let from = if self.config.reset {
            self.config.start_block
        } else {
            self.ledger
                .lock()
                .await
                .last_block(campaign)
                .map_or(self.config.start_block, |block| block + 1)
        };
        let to = self.provider.block_number().await.map_err(IndexerError::Tip)?;
        if from > to {
            info!(%campaign, from, to, "indexer: no new blocks to scan");
            return Ok(ScanReport {
                from,
                to,
                ..ScanReport::default()
            });
        }
        self.scan_range(campaign, from, to).await
    }

    /// Walks `[from, to]` in batches. A timed-out or oversized batch is
    /// halved; a single block that still fails is skipped. Any other
    /// provider error ends the scan.
    pub async fn scan_range(
        &self,
        campaign: Address,
        from: u64,
        to: u64,
    ) -> Result<ScanReport, IndexerError> {
        let mut report = ScanReport {
            from,
            to,
            ..ScanReport::default()
        };
        let mut batch = self.config.batch_size.max(1);
        let mut start = from;

        while start <= to {
            let end = start.saturating_add(batch - 1).min(to);
            debug!(%campaign, start, end, "indexer: scanning batch");
            report.requests += 1;
            match self.fetch(campaign, start, end).await {
                Ok(logs) => {
                    report.recorded += self.record(campaign, &logs).await;
                    start = end + 1;
                }
                Err(err) if err.is_retryable() && batch > 1 => {
                    batch = (batch / 2).max(1);
                    warn!(
                        %campaign,
                        start,
                        batch,
                        error = %err,
                        "indexer: batch failed, halving"
                    );
                }
                Err(err) if err.is_retryable() => {
                    warn!(%campaign, block = start, error = %err, "indexer: skipping block");
                    report.skipped_blocks.push(start);
                    start += 1;
                }
                Err(source) => {
                    return Err(IndexerError::Logs {
                        from: start,
                        to: end,
                        source,
                    })
                }
            }
        }

        info!(
            %campaign,
            from,
            to,
            recorded = report.recorded,
            skipped = report.skipped_blocks.len(),
            "indexer: scan complete"
        );
        Ok(report)
    }

    /// Starts watching each campaign from the current tip; earlier blocks are
    /// never visited by `poll_once`.
    pub async fn watch_from_tip(&self, campaigns: &[Address]) -> Result<u64, IndexerError> {
        let tip = self.provider.block_number().await.map_err(IndexerError::Tip)?;
        let mut cursors = self.cursors.lock().await;
        for campaign in campaigns {
            cursors.insert(*campaign, tip);
            info!(%campaign, from = tip + 1, "indexer: watching");
        }
        Ok(tip)
    }

    /// One follow step: at most `follow_window` new blocks per campaign.
    /// Returns how many contributions were recorded.
    pub async fn poll_once(&self, campaigns: &[Address]) -> Result<usize, IndexerError> {
        let tip = self.provider.block_number().await.map_err(IndexerError::Tip)?;
        let window = self.config.follow_window.max(1);
        let mut recorded = 0;

        for campaign in campaigns {
            let last_seen = *self.cursors.lock().await.entry(*campaign).or_insert(tip);
            let watch = last_seen + 1;
            if watch > tip {
                continue;
            }
            let to = watch.saturating_add(window - 1).min(tip);

            let next = match self.fetch(*campaign, watch, to).await {
                Ok(logs) => {
                    recorded += self.record(*campaign, &logs).await;
                    to
                }
                Err(err) if err.is_retryable() => {
                    warn!(
                        %campaign,
                        block = watch,
                        error = %err,
                        "indexer: poll failed, retrying"
                    );
                    last_seen
                }
                Err(err) => {
                    warn!(
                        %campaign,
                        block = watch,
                        error = %err,
                        "indexer: poll failed, skipping block"
                    );
                    watch
                }
            };
            self.cursors.lock().await.insert(*campaign, next);
        }
        Ok(recorded)
    }

    /// Polls every `poll_interval` until `shutdown` resolves.
    pub async fn follow<F>(&self, campaigns: &[Address], shutdown: F) -> Result<(), IndexerError>
    where
        F: Future<Output = ()>,
    {
        self.watch_from_tip(campaigns).await?;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("indexer: follow stopped");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
            if let Err(err) = self.poll_once(campaigns).await {
                warn!(error = %err, "indexer: poll skipped");
            }
        }
    }

    async fn fetch(
        &self,
        campaign: Address,
        from: u64,
        to: u64,
    ) -> Result<Vec<LogEntry>, wallet::WalletError> {
        let filter = LogFilter::new(
            campaign,
            from,
            to,
            vec![self.native_topic.clone(), self.token_topic.clone()],
        );
        self.provider.logs(&filter).await
    }

    async fn record(&self, campaign: Address, logs: &[LogEntry]) -> usize {
        let mut ledger = self.ledger.lock().await;
        let mut recorded = 0;
        for log in logs {
            let record = match self.decode(campaign, log) {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(err) => {
                    warn!(tx = %log.transaction_hash, error = %err, "indexer: undecodable log");
                    continue;
                }
            };
            if ledger.insert(record.clone()) {
                info!(
                    %campaign,
                    tx = %record.tx_hash,
                    block = record.block,
                    investor = %record.investor,
                    amount = %record.display_amount(),
                    "indexer: contribution recorded"
                );
                let _ = self.events.send(record);
                recorded += 1;
            }
        }
        recorded
    }

    /// `Ok(None)` for logs that are not contribution events.
    fn decode(
        &self,
        campaign: Address,
        log: &LogEntry,
    ) -> Result<Option<ContributionRecord>, AbiError> {
        let Some(topic0) = log.topics.first().map(|t| t.to_ascii_lowercase()) else {
            return Ok(None);
        };
        let token_event = if topic0 == self.native_topic {
            false
        } else if topic0 == self.token_topic {
            true
        } else {
            return Ok(None);
        };

        // Indexed arguments come first in both events, so topics then data
        // yields the arguments in declaration order.
        let mut words: Vec<[u8; WORD_LEN]> = Vec::new();
        for topic in &log.topics[1..] {
            words.extend(decode_words(topic)?);
        }
        words.extend(decode_words(&log.data)?);

        let expected = if token_event { 3 } else { 2 };
        if words.len() != expected {
            return Err(AbiError::MalformedData(format!(
                "expected {expected} arguments, found {}",
                words.len()
            )));
        }
        let address_at = |i: usize| {
            word_to_address(&words[i])
                .ok_or_else(|| AbiError::MalformedData(format!("argument {i} is not an address")))
        };
        let investor = address_at(0)?;
        let asset = if token_event {
            let token = address_at(1)?;
            let known = self.tokens.get(&token);
            ContributedAsset::Token {
                token,
                symbol: known.map(|asset| asset.symbol.clone()),
                decimals: known.map(|asset| asset.decimals),
            }
        } else {
            ContributedAsset::Native
        };
        let amount = word_to_uint(&words[expected - 1])
            .ok_or_else(|| AbiError::MalformedData("amount exceeds 128 bits".to_string()))?;
        let block = log
            .block()
            .ok_or_else(|| AbiError::MalformedData(format!("block {}", log.block_number)))?;

        Ok(Some(ContributionRecord {
            campaign,
            tx_hash: log.transaction_hash,
            block,
            investor,
            asset,
            amount,
            recorded_at: Utc::now(),
        }))
    }
}

#[cfg(test)]
#[path = "tests/scanner_tests.rs"]
mod tests;
