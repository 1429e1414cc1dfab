use std::time::Duration;

use async_trait::async_trait;
use shared::{domain::TxHash, error::ContributionError};
use tracing::{debug, info, warn};
use wallet::WalletProvider;

use crate::session::WalletSession;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[async_trait]
pub trait ConfirmationWaiter: Send + Sync {
    /// Resolves once `hash` is mined and executed. A revert is
    /// `ExecutionReverted`; a failed or timed-out wait is `NetworkError`.
    async fn await_confirmation(
        &self,
        session: &WalletSession,
        hash: TxHash,
    ) -> Result<(), ContributionError>;
}

/// Polls `eth_getTransactionReceipt` until a receipt shows up.
#[derive(Debug, Clone, Copy)]
pub struct ReceiptPoller {
    poll_interval: Duration,
    timeout: Duration,
}

impl Default for ReceiptPoller {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ReceiptPoller {
    pub fn new(poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }

    async fn poll_until_mined(
        &self,
        provider: &dyn WalletProvider,
        hash: TxHash,
    ) -> Result<(), ContributionError> {
        loop {
            match provider.transaction_receipt(hash).await? {
                Some(receipt) if receipt.succeeded() => {
                    info!(%hash, block = ?receipt.block_number(), "confirm: transaction mined");
                    return Ok(());
                }
                Some(receipt) => {
                    warn!(%hash, block = ?receipt.block_number(), "confirm: transaction reverted");
                    return Err(ContributionError::ExecutionReverted(format!(
                        "execution reverted: transaction {hash} failed on-chain"
                    )));
                }
                None => {
                    debug!(%hash, "confirm: receipt pending");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }
}

#[async_trait]
impl ConfirmationWaiter for ReceiptPoller {
    async fn await_confirmation(
        &self,
        session: &WalletSession,
        hash: TxHash,
    ) -> Result<(), ContributionError> {
        match tokio::time::timeout(
            self.timeout,
            self.poll_until_mined(session.provider().as_ref(), hash),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ContributionError::NetworkError(format!(
                "timed out after {}s waiting for transaction {hash} to be mined",
                self.timeout.as_secs()
            ))),
        }
    }
}

#[cfg(test)]
#[path = "tests/confirm_tests.rs"]
mod tests;
