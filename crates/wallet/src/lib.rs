use async_trait::async_trait;
use shared::{
    domain::{Address, ChainId, TxHash},
    error::ContributionError,
    protocol::{LogEntry, LogFilter, TransactionReceipt, TransactionRequest},
};
use thiserror::Error;

pub mod abi;
mod rpc;

pub use rpc::JsonRpcWallet;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("malformed provider response: {0}")]
    Decode(String),
}

impl WalletError {
    /// Whether retrying the same request with a smaller scope may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Transport(_) => true,
            Self::Rpc { message, .. } => {
                let lower = message.to_ascii_lowercase();
                lower.contains("range") || lower.contains("limit exceeded")
            }
            Self::Decode(_) => false,
        }
    }
}

impl From<WalletError> for ContributionError {
    fn from(value: WalletError) -> Self {
        match value {
            WalletError::Timeout(message) => {
                ContributionError::NetworkError(format!("request timed out: {message}"))
            }
            WalletError::Transport(message) | WalletError::Decode(message) => {
                ContributionError::NetworkError(message)
            }
            WalletError::Rpc { code, message } => {
                ContributionError::from_provider_failure(Some(code), message)
            }
        }
    }
}

/// The host's wallet/node integration point. A signing session is a
/// provider plus the account it authorized.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Asks the wallet to authorize accounts; may wait for user approval.
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError>;
    async fn chain_id(&self) -> Result<ChainId, WalletError>;
    async fn balance(&self, account: Address) -> Result<u128, WalletError>;
    /// Signs and broadcasts; may wait for user approval.
    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<TxHash, WalletError>;
    async fn transaction_receipt(
        &self,
        hash: TxHash,
    ) -> Result<Option<TransactionReceipt>, WalletError>;
    async fn block_number(&self) -> Result<u64, WalletError>;
    async fn logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, WalletError>;
}
