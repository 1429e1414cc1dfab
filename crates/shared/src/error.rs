use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JSON-RPC / EIP-1193 code a wallet returns when the user declines a request.
pub const USER_REJECTED_CODE: i64 = 4001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidAmount,
    InputNotFound,
    InvalidDescriptor,
    NoProviderDetected,
    SubmissionRejected,
    InsufficientFunds,
    ExecutionReverted,
    NetworkError,
}

impl FailureKind {
    /// Failures detected before anything is sent to a wallet or node.
    pub fn is_local(self) -> bool {
        matches!(
            self,
            Self::InvalidAmount | Self::InputNotFound | Self::InvalidDescriptor
        )
    }
}

/// Every way a contribution can fail. Each variant keeps the raw diagnostic
/// text exactly as the wallet, node, or validator reported it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContributionError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("input not found: {0}")]
    InputNotFound(String),
    #[error("invalid contract descriptor: {0}")]
    InvalidDescriptor(String),
    #[error("no wallet provider detected: {0}")]
    NoProviderDetected(String),
    #[error("submission rejected: {0}")]
    SubmissionRejected(String),
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("execution reverted: {0}")]
    ExecutionReverted(String),
    #[error("network error: {0}")]
    NetworkError(String),
}

impl ContributionError {
    /// Maps a failure reported by a wallet or node onto the taxonomy.
    pub fn from_provider_failure(code: Option<i64>, message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if lower.contains("insufficient") {
            Self::InsufficientFunds(message)
        } else if code == Some(USER_REJECTED_CODE)
            || lower.contains("user rejected")
            || lower.contains("user denied")
        {
            Self::SubmissionRejected(message)
        } else if lower.contains("execution reverted") {
            Self::ExecutionReverted(message)
        } else {
            Self::NetworkError(message)
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidAmount(_) => FailureKind::InvalidAmount,
            Self::InputNotFound(_) => FailureKind::InputNotFound,
            Self::InvalidDescriptor(_) => FailureKind::InvalidDescriptor,
            Self::NoProviderDetected(_) => FailureKind::NoProviderDetected,
            Self::SubmissionRejected(_) => FailureKind::SubmissionRejected,
            Self::InsufficientFunds(_) => FailureKind::InsufficientFunds,
            Self::ExecutionReverted(_) => FailureKind::ExecutionReverted,
            Self::NetworkError(_) => FailureKind::NetworkError,
        }
    }

    pub fn raw_message(&self) -> &str {
        match self {
            Self::InvalidAmount(raw)
            | Self::InputNotFound(raw)
            | Self::InvalidDescriptor(raw)
            | Self::NoProviderDetected(raw)
            | Self::SubmissionRejected(raw)
            | Self::InsufficientFunds(raw)
            | Self::ExecutionReverted(raw)
            | Self::NetworkError(raw) => raw,
        }
    }
}
