use shared::error::{ContributionError, FailureKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserMessage {
    InsufficientFunds,
    Canceled,
    OnChainRevert,
    NoProvider,
    InvalidAmount,
    Generic,
}

impl UserMessage {
    pub fn text(self) -> &'static str {
        match self {
            Self::InsufficientFunds => "Not enough funds.",
            Self::Canceled => "Transaction canceled.",
            Self::OnChainRevert => "On-chain revert.",
            Self::NoProvider => "Please install a wallet to contribute.",
            Self::InvalidAmount => "Please enter a valid amount greater than zero.",
            Self::Generic => "Something went wrong. Please try again.",
        }
    }
}

/// Picks the user-facing message for a failure. The raw text decides first,
/// case-insensitively and in priority order; the failure kind is only
/// consulted when no pattern matches.
pub fn classify(raw: &str, kind: FailureKind) -> UserMessage {
    let lower = raw.to_lowercase();
    if lower.contains("insufficient") {
        UserMessage::InsufficientFunds
    } else if lower.contains("user rejected") || lower.contains("user denied") {
        UserMessage::Canceled
    } else if lower.contains("execution reverted") {
        UserMessage::OnChainRevert
    } else {
        match kind {
            FailureKind::NoProviderDetected => UserMessage::NoProvider,
            FailureKind::InvalidAmount => UserMessage::InvalidAmount,
            _ => UserMessage::Generic,
        }
    }
}

pub fn classify_error(err: &ContributionError) -> UserMessage {
    classify(err.raw_message(), err.kind())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_wins_over_every_other_pattern() {
        for raw in [
            "insufficient funds for gas * price + value",
            "INSUFFICIENT balance; user rejected; execution reverted",
            "execution reverted: Insufficient allowance",
        ] {
            assert_eq!(
                classify(raw, FailureKind::NetworkError),
                UserMessage::InsufficientFunds,
                "{raw}"
            );
        }
    }

    #[test]
    fn user_rejection_beats_revert_and_generic() {
        assert_eq!(
            classify(
                "MetaMask Tx Signature: User denied transaction signature.",
                FailureKind::NetworkError
            ),
            UserMessage::Canceled
        );
        assert_eq!(
            classify("user rejected; execution reverted", FailureKind::ExecutionReverted),
            UserMessage::Canceled
        );
    }

    #[test]
    fn revert_pattern_and_fallbacks() {
        assert_eq!(
            classify("Execution Reverted: goal already met", FailureKind::NetworkError),
            UserMessage::OnChainRevert
        );
        assert_eq!(
            classify("No Ethereum provider found.", FailureKind::NoProviderDetected),
            UserMessage::NoProvider
        );
        assert_eq!(
            classify("\"abc\" is not a number", FailureKind::InvalidAmount),
            UserMessage::InvalidAmount
        );
        assert_eq!(
            classify("connection reset by peer", FailureKind::NetworkError),
            UserMessage::Generic
        );
    }
}
