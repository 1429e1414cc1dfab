use std::sync::Arc;

use shared::{domain::ChainId, error::FailureKind};

use super::*;
use crate::test_support::{MockWallet, SIGNER};

#[tokio::test]
async fn connect_authorizes_once_and_shares_the_session() {
    let wallet = Arc::new(MockWallet::new());
    let sessions = WalletSessionProvider::new(wallet.clone());
    assert!(!sessions.is_connected());

    let first = sessions.connect().await.unwrap();
    let second = sessions.connect().await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.signer(), SIGNER);
    assert_eq!(first.chain_id(), ChainId(10143));
    assert_eq!(wallet.account_requests(), 1);
    assert!(sessions.is_connected());
}

#[tokio::test]
async fn concurrent_connects_prompt_the_wallet_once() {
    let wallet = Arc::new(MockWallet::new());
    let sessions = Arc::new(WalletSessionProvider::new(wallet.clone()));

    let (a, b) = tokio::join!(sessions.connect(), sessions.connect());

    assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
    assert_eq!(wallet.account_requests(), 1);
}

#[tokio::test]
async fn missing_provider_is_reported() {
    let err = WalletSessionProvider::missing().connect().await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::NoProviderDetected);
    assert_eq!(err.raw_message(), "No Ethereum provider found.");
}

#[tokio::test]
async fn empty_authorization_is_a_rejection_and_can_be_retried() {
    let wallet = Arc::new(MockWallet::new().with_accounts(Vec::new()));
    let sessions = WalletSessionProvider::new(wallet.clone());

    let err = sessions.connect().await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::SubmissionRejected);
    assert!(!sessions.is_connected());

    let _ = sessions.connect().await;
    assert_eq!(wallet.account_requests(), 2);
}
