use std::{fmt, sync::Arc};

use shared::{
    domain::{Address, ChainId},
    error::ContributionError,
};
use tokio::sync::OnceCell;
use tracing::{info, warn};
use wallet::WalletProvider;

/// An authorized signing identity plus the provider it was authorized on.
#[derive(Clone)]
pub struct WalletSession {
    signer: Address,
    chain_id: ChainId,
    provider: Arc<dyn WalletProvider>,
}

impl WalletSession {
    pub fn signer(&self) -> Address {
        self.signer
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn provider(&self) -> &Arc<dyn WalletProvider> {
        &self.provider
    }
}

impl fmt::Debug for WalletSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletSession")
            .field("signer", &self.signer)
            .field("chain_id", &self.chain_id)
            .finish_non_exhaustive()
    }
}

/// Lazily authorizes one session and hands the same one to every control.
pub struct WalletSessionProvider {
    provider: Option<Arc<dyn WalletProvider>>,
    session: OnceCell<Arc<WalletSession>>,
}

impl WalletSessionProvider {
    pub fn new(provider: Arc<dyn WalletProvider>) -> Self {
        Self {
            provider: Some(provider),
            session: OnceCell::new(),
        }
    }

    /// A host with no wallet integration; every `connect` fails.
    pub fn missing() -> Self {
        Self {
            provider: None,
            session: OnceCell::new(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session.initialized()
    }

    pub async fn connect(&self) -> Result<Arc<WalletSession>, ContributionError> {
        let Some(provider) = &self.provider else {
            warn!("wallet: no provider available on this host");
            return Err(ContributionError::NoProviderDetected(
                "No Ethereum provider found.".to_string(),
            ));
        };

        self.session
            .get_or_try_init(|| establish(Arc::clone(provider)))
            .await
            .map(Arc::clone)
    }
}

async fn establish(
    provider: Arc<dyn WalletProvider>,
) -> Result<Arc<WalletSession>, ContributionError> {
    let accounts = provider.request_accounts().await?;
    let Some(signer) = accounts.first().copied() else {
        return Err(ContributionError::SubmissionRejected(
            "wallet did not authorize any account".to_string(),
        ));
    };
    let chain_id = provider.chain_id().await?;
    info!(%signer, %chain_id, "wallet: session established");

    Ok(Arc::new(WalletSession {
        signer,
        chain_id,
        provider,
    }))
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
