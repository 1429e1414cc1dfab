use std::sync::Arc;

use shared::{
    domain::{format_units, Address, AssetDescriptor, AssetKind, TxHash},
    error::ContributionError,
    protocol::TransactionRequest,
};
use tracing::info;
use uuid::Uuid;
use wallet::abi::{
    encode_call, selector, AbiEntry, ContractAbi, Token, CONTRIBUTE, CONTRIBUTE_TOKEN,
    ERC20_APPROVE,
};

use crate::{amount::Amount, confirm::ConfirmationWaiter, session::WalletSession};

const TOKEN_CONTRIBUTE_SIGNATURE: &str = "contributeToken(address,uint256)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Pending,
    Confirmed,
    Failed,
}

/// A broadcast transaction. Its status only ever leaves `Pending` once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionHandle {
    hash: TxHash,
    status: TxStatus,
}

impl TransactionHandle {
    pub fn pending(hash: TxHash) -> Self {
        Self {
            hash,
            status: TxStatus::Pending,
        }
    }

    pub fn hash(&self) -> TxHash {
        self.hash
    }

    pub fn status(&self) -> TxStatus {
        self.status
    }

    /// Returns false, leaving the status untouched, if the handle was
    /// already resolved or `outcome` is `Pending`.
    pub fn resolve(&mut self, outcome: TxStatus) -> bool {
        if self.status != TxStatus::Pending || outcome == TxStatus::Pending {
            return false;
        }
        self.status = outcome;
        true
    }
}

/// One click's worth of intent, discarded once the flow resolves.
#[derive(Debug, Clone)]
pub struct ContributionRequest {
    pub id: Uuid,
    pub campaign: Address,
    pub abi: Arc<ContractAbi>,
    pub amount: Amount,
    pub asset: AssetDescriptor,
    pub input_id: String,
}

pub struct TransactionSubmitter {
    waiter: Arc<dyn ConfirmationWaiter>,
}

impl TransactionSubmitter {
    /// `waiter` confirms token approvals before the contribution is sent.
    pub fn new(waiter: Arc<dyn ConfirmationWaiter>) -> Self {
        Self { waiter }
    }

    pub async fn submit(
        &self,
        session: &WalletSession,
        request: &ContributionRequest,
    ) -> Result<TransactionHandle, ContributionError> {
        let value = request.amount.to_base_units(request.asset.decimals)?;
        match request.asset.kind {
            AssetKind::Native => self.submit_native(session, request, value).await,
            AssetKind::Erc20 { token } => self.submit_token(session, request, token, value).await,
        }
    }

    async fn submit_native(
        &self,
        session: &WalletSession,
        request: &ContributionRequest,
        value: u128,
    ) -> Result<TransactionHandle, ContributionError> {
        let entry = no_arg_function(&request.abi, CONTRIBUTE)?;

        let balance = session.provider().balance(session.signer()).await?;
        if balance < value {
            return Err(ContributionError::InsufficientFunds(format!(
                "insufficient funds: balance {} {} is below contribution {} {}",
                format_units(balance, request.asset.decimals),
                request.asset.symbol,
                format_units(value, request.asset.decimals),
                request.asset.symbol,
            )));
        }

        let tx = TransactionRequest::call(
            session.signer(),
            request.campaign,
            &encode_call(entry.selector(), &[]),
        )
        .with_value(value);
        let hash = session.provider().send_transaction(&tx).await?;
        info!(
            request_id = %request.id,
            campaign = %request.campaign,
            %hash,
            value,
            "submit: contribution broadcast"
        );
        Ok(TransactionHandle::pending(hash))
    }

    async fn submit_token(
        &self,
        session: &WalletSession,
        request: &ContributionRequest,
        token: Address,
        value: u128,
    ) -> Result<TransactionHandle, ContributionError> {
        let entry = request.abi.function(CONTRIBUTE_TOKEN).ok_or_else(|| {
            ContributionError::InvalidDescriptor(format!(
                "contract interface has no `{CONTRIBUTE_TOKEN}` function"
            ))
        })?;
        if entry.signature() != TOKEN_CONTRIBUTE_SIGNATURE {
            return Err(ContributionError::InvalidDescriptor(format!(
                "`{}` does not match `{TOKEN_CONTRIBUTE_SIGNATURE}`",
                entry.signature()
            )));
        }

        let approve = TransactionRequest::call(
            session.signer(),
            token,
            &encode_call(
                selector(ERC20_APPROVE),
                &[Token::Address(request.campaign), Token::Uint(value)],
            ),
        );
        let mut approval =
            TransactionHandle::pending(session.provider().send_transaction(&approve).await?);
        info!(
            request_id = %request.id,
            %token,
            hash = %approval.hash(),
            "submit: approval broadcast"
        );
        if let Err(err) = self.waiter.await_confirmation(session, approval.hash()).await {
            approval.resolve(TxStatus::Failed);
            return Err(err);
        }
        approval.resolve(TxStatus::Confirmed);

        let tx = TransactionRequest::call(
            session.signer(),
            request.campaign,
            &encode_call(entry.selector(), &[Token::Address(token), Token::Uint(value)]),
        );
        let hash = session.provider().send_transaction(&tx).await?;
        info!(
            request_id = %request.id,
            campaign = %request.campaign,
            %token,
            %hash,
            value,
            "submit: token contribution broadcast"
        );
        Ok(TransactionHandle::pending(hash))
    }
}

fn no_arg_function<'a>(
    abi: &'a ContractAbi,
    name: &str,
) -> Result<&'a AbiEntry, ContributionError> {
    let entry = abi.function(name).ok_or_else(|| {
        ContributionError::InvalidDescriptor(format!("contract interface has no `{name}` function"))
    })?;
    if !entry.inputs.is_empty() {
        return Err(ContributionError::InvalidDescriptor(format!(
            "`{}` takes arguments; only a bare payable call can be built",
            entry.signature()
        )));
    }
    Ok(entry)
}

#[cfg(test)]
#[path = "tests/submit_tests.rs"]
mod tests;
