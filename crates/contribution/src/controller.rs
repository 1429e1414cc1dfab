use std::{collections::HashMap, sync::Arc};

use shared::{
    domain::{Address, AssetDescriptor, TxHash},
    error::ContributionError,
};
use tracing::{debug, info};
use uuid::Uuid;
use wallet::abi::ContractAbi;

use crate::{
    amount,
    confirm::ConfirmationWaiter,
    session::WalletSessionProvider,
    submit::{ContributionRequest, TransactionSubmitter, TxStatus},
    ui::UiStateMachine,
};

/// Read-only access to the page's input fields by id.
pub trait InputSource: Send + Sync {
    fn read(&self, input_id: &str) -> Option<String>;
}

#[derive(Debug, Clone, Default)]
pub struct StaticInputs {
    values: HashMap<String, String>,
}

impl StaticInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, input_id: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(input_id.into(), value.into());
        self
    }
}

impl InputSource for StaticInputs {
    fn read(&self, input_id: &str) -> Option<String> {
        self.values.get(input_id).cloned()
    }
}

/// Which assets a control accepts. The first listed asset is the default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlCapabilities {
    accepted_assets: Vec<AssetDescriptor>,
}

impl ControlCapabilities {
    pub fn native_only(symbol: impl Into<String>) -> Self {
        Self {
            accepted_assets: vec![AssetDescriptor::native(symbol)],
        }
    }

    pub fn with_assets(accepted_assets: Vec<AssetDescriptor>) -> Self {
        Self { accepted_assets }
    }

    pub fn accepted_assets(&self) -> &[AssetDescriptor] {
        &self.accepted_assets
    }

    pub fn is_multi_asset(&self) -> bool {
        self.accepted_assets.len() > 1
    }

    pub fn resolve(&self, symbol: Option<&str>) -> Result<&AssetDescriptor, ContributionError> {
        match symbol {
            None => self.accepted_assets.first().ok_or_else(|| {
                ContributionError::InputNotFound("this campaign accepts no assets".to_string())
            }),
            Some(symbol) => self
                .accepted_assets
                .iter()
                .find(|asset| asset.symbol.eq_ignore_ascii_case(symbol))
                .ok_or_else(|| {
                    ContributionError::InputNotFound(format!(
                        "asset {symbol} is not accepted by this campaign"
                    ))
                }),
        }
    }
}

/// One contribute button: the campaign it pays into and the field it reads.
#[derive(Debug, Clone)]
pub struct ContributionControl {
    pub id: String,
    pub campaign: Address,
    pub abi: Arc<ContractAbi>,
    pub input_id: String,
    pub capabilities: ControlCapabilities,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    /// The control was busy; the click did nothing.
    Ignored,
    /// Failed before anything was sent; the control never went busy.
    Rejected(ContributionError),
    Confirmed(TxHash),
    Failed(ContributionError),
}

pub struct ContributionController {
    control: ContributionControl,
    inputs: Arc<dyn InputSource>,
    sessions: Arc<WalletSessionProvider>,
    submitter: TransactionSubmitter,
    waiter: Arc<dyn ConfirmationWaiter>,
    ui: UiStateMachine,
}

impl ContributionController {
    pub fn new(
        control: ContributionControl,
        inputs: Arc<dyn InputSource>,
        sessions: Arc<WalletSessionProvider>,
        waiter: Arc<dyn ConfirmationWaiter>,
        ui: UiStateMachine,
    ) -> Self {
        Self {
            control,
            inputs,
            sessions,
            submitter: TransactionSubmitter::new(Arc::clone(&waiter)),
            waiter,
            ui,
        }
    }

    pub fn control(&self) -> &ContributionControl {
        &self.control
    }

    pub fn ui(&self) -> &UiStateMachine {
        &self.ui
    }

    /// Runs one click through validation, wallet, submission, and
    /// confirmation. Every failure ends up on the UI; none escapes.
    pub async fn on_click(&self, asset: Option<&str>) -> FlowOutcome {
        let request_id = Uuid::new_v4();
        if self.ui.is_busy().await {
            debug!(%request_id, control = %self.control.id, "flow: click ignored while busy");
            return FlowOutcome::Ignored;
        }

        let request = match self.prepare(request_id, asset) {
            Ok(request) => request,
            Err(err) => {
                self.ui.reject_preflight(request_id, &err).await;
                return FlowOutcome::Rejected(err);
            }
        };

        if !self.ui.try_begin(request_id).await {
            return FlowOutcome::Ignored;
        }

        match self.execute(&request).await {
            Ok(hash) => {
                self.ui.succeed(request_id).await;
                FlowOutcome::Confirmed(hash)
            }
            Err(err) => {
                self.ui.fail(request_id, &err).await;
                FlowOutcome::Failed(err)
            }
        }
    }

    fn prepare(
        &self,
        request_id: Uuid,
        asset: Option<&str>,
    ) -> Result<ContributionRequest, ContributionError> {
        let raw = self.inputs.read(&self.control.input_id).ok_or_else(|| {
            ContributionError::InputNotFound(format!(
                "amount input {:?} not found",
                self.control.input_id
            ))
        })?;
        let amount = amount::validate(&raw)?;
        let asset = self.control.capabilities.resolve(asset)?.clone();
        amount.to_base_units(asset.decimals)?;

        Ok(ContributionRequest {
            id: request_id,
            campaign: self.control.campaign,
            abi: Arc::clone(&self.control.abi),
            amount,
            asset,
            input_id: self.control.input_id.clone(),
        })
    }

    async fn execute(&self, request: &ContributionRequest) -> Result<TxHash, ContributionError> {
        let session = self.sessions.connect().await?;
        let mut handle = self.submitter.submit(&session, request).await?;

        let outcome = self.waiter.await_confirmation(&session, handle.hash()).await;
        handle.resolve(if outcome.is_ok() {
            TxStatus::Confirmed
        } else {
            TxStatus::Failed
        });
        info!(
            request_id = %request.id,
            control = %self.control.id,
            amount = %request.amount,
            asset = %request.asset.symbol,
            hash = %handle.hash(),
            status = ?handle.status(),
            "flow: transaction resolved"
        );
        outcome.map(|()| handle.hash())
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
