#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use serde_json::json;
use shared::{
    domain::{Address, ChainId, TxHash},
    error::ContributionError,
    protocol::{LogEntry, LogFilter, TransactionReceipt, TransactionRequest},
};
use wallet::{abi::ContractAbi, WalletError, WalletProvider};

use crate::{
    confirm::ConfirmationWaiter,
    session::{WalletSession, WalletSessionProvider},
    ui::{ControlView, DetailSurface, NotificationSurface, UiSurfaces, ViewRefresher},
};

pub const SIGNER: Address = Address([0x11; 20]);
pub const CAMPAIGN: Address = Address([0xca; 20]);
pub const TOKEN: Address = Address([0x70; 20]);
pub const ONE_ETHER: u128 = 1_000_000_000_000_000_000;

pub fn crowdfund_abi() -> Arc<ContractAbi> {
    let descriptor = json!({
        "contractName": "Crowdfund",
        "abi": [
            { "type": "function", "name": "contribute", "inputs": [], "outputs": [],
              "stateMutability": "payable" },
            { "type": "function", "name": "contributeToken",
              "inputs": [
                  { "name": "token", "type": "address" },
                  { "name": "amount", "type": "uint256" }
              ],
              "outputs": [], "stateMutability": "nonpayable" },
            { "type": "event", "name": "Contribution", "anonymous": false,
              "inputs": [
                  { "name": "contributor", "type": "address", "indexed": true },
                  { "name": "amount", "type": "uint256", "indexed": false }
              ] }
        ]
    });
    Arc::new(ContractAbi::from_json(&descriptor).expect("fixture abi"))
}

#[derive(Default)]
struct WalletState {
    accounts: Vec<Address>,
    chain_id: u64,
    balance: u128,
    send_failures: VecDeque<WalletError>,
    receipts: VecDeque<Option<TransactionReceipt>>,
    sent: Vec<TransactionRequest>,
    account_requests: usize,
    receipt_requests: usize,
    next_hash: u8,
}

/// In-memory wallet. Sends succeed with sequential hashes unless a failure is
/// queued; receipts come from the queue, then default to mined.
pub struct MockWallet {
    state: Mutex<WalletState>,
}

impl MockWallet {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(WalletState {
                accounts: vec![SIGNER],
                chain_id: 10143,
                balance: 10 * ONE_ETHER,
                ..WalletState::default()
            }),
        }
    }

    pub fn with_accounts(self, accounts: Vec<Address>) -> Self {
        self.state.lock().unwrap().accounts = accounts;
        self
    }

    pub fn with_balance(self, balance: u128) -> Self {
        self.state.lock().unwrap().balance = balance;
        self
    }

    pub fn fail_next_send(&self, err: WalletError) {
        self.state.lock().unwrap().send_failures.push_back(err);
    }

    pub fn queue_receipt(&self, receipt: Option<TransactionReceipt>) {
        self.state.lock().unwrap().receipts.push_back(receipt);
    }

    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn account_requests(&self) -> usize {
        self.state.lock().unwrap().account_requests
    }

    pub fn receipt_requests(&self) -> usize {
        self.state.lock().unwrap().receipt_requests
    }
}

pub fn receipt(hash: TxHash, status: &str) -> TransactionReceipt {
    TransactionReceipt {
        transaction_hash: hash,
        block_number: Some("0x10".into()),
        status: Some(status.into()),
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        let mut state = self.state.lock().unwrap();
        state.account_requests += 1;
        Ok(state.accounts.clone())
    }

    async fn chain_id(&self) -> Result<ChainId, WalletError> {
        Ok(ChainId(self.state.lock().unwrap().chain_id))
    }

    async fn balance(&self, _account: Address) -> Result<u128, WalletError> {
        Ok(self.state.lock().unwrap().balance)
    }

    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<TxHash, WalletError> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.send_failures.pop_front() {
            return Err(err);
        }
        state.sent.push(tx.clone());
        state.next_hash += 1;
        Ok(TxHash([state.next_hash; 32]))
    }

    async fn transaction_receipt(
        &self,
        hash: TxHash,
    ) -> Result<Option<TransactionReceipt>, WalletError> {
        let mut state = self.state.lock().unwrap();
        state.receipt_requests += 1;
        Ok(state
            .receipts
            .pop_front()
            .unwrap_or_else(|| Some(receipt(hash, "0x1"))))
    }

    async fn block_number(&self) -> Result<u64, WalletError> {
        Ok(16)
    }

    async fn logs(&self, _filter: &LogFilter) -> Result<Vec<LogEntry>, WalletError> {
        Ok(Vec::new())
    }
}

pub async fn session_for(wallet: Arc<MockWallet>) -> Arc<WalletSession> {
    WalletSessionProvider::new(wallet)
        .connect()
        .await
        .expect("mock session")
}

/// Replays queued outcomes; once the queue is empty every wait succeeds.
#[derive(Default)]
pub struct ScriptedWaiter {
    outcomes: Mutex<VecDeque<Result<(), ContributionError>>>,
    waited: Mutex<Vec<TxHash>>,
}

impl ScriptedWaiter {
    pub fn then(self, outcome: Result<(), ContributionError>) -> Self {
        self.outcomes.lock().unwrap().push_back(outcome);
        self
    }

    pub fn waited(&self) -> Vec<TxHash> {
        self.waited.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConfirmationWaiter for ScriptedWaiter {
    async fn await_confirmation(
        &self,
        _session: &WalletSession,
        hash: TxHash,
    ) -> Result<(), ContributionError> {
        self.waited.lock().unwrap().push(hash);
        self.outcomes.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Toast(String),
    Modal { user: String, debug: String },
    Enabled(bool),
    BusyIndicator(bool),
    Reload,
}

/// Stands in for every surface at once and records what it was asked to do.
#[derive(Default)]
pub struct RecordingUi {
    events: Mutex<Vec<UiEvent>>,
}

impl RecordingUi {
    pub fn surfaces(self: &Arc<Self>) -> UiSurfaces {
        UiSurfaces {
            toast: self.clone(),
            detail: self.clone(),
            view: self.clone(),
            refresher: self.clone(),
        }
    }

    pub fn events(&self) -> Vec<UiEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn toasts(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                UiEvent::Toast(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn modals(&self) -> Vec<(String, String)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                UiEvent::Modal { user, debug } => Some((user, debug)),
                _ => None,
            })
            .collect()
    }

    pub fn reloads(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| **event == UiEvent::Reload)
            .count()
    }

    fn push(&self, event: UiEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl NotificationSurface for RecordingUi {
    fn show_toast(&self, message: &str) {
        self.push(UiEvent::Toast(message.to_string()));
    }
}

impl DetailSurface for RecordingUi {
    fn show_error(&self, user_message: &str, debug_message: &str) {
        self.push(UiEvent::Modal {
            user: user_message.to_string(),
            debug: debug_message.to_string(),
        });
    }
}

impl ControlView for RecordingUi {
    fn set_enabled(&self, enabled: bool) {
        self.push(UiEvent::Enabled(enabled));
    }

    fn set_busy_indicator(&self, visible: bool) {
        self.push(UiEvent::BusyIndicator(visible));
    }
}

impl ViewRefresher for RecordingUi {
    fn reload(&self) {
        self.push(UiEvent::Reload);
    }
}
