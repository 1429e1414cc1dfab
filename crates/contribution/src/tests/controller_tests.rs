use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use shared::{
    domain::{AssetDescriptor, TxHash},
    error::{ContributionError, FailureKind},
};
use tokio::sync::Notify;
use wallet::WalletError;

use super::*;
use crate::{
    confirm::ConfirmationWaiter,
    session::{WalletSession, WalletSessionProvider},
    test_support::{
        crowdfund_abi, MockWallet, RecordingUi, ScriptedWaiter, UiEvent, CAMPAIGN, ONE_ETHER,
        TOKEN,
    },
    ui::{UiPhase, UiStateMachine, PROCESSING_MESSAGE, SUCCESS_MESSAGE},
};

const INPUT: &str = "amount-7";

fn control(capabilities: ControlCapabilities) -> ContributionControl {
    ContributionControl {
        id: "contribute-7".into(),
        campaign: CAMPAIGN,
        abi: crowdfund_abi(),
        input_id: INPUT.into(),
        capabilities,
    }
}

struct Harness {
    wallet: Arc<MockWallet>,
    recorder: Arc<RecordingUi>,
    controller: Arc<ContributionController>,
}

fn harness_with(
    typed: Option<&str>,
    capabilities: ControlCapabilities,
    wallet: Arc<MockWallet>,
    waiter: Arc<dyn ConfirmationWaiter>,
) -> Harness {
    let mut inputs = StaticInputs::new();
    if let Some(typed) = typed {
        inputs = inputs.with(INPUT, typed);
    }
    let recorder = Arc::new(RecordingUi::default());
    let controller = ContributionController::new(
        control(capabilities),
        Arc::new(inputs),
        Arc::new(WalletSessionProvider::new(wallet.clone())),
        waiter,
        UiStateMachine::new("contribute-7", recorder.surfaces()),
    );
    Harness {
        wallet,
        recorder,
        controller: Arc::new(controller),
    }
}

fn harness(typed: &str) -> Harness {
    harness_with(
        Some(typed),
        ControlCapabilities::native_only("MON"),
        Arc::new(MockWallet::new()),
        Arc::new(ScriptedWaiter::default()),
    )
}

#[tokio::test]
async fn zero_is_rejected_without_touching_the_wallet() {
    let h = harness("0");

    let outcome = h.controller.on_click(None).await;

    assert!(matches!(
        outcome,
        FlowOutcome::Rejected(ref err) if err.kind() == FailureKind::InvalidAmount
    ));
    assert_eq!(h.wallet.account_requests(), 0);
    assert!(h.wallet.sent().is_empty());
    let state = h.controller.ui().snapshot().await;
    assert_eq!(state.phase, UiPhase::Idle);
    assert!(!state.busy);
    assert_eq!(
        h.recorder.modals()[0].0,
        "Please enter a valid amount greater than zero."
    );
}

#[tokio::test]
async fn missing_input_field_is_reported() {
    let h = harness_with(
        None,
        ControlCapabilities::native_only("MON"),
        Arc::new(MockWallet::new()),
        Arc::new(ScriptedWaiter::default()),
    );

    let outcome = h.controller.on_click(None).await;

    assert!(matches!(
        outcome,
        FlowOutcome::Rejected(ref err) if err.kind() == FailureKind::InputNotFound
    ));
    assert_eq!(h.wallet.account_requests(), 0);
}

#[tokio::test(start_paused = true)]
async fn valid_contribution_confirms_then_reloads() {
    let h = harness("1.5");

    let task = tokio::spawn({
        let controller = h.controller.clone();
        async move { controller.on_click(None).await }
    });
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    assert_eq!(h.controller.ui().snapshot().await.phase, UiPhase::Success);
    assert_eq!(h.recorder.reloads(), 0);

    let outcome = task.await.unwrap();

    assert!(matches!(outcome, FlowOutcome::Confirmed(_)));
    let sent = h.wallet.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].value_base_units(), Some(1_500_000_000_000_000_000));
    assert_eq!(h.recorder.reloads(), 1);
    assert_eq!(
        h.recorder.toasts(),
        vec![PROCESSING_MESSAGE.to_string(), SUCCESS_MESSAGE.to_string()]
    );
    assert_eq!(h.recorder.events()[0], UiEvent::Enabled(false));
    assert_eq!(h.controller.ui().snapshot().await.phase, UiPhase::Idle);
}

#[tokio::test]
async fn insufficient_funds_from_the_provider_is_friendly() {
    let h = harness("1");
    h.wallet.fail_next_send(WalletError::Rpc {
        code: -32000,
        message: "insufficient funds for gas * price + value".into(),
    });

    let outcome = h.controller.on_click(None).await;

    assert!(matches!(
        outcome,
        FlowOutcome::Failed(ref err) if err.kind() == FailureKind::InsufficientFunds
    ));
    assert_eq!(h.recorder.modals()[0].0, "Not enough funds.");
    let state = h.controller.ui().snapshot().await;
    assert_eq!(state.phase, UiPhase::Idle);
    assert!(!state.busy);
    let events = h.recorder.events();
    assert_eq!(
        &events[events.len() - 2..],
        &[UiEvent::Enabled(true), UiEvent::BusyIndicator(false)]
    );
    assert_eq!(h.recorder.reloads(), 0);
}

#[tokio::test]
async fn revert_while_waiting_keeps_the_raw_reason() {
    let h = harness_with(
        Some("1"),
        ControlCapabilities::native_only("MON"),
        Arc::new(MockWallet::new()),
        Arc::new(ScriptedWaiter::default().then(Err(ContributionError::ExecutionReverted(
            "execution reverted: goal already met".into(),
        )))),
    );

    let outcome = h.controller.on_click(None).await;

    assert!(matches!(outcome, FlowOutcome::Failed(_)));
    assert_eq!(
        h.recorder.modals(),
        vec![(
            "On-chain revert.".to_string(),
            "execution reverted: goal already met".to_string()
        )]
    );
    assert_eq!(h.recorder.reloads(), 0);
}

#[tokio::test]
async fn no_wallet_on_the_host() {
    let recorder = Arc::new(RecordingUi::default());
    let controller = ContributionController::new(
        control(ControlCapabilities::native_only("MON")),
        Arc::new(StaticInputs::new().with(INPUT, "1")),
        Arc::new(WalletSessionProvider::missing()),
        Arc::new(ScriptedWaiter::default()),
        UiStateMachine::new("contribute-7", recorder.surfaces()),
    );

    let outcome = controller.on_click(None).await;

    assert!(matches!(
        outcome,
        FlowOutcome::Failed(ref err) if err.kind() == FailureKind::NoProviderDetected
    ));
    assert_eq!(
        recorder.modals()[0].0,
        "Please install a wallet to contribute."
    );
    assert!(!controller.ui().is_busy().await);
}

/// Holds every confirmation until released.
#[derive(Default)]
struct GatedWaiter {
    release: Notify,
}

#[async_trait]
impl ConfirmationWaiter for GatedWaiter {
    async fn await_confirmation(
        &self,
        _session: &WalletSession,
        _hash: TxHash,
    ) -> Result<(), ContributionError> {
        self.release.notified().await;
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn clicks_while_busy_are_ignored() {
    let waiter = Arc::new(GatedWaiter::default());
    let h = harness_with(
        Some("1"),
        ControlCapabilities::native_only("MON"),
        Arc::new(MockWallet::new()),
        waiter.clone(),
    );

    let first = tokio::spawn({
        let controller = h.controller.clone();
        async move { controller.on_click(None).await }
    });
    while h.wallet.sent().is_empty() {
        tokio::task::yield_now().await;
    }

    assert_eq!(h.controller.on_click(None).await, FlowOutcome::Ignored);

    waiter.release.notify_one();
    assert!(matches!(first.await.unwrap(), FlowOutcome::Confirmed(_)));
    assert_eq!(h.wallet.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn later_clicks_reuse_the_session() {
    let h = harness("0.1");

    h.controller.on_click(None).await;
    h.controller.on_click(None).await;

    assert_eq!(h.wallet.account_requests(), 1);
    assert_eq!(h.wallet.sent().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn token_asset_is_chosen_by_symbol() {
    let capabilities = ControlCapabilities::with_assets(vec![
        AssetDescriptor::native("MON"),
        AssetDescriptor::erc20("USDC", TOKEN, 6),
    ]);
    assert!(capabilities.is_multi_asset());
    let h = harness_with(
        Some("3"),
        capabilities,
        Arc::new(MockWallet::new()),
        Arc::new(ScriptedWaiter::default()),
    );

    let outcome = h.controller.on_click(Some("usdc")).await;

    assert!(matches!(outcome, FlowOutcome::Confirmed(_)));
    let sent = h.wallet.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].to, TOKEN);
    assert_eq!(sent[1].to, CAMPAIGN);
}

#[tokio::test]
async fn unknown_asset_and_excess_precision_fail_preflight() {
    let h = harness("1");
    let outcome = h.controller.on_click(Some("DOGE")).await;
    assert!(matches!(
        outcome,
        FlowOutcome::Rejected(ref err) if err.kind() == FailureKind::InputNotFound
    ));

    let capabilities =
        ControlCapabilities::with_assets(vec![AssetDescriptor::erc20("USDC", TOKEN, 6)]);
    let h = harness_with(
        Some("0.0000001"),
        capabilities,
        Arc::new(MockWallet::new()),
        Arc::new(ScriptedWaiter::default()),
    );
    let outcome = h.controller.on_click(None).await;
    assert!(matches!(
        outcome,
        FlowOutcome::Rejected(ref err) if err.kind() == FailureKind::InvalidAmount
    ));
    assert!(h.wallet.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn controls_share_one_session_and_run_side_by_side() {
    let wallet = Arc::new(MockWallet::new());
    let sessions = Arc::new(WalletSessionProvider::new(wallet.clone()));
    let recorder = Arc::new(RecordingUi::default());
    let controllers: Vec<ContributionController> = ["1", "2"]
        .into_iter()
        .enumerate()
        .map(|(i, typed)| {
            let mut control = control(ControlCapabilities::native_only("MON"));
            control.id = format!("contribute-{i}");
            ContributionController::new(
                control,
                Arc::new(StaticInputs::new().with(INPUT, typed)),
                sessions.clone(),
                Arc::new(ScriptedWaiter::default()),
                UiStateMachine::new(format!("contribute-{i}"), recorder.surfaces()),
            )
        })
        .collect();

    let outcomes =
        futures::future::join_all(controllers.iter().map(|c| c.on_click(None))).await;

    assert!(outcomes
        .iter()
        .all(|outcome| matches!(outcome, FlowOutcome::Confirmed(_))));
    assert_eq!(wallet.account_requests(), 1);
    let mut values: Vec<_> = wallet
        .sent()
        .iter()
        .filter_map(|tx| tx.value_base_units())
        .collect();
    values.sort_unstable();
    assert_eq!(values, vec![ONE_ETHER, 2 * ONE_ETHER]);
}
