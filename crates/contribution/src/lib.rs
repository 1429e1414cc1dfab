//! Client-side contribution flow for crowdfund campaigns: validate the typed
//! amount, authorize a wallet session, broadcast `contribute`, wait for the
//! receipt, and drive the control's busy/idle state and failure surfaces.

pub mod amount;
pub mod classify;
pub mod confirm;
pub mod controller;
pub mod session;
pub mod submit;
pub mod surfaces;
pub mod ui;

pub use amount::{validate, Amount};
pub use classify::{classify, UserMessage};
pub use confirm::{ConfirmationWaiter, ReceiptPoller};
pub use controller::{
    ContributionControl, ContributionController, ControlCapabilities, FlowOutcome, InputSource,
    StaticInputs,
};
pub use session::{WalletSession, WalletSessionProvider};
pub use submit::{ContributionRequest, TransactionHandle, TransactionSubmitter, TxStatus};
pub use ui::{
    ControlView, DetailSurface, FailureDisplay, NotificationSurface, UiControlState, UiPhase,
    UiStateMachine, UiSurfaces, ViewRefresher,
};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
