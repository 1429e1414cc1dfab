use std::{fmt, str::FromStr, sync::Arc, time::Duration};

use serde::Deserialize;
use shared::error::ContributionError;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::classify::{classify_error, UserMessage};

pub const PROCESSING_MESSAGE: &str = "Processing transaction…";
pub const SUCCESS_MESSAGE: &str = "Contribution successful! Reloading…";
pub const DEFAULT_RELOAD_DELAY: Duration = Duration::from_millis(1500);

/// Transient notifications. Implementations dismiss on their own.
pub trait NotificationSurface: Send + Sync {
    fn show_toast(&self, message: &str);
}

/// Detailed error display; stays up until the host dismisses it.
pub trait DetailSurface: Send + Sync {
    fn show_error(&self, user_message: &str, debug_message: &str);
}

/// The triggering control: its enabled state and busy indicator.
pub trait ControlView: Send + Sync {
    fn set_enabled(&self, enabled: bool);
    fn set_busy_indicator(&self, visible: bool);
}

pub trait ViewRefresher: Send + Sync {
    fn reload(&self);
}

#[derive(Clone)]
pub struct UiSurfaces {
    pub toast: Arc<dyn NotificationSurface>,
    pub detail: Arc<dyn DetailSurface>,
    pub view: Arc<dyn ControlView>,
    pub refresher: Arc<dyn ViewRefresher>,
}

/// Where failures are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureDisplay {
    Toast,
    #[default]
    Modal,
    Both,
}

impl FailureDisplay {
    fn uses_toast(self) -> bool {
        matches!(self, Self::Toast | Self::Both)
    }

    fn uses_modal(self) -> bool {
        matches!(self, Self::Modal | Self::Both)
    }
}

impl FromStr for FailureDisplay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "toast" => Ok(Self::Toast),
            "modal" => Ok(Self::Modal),
            "both" => Ok(Self::Both),
            other => Err(format!(
                "unknown failure display {other:?}; expected toast, modal or both"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UiPhase {
    #[default]
    Idle,
    Busy,
    Success,
    Failed,
}

impl fmt::Display for UiPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Busy => "busy",
            Self::Success => "success",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

impl UiPhase {
    fn can_become(self, next: UiPhase) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Busy)
                | (Self::Busy, Self::Success)
                | (Self::Busy, Self::Failed)
                | (Self::Success, Self::Idle)
                | (Self::Failed, Self::Idle)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastError {
    pub user_message: UserMessage,
    pub debug_message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UiControlState {
    pub phase: UiPhase,
    pub busy: bool,
    pub last_error: Option<LastError>,
}

/// Owns one control's visual state. `Busy` is the only mutual exclusion:
/// `try_begin` refuses while a flow is in flight.
pub struct UiStateMachine {
    control_id: String,
    surfaces: UiSurfaces,
    failure_display: FailureDisplay,
    reload_delay: Duration,
    state: Mutex<UiControlState>,
}

impl UiStateMachine {
    pub fn new(control_id: impl Into<String>, surfaces: UiSurfaces) -> Self {
        Self {
            control_id: control_id.into(),
            surfaces,
            failure_display: FailureDisplay::default(),
            reload_delay: DEFAULT_RELOAD_DELAY,
            state: Mutex::new(UiControlState::default()),
        }
    }

    pub fn with_failure_display(mut self, failure_display: FailureDisplay) -> Self {
        self.failure_display = failure_display;
        self
    }

    pub fn with_reload_delay(mut self, reload_delay: Duration) -> Self {
        self.reload_delay = reload_delay;
        self
    }

    pub async fn snapshot(&self) -> UiControlState {
        self.state.lock().await.clone()
    }

    pub async fn is_busy(&self) -> bool {
        self.state.lock().await.busy
    }

    fn advance(&self, state: &mut UiControlState, request_id: Uuid, next: UiPhase) -> bool {
        if !state.phase.can_become(next) {
            warn!(
                %request_id,
                control = %self.control_id,
                from = %state.phase,
                to = %next,
                "ui: refused transition"
            );
            return false;
        }
        info!(
            %request_id,
            control = %self.control_id,
            from = %state.phase,
            to = %next,
            "ui: transition"
        );
        state.phase = next;
        state.busy = next == UiPhase::Busy;
        true
    }

    /// `Idle -> Busy`. Returns false if a flow is already in flight.
    pub async fn try_begin(&self, request_id: Uuid) -> bool {
        {
            let mut state = self.state.lock().await;
            if !self.advance(&mut state, request_id, UiPhase::Busy) {
                return false;
            }
            state.last_error = None;
        }
        self.surfaces.view.set_enabled(false);
        self.surfaces.view.set_busy_indicator(true);
        self.surfaces.toast.show_toast(PROCESSING_MESSAGE);
        true
    }

    /// `Busy -> Success`, then reload after the configured delay and come back
    /// to `Idle`.
    pub async fn succeed(&self, request_id: Uuid) {
        if !self.advance(&mut *self.state.lock().await, request_id, UiPhase::Success) {
            return;
        }
        self.surfaces.toast.show_toast(SUCCESS_MESSAGE);

        tokio::time::sleep(self.reload_delay).await;
        self.surfaces.refresher.reload();

        self.advance(&mut *self.state.lock().await, request_id, UiPhase::Idle);
        self.restore_view();
    }

    /// `Busy -> Failed -> Idle`: surfaces the classified failure and gives the
    /// control back to the user.
    pub async fn fail(&self, request_id: Uuid, err: &ContributionError) {
        {
            let mut state = self.state.lock().await;
            if !self.advance(&mut state, request_id, UiPhase::Failed) {
                return;
            }
            state.last_error = Some(self.report(request_id, err));
        }
        self.restore_view();
        self.advance(&mut *self.state.lock().await, request_id, UiPhase::Idle);
    }

    /// Failures caught before the control went busy. The phase is untouched.
    pub async fn reject_preflight(&self, request_id: Uuid, err: &ContributionError) {
        let last_error = self.report(request_id, err);
        self.state.lock().await.last_error = Some(last_error);
    }

    fn report(&self, request_id: Uuid, err: &ContributionError) -> LastError {
        let user_message = classify_error(err);
        error!(
            %request_id,
            control = %self.control_id,
            kind = ?err.kind(),
            raw = err.raw_message(),
            "ui: contribution failed"
        );
        if self.failure_display.uses_toast() {
            self.surfaces.toast.show_toast(user_message.text());
        }
        if self.failure_display.uses_modal() {
            self.surfaces
                .detail
                .show_error(user_message.text(), err.raw_message());
        }
        LastError {
            user_message,
            debug_message: err.raw_message().to_string(),
        }
    }

    fn restore_view(&self) {
        self.surfaces.view.set_enabled(true);
        self.surfaces.view.set_busy_indicator(false);
    }
}

#[cfg(test)]
#[path = "tests/ui_tests.rs"]
mod tests;
