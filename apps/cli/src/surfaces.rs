use std::sync::Arc;

use contribution::{ControlView, DetailSurface, NotificationSurface, UiSurfaces, ViewRefresher};
use tracing::{debug, info};

/// Toasts on stdout, error details on stderr; the control itself is only
/// visible in the log.
pub struct TerminalSurfaces;

impl TerminalSurfaces {
    pub fn shared() -> UiSurfaces {
        let terminal = Arc::new(TerminalSurfaces);
        UiSurfaces {
            toast: terminal.clone(),
            detail: terminal.clone(),
            view: terminal.clone(),
            refresher: terminal,
        }
    }
}

impl NotificationSurface for TerminalSurfaces {
    fn show_toast(&self, message: &str) {
        println!("{message}");
    }
}

impl DetailSurface for TerminalSurfaces {
    fn show_error(&self, user_message: &str, debug_message: &str) {
        eprintln!("error: {user_message}");
        eprintln!("  details: {debug_message}");
    }
}

impl ControlView for TerminalSurfaces {
    fn set_enabled(&self, enabled: bool) {
        debug!(enabled, "cli: control enabled changed");
    }

    fn set_busy_indicator(&self, visible: bool) {
        debug!(visible, "cli: busy indicator changed");
    }
}

impl ViewRefresher for TerminalSurfaces {
    fn reload(&self) {
        info!("cli: campaign view refresh requested");
    }
}
