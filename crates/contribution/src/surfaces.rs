//! Headless surfaces for hosts that render state themselves (and for tests):
//! a toast slot that expires and a modal slot that holds until dismissed.

use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};

use tokio::time::Instant;

use crate::ui::{DetailSurface, NotificationSurface};

pub const TOAST_DISMISS_AFTER: Duration = Duration::from_secs(4);

pub struct ToastBoard {
    dismiss_after: Duration,
    current: Mutex<Option<(String, Instant)>>,
}

impl Default for ToastBoard {
    fn default() -> Self {
        Self::new(TOAST_DISMISS_AFTER)
    }
}

impl ToastBoard {
    pub fn new(dismiss_after: Duration) -> Self {
        Self {
            dismiss_after,
            current: Mutex::new(None),
        }
    }

    /// The message on screen right now, if it has not expired.
    pub fn visible(&self) -> Option<String> {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        current
            .as_ref()
            .filter(|(_, expires_at)| Instant::now() < *expires_at)
            .map(|(message, _)| message.clone())
    }
}

impl NotificationSurface for ToastBoard {
    fn show_toast(&self, message: &str) {
        let expires_at = Instant::now() + self.dismiss_after;
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) =
            Some((message.to_string(), expires_at));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalContent {
    pub user_message: String,
    pub debug_message: String,
}

#[derive(Default)]
pub struct ErrorModal {
    current: Mutex<Option<ModalContent>>,
}

impl ErrorModal {
    pub fn current(&self) -> Option<ModalContent> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn dismiss(&self) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl DetailSurface for ErrorModal {
    fn show_error(&self, user_message: &str, debug_message: &str) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(ModalContent {
            user_message: user_message.to_string(),
            debug_message: debug_message.to_string(),
        });
    }
}
