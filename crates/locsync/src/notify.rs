//! Notification surface: transient status messages and the one actionable
//! prompt (the nearby-branch offer).
//!
//! The channel only shows things.  Buttons on an actionable message hand the
//! bound `Action` back to the caller, which dispatches it; nothing here
//! touches the selection.

use std::time::Duration;

use tokio::time::Instant;

use crate::action::Action;

pub const DEFAULT_EPHEMERAL: Duration = Duration::from_secs(3);

/// What the engine needs from a notification surface.
pub trait NotificationChannel {
    /// Auto-clearing message.  A new one replaces the visible text and
    /// restarts the timer.
    fn show_ephemeral(&mut self, text: String);

    /// Stays up until accepted or dismissed.  Replaces any earlier prompt
    /// together with its bound actions.
    fn show_actionable(&mut self, text: String, on_accept: Action, on_dismiss: Action);
}

struct Ephemeral {
    text: String,
    expires: Instant,
}

struct Actionable {
    text: String,
    on_accept: Action,
    on_dismiss: Action,
}

/// Change seen by `tick`, so the driver can tell the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastEvent {
    Expired,
}

pub struct ToastChannel {
    ephemeral: Option<Ephemeral>,
    actionable: Option<Actionable>,
    duration: Duration,
}

impl ToastChannel {
    pub fn new(duration: Duration) -> Self {
        Self {
            ephemeral: None,
            actionable: None,
            duration,
        }
    }

    pub fn ephemeral_text(&self) -> Option<&str> {
        self.ephemeral.as_ref().map(|t| t.text.as_str())
    }

    pub fn actionable_text(&self) -> Option<&str> {
        self.actionable.as_ref().map(|a| a.text.as_str())
    }

    /// When the visible ephemeral message will clear.
    pub fn ephemeral_deadline(&self) -> Option<Instant> {
        self.ephemeral.as_ref().map(|t| t.expires)
    }

    /// Clear an expired ephemeral message.  Call each tick.
    pub fn tick(&mut self) -> Option<ToastEvent> {
        let now = Instant::now();
        match &self.ephemeral {
            Some(t) if t.expires <= now => {
                self.ephemeral = None;
                Some(ToastEvent::Expired)
            }
            _ => None,
        }
    }

    /// Toast close button.
    pub fn close_ephemeral(&mut self) -> bool {
        self.ephemeral.take().is_some()
    }

    /// Action the visible prompt's accept button is bound to.
    pub fn pending_accept(&self) -> Option<&Action> {
        self.actionable.as_ref().map(|a| &a.on_accept)
    }

    /// Take the prompt down without running either bound action.
    pub fn withdraw(&mut self) -> bool {
        self.actionable.take().is_some()
    }

    /// Accept button: clears the prompt and returns its accept action.
    pub fn accept(&mut self) -> Option<Action> {
        self.actionable.take().map(|a| a.on_accept)
    }

    /// Dismiss button: clears the prompt and returns its dismiss action.
    pub fn dismiss(&mut self) -> Option<Action> {
        self.actionable.take().map(|a| a.on_dismiss)
    }
}

impl Default for ToastChannel {
    fn default() -> Self {
        Self::new(DEFAULT_EPHEMERAL)
    }
}

impl NotificationChannel for ToastChannel {
    fn show_ephemeral(&mut self, text: String) {
        self.ephemeral = Some(Ephemeral {
            text,
            expires: Instant::now() + self.duration,
        });
    }

    fn show_actionable(&mut self, text: String, on_accept: Action, on_dismiss: Action) {
        self.actionable = Some(Actionable {
            text,
            on_accept,
            on_dismiss,
        });
    }
}
