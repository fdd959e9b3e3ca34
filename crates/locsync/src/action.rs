//! Action enum: all user-initiated intents and internal events.

use locsync_proto::protocol::Command;

/// All actions that can flow through the system.
/// Components and notifications carry Actions; the App dispatches them.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // ── Selection ────────────────────────────────────────────────────────────
    /// Explicit pick from a selector; confirmed with a toast.
    Select(String),
    /// Accepted proximity suggestion; switches without a confirmation toast.
    SwitchToNearby(String),

    // ── Detection ────────────────────────────────────────────────────────────
    /// Startup timer fired; honours the dismissed flag.
    AutoDetect,
    /// "Detect my location" button; runs even after a dismissal.
    DetectLocation,
    /// Never suggest again (persisted).
    DismissDetection,

    // ── Notification buttons ─────────────────────────────────────────────────
    AcceptSuggestion,
    RejectSuggestion,
    CloseToast,

    // ── Viewport ─────────────────────────────────────────────────────────────
    Scroll(f64),

    // ── System ───────────────────────────────────────────────────────────────
    Snapshot,
    Quit,
}

impl From<Command> for Action {
    fn from(cmd: Command) -> Self {
        match cmd {
            Command::Select { id } => Action::Select(id),
            Command::Detect => Action::DetectLocation,
            Command::Accept => Action::AcceptSuggestion,
            Command::Dismiss => Action::RejectSuggestion,
            Command::CloseToast => Action::CloseToast,
            Command::Scroll { y } => Action::Scroll(y),
            Command::Snapshot => Action::Snapshot,
            Command::Quit => Action::Quit,
        }
    }
}
