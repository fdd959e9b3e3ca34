use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Messages sent from the host page (or the stdin driver) to the engine.
/// One JSON object per line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Explicit branch choice from a selector, button, or footer entry.
    Select { id: String },
    /// "Detect my location" button.
    Detect,
    /// Accept the pending proximity suggestion.
    Accept,
    /// Dismiss the pending proximity suggestion (sticky across sessions).
    Dismiss,
    /// Toast close button.
    CloseToast,
    /// Viewport scrolled to `y` pixels.
    Scroll { y: f64 },
    /// Ask for a full page snapshot.
    Snapshot,
    Quit,
}

/// Messages emitted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "broadcast", rename_all = "snake_case")]
pub enum Broadcast {
    Page {
        selected: String,
        elements: PageSnapshot,
    },
    Toast {
        text: String,
    },
    ToastCleared,
    Suggestion {
        id: String,
        text: String,
    },
    SuggestionCleared,
    Error {
        message: String,
    },
}

/// Rendered state of one page element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    pub visible: bool,
    pub active: bool,
}

/// Element id → rendered state.
pub type PageSnapshot = BTreeMap<String, ElementState>;

impl Command {
    pub fn parse_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim())
    }
}

impl Broadcast {
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
