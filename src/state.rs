//! Active-state store: the single source of truth for what the content page
//! should currently see.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::protocol::Variables;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Inline,
    Detached,
}

impl DisplayMode {
    /// Maps the persisted `displayInline` flag.
    pub fn from_inline_flag(display_inline: bool) -> Self {
        if display_inline {
            DisplayMode::Inline
        } else {
            DisplayMode::Detached
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, DisplayMode::Inline)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayMode::Inline => "inline",
            DisplayMode::Detached => "detached",
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" => Ok(DisplayMode::Inline),
            "detached" | "tab" => Ok(DisplayMode::Detached),
            other => Err(format!(
                "invalid display mode '{}' (expected 'inline' or 'detached')",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActiveState {
    pub selected_page_id: Option<String>,
    pub current_variables: Option<Variables>,
    pub display_mode: DisplayMode,
    /// Last email reported by a content page; carried into the enter-code URL.
    pub known_email: Option<String>,
}

/// Shared handle to the active state. Clones observe the same state; every
/// setter notifies subscribers.
#[derive(Clone)]
pub struct ActiveStateStore {
    sender: Arc<watch::Sender<ActiveState>>,
}

impl ActiveStateStore {
    pub fn new(display_mode: DisplayMode) -> Self {
        let (sender, _) = watch::channel(ActiveState {
            display_mode,
            ..ActiveState::default()
        });
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn get(&self) -> ActiveState {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ActiveState> {
        self.sender.subscribe()
    }

    pub fn set_variables(&self, variables: Option<Variables>) {
        self.sender.send_modify(|state| state.current_variables = variables);
    }

    pub fn set_selected_page(&self, page_id: Option<String>) {
        self.sender.send_modify(|state| state.selected_page_id = page_id);
    }

    pub fn set_display_mode(&self, mode: DisplayMode) {
        self.sender.send_modify(|state| state.display_mode = mode);
    }

    pub fn set_known_email(&self, email: Option<String>) {
        self.sender.send_modify(|state| state.known_email = email);
    }
}

impl Default for ActiveStateStore {
    fn default() -> Self {
        Self::new(DisplayMode::Inline)
    }
}
