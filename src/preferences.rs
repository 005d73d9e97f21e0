//! Persisted client-side preferences, kept in a sled tree.
//!
//! The display mode is stored under `displayInline` as `"true"` or `"false"`;
//! a missing or unreadable value means inline.

use std::path::Path;

use sled::{Db, Tree};
use tracing::{debug, warn};

use crate::error::PreferenceError;
use crate::state::DisplayMode;

const TREE_PREFERENCES: &str = "preferences";
pub const DISPLAY_INLINE_KEY: &str = "displayInline";

/// Where the display-mode choice is persisted between sessions.
pub trait DisplayModeStore: Send {
    fn display_mode(&self) -> Result<DisplayMode, PreferenceError>;

    fn set_display_mode(&self, mode: DisplayMode) -> Result<(), PreferenceError>;
}

#[derive(Clone)]
pub struct Preferences {
    db: Db,
    tree: Tree,
}

impl Preferences {
    pub fn open(path: &Path) -> Result<Self, PreferenceError> {
        Self::from_db(sled::open(path)?)
    }

    /// Backed by a temporary database that disappears on drop.
    pub fn temporary() -> Result<Self, PreferenceError> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: Db) -> Result<Self, PreferenceError> {
        let tree = db.open_tree(TREE_PREFERENCES)?;
        Ok(Self { db, tree })
    }

    pub fn display_mode(&self) -> Result<DisplayMode, PreferenceError> {
        let Some(raw) = self.tree.get(DISPLAY_INLINE_KEY)? else {
            return Ok(DisplayMode::Inline);
        };
        match raw.as_ref() {
            b"true" => Ok(DisplayMode::from_inline_flag(true)),
            b"false" => Ok(DisplayMode::from_inline_flag(false)),
            other => {
                warn!(
                    value = %String::from_utf8_lossy(other),
                    "unrecognized displayInline preference; using inline"
                );
                Ok(DisplayMode::Inline)
            }
        }
    }

    pub fn set_display_mode(&self, mode: DisplayMode) -> Result<(), PreferenceError> {
        let value: &[u8] = if mode.is_inline() { b"true" } else { b"false" };
        self.tree.insert(DISPLAY_INLINE_KEY, value)?;
        self.db.flush()?;
        debug!(mode = %mode, "persisted display mode");
        Ok(())
    }
}

impl DisplayModeStore for Preferences {
    fn display_mode(&self) -> Result<DisplayMode, PreferenceError> {
        Preferences::display_mode(self)
    }

    fn set_display_mode(&self, mode: DisplayMode) -> Result<(), PreferenceError> {
        Preferences::set_display_mode(self, mode)
    }
}
