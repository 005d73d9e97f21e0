//! CLI presentation: text and json formatters per command family.

mod pages;
mod session;
mod sets;

pub use pages::{format_pages_json, format_pages_text};
pub use session::{format_session_json, format_session_text};
pub use sets::{format_set_detail, format_sets_json, format_sets_text, format_stored_set};

use crate::error::HostError;

pub(crate) fn to_pretty_json<T: serde::Serialize>(value: &T) -> Result<String, HostError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| HostError::Store(crate::error::StoreError::Serialization(e)))
}
