//! Transport layer: one interface for reaching the content page, whether it
//! is embedded in the host's frame or detached into its own tab.

mod detached;
mod inline;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::error::CoordinatorError;
use crate::protocol::{ContentMessage, HostMessage};
use crate::state::DisplayMode;

pub use detached::DetachedTransport;
pub use inline::InlineTransport;

/// Something the content side delivered to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Content(ContentMessage),
    /// A payload that did not parse; kept verbatim for the log.
    Malformed(Value),
    /// The detached tab with this id (if it gave one) is listening.
    TabReady(Option<u64>),
    TabClosed(Option<u64>),
}

/// A live connection to the content page.
///
/// Inbound messages are yielded in receipt order. A transport stops yielding
/// once [`Transport::unsubscribe`] is called; anything still queued is dropped.
#[async_trait]
pub trait Transport: Send {
    fn mode(&self) -> DisplayMode;

    fn send(&mut self, message: &HostMessage) -> Result<(), CoordinatorError>;

    /// Waits for the next inbound message. `None` once unsubscribed.
    async fn recv(&mut self) -> Option<Inbound>;

    fn try_recv(&mut self) -> Option<Inbound>;

    fn unsubscribe(&mut self);

    fn is_subscribed(&self) -> bool;
}

pub(crate) fn decode_content(raw: Value) -> Inbound {
    match ContentMessage::from_value(&raw) {
        Ok(message) => Inbound::Content(message),
        Err(err) => {
            warn!(error = %err, "inbound content message failed to parse");
            Inbound::Malformed(raw)
        }
    }
}
