//! Cross-tab relay over the shared broadcast channel.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::CoordinatorError;
use crate::platform::{ChannelEndpoint, ChannelHub, ChannelSender};
use crate::protocol::{ControlEnvelope, HostMessage};
use crate::state::DisplayMode;
use crate::transport::{decode_content, Inbound, Transport};

pub struct DetachedTransport {
    endpoint: Option<ChannelEndpoint>,
    sender: ChannelSender,
}

impl DetachedTransport {
    pub fn new(hub: &ChannelHub, channel_name: &str) -> Self {
        let endpoint = hub.open(channel_name);
        let sender = endpoint.sender();
        Self {
            endpoint: Some(endpoint),
            sender,
        }
    }

    /// Posting handle for control traffic on the same channel.
    pub fn sender(&self) -> ChannelSender {
        self.sender.clone()
    }

    /// Maps channel traffic to inbound messages. Control messages addressed to
    /// tabs (and echoes from other hosts) are not for us.
    fn decode(raw: Value) -> Option<Inbound> {
        match ControlEnvelope::from_value(&raw) {
            Ok(ControlEnvelope::IframeMessage(data)) => Some(decode_content(data)),
            Ok(ControlEnvelope::TabReady { tab }) => Some(Inbound::TabReady(tab)),
            Ok(ControlEnvelope::TabClosed { tab }) => Some(Inbound::TabClosed(tab)),
            Ok(other) => {
                debug!(kind = other.type_name(), "ignoring tab-bound control message");
                None
            }
            Err(_) => Some(Inbound::Malformed(raw)),
        }
    }
}

#[async_trait]
impl Transport for DetachedTransport {
    fn mode(&self) -> DisplayMode {
        DisplayMode::Detached
    }

    fn send(&mut self, message: &HostMessage) -> Result<(), CoordinatorError> {
        let envelope = ControlEnvelope::SendMessage {
            message: message.clone(),
        };
        let delivered = self.sender.post(envelope.to_value()?);
        debug!(delivered, "posted SEND_MESSAGE on broadcast channel");
        Ok(())
    }

    async fn recv(&mut self) -> Option<Inbound> {
        loop {
            let raw = self.endpoint.as_mut()?.recv().await?;
            if let Some(inbound) = Self::decode(raw) {
                return Some(inbound);
            }
        }
    }

    fn try_recv(&mut self) -> Option<Inbound> {
        loop {
            let raw = self.endpoint.as_mut()?.try_recv()?;
            if let Some(inbound) = Self::decode(raw) {
                return Some(inbound);
            }
        }
    }

    fn unsubscribe(&mut self) {
        self.endpoint = None;
    }

    fn is_subscribed(&self) -> bool {
        self.endpoint.is_some()
    }
}
