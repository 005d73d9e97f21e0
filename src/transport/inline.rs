//! Direct frame messaging for the embedded content page.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::CoordinatorError;
use crate::platform::{ContentFrame, WindowBus, WindowListener};
use crate::protocol::HostMessage;
use crate::state::DisplayMode;
use crate::transport::{decode_content, Inbound, Transport};

pub struct InlineTransport {
    frame: Arc<dyn ContentFrame>,
    listener: Option<WindowListener>,
}

impl InlineTransport {
    /// Subscribes to the host window's `message` events.
    pub fn new(frame: Arc<dyn ContentFrame>, window: &WindowBus) -> Self {
        Self {
            frame,
            listener: Some(window.listen()),
        }
    }
}

#[async_trait]
impl Transport for InlineTransport {
    fn mode(&self) -> DisplayMode {
        DisplayMode::Inline
    }

    fn send(&mut self, message: &HostMessage) -> Result<(), CoordinatorError> {
        let value = serde_json::to_value(message)
            .map_err(|e| CoordinatorError::MalformedPayload(e.to_string()))?;
        debug!(target_page = %self.frame.source(), "posting message to inline frame");
        self.frame.post_message(value);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Inbound> {
        let raw = self.listener.as_mut()?.recv().await?;
        Some(decode_content(raw))
    }

    fn try_recv(&mut self) -> Option<Inbound> {
        let raw = self.listener.as_mut()?.try_recv()?;
        Some(decode_content(raw))
    }

    fn unsubscribe(&mut self) {
        self.listener = None;
    }

    fn is_subscribed(&self) -> bool {
        self.listener.is_some()
    }
}
