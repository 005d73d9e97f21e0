//! Page viewer: the relay that runs inside the detached tab.
//!
//! It subscribes to the shared channel, announces `TAB_READY`, loads pages
//! and forwards host messages into its own frame on request, relays whatever
//! the content page posts back as `IFRAME_MESSAGE`, and announces
//! `TAB_CLOSED` when it goes away. Both announcements carry the tab id the
//! host put in the viewer URL.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::platform::{ChannelEndpoint, ContentFrame, TabWindow, WindowBus, WindowListener};
use crate::protocol::ControlEnvelope;

/// Query parameter naming the tab in the viewer URL.
pub const TAB_QUERY: &str = "tab";

/// The tab id in a viewer URL such as `http://host/page-viewer?tab=3`.
pub fn tab_id_from_url(viewer_url: &str) -> Option<u64> {
    let url = Url::parse(viewer_url).ok()?;
    let (_, value) = url.query_pairs().find(|(key, _)| key == TAB_QUERY)?;
    value.parse().ok()
}

pub struct PageViewer {
    tab_id: Option<u64>,
    channel: ChannelEndpoint,
    frame: Arc<dyn ContentFrame>,
    frame_output: WindowListener,
    tab: Arc<dyn TabWindow>,
}

enum ViewerInput {
    Control(Value),
    Content(Value),
    Shutdown,
}

impl PageViewer {
    /// `window` is the tab's own window; the frame posts its output there.
    pub fn new(
        tab_id: Option<u64>,
        channel: ChannelEndpoint,
        frame: Arc<dyn ContentFrame>,
        window: &WindowBus,
        tab: Arc<dyn TabWindow>,
    ) -> Self {
        Self {
            tab_id,
            channel,
            frame,
            frame_output: window.listen(),
            tab,
        }
    }

    /// Runs until the host asks the tab to close or `shutdown` resolves.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) {
        self.announce(ControlEnvelope::TabReady { tab: self.tab_id });
        info!(tab = ?self.tab_id, "page viewer ready");

        tokio::pin!(shutdown);
        loop {
            let input = tokio::select! {
                Some(raw) = self.channel.recv() => ViewerInput::Control(raw),
                Some(raw) = self.frame_output.recv() => ViewerInput::Content(raw),
                _ = &mut shutdown => ViewerInput::Shutdown,
            };
            match input {
                ViewerInput::Control(raw) => {
                    if !self.handle_control(&raw) {
                        break;
                    }
                }
                ViewerInput::Content(raw) => {
                    self.announce(ControlEnvelope::IframeMessage(raw));
                }
                ViewerInput::Shutdown => break,
            }
        }

        self.announce(ControlEnvelope::TabClosed { tab: self.tab_id });
        self.tab.close();
        info!("page viewer closed");
    }

    /// Returns false once the viewer should stop.
    fn handle_control(&self, raw: &Value) -> bool {
        let envelope = match ControlEnvelope::from_value(raw) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(error = %err, "page viewer ignoring malformed control message");
                return true;
            }
        };
        match envelope {
            ControlEnvelope::LoadPage { url } => {
                debug!(url = %url, "page viewer loading page");
                self.frame.set_source(&url);
            }
            ControlEnvelope::SendMessage { message } => match serde_json::to_value(&message) {
                Ok(value) => self.frame.post_message(value),
                Err(err) => warn!(error = %err, "page viewer could not encode message"),
            },
            ControlEnvelope::CloseTab {} => {
                debug!("page viewer asked to close");
                return false;
            }
            other => debug!(kind = other.type_name(), "page viewer ignoring control message"),
        }
        true
    }

    fn announce(&self, envelope: ControlEnvelope) {
        match envelope.to_value() {
            Ok(value) => {
                self.channel.post(value);
            }
            Err(err) => warn!(error = %err, "page viewer could not encode envelope"),
        }
    }
}
