//! Host environment seams: the embedded frame, the host window's message
//! listeners, named broadcast channels, and browser tabs.
//!
//! The coordinator only talks to these abstractions. `platform::memory`
//! provides an in-process implementation used by the simulator and tests.

mod bus;
pub mod memory;

use std::sync::Arc;

use serde_json::Value;

use crate::error::PlatformError;

pub use bus::{ChannelEndpoint, ChannelHub, ChannelSender, WindowBus, WindowListener};

/// Source of an empty frame.
pub const BLANK_PAGE: &str = "about:blank";

/// The embedded content frame (inline mode target).
pub trait ContentFrame: Send + Sync {
    fn set_source(&self, url: &str);

    fn source(&self) -> String;

    /// Deliver a message into the frame's window.
    fn post_message(&self, message: Value);

    fn is_blank(&self) -> bool {
        self.source() == BLANK_PAGE
    }
}

/// A browser tab opened by the host.
pub trait TabWindow: Send + Sync {
    fn is_closed(&self) -> bool;

    fn focus(&self);

    fn close(&self);
}

pub trait TabOpener: Send + Sync {
    fn open(&self, url: &str) -> Result<Arc<dyn TabWindow>, PlatformError>;
}

/// Everything the coordinator needs from the host page.
#[derive(Clone)]
pub struct HostEnvironment {
    pub frame: Arc<dyn ContentFrame>,
    pub window: WindowBus,
    pub tabs: Arc<dyn TabOpener>,
    /// `None` when the platform lacks the broadcast capability.
    pub broadcast: Option<ChannelHub>,
}
