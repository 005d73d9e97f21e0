//! In-process host environment: a recording frame, a tab-opening browser
//! whose tabs run the page viewer, and shared buses.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::PlatformError;
use crate::platform::{
    ChannelHub, ContentFrame, HostEnvironment, TabOpener, TabWindow, WindowBus, BLANK_PAGE,
};
use crate::protocol::ContentMessage;
use crate::viewer::{tab_id_from_url, PageViewer};

struct FrameState {
    source: String,
    history: Vec<String>,
    received: Vec<Value>,
}

/// Frame that records what it was sent. Content-page output goes to the
/// parent window's bus. With `auto_ready`, loading a non-blank page makes the
/// page announce `READY`, as real content pages do on load.
pub struct MemoryFrame {
    state: Mutex<FrameState>,
    parent: WindowBus,
    auto_ready: bool,
}

impl MemoryFrame {
    pub fn new(parent: WindowBus) -> Arc<Self> {
        Self::build(parent, false)
    }

    pub fn with_auto_ready(parent: WindowBus) -> Arc<Self> {
        Self::build(parent, true)
    }

    fn build(parent: WindowBus, auto_ready: bool) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FrameState {
                source: BLANK_PAGE.to_string(),
                history: Vec::new(),
                received: Vec::new(),
            }),
            parent,
            auto_ready,
        })
    }

    /// Messages delivered into the frame, oldest first.
    pub fn received(&self) -> Vec<Value> {
        self.state.lock().received.clone()
    }

    /// Every source the frame was pointed at, including blanks.
    pub fn history(&self) -> Vec<String> {
        self.state.lock().history.clone()
    }

    /// The content page posts a message to its parent window.
    pub fn emit(&self, message: Value) -> usize {
        self.parent.post(message)
    }
}

impl ContentFrame for MemoryFrame {
    fn set_source(&self, url: &str) {
        {
            let mut state = self.state.lock();
            state.source = url.to_string();
            state.history.push(url.to_string());
        }
        if self.auto_ready && url != BLANK_PAGE {
            self.emit(json!({ "event": ContentMessage::READY }));
        }
    }

    fn source(&self) -> String {
        self.state.lock().source.clone()
    }

    fn post_message(&self, message: Value) {
        self.state.lock().received.push(message);
    }
}

/// A tab opened by [`MemoryBrowser`]. Its page viewer renders into `frame`.
pub struct MemoryTab {
    url: String,
    closed: AtomicBool,
    focus_count: AtomicUsize,
    closed_tx: watch::Sender<bool>,
    window: WindowBus,
    frame: Arc<MemoryFrame>,
}

impl MemoryTab {
    fn new(url: &str, auto_ready: bool) -> Arc<Self> {
        let window = WindowBus::new();
        let frame = MemoryFrame::build(window.clone(), auto_ready);
        let (closed_tx, _) = watch::channel(false);
        Arc::new(Self {
            url: url.to_string(),
            closed: AtomicBool::new(false),
            focus_count: AtomicUsize::new(0),
            closed_tx,
            window,
            frame,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn frame(&self) -> Arc<MemoryFrame> {
        Arc::clone(&self.frame)
    }

    /// The tab's own window; its frame posts content output here.
    pub fn window(&self) -> WindowBus {
        self.window.clone()
    }

    pub fn focus_count(&self) -> usize {
        self.focus_count.load(Ordering::SeqCst)
    }

    /// Resolves once the tab is closed, by anyone.
    pub async fn closed(&self) {
        let mut rx = self.closed_tx.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl TabWindow for MemoryTab {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn focus(&self) {
        self.focus_count.fetch_add(1, Ordering::SeqCst);
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!(url = %self.url, "tab closed");
            self.closed_tx.send_replace(true);
        }
    }
}

struct BrowserSettings {
    block_popups: bool,
    viewer_enabled: bool,
    viewer_delay: Duration,
}

/// Opens [`MemoryTab`]s and starts a [`PageViewer`] in each one.
pub struct MemoryBrowser {
    hub: Option<ChannelHub>,
    channel_name: String,
    auto_ready: bool,
    settings: Mutex<BrowserSettings>,
    tabs: Mutex<Vec<Arc<MemoryTab>>>,
}

impl MemoryBrowser {
    pub fn new(hub: Option<ChannelHub>, channel_name: impl Into<String>, auto_ready: bool) -> Arc<Self> {
        Arc::new(Self {
            hub,
            channel_name: channel_name.into(),
            auto_ready,
            settings: Mutex::new(BrowserSettings {
                block_popups: false,
                viewer_enabled: true,
                viewer_delay: Duration::from_millis(50),
            }),
            tabs: Mutex::new(Vec::new()),
        })
    }

    pub fn set_block_popups(&self, block: bool) {
        self.settings.lock().block_popups = block;
    }

    /// With the viewer disabled, opened tabs never subscribe to the channel.
    pub fn set_viewer_enabled(&self, enabled: bool) {
        self.settings.lock().viewer_enabled = enabled;
    }

    /// How long a new tab takes before its viewer subscribes.
    pub fn set_viewer_delay(&self, delay: Duration) {
        self.settings.lock().viewer_delay = delay;
    }

    pub fn tabs(&self) -> Vec<Arc<MemoryTab>> {
        self.tabs.lock().clone()
    }

    pub fn latest_tab(&self) -> Option<Arc<MemoryTab>> {
        self.tabs.lock().last().cloned()
    }

    fn start_viewer(&self, tab: &Arc<MemoryTab>, delay: Duration) {
        let Some(hub) = self.hub.clone() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime available; page viewer not started");
            return;
        };
        let channel_name = self.channel_name.clone();
        let tab = Arc::clone(tab);
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if tab.is_closed() {
                return;
            }
            let window: Arc<dyn TabWindow> = tab.clone();
            let frame: Arc<dyn ContentFrame> = tab.frame();
            let viewer = PageViewer::new(
                tab_id_from_url(&tab.url),
                hub.open(&channel_name),
                frame,
                &tab.window,
                window,
            );
            viewer.run(tab.closed()).await;
        });
    }
}

impl TabOpener for MemoryBrowser {
    fn open(&self, url: &str) -> Result<Arc<dyn TabWindow>, PlatformError> {
        let (blocked, viewer_enabled, delay) = {
            let settings = self.settings.lock();
            (settings.block_popups, settings.viewer_enabled, settings.viewer_delay)
        };
        if blocked {
            return Err(PlatformError::PopupBlocked(url.to_string()));
        }
        let tab = MemoryTab::new(url, self.auto_ready);
        self.tabs.lock().push(Arc::clone(&tab));
        if viewer_enabled {
            self.start_viewer(&tab, delay);
        }
        Ok(tab)
    }
}

/// A complete in-process host page.
#[derive(Clone)]
pub struct MemoryEnvironment {
    pub window: WindowBus,
    pub frame: Arc<MemoryFrame>,
    pub hub: Option<ChannelHub>,
    pub browser: Arc<MemoryBrowser>,
}

impl MemoryEnvironment {
    pub fn new(channel_name: &str) -> Self {
        Self::build(channel_name, Some(ChannelHub::new()), false)
    }

    /// Content pages announce `READY` whenever they load.
    pub fn with_auto_ready(channel_name: &str) -> Self {
        Self::build(channel_name, Some(ChannelHub::new()), true)
    }

    /// A platform without broadcast channels.
    pub fn without_broadcast(channel_name: &str) -> Self {
        Self::build(channel_name, None, false)
    }

    fn build(channel_name: &str, hub: Option<ChannelHub>, auto_ready: bool) -> Self {
        let window = WindowBus::new();
        let frame = MemoryFrame::build(window.clone(), auto_ready);
        let browser = MemoryBrowser::new(hub.clone(), channel_name, auto_ready);
        Self {
            window,
            frame,
            hub,
            browser,
        }
    }

    pub fn host(&self) -> HostEnvironment {
        HostEnvironment {
            frame: self.frame.clone(),
            window: self.window.clone(),
            tabs: self.browser.clone(),
            broadcast: self.hub.clone(),
        }
    }
}
