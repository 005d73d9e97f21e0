//! Tab lifecycle manager: owns the detached tab, its ready handshake, reuse,
//! and teardown.
//!
//! A tab moves `Opening -> Ready -> Closed`, or straight to `Closed` when it
//! disappears or never answers. While `Opening`, `LOAD_PAGE` requests are
//! buffered and flushed in order once the tab is addressable.
//!
//! Every opened handle and its handshake timer carry the manager's
//! generation; ticks from a superseded generation are discarded.
//!
//! Each tab also gets a process-wide id, passed to it in the viewer URL. Only
//! a `TAB_READY` echoing that id makes the tab `Ready`, and only a
//! `TAB_CLOSED` echoing it clears the handle. Announcements from older tabs,
//! or from other parties on the channel, are ignored.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::time::{sleep, Sleep};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::HandshakeConfig;
use crate::error::CoordinatorError;
use crate::platform::{ChannelSender, TabOpener, TabWindow};
use crate::protocol::ControlEnvelope;
use crate::viewer::TAB_QUERY;

static NEXT_TAB_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabState {
    Opening,
    Ready,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The tab announced `TAB_CLOSED`.
    Remote,
    /// The tab was found closed without notice.
    Stale,
    /// The host closed it.
    Host,
    HandshakeTimeout,
}

pub struct DetachedTabHandle {
    window: Arc<dyn TabWindow>,
    state: TabState,
    generation: u64,
    tab_id: u64,
    pending: VecDeque<ControlEnvelope>,
    attempts: u32,
}

struct HandshakePoll {
    generation: u64,
    sleep: Pin<Box<Sleep>>,
}

type ClosedHandler = Box<dyn FnMut(CloseReason) + Send>;

pub struct TabLifecycleManager {
    opener: Arc<dyn TabOpener>,
    channel: ChannelSender,
    viewer_url: String,
    handshake: HandshakeConfig,
    handle: Option<DetachedTabHandle>,
    generation: u64,
    poll: Option<HandshakePoll>,
    closed_handlers: Vec<ClosedHandler>,
}

impl TabLifecycleManager {
    pub fn new(
        opener: Arc<dyn TabOpener>,
        channel: ChannelSender,
        viewer_url: impl Into<String>,
        handshake: HandshakeConfig,
    ) -> Self {
        Self {
            opener,
            channel,
            viewer_url: viewer_url.into(),
            handshake,
            handle: None,
            generation: 0,
            poll: None,
            closed_handlers: Vec::new(),
        }
    }

    pub fn state(&self) -> TabState {
        self.handle
            .as_ref()
            .map(|handle| handle.state)
            .unwrap_or(TabState::Closed)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Id of the tracked tab, as echoed in its announcements.
    pub fn tab_id(&self) -> Option<u64> {
        self.handle.as_ref().map(|handle| handle.tab_id)
    }

    pub fn pending_len(&self) -> usize {
        self.handle.as_ref().map_or(0, |handle| handle.pending.len())
    }

    pub fn is_polling(&self) -> bool {
        self.poll.is_some()
    }

    pub fn on_closed(&mut self, handler: impl FnMut(CloseReason) + Send + 'static) {
        self.closed_handlers.push(Box::new(handler));
    }

    /// Loads `page_url` in the detached tab, opening one if none is alive.
    /// Never opens a second tab while one is alive.
    pub fn open_or_reuse(&mut self, page_url: &str) -> Result<TabState, CoordinatorError> {
        self.check_liveness();
        let load = ControlEnvelope::LoadPage {
            url: page_url.to_string(),
        };

        if let Some(handle) = self.handle.as_mut() {
            match handle.state {
                TabState::Ready => {
                    post(&self.channel, &load)?;
                }
                _ => {
                    debug!(url = %page_url, "tab still opening; buffering LOAD_PAGE");
                    handle.pending.push_back(load);
                }
            }
            handle.window.focus();
            return Ok(handle.state);
        }

        let tab_id = NEXT_TAB_ID.fetch_add(1, Ordering::Relaxed);
        let window = self.opener.open(&self.viewer_url_for(tab_id)).map_err(|err| {
            warn!(error = %err, "detached tab creation blocked");
            CoordinatorError::TabCreationBlocked(err.to_string())
        })?;
        self.generation += 1;
        let mut pending = VecDeque::new();
        pending.push_back(load);
        self.handle = Some(DetachedTabHandle {
            window,
            state: TabState::Opening,
            generation: self.generation,
            tab_id,
            pending,
            attempts: 0,
        });
        self.schedule_poll();
        info!(generation = self.generation, tab = tab_id, url = %page_url, "opening detached tab");
        Ok(TabState::Opening)
    }

    /// Resolves when the pending handshake timer fires, yielding its
    /// generation. Never resolves when no handshake is pending.
    pub async fn next_tick(&mut self) -> u64 {
        match self.poll.as_mut() {
            Some(poll) => {
                poll.sleep.as_mut().await;
                poll.generation
            }
            None => std::future::pending().await,
        }
    }

    /// One handshake attempt: gives up once the tab is gone or has stayed
    /// silent for `max_attempts` intervals.
    pub fn on_tick(&mut self, generation: u64) -> Result<TabState, CoordinatorError> {
        let current = self.handle.as_ref().map(|handle| handle.generation);
        if current != Some(generation) {
            debug!(generation, "discarding stale handshake tick");
            if self.poll.as_ref().map(|poll| poll.generation) == Some(generation) {
                self.poll = None;
            }
            return Ok(self.state());
        }
        self.poll = None;

        let Some(handle) = self.handle.as_mut() else {
            return Ok(TabState::Closed);
        };
        if handle.state != TabState::Opening {
            return Ok(handle.state);
        }
        if handle.window.is_closed() {
            self.mark_closed(CloseReason::Stale);
            return Ok(TabState::Closed);
        }

        handle.attempts += 1;
        let attempts = handle.attempts;
        if attempts >= self.handshake.max_attempts {
            warn!(attempts, "detached tab never became addressable");
            if let Some(handle) = self.handle.as_ref() {
                handle.window.close();
            }
            self.mark_closed(CloseReason::HandshakeTimeout);
            return Err(CoordinatorError::HandshakeTimeout { attempts });
        }
        self.schedule_poll();
        Ok(TabState::Opening)
    }

    /// A tab announced it is listening. Completes the handshake when it is
    /// the tracked tab.
    pub fn on_tab_ready(&mut self, tab: Option<u64>) -> Result<TabState, CoordinatorError> {
        if !self.is_tracked(tab) {
            debug!(?tab, tracked = ?self.tab_id(), "ignoring TAB_READY from another tab");
            return Ok(self.state());
        }
        if self.state() == TabState::Opening {
            self.complete_handshake()?;
        }
        Ok(self.state())
    }

    /// A tab announced it went away. Clears the handle when it is the
    /// tracked tab.
    pub fn on_tab_closed(&mut self, tab: Option<u64>) {
        if !self.is_tracked(tab) {
            debug!(?tab, tracked = ?self.tab_id(), "ignoring TAB_CLOSED from another tab");
            return;
        }
        self.mark_closed(CloseReason::Remote);
    }

    fn is_tracked(&self, tab: Option<u64>) -> bool {
        tab.is_some() && tab == self.tab_id()
    }

    fn viewer_url_for(&self, tab_id: u64) -> String {
        match Url::parse(&self.viewer_url) {
            Ok(mut url) => {
                url.query_pairs_mut()
                    .append_pair(TAB_QUERY, &tab_id.to_string());
                url.to_string()
            }
            Err(_) => format!("{}?{}={}", self.viewer_url, TAB_QUERY, tab_id),
        }
    }

    /// Clears a handle whose tab went away silently. Returns whether a tab
    /// is still alive.
    pub fn check_liveness(&mut self) -> bool {
        match self.handle.as_ref() {
            Some(handle) if handle.window.is_closed() => {
                self.mark_closed(CloseReason::Stale);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Asks the tab to close itself, then force-closes it.
    pub fn close(&mut self) {
        let Some(handle) = self.handle.as_ref() else {
            return;
        };
        if let Err(err) = post(&self.channel, &ControlEnvelope::CloseTab {}) {
            warn!(error = %err, "failed to post CLOSE_TAB");
        }
        handle.window.close();
        self.mark_closed(CloseReason::Host);
    }

    fn complete_handshake(&mut self) -> Result<(), CoordinatorError> {
        self.poll = None;
        let Some(handle) = self.handle.as_mut() else {
            return Ok(());
        };
        handle.state = TabState::Ready;
        info!(
            generation = handle.generation,
            buffered = handle.pending.len(),
            "detached tab ready"
        );
        while let Some(envelope) = handle.pending.pop_front() {
            post(&self.channel, &envelope)?;
        }
        Ok(())
    }

    fn schedule_poll(&mut self) {
        self.poll = Some(HandshakePoll {
            generation: self.generation,
            sleep: Box::pin(sleep(self.handshake.interval())),
        });
    }

    fn mark_closed(&mut self, reason: CloseReason) {
        self.poll = None;
        if let Some(handle) = self.handle.take() {
            info!(generation = handle.generation, tab = handle.tab_id, ?reason, "detached tab closed");
            for handler in self.closed_handlers.iter_mut() {
                handler(reason);
            }
        }
    }
}

fn post(channel: &ChannelSender, envelope: &ControlEnvelope) -> Result<usize, CoordinatorError> {
    let delivered = channel.post(envelope.to_value()?);
    debug!(kind = envelope.type_name(), delivered, "posted control message");
    Ok(delivered)
}
