//! Coordinator: the façade UI actions go through, and the dispatcher for
//! everything the content side sends back.
//!
//! The coordinator owns exactly one live [`Transport`] at a time, matching
//! `ActiveState::display_mode`. Inbound traffic and handshake timer ticks are
//! consumed one at a time by [`Coordinator::step`] or [`Coordinator::run_for`],
//! so every handler runs to completion before the next input is looked at.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{HandshakeConfig, HostConfig};
use crate::error::{ConfigError, CoordinatorError};
use crate::event_log::{Event, EventLog, Snapshot};
use crate::pages::{content_url, PageCatalog};
use crate::platform::{ChannelSender, ContentFrame, HostEnvironment, BLANK_PAGE};
use crate::preferences::DisplayModeStore;
use crate::protocol::{ContentMessage, HostMessage, Variables};
use crate::state::{ActiveState, ActiveStateStore, DisplayMode};
use crate::store::{StoredVariableSet, VariableSet, VariableSetStore};
use crate::tabs::{CloseReason, TabLifecycleManager, TabState};
use crate::transport::{DetachedTransport, Inbound, InlineTransport, Transport};

/// Page id recorded on outbound entries when nothing is selected.
pub const UNKNOWN_PAGE: &str = "unknown";

#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub base_url: Url,
    pub channel_name: String,
    /// Where detached tabs are opened; the page viewer lives there.
    pub viewer_url: String,
    pub handshake: HandshakeConfig,
}

impl CoordinatorSettings {
    pub fn new(base_url: Url, channel_name: impl Into<String>, handshake: HandshakeConfig) -> Self {
        let viewer_url = match base_url.join("/page-viewer") {
            Ok(url) => url.to_string(),
            Err(_) => format!("{}page-viewer", base_url),
        };
        Self {
            base_url,
            channel_name: channel_name.into(),
            viewer_url,
            handshake,
        }
    }

    pub fn from_config(config: &HostConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.parsed_base_url()?,
            config.channel_name.clone(),
            config.handshake,
        ))
    }
}

/// Something the UI should tell the user about. Lower layers never alert the
/// user themselves; they end up here.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    TabClosed(CloseReason),
    HandshakeTimeout { attempts: u32 },
    MalformedPayload(String),
    TransportUnavailable,
    Failed(String),
}

enum Input {
    Transport(Inbound),
    Tick(u64),
}

pub struct Coordinator {
    env: HostEnvironment,
    settings: CoordinatorSettings,
    state: ActiveStateStore,
    log: EventLog,
    pages: PageCatalog,
    store: Arc<dyn VariableSetStore>,
    variable_sets: BTreeMap<String, VariableSet>,
    selected_set: Option<String>,
    transport: Box<dyn Transport>,
    detached_sender: Option<ChannelSender>,
    tabs: Option<TabLifecycleManager>,
    detached_disabled: bool,
    preferences: Option<Box<dyn DisplayModeStore>>,
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl Coordinator {
    /// Wires the transport for the state's current display mode. A detached
    /// start on a platform without broadcast channels falls back to inline and
    /// disables detached mode.
    pub fn new(
        env: HostEnvironment,
        settings: CoordinatorSettings,
        state: ActiveStateStore,
        store: Arc<dyn VariableSetStore>,
    ) -> Self {
        let mut notices = Vec::new();
        let mut detached_disabled = false;
        let mut mode = state.get().display_mode;
        if mode == DisplayMode::Detached && env.broadcast.is_none() {
            warn!("broadcast channels unavailable; starting inline");
            notices.push(Notice::TransportUnavailable);
            detached_disabled = true;
            mode = DisplayMode::Inline;
            state.set_display_mode(mode);
        }

        let (transport, detached_sender) = connect(&env, &settings.channel_name, mode);
        info!(mode = %mode, channel = %settings.channel_name, "coordinator started");
        Self {
            env,
            settings,
            state,
            log: EventLog::new(),
            pages: PageCatalog::default(),
            store,
            variable_sets: BTreeMap::new(),
            selected_set: None,
            transport,
            detached_sender,
            tabs: None,
            detached_disabled,
            preferences: None,
            notices: Arc::new(Mutex::new(notices)),
        }
    }

    pub fn with_pages(mut self, pages: PageCatalog) -> Self {
        self.pages = pages;
        self
    }

    pub fn with_preferences(mut self, preferences: impl DisplayModeStore + 'static) -> Self {
        self.preferences = Some(Box::new(preferences));
        self
    }

    // ---- UI actions ----

    /// Loads a page: into the frame when inline, into the detached tab
    /// (opening or reusing it) when detached.
    pub fn select_page(&mut self, page_id: &str) -> Result<(), CoordinatorError> {
        let page = self
            .pages
            .get(page_id)
            .cloned()
            .ok_or_else(|| CoordinatorError::UnknownPage(page_id.to_string()))?;
        let snapshot = self.state.get();
        let url = content_url(&self.settings.base_url, &page, snapshot.known_email.as_deref())?;

        self.state.set_selected_page(Some(page.directory.clone()));
        match snapshot.display_mode {
            DisplayMode::Inline => self.env.frame.set_source(&url),
            DisplayMode::Detached => {
                let opened = self.ensure_tabs().and_then(|tabs| tabs.open_or_reuse(&url));
                if let Err(err) = opened {
                    self.state.set_selected_page(snapshot.selected_page_id);
                    if matches!(err, CoordinatorError::TransportUnavailable) {
                        self.disable_detached();
                    }
                    return Err(err);
                }
            }
        }
        info!(page = %page.directory, mode = %snapshot.display_mode, url = %url, "page selected");
        Ok(())
    }

    /// Makes a cached variable set current (or none). Pushes it right away
    /// when a content page is loaded; returns whether it did.
    pub fn select_variable_set(&mut self, set_id: Option<&str>) -> Result<bool, CoordinatorError> {
        let Some(set_id) = set_id else {
            self.selected_set = None;
            self.state.set_variables(None);
            debug!("variable set cleared");
            return Ok(false);
        };
        let variables = self
            .variable_sets
            .get(set_id)
            .map(|set| set.variables.clone())
            .ok_or_else(|| CoordinatorError::UnknownVariableSet(set_id.to_string()))?;

        self.selected_set = Some(set_id.to_string());
        self.state.set_variables(Some(variables.clone()));
        if !self.content_loaded() {
            debug!(set = %set_id, "variable set selected; no content page loaded");
            return Ok(false);
        }
        self.push(variables)?;
        Ok(true)
    }

    /// Saves the display-mode configuration. Switching tears the old
    /// transport down before the new one subscribes. Every save is persisted
    /// and logged as `CONFIG_CHANGE`, changed or not. A save that cannot be
    /// persisted changes nothing.
    pub fn set_display_mode(&mut self, mode: DisplayMode) -> Result<(), CoordinatorError> {
        if mode == DisplayMode::Detached {
            if self.detached_disabled {
                return Err(CoordinatorError::DetachedModeDisabled);
            }
            if self.env.broadcast.is_none() {
                warn!("broadcast channels unavailable");
                self.disable_detached();
                return Err(CoordinatorError::TransportUnavailable);
            }
        }

        if let Some(preferences) = &self.preferences {
            preferences.set_display_mode(mode)?;
        }
        let previous = self.state.get().display_mode;
        if mode != previous {
            self.switch_transport(mode);
        }
        self.log.append(Event::config_change(mode.is_inline()));
        Ok(())
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Closes the detached tab, if any, as the host.
    pub fn close_tab(&mut self) {
        if let Some(tabs) = self.tabs.as_mut() {
            tabs.close();
        }
    }

    // ---- variable-set management ----

    pub async fn reload_variable_sets(&mut self) -> Result<usize, CoordinatorError> {
        let sets = self.store.list_variable_sets().await?;
        self.variable_sets = sets;
        if let Some(selected) = self.selected_set.clone() {
            if !self.variable_sets.contains_key(&selected) {
                self.forget_selected_set(&selected);
            }
        }
        Ok(self.variable_sets.len())
    }

    /// Creates (`id = None`) or updates a set through the store, then caches
    /// it. Editing the selected set refreshes the current variables without
    /// pushing them.
    pub async fn save_variable_set(
        &mut self,
        set_id: Option<&str>,
        variable_set: VariableSet,
    ) -> Result<StoredVariableSet, CoordinatorError> {
        let stored = self.store.create_or_update(set_id, variable_set).await?;
        self.variable_sets
            .insert(stored.id.clone(), stored.variable_set.clone());
        if self.selected_set.as_deref() == Some(stored.id.as_str()) {
            self.state
                .set_variables(Some(stored.variable_set.variables.clone()));
        }
        Ok(stored)
    }

    pub async fn delete_variable_set(&mut self, set_id: &str) -> Result<(), CoordinatorError> {
        self.store.delete_variable_set(set_id).await?;
        self.variable_sets.remove(set_id);
        if self.selected_set.as_deref() == Some(set_id) {
            self.forget_selected_set(set_id);
        }
        Ok(())
    }

    // ---- input loop ----

    /// Processes one inbound message or handshake tick. Returns `false` when
    /// nothing can arrive any more.
    pub async fn step(&mut self) -> bool {
        match self.next_input().await {
            Some(input) => {
                self.dispatch(input);
                true
            }
            None => false,
        }
    }

    /// Keeps processing inputs until `duration` has elapsed.
    pub async fn run_for(&mut self, duration: Duration) {
        let deadline = Instant::now() + duration;
        loop {
            match timeout_at(deadline, self.next_input()).await {
                Ok(Some(input)) => self.dispatch(input),
                Ok(None) | Err(_) => break,
            }
        }
    }

    /// Handles whatever is already queued on the transport without waiting.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Some(inbound) = self.transport.try_recv() {
            self.dispatch(Input::Transport(inbound));
            handled += 1;
        }
        handled
    }

    async fn next_input(&mut self) -> Option<Input> {
        let transport = &mut self.transport;
        let tabs = self.tabs.as_mut();
        tokio::select! {
            biased;
            inbound = transport.recv() => inbound.map(Input::Transport),
            generation = next_tick(tabs) => Some(Input::Tick(generation)),
        }
    }

    fn dispatch(&mut self, input: Input) {
        match input {
            Input::Transport(Inbound::Content(message)) => self.handle_content(message),
            Input::Transport(Inbound::Malformed(raw)) => {
                warn!(payload = %raw, "logging malformed inbound payload");
                self.notice(Notice::MalformedPayload(raw.to_string()));
                self.log.append(Event::malformed(raw));
            }
            Input::Transport(Inbound::TabReady(tab)) => {
                let Some(tabs) = self.tabs.as_mut() else {
                    debug!(?tab, "TAB_READY with no tab being tracked");
                    return;
                };
                if let Err(err) = tabs.on_tab_ready(tab) {
                    self.fail(err);
                }
            }
            Input::Transport(Inbound::TabClosed(tab)) => {
                if let Some(tabs) = self.tabs.as_mut() {
                    tabs.on_tab_closed(tab);
                }
            }
            Input::Tick(generation) => {
                let Some(tabs) = self.tabs.as_mut() else {
                    return;
                };
                if let Err(err) = tabs.on_tick(generation) {
                    self.fail(err);
                }
            }
        }
    }

    fn handle_content(&mut self, message: ContentMessage) {
        debug!(event = %message.event, "inbound content message");
        self.log.append(Event::inbound(&message));
        if let Some(email) = message.email() {
            self.state.set_known_email(Some(email.to_string()));
        }
        if message.is_ready() {
            let variables = self.state.get().current_variables.unwrap_or_default();
            if let Err(err) = self.push(variables) {
                self.fail(err);
            }
        }
    }

    // ---- inspection ----

    pub fn log(&self) -> Snapshot<'_> {
        self.log.snapshot()
    }

    pub fn state(&self) -> ActiveState {
        self.state.get()
    }

    pub fn state_store(&self) -> &ActiveStateStore {
        &self.state
    }

    pub fn pages(&self) -> &PageCatalog {
        &self.pages
    }

    pub fn variable_sets(&self) -> &BTreeMap<String, VariableSet> {
        &self.variable_sets
    }

    pub fn selected_variable_set(&self) -> Option<&str> {
        self.selected_set.as_deref()
    }

    pub fn transport_mode(&self) -> DisplayMode {
        self.transport.mode()
    }

    pub fn transport_subscribed(&self) -> bool {
        self.transport.is_subscribed()
    }

    pub fn tab_state(&self) -> TabState {
        self.tabs
            .as_ref()
            .map(TabLifecycleManager::state)
            .unwrap_or(TabState::Closed)
    }

    pub fn detached_available(&self) -> bool {
        !self.detached_disabled && self.env.broadcast.is_some()
    }

    pub fn drain_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock())
    }

    // ---- internals ----

    /// Sends the variables through the live transport and logs the push.
    fn push(&mut self, variables: Variables) -> Result<(), CoordinatorError> {
        let message = HostMessage::new(variables);
        self.transport.send(&message)?;
        let page = self
            .state
            .get()
            .selected_page_id
            .unwrap_or_else(|| UNKNOWN_PAGE.to_string());
        debug!(page = %page, mode = %self.transport.mode(), "pushed variables");
        self.log.append(Event::outbound(page, message.variables));
        Ok(())
    }

    fn content_loaded(&mut self) -> bool {
        match self.transport.mode() {
            DisplayMode::Inline => !self.env.frame.is_blank(),
            DisplayMode::Detached => match self.tabs.as_mut() {
                Some(tabs) => tabs.check_liveness() && tabs.state() == TabState::Ready,
                None => false,
            },
        }
    }

    fn switch_transport(&mut self, mode: DisplayMode) {
        self.transport.unsubscribe();
        if let Some(mut tabs) = self.tabs.take() {
            tabs.close();
        }
        self.env.frame.set_source(BLANK_PAGE);
        self.state.set_selected_page(None);

        let (transport, detached_sender) = connect(&self.env, &self.settings.channel_name, mode);
        self.transport = transport;
        self.detached_sender = detached_sender;
        self.state.set_display_mode(mode);
        info!(mode = %mode, "display mode switched");
    }

    fn ensure_tabs(&mut self) -> Result<&mut TabLifecycleManager, CoordinatorError> {
        let tabs = match self.tabs.take() {
            Some(tabs) => tabs,
            None => {
                let sender = self
                    .detached_sender
                    .clone()
                    .ok_or(CoordinatorError::TransportUnavailable)?;
                let mut tabs = TabLifecycleManager::new(
                    self.env.tabs.clone(),
                    sender,
                    self.settings.viewer_url.clone(),
                    self.settings.handshake,
                );
                let notices = Arc::clone(&self.notices);
                tabs.on_closed(move |reason| notices.lock().push(Notice::TabClosed(reason)));
                tabs
            }
        };
        Ok(self.tabs.insert(tabs))
    }

    fn forget_selected_set(&mut self, set_id: &str) {
        debug!(set = %set_id, "selected variable set is gone; clearing variables");
        self.selected_set = None;
        self.state.set_variables(None);
    }

    fn fail(&mut self, err: CoordinatorError) {
        warn!(error = %err, "coordinator action failed");
        let notice = match err {
            CoordinatorError::HandshakeTimeout { attempts } => Notice::HandshakeTimeout { attempts },
            CoordinatorError::MalformedPayload(detail) => Notice::MalformedPayload(detail),
            CoordinatorError::TransportUnavailable => {
                self.disable_detached();
                return;
            }
            other => Notice::Failed(other.to_string()),
        };
        self.notice(notice);
    }

    /// Detached mode stays off for the rest of the session.
    fn disable_detached(&mut self) {
        if !self.detached_disabled {
            warn!("disabling detached mode for this session");
            self.detached_disabled = true;
        }
        self.notice(Notice::TransportUnavailable);
    }

    fn notice(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}

fn connect(
    env: &HostEnvironment,
    channel_name: &str,
    mode: DisplayMode,
) -> (Box<dyn Transport>, Option<ChannelSender>) {
    match (mode, env.broadcast.as_ref()) {
        (DisplayMode::Detached, Some(hub)) => {
            let transport = DetachedTransport::new(hub, channel_name);
            let sender = transport.sender();
            (Box::new(transport), Some(sender))
        }
        _ => (
            Box::new(InlineTransport::new(env.frame.clone(), &env.window)),
            None,
        ),
    }
}

async fn next_tick(tabs: Option<&mut TabLifecycleManager>) -> u64 {
    match tabs {
        Some(tabs) => tabs.next_tick().await,
        None => std::future::pending().await,
    }
}
