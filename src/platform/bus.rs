//! In-process message buses: same-window `message` listeners and named
//! broadcast channels.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

type Subscriber = (u64, UnboundedSender<Value>);

#[derive(Default)]
struct WindowInner {
    next_id: u64,
    listeners: Vec<Subscriber>,
}

/// A window's `message` event target. Every registered listener gets every
/// posted message, in post order.
#[derive(Clone, Default)]
pub struct WindowBus {
    inner: Arc<Mutex<WindowInner>>,
}

impl WindowBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listen(&self) -> WindowListener {
        let (tx, rx) = unbounded_channel();
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.listeners.push((id, tx));
        WindowListener {
            id,
            bus: self.clone(),
            rx,
        }
    }

    /// Returns how many listeners received the message.
    pub fn post(&self, message: Value) -> usize {
        let mut inner = self.inner.lock();
        inner.listeners.retain(|(_, tx)| !tx.is_closed());
        inner
            .listeners
            .iter()
            .filter(|(_, tx)| tx.send(message.clone()).is_ok())
            .count()
    }

    pub fn listener_count(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.listeners.retain(|(_, tx)| !tx.is_closed());
        inner.listeners.len()
    }

    fn remove(&self, id: u64) {
        self.inner.lock().listeners.retain(|(lid, _)| *lid != id);
    }
}

/// Registered `message` listener. Dropping it deregisters the listener and
/// discards anything still queued.
pub struct WindowListener {
    id: u64,
    bus: WindowBus,
    rx: UnboundedReceiver<Value>,
}

impl WindowListener {
    pub async fn recv(&mut self) -> Option<Value> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Value> {
        self.rx.try_recv().ok()
    }
}

impl Drop for WindowListener {
    fn drop(&mut self) {
        self.bus.remove(self.id);
    }
}

#[derive(Default)]
struct HubInner {
    next_id: u64,
    channels: HashMap<String, Vec<Subscriber>>,
}

/// Registry of named broadcast channels for one origin. A message posted on
/// a channel reaches every other subscriber of the same name, never the sender.
#[derive(Clone, Default)]
pub struct ChannelHub {
    inner: Arc<Mutex<HubInner>>,
}

impl ChannelHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, name: &str) -> ChannelEndpoint {
        let (tx, rx) = unbounded_channel();
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner
            .channels
            .entry(name.to_string())
            .or_default()
            .push((id, tx));
        ChannelEndpoint {
            sender: ChannelSender {
                hub: self.clone(),
                name: Arc::from(name),
                id,
            },
            rx,
        }
    }

    pub fn subscriber_count(&self, name: &str) -> usize {
        let mut inner = self.inner.lock();
        match inner.channels.get_mut(name) {
            Some(subscribers) => {
                subscribers.retain(|(_, tx)| !tx.is_closed());
                subscribers.len()
            }
            None => 0,
        }
    }

    fn post(&self, name: &str, from: u64, message: Value) -> usize {
        let mut inner = self.inner.lock();
        let Some(subscribers) = inner.channels.get_mut(name) else {
            return 0;
        };
        subscribers.retain(|(_, tx)| !tx.is_closed());
        subscribers
            .iter()
            .filter(|(id, _)| *id != from)
            .filter(|(_, tx)| tx.send(message.clone()).is_ok())
            .count()
    }

    fn unsubscribe(&self, name: &str, id: u64) {
        let mut inner = self.inner.lock();
        if let Some(subscribers) = inner.channels.get_mut(name) {
            subscribers.retain(|(sid, _)| *sid != id);
            if subscribers.is_empty() {
                inner.channels.remove(name);
            }
        }
    }
}

/// Posting half of a channel subscription. Cheap to clone.
#[derive(Clone)]
pub struct ChannelSender {
    hub: ChannelHub,
    name: Arc<str>,
    id: u64,
}

impl ChannelSender {
    /// Returns how many peers received the message.
    pub fn post(&self, message: Value) -> usize {
        self.hub.post(&self.name, self.id, message)
    }

    pub fn channel_name(&self) -> &str {
        &self.name
    }
}

/// A live subscription. Dropping it unsubscribes.
pub struct ChannelEndpoint {
    sender: ChannelSender,
    rx: UnboundedReceiver<Value>,
}

impl ChannelEndpoint {
    pub fn sender(&self) -> ChannelSender {
        self.sender.clone()
    }

    pub fn post(&self, message: Value) -> usize {
        self.sender.post(message)
    }

    pub async fn recv(&mut self) -> Option<Value> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Value> {
        self.rx.try_recv().ok()
    }
}

impl Drop for ChannelEndpoint {
    fn drop(&mut self) {
        self.sender.hub.unsubscribe(&self.sender.name, self.sender.id);
    }
}
