//! Append-only transcript of every exchange with the content page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::protocol::{ContentMessage, HostMessage, Variables};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Ready,
    Generic,
    ConfigChange,
    Message,
}

impl EventKind {
    pub fn from_event_name(name: &str) -> Self {
        match name {
            ContentMessage::READY => EventKind::Ready,
            HostMessage::EVENT => EventKind::Message,
            Event::CONFIG_CHANGE => EventKind::ConfigChange,
            _ => EventKind::Generic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// One log entry. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    /// Event name exactly as sent or received.
    pub name: String,
    pub direction: Direction,
    pub page_id: Option<String>,
    pub variables: Option<Variables>,
    /// Original payload, kept only for messages that failed to parse.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub const CONFIG_CHANGE: &'static str = "CONFIG_CHANGE";
    pub const MALFORMED: &'static str = "MALFORMED";

    pub fn inbound(message: &ContentMessage) -> Self {
        Self {
            kind: EventKind::from_event_name(&message.event),
            name: message.event.clone(),
            direction: Direction::Inbound,
            page_id: message.page.clone(),
            variables: message.variables.clone(),
            raw: None,
            timestamp: Utc::now(),
        }
    }

    pub fn outbound(page_id: impl Into<String>, variables: Variables) -> Self {
        Self {
            kind: EventKind::Message,
            name: HostMessage::EVENT.to_string(),
            direction: Direction::Outbound,
            page_id: Some(page_id.into()),
            variables: Some(variables),
            raw: None,
            timestamp: Utc::now(),
        }
    }

    pub fn config_change(display_inline: bool) -> Self {
        let mut variables = Variables::new();
        variables.insert("displayInline".to_string(), json!(display_inline));
        Self {
            kind: EventKind::ConfigChange,
            name: Self::CONFIG_CHANGE.to_string(),
            direction: Direction::Inbound,
            page_id: None,
            variables: Some(variables),
            raw: None,
            timestamp: Utc::now(),
        }
    }

    pub fn malformed(raw: Value) -> Self {
        Self {
            kind: EventKind::Generic,
            name: Self::MALFORMED.to_string(),
            direction: Direction::Inbound,
            page_id: None,
            variables: None,
            raw: Some(raw),
            timestamp: Utc::now(),
        }
    }
}

/// Ordered, append-only event log. Only [`EventLog::clear`] removes entries.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    entries: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, event: Event) {
        self.entries.push(event);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Borrowed view in insertion order. The view is `Copy`, so it can be
    /// iterated as many times as needed.
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            entries: &self.entries,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    entries: &'a [Event],
}

impl<'a> Snapshot<'a> {
    pub fn iter(&self) -> std::slice::Iter<'a, Event> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&'a Event> {
        self.entries.last()
    }

    pub fn to_vec(&self) -> Vec<Event> {
        self.entries.to_vec()
    }
}

impl<'a> IntoIterator for Snapshot<'a> {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
