//! Wire contract between the host page, the content page, and the detached
//! page viewer. Field names and tags are part of the contract and must not change.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoordinatorError;

/// A bag of variables as pushed to the content page.
pub type Variables = Map<String, Value>;

/// Host → content: `{ "event": "message", "variables": {...} }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostMessage {
    pub event: String,
    pub variables: Variables,
}

impl HostMessage {
    pub const EVENT: &'static str = "message";

    pub fn new(variables: Variables) -> Self {
        Self {
            event: Self::EVENT.to_string(),
            variables,
        }
    }
}

/// Content → host telemetry. `READY` triggers the initial variable push;
/// anything else is logged verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentMessage {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Variables>,
}

impl ContentMessage {
    pub const READY: &'static str = "READY";

    pub fn ready() -> Self {
        Self {
            event: Self::READY.to_string(),
            page: None,
            variables: None,
        }
    }

    pub fn from_value(raw: &Value) -> Result<Self, CoordinatorError> {
        serde_json::from_value(raw.clone())
            .map_err(|e| CoordinatorError::MalformedPayload(e.to_string()))
    }

    pub fn is_ready(&self) -> bool {
        self.event == Self::READY
    }

    /// Non-empty `variables.email`, if the page reported one.
    pub fn email(&self) -> Option<&str> {
        self.variables
            .as_ref()?
            .get("email")?
            .as_str()
            .filter(|email| !email.is_empty())
    }
}

/// Control envelope shared by every party on the cross-tab channel.
///
/// `TAB_READY` and `TAB_CLOSED` name the tab they come from; the id is the one
/// the host put in the viewer URL. Viewers opened without one omit it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlEnvelope {
    TabReady {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tab: Option<u64>,
    },
    TabClosed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tab: Option<u64>,
    },
    SendMessage { message: HostMessage },
    LoadPage { url: String },
    CloseTab {},
    IframeMessage(Value),
}

impl ControlEnvelope {
    pub fn to_value(&self) -> Result<Value, CoordinatorError> {
        serde_json::to_value(self).map_err(|e| CoordinatorError::MalformedPayload(e.to_string()))
    }

    pub fn from_value(raw: &Value) -> Result<Self, CoordinatorError> {
        serde_json::from_value(raw.clone())
            .map_err(|e| CoordinatorError::MalformedPayload(e.to_string()))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ControlEnvelope::TabReady { .. } => "TAB_READY",
            ControlEnvelope::TabClosed { .. } => "TAB_CLOSED",
            ControlEnvelope::SendMessage { .. } => "SEND_MESSAGE",
            ControlEnvelope::LoadPage { .. } => "LOAD_PAGE",
            ControlEnvelope::CloseTab {} => "CLOSE_TAB",
            ControlEnvelope::IframeMessage(_) => "IFRAME_MESSAGE",
        }
    }
}
