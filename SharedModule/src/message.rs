//! # Wire Envelope
//!
//! The JSON envelope every scene message travels in:
//!
//! ```text
//! { "object_id": "...", "action": "create" | "update" | "delete",
//!   "type": "object", "persist": true, "ttl": 30, "data": { ... } }
//! ```

use serde::{Serialize, Deserialize};
use serde_json::{Map, Value};

use crate::constants::wire;
use crate::error::{SyncError, SyncResult};

/// Stable identifier of a scene entity
pub type ObjectId = String;

/// What a message does to the addressed object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Update,
    Delete,
}

/// A single scene message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub object_id: ObjectId,

    pub action: Action,

    /// Message category ("object", "rig", ...)
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,

    /// Whether the object outlives the session; only meaningful on create
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persist: Option<bool>,

    /// Seconds to live for ephemeral objects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<f64>,

    /// Object state: `object_type`, transform keys and component sub-objects
    #[serde(default)]
    pub data: Map<String, Value>,
}

fn default_kind() -> String {
    wire::DEFAULT_KIND.to_string()
}

impl Envelope {
    /// Parse an envelope from raw payload text
    pub fn parse(raw: &str) -> SyncResult<Self> {
        let envelope: Envelope = serde_json::from_str(raw)
            .map_err(|e| SyncError::MalformedMessage(e.to_string()))?;

        if envelope.object_id.is_empty() {
            return Err(SyncError::MalformedMessage("empty object_id".to_string()));
        }

        Ok(envelope)
    }

    pub fn create(object_id: &str, kind: &str, persist: bool, data: Map<String, Value>) -> Self {
        Self {
            object_id: object_id.to_string(),
            action: Action::Create,
            kind: kind.to_string(),
            persist: Some(persist),
            ttl: None,
            data,
        }
    }

    pub fn update(object_id: &str, kind: &str, data: Map<String, Value>) -> Self {
        Self {
            object_id: object_id.to_string(),
            action: Action::Update,
            kind: kind.to_string(),
            persist: None,
            ttl: None,
            data,
        }
    }

    pub fn delete(object_id: &str, kind: &str) -> Self {
        Self {
            object_id: object_id.to_string(),
            action: Action::Delete,
            kind: kind.to_string(),
            persist: None,
            ttl: None,
            data: Map::new(),
        }
    }

    /// `data.object_type`, if present and a string
    pub fn object_type(&self) -> Option<&str> {
        self.data.get(wire::OBJECT_TYPE).and_then(Value::as_str)
    }

    /// Serialize to payload text
    pub fn to_json_string(&self) -> SyncResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
