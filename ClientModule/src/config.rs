//! # Session Configuration
//!
//! Tunables for one [`SceneRegistry`](crate::registry::SceneRegistry)
//! session. Every field has a default so partial JSON documents are fine.

use serde::{Serialize, Deserialize};

use scenesync_shared::constants::{collision, wire};
use scenesync_shared::error::{SyncError, SyncResult};

/// What a locally-initiated create does when its id is already taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Append a random numeric suffix until the id is free
    Rename,
    /// Hand back the existing object
    Reuse,
    /// Fail with `DuplicateObject`
    Reject,
}

impl Default for CollisionPolicy {
    fn default() -> Self {
        CollisionPolicy::Rename
    }
}

/// Per-session settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub collision_policy: CollisionPolicy,

    /// Suffixes are drawn from `0..rename_suffix_range`
    pub rename_suffix_range: u32,

    pub max_rename_attempts: u32,

    /// Local edits also schedule a render apply
    pub render_local_edits: bool,

    /// Envelope `type` for locally created objects
    pub default_object_kind: String,

    /// Cap on inbox messages drained per tick; `None` drains everything
    pub max_messages_per_tick: Option<usize>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            collision_policy: CollisionPolicy::default(),
            rename_suffix_range: collision::DEFAULT_SUFFIX_RANGE,
            max_rename_attempts: collision::DEFAULT_MAX_ATTEMPTS,
            render_local_edits: true,
            default_object_kind: wire::DEFAULT_KIND.to_string(),
            max_messages_per_tick: None,
        }
    }
}

impl SyncConfig {
    /// Parse and validate a JSON configuration document
    pub fn from_json_str(json: &str) -> SyncResult<Self> {
        let config: SyncConfig = serde_json::from_str(json)
            .map_err(|e| SyncError::Config(format!("Failed to parse configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SyncResult<()> {
        if self.collision_policy == CollisionPolicy::Rename {
            if self.rename_suffix_range == 0 {
                return Err(SyncError::Config("rename_suffix_range must be positive".to_string()));
            }
            if self.max_rename_attempts == 0 {
                return Err(SyncError::Config("max_rename_attempts must be positive".to_string()));
            }
        }
        if self.default_object_kind.is_empty() {
            return Err(SyncError::Config("default_object_kind must not be empty".to_string()));
        }
        if self.max_messages_per_tick == Some(0) {
            return Err(SyncError::Config("max_messages_per_tick must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = SyncConfig::from_json_str("{}").unwrap();
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.collision_policy, CollisionPolicy::Rename);
        assert_eq!(config.default_object_kind, "object");
    }

    #[test]
    fn partial_document() {
        let config =
            SyncConfig::from_json_str(r#"{"collision_policy": "reject", "max_messages_per_tick": 32}"#).unwrap();
        assert_eq!(config.collision_policy, CollisionPolicy::Reject);
        assert_eq!(config.max_messages_per_tick, Some(32));
        assert!(config.render_local_edits);
    }

    #[test]
    fn bad_documents_are_config_errors() {
        for doc in [
            "not json",
            r#"{"collision_policy": "overwrite"}"#,
            r#"{"rename_suffix_range": 0}"#,
            r#"{"max_messages_per_tick": 0}"#,
        ] {
            assert!(matches!(SyncConfig::from_json_str(doc), Err(SyncError::Config(_))), "{}", doc);
        }
    }
}
