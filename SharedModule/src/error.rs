//! # Sync Errors
//!
//! Error type shared by the wire layer and the client core.

use thiserror::Error;

/// Result alias used throughout the sync crates
pub type SyncResult<T> = Result<T, SyncError>;

/// Everything that can go wrong while decoding, routing or publishing scene state
#[derive(Error, Debug)]
pub enum SyncError {
    /// The whole message could not be understood
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// A component payload was present but was not a JSON object
    #[error("Malformed payload for component '{component}': {reason}")]
    MalformedComponent { component: String, reason: String },

    /// A field value could not be decoded into its declared type
    #[error("Invalid value for field '{field}': expected {expected}")]
    InvalidField { field: String, expected: &'static str },

    /// A local write used a value of the wrong type
    #[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Unknown object: {0}")]
    UnknownObject(String),

    #[error("Object {object_id} has no component '{component}'")]
    UnknownComponent { object_id: String, component: String },

    #[error("Component '{component}' has no field '{field}'")]
    UnknownField { component: String, field: String },

    #[error("Object already exists: {0}")]
    DuplicateObject(String),

    /// Every random suffix tried for a colliding id was also taken
    #[error("Could not find a free id for '{id}' after {attempts} attempts")]
    RenameExhausted { id: String, attempts: u32 },

    /// The transport refused an outgoing payload
    #[error("Publish failed for {object_id}: {reason}")]
    Publish { object_id: String, reason: String },

    /// The receiving side of the inbox has been dropped
    #[error("Inbox closed")]
    InboxClosed,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
