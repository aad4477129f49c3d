//! # SharedModule
//!
//! Wire-level types for the scene sync protocol: the message envelope,
//! typed field values and their JSON encoding, spatial types, lifecycle
//! enums and the shared error type. Anything that reads or writes scene
//! messages depends on this crate.

// Export module structure
pub mod types;
pub mod field;
pub mod message;
pub mod constants;
pub mod lifecycle;
pub mod error;

// Re-export commonly used items for convenience
pub use types::*;
pub use field::{FieldType, FieldValue};
pub use message::{Action, Envelope, ObjectId};
pub use lifecycle::{ComponentState, ObjectLifecycleState};
pub use error::{SyncError, SyncResult};
