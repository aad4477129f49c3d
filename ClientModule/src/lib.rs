//! # Scene Sync Client Module
//!
//! Client-side half of the scene sync protocol. Keeps a local scene graph
//! consistent with a shared multi-user scene published over a pub/sub
//! transport, sending only the properties that matter and never echoing a
//! remote change back.
//!
//! The system is organized into several sub-modules:
//! - `schema`: Typed component field sets and the component catalog
//! - `component`: Per-component dirty/apply state machine and render seam
//! - `object`: Scene entities and their component maps
//! - `registry`: The per-session object map, message dispatch and tick
//! - `net`: Transport and write-permission seams
//! - `config`: Session configuration

// Module declarations
pub mod schema;      // Component schemas
pub mod component;   // Component controllers
pub mod object;      // Scene entities
pub mod registry;    // Session state and tick
pub mod net;         // Transport seams
pub mod config;      // Session configuration

// Re-export commonly used items
pub use scenesync_shared::{
    Action, ComponentState, Envelope, EulerAngles, FieldType, FieldValue, ObjectId, ObjectLifecycleState, Quat,
    SyncError, SyncResult, Transform, Vector3,
};
pub use schema::{ComponentCatalog, SchemaModel};
pub use component::{ComponentController, RenderApplier};
pub use object::SceneObject;
pub use registry::{Inbox, InboxSender, MessageOutcome, SceneRegistry, TickReport};
pub use net::{AllowAll, NullPublisher, PermissionProvider, Publisher, ReadOnly};
pub use config::{CollisionPolicy, SyncConfig};
