//! # Shared Constants
//!
//! Wire keys and protocol defaults.

/// Keys inside an envelope's `data` object
pub mod wire {
    /// Immutable object type, set on create
    pub const OBJECT_TYPE: &str = "object_type";

    pub const POSITION: &str = "position";

    /// Quaternion only; Euler angles never go on the wire
    pub const ROTATION: &str = "rotation";

    pub const SCALE: &str = "scale";

    /// Transform keys, in output order
    pub const TRANSFORM_KEYS: [&str; 3] = [POSITION, ROTATION, SCALE];

    /// Envelope `type` used when a message omits it
    pub const DEFAULT_KIND: &str = "object";
}

/// Component naming
pub mod component {
    /// Name of the built-in transform component. Its fields are flattened
    /// into `data` rather than nested under this name.
    pub const TRANSFORM: &str = "transform";
}

/// Defaults for local collision handling
pub mod collision {
    /// Random suffix range used when renaming a colliding local create
    pub const DEFAULT_SUFFIX_RANGE: u32 = 10_000;

    /// Attempts before giving up on finding a free id
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;
}
