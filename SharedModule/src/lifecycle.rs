//! # Lifecycle Types
//!
//! State enums for component controllers and scene objects.

use serde::{Serialize, Deserialize};

/// Observable state of a component controller.
///
/// The publishing and received-remote steps of the lifecycle only last for
/// one tick step or one dispatch call, so they are never observable here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentState {
    /// Nothing to publish or apply
    Clean,

    /// Local edits differ from the last published snapshot
    Dirty,

    /// Remote or local change waiting for the render applier
    ApplyPending,
}

/// The current state of a scene object in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectLifecycleState {
    /// Created locally, `create` not yet published
    PendingCreate,

    /// Known to the shared scene
    Active,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_resting_states_are_representable() {
        for state in [ComponentState::Clean, ComponentState::Dirty, ComponentState::ApplyPending] {
            let text = serde_json::to_string(&state).unwrap();
            assert_eq!(serde_json::from_str::<ComponentState>(&text).unwrap(), state);
        }
        assert!(serde_json::from_str::<ComponentState>("\"Publishing\"").is_err());
        assert!(serde_json::from_str::<ComponentState>("\"ReceivedRemote\"").is_err());
    }
}
