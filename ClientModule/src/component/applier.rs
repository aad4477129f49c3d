//! # Render Applier
//!
//! The presentation-side capability each component kind provides. The sync
//! core calls it once per tick for every controller with a pending apply.
//! Implementations must be idempotent and must not call back into the
//! registry.

use serde_json::{Map, Value};

/// Reflects a component's state in the concrete scene (mesh, light, ...)
pub trait RenderApplier {
    /// Apply the full current state of one component of one object
    fn apply(&mut self, object_id: &str, component: &str, snapshot: &Map<String, Value>);

    /// Readiness predicate for deferred application.
    ///
    /// Returning false leaves the apply pending; it is asked again next tick.
    /// Use this to hold a component back until e.g. its asset has loaded.
    fn is_ready(&self, object_id: &str, component: &str, snapshot: &Map<String, Value>) -> bool {
        let _ = (object_id, component, snapshot);
        true
    }

    /// The object is gone (deleted, expired or session torn down)
    fn detach(&mut self, object_id: &str) {
        let _ = object_id;
    }
}

impl<F> RenderApplier for F
where
    F: FnMut(&str, &str, &Map<String, Value>),
{
    fn apply(&mut self, object_id: &str, component: &str, snapshot: &Map<String, Value>) {
        (*self)(object_id, component, snapshot)
    }
}
