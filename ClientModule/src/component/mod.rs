//! # Component Controller
//!
//! Wraps one [`SchemaModel`] attached to one scene object and runs its
//! dirty/apply state machine:
//!
//! - local path: `Clean → Dirty → Publishing → Clean`
//! - remote path: `Clean → ReceivedRemote → ApplyPending → Clean`
//!
//! Setters and remote receipt only flip flags. Publishing and render
//! application happen when the registry ticks, so any number of edits
//! inside one tick cost one publish and one apply.

use serde_json::{Map, Value};
use log::{debug, trace, warn};

use scenesync_shared::constants::component;
use scenesync_shared::error::{SyncError, SyncResult};
use scenesync_shared::field::FieldValue;
use scenesync_shared::lifecycle::ComponentState;

use crate::schema::{catalog, ApplyReport, SchemaModel};

pub mod applier;

pub use applier::RenderApplier;

/// Result of feeding a remote payload to a controller
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteOutcome {
    /// Merged into the schema; a render apply is now pending
    Applied(ApplyReport),
    /// Identical to what this controller last published; ignored
    Echo,
    /// Payload was not a JSON object; nothing changed
    Malformed,
}

/// A patch ready to go on the wire, with its canonical text
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingPatch {
    pub patch: Map<String, Value>,
    pub json: String,
}

/// Per-component sync state
#[derive(Debug, Clone)]
pub struct ComponentController {
    wire_name: String,
    flattened: bool,
    schema: SchemaModel,
    last_published_json: Option<String>,
    dirty: bool,
    pending_apply: bool,
}

impl ComponentController {
    pub fn new(wire_name: &str, schema: SchemaModel) -> Self {
        Self {
            wire_name: wire_name.to_string(),
            flattened: false,
            schema,
            last_published_json: None,
            dirty: false,
            pending_apply: false,
        }
    }

    /// The built-in transform component, whose fields sit directly in `data`
    pub fn transform() -> Self {
        Self {
            flattened: true,
            ..Self::new(component::TRANSFORM, catalog::transform_schema())
        }
    }

    pub fn wire_name(&self) -> &str {
        &self.wire_name
    }

    /// True when the patch is merged into `data` rather than nested under the name
    pub fn is_flattened(&self) -> bool {
        self.flattened
    }

    pub fn schema(&self) -> &SchemaModel {
        &self.schema
    }

    pub fn last_published_json(&self) -> Option<&str> {
        self.last_published_json.as_deref()
    }

    pub fn state(&self) -> ComponentState {
        if self.dirty {
            ComponentState::Dirty
        } else if self.pending_apply {
            ComponentState::ApplyPending
        } else {
            ComponentState::Clean
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_apply_pending(&self) -> bool {
        self.pending_apply
    }

    /// Edit a field locally.
    ///
    /// Marks the controller dirty when the sparse output no longer matches
    /// the last published snapshot. `schedule_apply` also queues a render
    /// apply for the change.
    pub fn set_local(&mut self, field: &str, value: impl Into<FieldValue>, schedule_apply: bool) -> SyncResult<()> {
        let changed = self
            .schema
            .set_local(field, value)
            .map_err(|e| scope_error(e, &self.wire_name))?;
        self.after_local_edit(changed, schedule_apply);
        Ok(())
    }

    /// Edit a field locally from a JSON value
    pub fn set_local_json(&mut self, field: &str, value: &Value, schedule_apply: bool) -> SyncResult<()> {
        let changed = self
            .schema
            .set_local_json(field, value)
            .map_err(|e| scope_error(e, &self.wire_name))?;
        self.after_local_edit(changed, schedule_apply);
        Ok(())
    }

    fn after_local_edit(&mut self, changed: bool, schedule_apply: bool) {
        if !changed {
            return;
        }
        if schedule_apply {
            self.pending_apply = true;
        }
        if !self.dirty && self.last_published_json.as_deref() != Some(self.current_json().as_str()) {
            trace!("Component '{}' is dirty", self.wire_name);
            self.dirty = true;
        }
    }

    /// Force a publish at the next tick even without edits
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn schedule_apply(&mut self) {
        self.pending_apply = true;
    }

    /// Feed a remote payload for this component.
    ///
    /// A payload byte-identical to the last published snapshot is an echo and
    /// is dropped before it touches the schema.
    pub fn receive_remote(&mut self, payload: &Value) -> RemoteOutcome {
        let Some(token) = payload.as_object() else {
            warn!(
                "{}",
                SyncError::MalformedComponent {
                    component: self.wire_name.clone(),
                    reason: format!("expected an object, got {}", payload),
                }
            );
            return RemoteOutcome::Malformed;
        };

        let incoming = payload.to_string();
        if self.last_published_json.as_deref() == Some(incoming.as_str()) {
            trace!("Suppressed echo for component '{}'", self.wire_name);
            return RemoteOutcome::Echo;
        }

        let report = self.schema.apply_from_wire(token);

        // Unpublished local edits stay dirty and keep their old baseline
        if !self.dirty {
            self.last_published_json = Some(self.current_json());
        }
        self.pending_apply = true;

        debug!(
            "Component '{}' received {} field(s), {} rejected",
            self.wire_name,
            report.applied.len(),
            report.rejected.len()
        );
        RemoteOutcome::Applied(report)
    }

    /// Tick step: produce the outgoing patch, if any.
    ///
    /// Clears the dirty flag either way. Without write permission, or when
    /// the patch equals the last published one, nothing is returned.
    pub fn take_patch(&mut self, can_write: bool) -> Option<OutgoingPatch> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;

        if !can_write {
            debug!("No write permission, dropping patch for '{}'", self.wire_name);
            return None;
        }

        let patch = self.schema.serialize();
        let json = Value::Object(patch.clone()).to_string();
        if self.last_published_json.as_deref() == Some(json.as_str()) {
            return None;
        }

        Some(OutgoingPatch { patch, json })
    }

    /// Record a patch as delivered to the transport
    pub fn mark_published(&mut self, json: String) {
        self.last_published_json = Some(json);
    }

    /// Put the controller back to dirty after a failed publish
    pub fn restore_dirty(&mut self) {
        self.dirty = true;
    }

    /// Clear the dirty flag without producing a patch (full-state create)
    pub fn discard_dirty(&mut self) {
        self.dirty = false;
    }

    /// Snapshot to hand to the render applier, if an apply is pending
    pub fn pending_snapshot(&self) -> Option<Map<String, Value>> {
        self.pending_apply.then(|| self.schema.snapshot())
    }

    pub fn complete_apply(&mut self) {
        self.pending_apply = false;
    }

    /// Drop any pending publish or apply work
    pub fn discard_pending(&mut self) {
        self.dirty = false;
        self.pending_apply = false;
    }

    /// Canonical text of the current sparse form
    pub fn current_json(&self) -> String {
        Value::Object(self.schema.serialize()).to_string()
    }
}

fn scope_error(err: SyncError, component: &str) -> SyncError {
    match err {
        SyncError::UnknownField { field, .. } => SyncError::UnknownField {
            component: component.to_string(),
            field,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use scenesync_shared::field::FieldType;

    fn controller() -> ComponentController {
        let schema = SchemaModel::new()
            .with_field("color", FieldType::Color, FieldValue::Color("#ffffff".into()))
            .with_field("opacity", FieldType::Number, 1.0);
        ComponentController::new("material", schema)
    }

    #[test]
    fn starts_clean() {
        let c = controller();
        assert_eq!(c.state(), ComponentState::Clean);
        assert!(c.last_published_json().is_none());
    }

    #[test]
    fn edits_within_a_tick_collapse_to_one_patch() {
        let mut c = controller();
        c.set_local("opacity", 0.5, false).unwrap();
        c.set_local("opacity", 0.5, false).unwrap();
        c.set_local("color", FieldValue::Color("#ff0000".into()), false).unwrap();
        assert_eq!(c.state(), ComponentState::Dirty);

        let out = c.take_patch(true).unwrap();
        assert_eq!(out.patch, json!({"color": "#ff0000", "opacity": 0.5}).as_object().cloned().unwrap());
        c.mark_published(out.json);

        assert_eq!(c.state(), ComponentState::Clean);
        assert!(c.take_patch(true).is_none());
    }

    #[test]
    fn reverted_edit_publishes_nothing() {
        let mut c = controller();
        c.set_local("opacity", 0.5, false).unwrap();
        let out = c.take_patch(true).unwrap();
        c.mark_published(out.json);

        c.set_local("opacity", 0.7, false).unwrap();
        c.set_local("opacity", 0.5, false).unwrap();
        assert!(c.take_patch(true).is_none());
        assert_eq!(c.state(), ComponentState::Clean);
    }

    #[test]
    fn no_permission_discards_patch() {
        let mut c = controller();
        c.set_local("opacity", 0.5, false).unwrap();
        assert!(c.take_patch(false).is_none());
        assert_eq!(c.state(), ComponentState::Clean);
        assert!(c.last_published_json().is_none());
    }

    #[test]
    fn remote_patch_schedules_apply() {
        let mut c = controller();
        let outcome = c.receive_remote(&json!({"opacity": 0.25}));
        assert!(matches!(outcome, RemoteOutcome::Applied(_)));
        assert_eq!(c.state(), ComponentState::ApplyPending);

        let snap = c.pending_snapshot().unwrap();
        assert_eq!(snap.get("opacity"), Some(&json!(0.25)));
        c.complete_apply();
        assert_eq!(c.state(), ComponentState::Clean);
        assert!(c.pending_snapshot().is_none());
    }

    #[test]
    fn echo_is_suppressed() {
        let mut c = controller();
        c.set_local("opacity", 0.5, false).unwrap();
        let out = c.take_patch(true).unwrap();
        let echoed: Value = serde_json::from_str(&out.json).unwrap();
        c.mark_published(out.json);

        assert_eq!(c.receive_remote(&echoed), RemoteOutcome::Echo);
        assert_eq!(c.state(), ComponentState::Clean);
        assert!(c.schema().raw_token().is_none());
    }

    #[test]
    fn malformed_payload_changes_nothing() {
        let mut c = controller();
        assert_eq!(c.receive_remote(&json!("opacity=0.5")), RemoteOutcome::Malformed);
        assert_eq!(c.state(), ComponentState::Clean);
        assert_eq!(c.schema().get("opacity"), Some(&FieldValue::Number(1.0)));
    }

    #[test]
    fn remote_merge_keeps_pending_local_edit() {
        let mut c = controller();
        c.set_local("color", FieldValue::Color("#00ff00".into()), false).unwrap();
        c.receive_remote(&json!({"opacity": 0.5}));

        let out = c.take_patch(true).unwrap();
        assert_eq!(out.patch.get("color"), Some(&json!("#00ff00")));
        assert_eq!(out.patch.get("opacity"), Some(&json!(0.5)));
    }

    #[test]
    fn remote_state_is_not_republished() {
        let mut c = controller();
        c.receive_remote(&json!({"opacity": 0.5}));
        assert!(c.take_patch(true).is_none());
    }

    #[test]
    fn unknown_field_error_names_component() {
        let mut c = controller();
        let err = c.set_local("glow", 1.0, false).unwrap_err();
        assert!(matches!(err, SyncError::UnknownField { ref component, .. } if component == "material"));
    }

    #[test]
    fn transform_is_flattened() {
        let t = ComponentController::transform();
        assert!(t.is_flattened());
        assert_eq!(t.wire_name(), "transform");
        assert_eq!(t.schema().len(), 3);
    }

    #[test]
    fn local_edit_can_schedule_apply() {
        let mut c = controller();
        c.set_local("opacity", 0.5, true).unwrap();
        assert!(c.is_apply_pending());
        assert!(c.is_dirty());
    }
}
