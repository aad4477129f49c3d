//! # Scene Object
//!
//! A scene entity: stable id, immutable object type, persistence and
//! permission flags, the built-in transform, and the named component
//! controllers. Keys under `data` that name no known component are kept in
//! an extension bag and sent back out with every update, so fields this
//! client does not understand survive a round trip through it.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use log::{debug, trace, warn};

use scenesync_shared::constants::{component, wire};
use scenesync_shared::error::{SyncError, SyncResult};
use scenesync_shared::field::FieldValue;
use scenesync_shared::lifecycle::ObjectLifecycleState;
use scenesync_shared::message::ObjectId;
use scenesync_shared::types::{EulerAngles, Quat, Transform, Vector3};

use crate::component::{ComponentController, RemoteOutcome};
use crate::schema::{ComponentCatalog, SchemaModel};

/// Counts of what one remote `data` object did to an object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteSummary {
    pub applied: usize,
    pub echoed: usize,
    pub malformed: usize,
    pub rejected_fields: usize,
    pub added: usize,
    pub removed: usize,
    pub extensions: usize,
}

/// Outgoing create or update data, not yet confirmed by the transport
#[derive(Debug, Clone, PartialEq)]
pub struct PendingUpdate {
    pub data: Map<String, Value>,
    published: Vec<(String, String)>,
    removed: Vec<String>,
}

/// Scene entity
#[derive(Debug, Clone)]
pub struct SceneObject {
    id: ObjectId,
    object_type: String,
    kind: String,
    persist: bool,
    ttl: Option<f64>,
    state: ObjectLifecycleState,
    has_write_permission: bool,
    transform: ComponentController,
    components: BTreeMap<String, ComponentController>,
    removed_components: Vec<String>,
    extensions: Map<String, Value>,
}

impl SceneObject {
    pub fn new(id: &str, object_type: &str, kind: &str, persist: bool) -> Self {
        Self {
            id: id.to_string(),
            object_type: object_type.to_string(),
            kind: kind.to_string(),
            persist,
            ttl: None,
            state: ObjectLifecycleState::Active,
            has_write_permission: true,
            transform: ComponentController::transform(),
            components: BTreeMap::new(),
            removed_components: Vec::new(),
            extensions: Map::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    /// Envelope `type` of this object ("object", "rig", ...)
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn persist(&self) -> bool {
        self.persist
    }

    /// Remaining lifetime in seconds, for ephemeral objects
    pub fn ttl(&self) -> Option<f64> {
        self.ttl
    }

    pub fn state(&self) -> ObjectLifecycleState {
        self.state
    }

    pub fn has_write_permission(&self) -> bool {
        self.has_write_permission
    }

    pub fn extensions(&self) -> &Map<String, Value> {
        &self.extensions
    }

    pub(crate) fn set_state(&mut self, state: ObjectLifecycleState) {
        self.state = state;
    }

    pub(crate) fn set_ttl(&mut self, ttl: Option<f64>) {
        self.ttl = ttl.filter(|t| t.is_finite() && *t > 0.0);
    }

    pub(crate) fn set_write_permission(&mut self, allowed: bool) {
        if self.has_write_permission != allowed {
            debug!("Write permission for {} is now {}", self.id, allowed);
        }
        self.has_write_permission = allowed;
    }

    // --- transform ---

    pub fn transform_controller(&self) -> &ComponentController {
        &self.transform
    }

    pub fn position(&self) -> Vector3 {
        self.transform
            .schema()
            .get(wire::POSITION)
            .and_then(FieldValue::as_vector3)
            .unwrap_or_else(Vector3::zero)
    }

    pub fn rotation(&self) -> Quat {
        self.transform
            .schema()
            .get(wire::ROTATION)
            .and_then(FieldValue::as_quat)
            .unwrap_or_else(Quat::identity)
    }

    pub fn scale(&self) -> Vector3 {
        self.transform
            .schema()
            .get(wire::SCALE)
            .and_then(FieldValue::as_vector3)
            .unwrap_or_else(Vector3::one)
    }

    pub fn transform(&self) -> Transform {
        Transform::new(self.position(), self.rotation(), self.scale())
    }

    pub(crate) fn set_position(&mut self, position: Vector3, schedule_apply: bool) -> SyncResult<()> {
        self.transform.set_local(wire::POSITION, position, schedule_apply)
    }

    pub(crate) fn set_rotation(&mut self, rotation: Quat, schedule_apply: bool) -> SyncResult<()> {
        self.transform.set_local(wire::ROTATION, rotation, schedule_apply)
    }

    /// Euler input is converted here; only the quaternion is stored
    pub(crate) fn set_euler(&mut self, euler: EulerAngles, schedule_apply: bool) -> SyncResult<()> {
        self.set_rotation(euler.to_quat(), schedule_apply)
    }

    pub(crate) fn set_scale(&mut self, scale: Vector3, schedule_apply: bool) -> SyncResult<()> {
        self.transform.set_local(wire::SCALE, scale, schedule_apply)
    }

    // --- components ---

    pub fn component(&self, name: &str) -> Option<&ComponentController> {
        if name == component::TRANSFORM {
            return Some(&self.transform);
        }
        self.components.get(name)
    }

    pub fn has_component(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    /// Named components, excluding the transform
    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    /// The transform followed by every named component
    pub fn controllers(&self) -> impl Iterator<Item = &ComponentController> {
        std::iter::once(&self.transform).chain(self.components.values())
    }

    pub(crate) fn controllers_mut(&mut self) -> impl Iterator<Item = &mut ComponentController> {
        std::iter::once(&mut self.transform).chain(self.components.values_mut())
    }

    fn controller_mut(&mut self, name: &str) -> SyncResult<&mut ComponentController> {
        if name == component::TRANSFORM {
            return Ok(&mut self.transform);
        }
        let id = &self.id;
        self.components
            .get_mut(name)
            .ok_or_else(|| SyncError::UnknownComponent {
                object_id: id.clone(),
                component: name.to_string(),
            })
    }

    /// Attach a component locally. The new component is published at the
    /// next tick even if it only holds defaults.
    ///
    /// Returns false when the component was already attached.
    pub(crate) fn add_component(&mut self, name: &str, schema: SchemaModel, schedule_apply: bool) -> bool {
        if self.components.contains_key(name) {
            return false;
        }
        let mut controller = ComponentController::new(name, schema);
        controller.mark_dirty();
        if schedule_apply {
            controller.schedule_apply();
        }
        self.components.insert(name.to_string(), controller);
        self.removed_components.retain(|n| n != name);
        self.extensions.remove(name);
        true
    }

    /// Detach a component locally; `"<name>": null` goes out at the next tick
    pub(crate) fn remove_component(&mut self, name: &str) -> bool {
        if self.components.remove(name).is_none() {
            return false;
        }
        self.removed_components.push(name.to_string());
        true
    }

    pub(crate) fn set_field(
        &mut self,
        component: &str,
        field: &str,
        value: FieldValue,
        schedule_apply: bool,
    ) -> SyncResult<()> {
        self.controller_mut(component)?.set_local(field, value, schedule_apply)
    }

    pub(crate) fn set_field_json(
        &mut self,
        component: &str,
        field: &str,
        value: &Value,
        schedule_apply: bool,
    ) -> SyncResult<()> {
        self.controller_mut(component)?.set_local_json(field, value, schedule_apply)
    }

    // --- remote data ---

    /// Merge a remote `data` object into this object.
    ///
    /// Transform keys go to the transform controller as one token. Known
    /// component keys go to their controller, attaching the component first
    /// if needed. `null` detaches a component. Everything else is stored in
    /// the extension bag.
    pub(crate) fn apply_remote(&mut self, data: &Map<String, Value>, catalog: &ComponentCatalog) -> RemoteSummary {
        let mut summary = RemoteSummary::default();

        let transform_token: Map<String, Value> = wire::TRANSFORM_KEYS
            .iter()
            .filter_map(|key| data.get(*key).map(|v| (key.to_string(), v.clone())))
            .collect();
        if !transform_token.is_empty() {
            tally(&mut summary, self.transform.receive_remote(&Value::Object(transform_token)));
        }

        for (key, value) in data {
            if key == wire::OBJECT_TYPE || wire::TRANSFORM_KEYS.contains(&key.as_str()) {
                continue;
            }

            if value.is_null() {
                if self.components.remove(key).is_some() {
                    debug!("Component '{}' removed from {} by remote", key, self.id);
                    summary.removed += 1;
                } else if self.extensions.remove(key).is_some() {
                    summary.extensions += 1;
                }
                continue;
            }

            if !self.components.contains_key(key) {
                match catalog.instantiate(key) {
                    Some(schema) => {
                        trace!("Attaching component '{}' to {} from remote", key, self.id);
                        self.extensions.remove(key);
                        self.components
                            .insert(key.clone(), ComponentController::new(key, schema));
                        summary.added += 1;
                    }
                    None => {
                        self.extensions.insert(key.clone(), value.clone());
                        summary.extensions += 1;
                        continue;
                    }
                }
            }

            if let Some(controller) = self.components.get_mut(key) {
                tally(&mut summary, controller.receive_remote(value));
            }
        }

        summary
    }

    // --- outgoing ---

    /// Full sparse state for a `create` message. Nothing is marked as
    /// published until [`SceneObject::commit_create`] is called.
    pub(crate) fn create_data(&self) -> PendingUpdate {
        let mut data = self.extensions.clone();
        data.insert(wire::OBJECT_TYPE.to_string(), Value::String(self.object_type.clone()));
        let mut published = Vec::new();

        let transform_patch = self.transform.schema().serialize();
        published.push((
            component::TRANSFORM.to_string(),
            Value::Object(transform_patch.clone()).to_string(),
        ));
        data.extend(transform_patch);

        for (name, controller) in &self.components {
            let patch = Value::Object(controller.schema().serialize());
            published.push((name.clone(), patch.to_string()));
            data.insert(name.clone(), patch);
        }

        PendingUpdate {
            data,
            published,
            removed: Vec::new(),
        }
    }

    /// The create went out: every controller is clean and removals made
    /// before it are moot.
    pub(crate) fn commit_create(&mut self, create: PendingUpdate) {
        for (name, json) in create.published {
            if let Ok(controller) = self.controller_mut(&name) {
                controller.discard_dirty();
                controller.mark_published(json);
            }
        }
        self.removed_components.clear();
    }

    /// Collect the tick's outgoing update, if anything changed.
    ///
    /// Without write permission every patch is dropped and pending removals
    /// are forgotten.
    pub(crate) fn collect_update(&mut self, can_write: bool) -> Option<PendingUpdate> {
        let mut data = Map::new();
        let mut published = Vec::new();

        if let Some(out) = self.transform.take_patch(can_write) {
            data.extend(out.patch);
            published.push((component::TRANSFORM.to_string(), out.json));
        }

        for (name, controller) in self.components.iter_mut() {
            if let Some(out) = controller.take_patch(can_write) {
                data.insert(name.clone(), Value::Object(out.patch));
                published.push((name.clone(), out.json));
            }
        }

        let removed = std::mem::take(&mut self.removed_components);
        if !can_write {
            if !removed.is_empty() {
                debug!("No write permission, dropping {} removal(s) on {}", removed.len(), self.id);
            }
            return None;
        }
        for name in &removed {
            data.insert(name.clone(), Value::Null);
        }

        if data.is_empty() {
            return None;
        }

        for (key, value) in &self.extensions {
            if !data.contains_key(key) {
                data.insert(key.clone(), value.clone());
            }
        }

        Some(PendingUpdate { data, published, removed })
    }

    /// The transport accepted the update
    pub(crate) fn commit_update(&mut self, update: PendingUpdate) {
        for (name, json) in update.published {
            if let Ok(controller) = self.controller_mut(&name) {
                controller.mark_published(json);
            }
        }
    }

    /// The transport refused the update; retry it next tick
    pub(crate) fn rollback_update(&mut self, update: PendingUpdate) {
        for (name, _) in &update.published {
            if let Ok(controller) = self.controller_mut(name) {
                controller.restore_dirty();
            }
        }
        for name in update.removed {
            if !self.components.contains_key(&name) {
                self.removed_components.push(name);
            }
        }
    }

    /// Drop all pending publish and apply work
    pub(crate) fn discard_pending(&mut self) {
        for controller in self.controllers_mut() {
            controller.discard_pending();
        }
        self.removed_components.clear();
    }

    /// Count down the lifetime; true once it has run out
    pub(crate) fn advance_ttl(&mut self, dt: f64) -> bool {
        match self.ttl.as_mut() {
            Some(remaining) => {
                *remaining -= dt;
                *remaining <= 0.0
            }
            None => false,
        }
    }

    /// Reject a change of the immutable object type, keeping the original
    pub(crate) fn check_object_type(&self, incoming: Option<&str>) {
        if let Some(t) = incoming {
            if t != self.object_type {
                warn!(
                    "Ignoring object_type change on {} ('{}' -> '{}')",
                    self.id, self.object_type, t
                );
            }
        }
    }
}

fn tally(summary: &mut RemoteSummary, outcome: RemoteOutcome) {
    match outcome {
        RemoteOutcome::Applied(report) => {
            summary.applied += 1;
            summary.rejected_fields += report.rejected.len();
        }
        RemoteOutcome::Echo => summary.echoed += 1,
        RemoteOutcome::Malformed => summary.malformed += 1,
    }
}
