//! # Scene Registry
//!
//! One session's id → object map, plus the collaborators the session talks
//! to. Remote messages and local edits only change state and flags. Network
//! publishing and render application happen in [`SceneRegistry::tick`].

use std::collections::{BTreeMap, HashMap};

use rand::Rng;
use log::{debug, info, trace, warn};
use serde_json::Value;

use scenesync_shared::error::{SyncError, SyncResult};
use scenesync_shared::field::FieldValue;
use scenesync_shared::lifecycle::ObjectLifecycleState;
use scenesync_shared::message::{Envelope, ObjectId};
use scenesync_shared::types::{EulerAngles, Quat, Vector3};

use crate::component::RenderApplier;
use crate::config::{CollisionPolicy, SyncConfig};
use crate::net::{PermissionProvider, Publisher};
use crate::object::{RemoteSummary, SceneObject};
use crate::schema::{ComponentCatalog, SchemaModel};

pub mod dispatch;
pub mod inbox;

pub use inbox::{Inbox, InboxSender};

/// What [`SceneRegistry::handle_message`] did with one payload
#[derive(Debug, Clone, PartialEq)]
pub enum MessageOutcome {
    /// A new object was built from a remote create
    Created(RemoteSummary),
    /// A remote create named an existing object and was merged into it
    Merged(RemoteSummary),
    Updated(RemoteSummary),
    Deleted,
    /// Update or delete for an id this session does not know
    UnknownObject,
    /// Not a valid envelope; dropped
    Malformed,
}

/// Counters for one tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Inbox messages handled
    pub messages: usize,
    /// Envelopes accepted by the publisher
    pub published: usize,
    /// Envelopes the publisher refused; retried next tick
    pub publish_failures: usize,
    /// Render applies performed
    pub applied: usize,
    /// Applies held back by a readiness predicate
    pub deferred: usize,
    /// Objects removed because their TTL ran out
    pub expired: usize,
}

/// A published object's delete, waiting for the next tick
#[derive(Debug, Clone)]
struct PendingDelete {
    object_id: ObjectId,
    kind: String,
}

/// Scene state of one session
pub struct SceneRegistry {
    config: SyncConfig,
    catalog: ComponentCatalog,
    objects: BTreeMap<ObjectId, SceneObject>,
    pending_deletes: Vec<PendingDelete>,
    inbox: Inbox,
    publisher: Box<dyn Publisher>,
    permission: Box<dyn PermissionProvider>,
    appliers: HashMap<String, Box<dyn RenderApplier>>,
}

impl SceneRegistry {
    /// Start a session with its own inbox
    pub fn new(
        config: SyncConfig,
        publisher: impl Publisher + 'static,
        permission: impl PermissionProvider + 'static,
    ) -> Self {
        Self::with_inbox(config, Inbox::new(), publisher, permission)
    }

    /// Start a session around an inbox created beforehand, so two sessions
    /// can publish into each other
    pub fn with_inbox(
        config: SyncConfig,
        inbox: Inbox,
        publisher: impl Publisher + 'static,
        permission: impl PermissionProvider + 'static,
    ) -> Self {
        info!("Starting scene sync session");
        if let Err(e) = config.validate() {
            warn!("Session configuration is invalid: {}", e);
        }
        Self {
            config,
            catalog: ComponentCatalog::with_builtins(),
            objects: BTreeMap::new(),
            pending_deletes: Vec::new(),
            inbox,
            publisher: Box::new(publisher),
            permission: Box::new(permission),
            appliers: HashMap::new(),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ComponentCatalog {
        &self.catalog
    }

    /// Handle for transport callbacks to queue incoming payloads
    pub fn inbox_sender(&self) -> InboxSender {
        self.inbox.sender()
    }

    /// Add a component kind to this session's catalog
    pub fn register_component(&mut self, name: &str, schema: SchemaModel) -> bool {
        self.catalog.register(name, schema)
    }

    /// Install the render applier for one component kind (`"transform"`
    /// included). Replaces any earlier applier for that kind.
    pub fn register_applier(&mut self, component: &str, applier: impl RenderApplier + 'static) {
        debug!("Registered render applier for '{}'", component);
        self.appliers.insert(component.to_string(), Box::new(applier));
    }

    pub fn object(&self, id: &str) -> Option<&SceneObject> {
        self.objects.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.objects.contains_key(id)
    }

    pub fn objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.values()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn object_mut(&mut self, id: &str) -> SyncResult<&mut SceneObject> {
        self.objects
            .get_mut(id)
            .ok_or_else(|| SyncError::UnknownObject(id.to_string()))
    }

    // --- local API ---

    /// Create an object locally. The `create` goes out at the next tick.
    ///
    /// Returns the id actually used, which differs from `id` when the
    /// collision policy renamed it.
    pub fn create_object(&mut self, id: &str, object_type: &str, persist: bool) -> SyncResult<ObjectId> {
        if id.is_empty() {
            return Err(SyncError::InvalidField {
                field: "object_id".to_string(),
                expected: "a non-empty id",
            });
        }

        let id = if self.objects.contains_key(id) {
            match self.config.collision_policy {
                CollisionPolicy::Reuse => {
                    debug!("Reusing existing object {}", id);
                    return Ok(id.to_string());
                }
                CollisionPolicy::Reject => return Err(SyncError::DuplicateObject(id.to_string())),
                CollisionPolicy::Rename => self.free_id(id)?,
            }
        } else {
            id.to_string()
        };

        let mut object = SceneObject::new(&id, object_type, &self.config.default_object_kind, persist);
        object.set_state(ObjectLifecycleState::PendingCreate);
        self.objects.insert(id.clone(), object);

        debug!("Created local object {} ({})", id, object_type);
        Ok(id)
    }

    fn free_id(&self, id: &str) -> SyncResult<ObjectId> {
        if self.config.rename_suffix_range == 0 || self.config.max_rename_attempts == 0 {
            return Err(SyncError::Config(
                "rename_suffix_range and max_rename_attempts must be positive to rename".to_string(),
            ));
        }
        let mut rng = rand::thread_rng();
        for _ in 0..self.config.max_rename_attempts {
            let candidate = format!("{}-{}", id, rng.gen_range(0..self.config.rename_suffix_range));
            if !self.objects.contains_key(&candidate) {
                debug!("Object id {} is taken, renamed to {}", id, candidate);
                return Ok(candidate);
            }
        }
        Err(SyncError::RenameExhausted {
            id: id.to_string(),
            attempts: self.config.max_rename_attempts,
        })
    }

    /// Remove an object locally. If it was already published and this
    /// client may write it, a `delete` goes out at the next tick.
    pub fn remove_object(&mut self, id: &str) -> SyncResult<()> {
        let object = self
            .objects
            .remove(id)
            .ok_or_else(|| SyncError::UnknownObject(id.to_string()))?;

        if object.state() == ObjectLifecycleState::Active {
            if self.permission.can_write(&object) {
                self.pending_deletes.push(PendingDelete {
                    object_id: object.id().to_string(),
                    kind: object.kind().to_string(),
                });
            } else {
                debug!("No write permission, removing {} locally only", id);
            }
        }

        detach_all(&mut self.appliers, id);
        debug!("Removed local object {}", id);
        Ok(())
    }

    pub fn set_field(&mut self, id: &str, component: &str, field: &str, value: impl Into<FieldValue>) -> SyncResult<()> {
        let render = self.config.render_local_edits;
        self.object_mut(id)?.set_field(component, field, value.into(), render)
    }

    /// Like [`set_field`](Self::set_field), decoding the value from JSON
    pub fn set_field_json(&mut self, id: &str, component: &str, field: &str, value: &Value) -> SyncResult<()> {
        let render = self.config.render_local_edits;
        self.object_mut(id)?.set_field_json(component, field, value, render)
    }

    pub fn set_position(&mut self, id: &str, position: Vector3) -> SyncResult<()> {
        let render = self.config.render_local_edits;
        self.object_mut(id)?.set_position(position, render)
    }

    pub fn set_rotation(&mut self, id: &str, rotation: Quat) -> SyncResult<()> {
        let render = self.config.render_local_edits;
        self.object_mut(id)?.set_rotation(rotation, render)
    }

    /// Rotate by Euler angles in degrees; stored and sent as a quaternion
    pub fn set_euler(&mut self, id: &str, euler: EulerAngles) -> SyncResult<()> {
        let render = self.config.render_local_edits;
        self.object_mut(id)?.set_euler(euler, render)
    }

    pub fn set_scale(&mut self, id: &str, scale: Vector3) -> SyncResult<()> {
        let render = self.config.render_local_edits;
        self.object_mut(id)?.set_scale(scale, render)
    }

    /// Attach a catalog component. Returns false if it was already attached.
    pub fn add_component(&mut self, id: &str, component: &str) -> SyncResult<bool> {
        let schema = self
            .catalog
            .instantiate(component)
            .ok_or_else(|| SyncError::UnknownComponent {
                object_id: id.to_string(),
                component: component.to_string(),
            })?;
        let render = self.config.render_local_edits;

        Ok(self.object_mut(id)?.add_component(component, schema, render))
    }

    /// Give an object a lifetime in seconds of ticked time; `None` or a
    /// non-positive value makes it permanent
    pub fn set_ttl(&mut self, id: &str, ttl: Option<f64>) -> SyncResult<()> {
        self.object_mut(id)?.set_ttl(ttl);
        Ok(())
    }

    /// Detach a component. Returns false if it was not attached.
    pub fn remove_component(&mut self, id: &str, component: &str) -> SyncResult<bool> {
        Ok(self.object_mut(id)?.remove_component(component))
    }

    // --- tick ---

    /// Run one tick with no elapsed time
    pub fn tick(&mut self) -> TickReport {
        self.tick_elapsed(0.0)
    }

    /// Run one tick after `dt` seconds:
    ///
    /// 1. drain the inbox
    /// 2. expire objects whose TTL ran out
    /// 3. refresh write permission
    /// 4. publish deletes, creates and updates
    /// 5. run pending render applies
    pub fn tick_elapsed(&mut self, dt: f64) -> TickReport {
        let mut report = TickReport::default();

        for raw in self.inbox.drain(self.config.max_messages_per_tick) {
            self.handle_message(&raw);
            report.messages += 1;
        }

        report.expired = self.expire(dt);

        for object in self.objects.values_mut() {
            let allowed = self.permission.can_write(object);
            object.set_write_permission(allowed);
        }

        self.publish_pending(&mut report);
        self.apply_pending(&mut report);

        if report != TickReport::default() {
            trace!("Tick: {:?}", report);
        }
        report
    }

    fn expire(&mut self, dt: f64) -> usize {
        let expired: Vec<ObjectId> = self
            .objects
            .iter_mut()
            .filter_map(|(id, object)| object.advance_ttl(dt).then(|| id.clone()))
            .collect();

        for id in &expired {
            self.objects.remove(id);
            detach_all(&mut self.appliers, id);
            debug!("Object {} expired", id);
        }
        expired.len()
    }

    fn publish_pending(&mut self, report: &mut TickReport) {
        let deletes = std::mem::take(&mut self.pending_deletes);
        for delete in deletes {
            let envelope = Envelope::delete(&delete.object_id, &delete.kind);
            if self.send(&envelope) {
                report.published += 1;
            } else {
                report.publish_failures += 1;
                self.pending_deletes.push(delete);
            }
        }

        for object in self.objects.values_mut() {
            let can_write = object.has_write_permission();

            if object.state() == ObjectLifecycleState::PendingCreate {
                if !can_write {
                    trace!("Holding create for {} until write permission", object.id());
                    continue;
                }
                let create = object.create_data();
                let mut envelope =
                    Envelope::create(object.id(), object.kind(), object.persist(), create.data.clone());
                envelope.ttl = object.ttl();
                if send_envelope(self.publisher.as_mut(), &envelope) {
                    object.commit_create(create);
                    object.set_state(ObjectLifecycleState::Active);
                    report.published += 1;
                } else {
                    report.publish_failures += 1;
                }
                continue;
            }

            let Some(update) = object.collect_update(can_write) else {
                continue;
            };
            let envelope = Envelope::update(object.id(), object.kind(), update.data.clone());
            if send_envelope(self.publisher.as_mut(), &envelope) {
                object.commit_update(update);
                report.published += 1;
            } else {
                object.rollback_update(update);
                report.publish_failures += 1;
            }
        }
    }

    fn send(&mut self, envelope: &Envelope) -> bool {
        send_envelope(self.publisher.as_mut(), envelope)
    }

    fn apply_pending(&mut self, report: &mut TickReport) {
        for object in self.objects.values_mut() {
            let object_id = object.id().to_string();
            for controller in object.controllers_mut() {
                let Some(snapshot) = controller.pending_snapshot() else {
                    continue;
                };

                let Some(applier) = self.appliers.get_mut(controller.wire_name()) else {
                    trace!("No applier for '{}', dropping apply", controller.wire_name());
                    controller.complete_apply();
                    continue;
                };

                if !applier.is_ready(&object_id, controller.wire_name(), &snapshot) {
                    report.deferred += 1;
                    continue;
                }

                applier.apply(&object_id, controller.wire_name(), &snapshot);
                controller.complete_apply();
                report.applied += 1;
            }
        }
    }

    /// End the session: detach every object and drop all pending work,
    /// including unread inbox messages
    pub fn teardown(&mut self) {
        for id in self.objects.keys() {
            detach_all(&mut self.appliers, id);
        }
        let objects = self.objects.len();
        self.objects.clear();
        self.pending_deletes.clear();
        let dropped = self.inbox.clear();

        info!(
            "Scene sync session torn down ({} object(s), {} unread message(s))",
            objects, dropped
        );
    }
}

fn send_envelope(publisher: &mut dyn Publisher, envelope: &Envelope) -> bool {
    let payload = match envelope.to_json_string() {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Failed to serialize envelope for {}: {}", envelope.object_id, e);
            return false;
        }
    };

    match publisher.publish(&envelope.object_id, &payload) {
        Ok(()) => {
            trace!("Published {:?} for {}", envelope.action, envelope.object_id);
            true
        }
        Err(e) => {
            warn!("Publish failed for {}: {}", envelope.object_id, e);
            false
        }
    }
}

fn detach_all(appliers: &mut HashMap<String, Box<dyn RenderApplier>>, object_id: &str) {
    for applier in appliers.values_mut() {
        applier.detach(object_id);
    }
}
