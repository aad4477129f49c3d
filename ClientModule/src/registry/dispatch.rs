//! # Message Dispatch
//!
//! Routing of incoming envelopes to objects. Nothing here returns an error:
//! every failure is logged and reported through [`MessageOutcome`].

use log::{debug, warn};

use scenesync_shared::lifecycle::ObjectLifecycleState;
use scenesync_shared::message::{Action, Envelope};

use crate::object::SceneObject;

use super::{detach_all, MessageOutcome, SceneRegistry};

impl SceneRegistry {
    /// Handle one raw payload from the transport, immediately.
    ///
    /// State changes take effect now. Render applies and any follow-up
    /// publishes wait for the next tick.
    pub fn handle_message(&mut self, raw: &str) -> MessageOutcome {
        match Envelope::parse(raw) {
            Ok(envelope) => self.handle_envelope(envelope),
            Err(e) => {
                warn!("Dropping message: {}", e);
                MessageOutcome::Malformed
            }
        }
    }

    /// Handle an already parsed envelope
    pub fn handle_envelope(&mut self, envelope: Envelope) -> MessageOutcome {
        match envelope.action {
            Action::Create => self.remote_create(envelope),
            Action::Update => self.remote_update(envelope),
            Action::Delete => self.remote_delete(envelope),
        }
    }

    fn remote_create(&mut self, envelope: Envelope) -> MessageOutcome {
        if let Some(object) = self.objects.get_mut(&envelope.object_id) {
            object.check_object_type(envelope.object_type());
            if object.state() == ObjectLifecycleState::PendingCreate {
                debug!("{} was created remotely first; publishing as updates", object.id());
                object.set_state(ObjectLifecycleState::Active);
            }
            if envelope.ttl.is_some() {
                object.set_ttl(envelope.ttl);
            }
            let summary = object.apply_remote(&envelope.data, &self.catalog);
            return MessageOutcome::Merged(summary);
        }

        let object_type = match envelope.object_type() {
            Some(t) => t.to_string(),
            None => {
                warn!("Create for {} has no object_type", envelope.object_id);
                String::new()
            }
        };

        let mut object = SceneObject::new(
            &envelope.object_id,
            &object_type,
            &envelope.kind,
            envelope.persist.unwrap_or(false),
        );
        object.set_ttl(envelope.ttl);
        let summary = object.apply_remote(&envelope.data, &self.catalog);

        debug!(
            "Created {} ({}) from remote with {} component(s)",
            envelope.object_id,
            object_type,
            object.component_names().count()
        );
        self.objects.insert(envelope.object_id, object);
        MessageOutcome::Created(summary)
    }

    fn remote_update(&mut self, envelope: Envelope) -> MessageOutcome {
        let Some(object) = self.objects.get_mut(&envelope.object_id) else {
            warn!("Update for unknown object {}", envelope.object_id);
            return MessageOutcome::UnknownObject;
        };

        object.check_object_type(envelope.object_type());
        let summary = object.apply_remote(&envelope.data, &self.catalog);
        if summary.rejected_fields > 0 || summary.malformed > 0 {
            warn!(
                "Update for {}: {} field(s) rejected, {} malformed component(s)",
                envelope.object_id, summary.rejected_fields, summary.malformed
            );
        }
        MessageOutcome::Updated(summary)
    }

    fn remote_delete(&mut self, envelope: Envelope) -> MessageOutcome {
        let Some(object) = self.objects.remove(&envelope.object_id) else {
            warn!("Delete for unknown object {}", envelope.object_id);
            return MessageOutcome::UnknownObject;
        };

        // Dropping the object drops its dirty and pending-apply work with it
        detach_all(&mut self.appliers, object.id());
        debug!("Deleted {} from remote", object.id());
        MessageOutcome::Deleted
    }
}
