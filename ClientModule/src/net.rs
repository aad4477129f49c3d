//! # Network Seams
//!
//! Interfaces to the collaborators this crate does not implement: the
//! transport that carries outgoing payloads, and the authorization source
//! that decides whether this client may write an object.

use log::debug;

use scenesync_shared::error::SyncResult;

use crate::object::SceneObject;

/// Outgoing half of the pub/sub transport
pub trait Publisher {
    /// Hand one serialized envelope to the transport
    fn publish(&mut self, object_id: &str, payload: &str) -> SyncResult<()>;
}

impl<F> Publisher for F
where
    F: FnMut(&str, &str) -> SyncResult<()>,
{
    fn publish(&mut self, object_id: &str, payload: &str) -> SyncResult<()> {
        (*self)(object_id, payload)
    }
}

/// Publisher for offline sessions; logs and drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPublisher;

impl Publisher for NullPublisher {
    fn publish(&mut self, object_id: &str, payload: &str) -> SyncResult<()> {
        debug!("Dropping {} byte payload for {} (no transport)", payload.len(), object_id);
        Ok(())
    }
}

/// Write-permission source. Asked again for every object on every tick,
/// since permission can move mid-session (scene host transfer, ...).
pub trait PermissionProvider {
    fn can_write(&self, object: &SceneObject) -> bool;
}

impl<F> PermissionProvider for F
where
    F: Fn(&SceneObject) -> bool,
{
    fn can_write(&self, object: &SceneObject) -> bool {
        (*self)(object)
    }
}

/// Grants write permission on everything
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl PermissionProvider for AllowAll {
    fn can_write(&self, _object: &SceneObject) -> bool {
        true
    }
}

/// Denies write permission on everything (spectator sessions)
#[derive(Debug, Default, Clone, Copy)]
pub struct ReadOnly;

impl PermissionProvider for ReadOnly {
    fn can_write(&self, _object: &SceneObject) -> bool {
        false
    }
}
