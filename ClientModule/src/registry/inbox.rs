//! # Message Inbox
//!
//! Transport callbacks may fire on any thread. They push raw payloads through
//! an [`InboxSender`]; the registry drains the queue at the start of each
//! tick, in arrival order.

use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use log::{debug, trace};

use scenesync_shared::error::{SyncError, SyncResult};

use crate::net::Publisher;

/// Cloneable, thread-safe handle for feeding an inbox
#[derive(Debug, Clone)]
pub struct InboxSender {
    tx: UnboundedSender<String>,
}

impl InboxSender {
    /// Queue one raw payload for the next tick
    pub fn push(&self, raw: impl Into<String>) -> SyncResult<()> {
        self.tx.send(raw.into()).map_err(|_| SyncError::InboxClosed)
    }

    /// True once the owning registry is gone
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Loopback transport: publishing into another session's inbox
impl Publisher for InboxSender {
    fn publish(&mut self, object_id: &str, payload: &str) -> SyncResult<()> {
        trace!("Loopback delivery for {}", object_id);
        self.push(payload)
    }
}

/// Receiving end, owned by one registry
#[derive(Debug)]
pub struct Inbox {
    tx: UnboundedSender<String>,
    rx: UnboundedReceiver<String>,
}

impl Inbox {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    pub fn sender(&self) -> InboxSender {
        InboxSender { tx: self.tx.clone() }
    }

    /// Take queued payloads in arrival order, at most `limit` of them
    pub fn drain(&mut self, limit: Option<usize>) -> Vec<String> {
        let mut batch = Vec::new();
        while limit.map_or(true, |max| batch.len() < max) {
            match self.rx.try_recv() {
                Ok(raw) => batch.push(raw),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        if !batch.is_empty() {
            debug!("Drained {} message(s) from inbox", batch.len());
        }
        batch
    }

    /// Drop everything queued
    pub fn clear(&mut self) -> usize {
        let mut dropped = 0;
        while self.rx.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new()
    }
}
