#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};

use scenesync_client::{Publisher, RenderApplier, SceneObject, SyncError, SyncResult};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ---------------------------------------------------------------------------
// Publisher double
// ---------------------------------------------------------------------------

/// Records every payload; can be switched to refuse them
#[derive(Clone, Default)]
pub struct RecordingPublisher {
    sent: Arc<Mutex<Vec<(String, String)>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Raw payloads published so far, removing them from the record
    pub fn take_raw(&self) -> Vec<String> {
        self.sent.lock().unwrap().drain(..).map(|(_, payload)| payload).collect()
    }

    /// Parsed envelopes published so far, removing them from the record
    pub fn take(&self) -> Vec<Value> {
        self.take_raw()
            .iter()
            .map(|raw| serde_json::from_str(raw).unwrap())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl Publisher for RecordingPublisher {
    fn publish(&mut self, object_id: &str, payload: &str) -> SyncResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SyncError::Publish {
                object_id: object_id.to_string(),
                reason: "transport offline".to_string(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((object_id.to_string(), payload.to_string()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Render applier double
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct ApplierLog {
    pub applies: Vec<(String, String, Map<String, Value>)>,
    pub detaches: Vec<String>,
}

/// Counts applies and detaches; readiness can be toggled
#[derive(Clone)]
pub struct CountingApplier {
    log: Arc<Mutex<ApplierLog>>,
    ready: Arc<AtomicBool>,
}

impl CountingApplier {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(ApplierLog::default())),
            ready: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn apply_count(&self) -> usize {
        self.log.lock().unwrap().applies.len()
    }

    pub fn last_snapshot(&self) -> Option<Map<String, Value>> {
        self.log.lock().unwrap().applies.last().map(|(_, _, s)| s.clone())
    }

    pub fn detaches(&self) -> Vec<String> {
        self.log.lock().unwrap().detaches.clone()
    }
}

impl RenderApplier for CountingApplier {
    fn apply(&mut self, object_id: &str, component: &str, snapshot: &Map<String, Value>) {
        self.log
            .lock()
            .unwrap()
            .applies
            .push((object_id.to_string(), component.to_string(), snapshot.clone()));
    }

    fn is_ready(&self, _object_id: &str, _component: &str, _snapshot: &Map<String, Value>) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn detach(&mut self, object_id: &str) {
        self.log.lock().unwrap().detaches.push(object_id.to_string());
    }
}

// ---------------------------------------------------------------------------
// Permission double
// ---------------------------------------------------------------------------

/// Switchable write permission, shared with the registry
#[derive(Clone)]
pub struct PermissionSwitch(Arc<AtomicBool>);

impl PermissionSwitch {
    pub fn new(allowed: bool) -> Self {
        Self(Arc::new(AtomicBool::new(allowed)))
    }

    pub fn set(&self, allowed: bool) {
        self.0.store(allowed, Ordering::SeqCst);
    }

    pub fn provider(&self) -> impl Fn(&SceneObject) -> bool + 'static {
        let flag = self.0.clone();
        move |_: &SceneObject| flag.load(Ordering::SeqCst)
    }
}
