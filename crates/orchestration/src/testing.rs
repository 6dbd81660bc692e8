//! In-memory fakes for the management API traits

use crate::context::{ManagementApi, ResourceManager};
use crate::error::{Error, Result};
use crate::types::{DeleteOutcome, ResourceKind, SaveReceipt};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Save(String),
    Delete(String),
}

/// First quoted value in the payload, or the whole payload
fn payload_id(payload: &str) -> String {
    if let Some(start) = payload.find("\":\"") {
        let rest = &payload[start + 3..];
        if let Some(end) = rest.find('"') {
            return rest[..end].to_string();
        }
    }
    payload.trim().to_string()
}

/// Upserts by id, records every call, fails on payloads containing a marker
pub struct FakeManager {
    kind: ResourceKind,
    resources: Mutex<BTreeSet<String>>,
    calls: Mutex<Vec<Call>>,
    fail_markers: Mutex<Vec<String>>,
    journal: Arc<Mutex<Vec<(ResourceKind, Call)>>>,
    latency: Duration,
}

impl FakeManager {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn resource_count(&self) -> usize {
        self.resources.lock().unwrap().len()
    }

    pub fn insert(&self, id: &str) {
        self.resources.lock().unwrap().insert(id.to_string());
    }

    pub fn fail_on(&self, marker: &str) {
        self.fail_markers.lock().unwrap().push(marker.to_string());
    }

    fn record(&self, call: Call, payload: &str) -> Result<String> {
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        self.calls.lock().unwrap().push(call.clone());
        self.journal.lock().unwrap().push((self.kind.clone(), call));
        if self
            .fail_markers
            .lock()
            .unwrap()
            .iter()
            .any(|m| payload.contains(m.as_str()))
        {
            return Err(Error::transport("HTTP 500 Internal Server Error", Some(500)));
        }
        Ok(payload_id(payload))
    }
}

impl ResourceManager for FakeManager {
    fn save(&self, payload: &str) -> Result<SaveReceipt> {
        let id = self.record(Call::Save(payload.to_string()), payload)?;
        let created = self.resources.lock().unwrap().insert(id.clone());
        Ok(if created {
            SaveReceipt::created(id)
        } else {
            SaveReceipt::updated(id)
        })
    }

    fn delete(&self, payload: &str) -> Result<DeleteOutcome> {
        let id = self.record(Call::Delete(payload.to_string()), payload)?;
        let removed = self.resources.lock().unwrap().remove(&id);
        Ok(if removed {
            DeleteOutcome::deleted(id)
        } else {
            DeleteOutcome::not_found(id)
        })
    }
}

/// Hands out one [`FakeManager`] per kind and keeps a global call journal
#[derive(Default)]
pub struct FakeApi {
    managers: Mutex<HashMap<ResourceKind, Arc<FakeManager>>>,
    journal: Arc<Mutex<Vec<(ResourceKind, Call)>>>,
    requested: AtomicUsize,
    latency: Duration,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_latency(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            latency,
            ..Self::default()
        })
    }

    /// The manager for `kind`, created on first use
    pub fn manager(&self, kind: &ResourceKind) -> Arc<FakeManager> {
        let mut managers = self.managers.lock().unwrap();
        Arc::clone(managers.entry(kind.clone()).or_insert_with(|| {
            Arc::new(FakeManager {
                kind: kind.clone(),
                resources: Mutex::new(BTreeSet::new()),
                calls: Mutex::new(Vec::new()),
                fail_markers: Mutex::new(Vec::new()),
                journal: Arc::clone(&self.journal),
                latency: self.latency,
            })
        }))
    }

    /// Number of times a command asked for a manager
    pub fn managers_requested(&self) -> usize {
        self.requested.load(Ordering::SeqCst)
    }

    /// Every call across all managers, in call order
    pub fn journal(&self) -> Vec<(ResourceKind, Call)> {
        self.journal.lock().unwrap().clone()
    }
}

impl ManagementApi for FakeApi {
    fn resource_manager(&self, kind: &ResourceKind) -> Result<Arc<dyn ResourceManager>> {
        self.requested.fetch_add(1, Ordering::SeqCst);
        Ok(self.manager(kind))
    }
}
