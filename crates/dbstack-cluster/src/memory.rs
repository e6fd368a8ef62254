//! In-memory [`KubeCommand`] implementation.
//!
//! Backs tests and dry-run wiring with a process-local object store that
//! mirrors the transport's observable behavior: apply upserts, get lists
//! or fetches, delete removes, patch merges. Every invocation is recorded
//! so callers can assert on traffic.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::ClusterError;
use crate::kubectl::KubeCommand;

#[derive(Debug, Default)]
struct MemoryStore {
    // resource → name → document
    objects: Mutex<HashMap<String, HashMap<String, Value>>>,
    // (pod, container) → log text
    logs: Mutex<HashMap<(String, String), String>>,
    calls: Mutex<Vec<String>>,
}

/// Shared in-memory transport; clones observe the same store.
#[derive(Debug, Default, Clone)]
pub struct MemoryKube {
    inner: Arc<MemoryStore>,
}

impl MemoryKube {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed one object under the given resource key.
    pub fn insert(&self, resource: &str, name: &str, doc: Value) {
        self.inner
            .objects
            .lock()
            .expect("poisoned")
            .entry(resource.to_owned())
            .or_default()
            .insert(name.to_owned(), doc);
    }

    /// Fetch one stored object back out, if present.
    pub fn stored(&self, resource: &str, name: &str) -> Option<Value> {
        self.inner
            .objects
            .lock()
            .expect("poisoned")
            .get(resource)
            .and_then(|objects| objects.get(name))
            .cloned()
    }

    /// Seed log output for one container.
    pub fn insert_logs(&self, pod: &str, container: &str, text: &str) {
        self.inner
            .logs
            .lock()
            .expect("poisoned")
            .insert((pod.to_owned(), container.to_owned()), text.to_owned());
    }

    /// Every transport invocation so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.inner.calls.lock().expect("poisoned").clone()
    }

    fn record(&self, call: String) {
        self.inner.calls.lock().expect("poisoned").push(call);
    }
}

/// Derive the resource key of a document from its kind and API group,
/// matching the gateway's resource argument convention.
fn resource_of(doc: &Value) -> Option<String> {
    let kind = doc.get("kind")?.as_str()?;
    let plural = format!("{}s", kind.to_lowercase());
    match doc.get("apiVersion")?.as_str()?.split_once('/') {
        Some((group, _)) => Some(format!("{plural}.{group}")),
        None => Some(plural),
    }
}

fn merge(target: &mut Value, patch: &Value) {
    if let (Some(target_map), Some(patch_map)) = (target.as_object_mut(), patch.as_object()) {
        for (key, value) in patch_map {
            match target_map.get_mut(key) {
                Some(existing) if existing.is_object() && value.is_object() => {
                    merge(existing, value);
                }
                _ => {
                    target_map.insert(key.clone(), value.clone());
                }
            }
        }
    }
}

#[async_trait]
impl KubeCommand for MemoryKube {
    async fn get(&self, resource: &str, name: &str) -> Result<Vec<u8>, ClusterError> {
        self.record(format!("get {resource} {name}"));
        let objects = self.inner.objects.lock().expect("poisoned");

        if name.is_empty() {
            let items: Vec<Value> = objects
                .get(resource)
                .map(|objects| objects.values().cloned().collect())
                .unwrap_or_default();
            let list = json!({
                "apiVersion": "v1",
                "kind": "List",
                "metadata": { "resourceVersion": "" },
                "items": items,
            });
            return Ok(serde_json::to_vec(&list).expect("list is serializable"));
        }

        let doc = objects
            .get(resource)
            .and_then(|objects| objects.get(name))
            .ok_or_else(|| ClusterError::not_found(resource, name))?;
        Ok(serde_json::to_vec(doc).expect("document is serializable"))
    }

    async fn apply(&self, doc: Vec<u8>) -> Result<(), ClusterError> {
        let mut doc: Value =
            serde_json::from_slice(&doc).map_err(ClusterError::encoding("decode applied document"))?;
        // the control plane owns status; a fresh object gets an empty one
        if doc.get("status").is_none_or(Value::is_null) {
            doc["status"] = json!({});
        }
        let resource = resource_of(&doc).ok_or_else(|| {
            ClusterError::InvalidParameter("document without kind or apiVersion".to_owned())
        })?;
        let name = doc["metadata"]["name"]
            .as_str()
            .unwrap_or_default()
            .to_owned();
        self.record(format!("apply {resource} {name}"));
        self.insert(&resource, &name, doc);
        Ok(())
    }

    async fn apply_url(&self, url: &str) -> Result<(), ClusterError> {
        self.record(format!("apply-url {url}"));
        Ok(())
    }

    async fn delete(&self, resource: &str, name: &str) -> Result<(), ClusterError> {
        self.record(format!("delete {resource} {name}"));
        let mut objects = self.inner.objects.lock().expect("poisoned");
        let removed = objects
            .get_mut(resource)
            .and_then(|objects| objects.remove(name));
        match removed {
            Some(_) => Ok(()),
            None => Err(ClusterError::not_found(resource, name)),
        }
    }

    async fn patch(&self, resource: &str, name: &str, patch: Vec<u8>) -> Result<(), ClusterError> {
        self.record(format!("patch {resource} {name}"));
        let patch: Value =
            serde_json::from_slice(&patch).map_err(ClusterError::encoding("decode patch"))?;
        let mut objects = self.inner.objects.lock().expect("poisoned");
        let doc = objects
            .get_mut(resource)
            .and_then(|objects| objects.get_mut(name))
            .ok_or_else(|| ClusterError::not_found(resource, name))?;
        merge(doc, &patch);
        Ok(())
    }

    async fn logs(&self, pod: &str, container: &str) -> Result<String, ClusterError> {
        self.record(format!("logs {pod} {container}"));
        Ok(self
            .inner
            .logs
            .lock()
            .expect("poisoned")
            .get(&(pod.to_owned(), container.to_owned()))
            .cloned()
            .unwrap_or_default())
    }
}
