//! In-memory reference backend
//!
//! Holds the whole tree as a single `serde_json::Value` behind a mutex and
//! fans change notifications out to registered listeners over unbounded
//! channels. Listeners are consumed on whatever task owns the
//! [`Subscription`], which plays the role of the background notification
//! thread.
//!
//! Besides the [`Backend`] contract it offers hooks for exercising failure
//! paths: permission-denied writes under a prefix and backend-initiated
//! subscription cancellation.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::backend::{Backend, Snapshot, SnapshotResult, Subscription};
use crate::error::BackendError;
use crate::path::DbPath;

struct Listener {
    id: u64,
    path: DbPath,
    last: Option<Value>,
    sender: mpsc::UnboundedSender<SnapshotResult>,
}

#[derive(Default)]
struct MemoryState {
    root: Value,
    listeners: Vec<Listener>,
    next_listener_id: u64,
    denied_prefixes: Vec<DbPath>,
}

impl MemoryState {
    fn notify(&mut self, changed: &DbPath) {
        let root = &self.root;
        self.listeners.retain_mut(|listener| {
            if !listener.path.overlaps(changed) {
                return true;
            }
            let current = read_at(root, listener.path.segments());
            if current == listener.last {
                return true;
            }
            listener.last = current.clone();
            listener
                .sender
                .send(Ok(Snapshot::new(listener.path.clone(), current)))
                .is_ok()
        });
    }
}

/// Shared in-memory tree; clones refer to the same data
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every write at or below `prefix`
    pub fn deny_writes(&self, prefix: impl Into<DbPath>) {
        let prefix = prefix.into();
        info!("Denying writes under {}", prefix);
        self.state.lock().denied_prefixes.push(prefix);
    }

    pub fn allow_all_writes(&self) {
        self.state.lock().denied_prefixes.clear();
    }

    /// Cancel every subscription at or below `prefix`, as a backend does when
    /// access to a location is revoked
    pub fn cancel_subscriptions(&self, prefix: impl Into<DbPath>, reason: &str) -> usize {
        let prefix = prefix.into();
        let mut state = self.state.lock();
        let before = state.listeners.len();
        state.listeners.retain(|listener| {
            if !prefix.contains(&listener.path) {
                return true;
            }
            let _ = listener.sender.send(Err(BackendError::Cancelled {
                path: listener.path.to_string(),
                reason: reason.to_string(),
            }));
            false
        });
        let cancelled = before - state.listeners.len();
        info!("Cancelled {} subscriptions under {}", cancelled, prefix);
        cancelled
    }

    /// Number of live listeners
    pub fn listener_count(&self) -> usize {
        self.state.lock().listeners.len()
    }

    /// Synchronous read, handy in tests
    pub fn value_at(&self, path: impl Into<DbPath>) -> Option<Value> {
        let path = path.into();
        read_at(&self.state.lock().root, path.segments())
    }

    fn unregister(state: &Weak<Mutex<MemoryState>>, id: u64) {
        if let Some(state) = state.upgrade() {
            state.lock().listeners.retain(|listener| listener.id != id);
        }
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn get(&self, path: &DbPath) -> Result<Snapshot, BackendError> {
        path.validate()?;
        let value = read_at(&self.state.lock().root, path.segments());
        Ok(Snapshot::new(path.clone(), value))
    }

    async fn set(&self, path: &DbPath, value: Value) -> Result<(), BackendError> {
        path.validate()?;
        let mut state = self.state.lock();
        if state.denied_prefixes.iter().any(|p| p.contains(path)) {
            return Err(BackendError::PermissionDenied(path.to_string()));
        }

        write_at(&mut state.root, path.segments(), normalize(value));
        debug!("Wrote {}", path);
        state.notify(path);
        Ok(())
    }

    async fn query_equal(
        &self,
        path: &DbPath,
        field: &str,
        value: &Value,
    ) -> Result<Snapshot, BackendError> {
        path.validate()?;
        let state = self.state.lock();
        let matches: Map<String, Value> = match read_at(&state.root, path.segments()) {
            Some(Value::Object(children)) => children
                .into_iter()
                .filter(|(_, child)| child.get(field) == Some(value))
                .collect(),
            _ => Map::new(),
        };

        let result = if matches.is_empty() {
            None
        } else {
            Some(Value::Object(matches))
        };
        Ok(Snapshot::new(path.clone(), result))
    }

    fn subscribe(&self, path: &DbPath) -> Subscription {
        if let Err(e) = path.validate() {
            return Subscription::failed(path.clone(), e);
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let mut state = self.state.lock();
        let id = state.next_listener_id;
        state.next_listener_id += 1;

        let current = read_at(&state.root, path.segments());
        let _ = sender.send(Ok(Snapshot::new(path.clone(), current.clone())));
        state.listeners.push(Listener {
            id,
            path: path.clone(),
            last: current,
            sender,
        });
        debug!("Subscribed listener {} to {}", id, path);

        let weak = Arc::downgrade(&self.state);
        Subscription::new(path.clone(), receiver, move || {
            MemoryBackend::unregister(&weak, id)
        })
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Drop nulls and empty objects, which the tree never stores
fn normalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let map: Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, normalize(v)))
                .filter(|(_, v)| !is_empty(v))
                .collect();
            if map.is_empty() {
                Value::Null
            } else {
                Value::Object(map)
            }
        }
        other => other,
    }
}

fn read_at(node: &Value, segments: &[String]) -> Option<Value> {
    let mut current = node;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    if is_empty(current) {
        None
    } else {
        Some(current.clone())
    }
}

fn write_at(node: &mut Value, segments: &[String], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value;
        return;
    };

    if !node.is_object() {
        if value.is_null() {
            return;
        }
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        let child = map.entry(head.clone()).or_insert(Value::Null);
        write_at(child, rest, value);
        if is_empty(child) {
            map.remove(head);
        }
    }
}
