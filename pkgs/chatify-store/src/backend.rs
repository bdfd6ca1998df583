//! Backend contract: a hierarchical key-value tree with snapshot subscriptions
//!
//! The sync layer never talks to a concrete database. Every component receives
//! an `Arc<dyn Backend>` and relies only on the four operations below:
//!
//! - **get**: single-shot read of a subtree
//! - **set**: atomic write of a single key (`Value::Null` deletes)
//! - **query_equal**: children whose named field equals a value
//! - **subscribe**: live subscription delivering the *full* subtree on every change
//!
//! There are no transactions and no multi-key atomicity.

use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::Stream;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::BackendError;
use crate::path::DbPath;

/// Item delivered by a [`Subscription`]
pub type SnapshotResult = Result<Snapshot, BackendError>;

/// Immutable view of a subtree at one point in time
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    path: DbPath,
    value: Option<Value>,
}

impl Snapshot {
    pub fn new(path: DbPath, value: Option<Value>) -> Self {
        Self { path, value }
    }

    pub fn empty(path: DbPath) -> Self {
        Self { path, value: None }
    }

    pub fn path(&self) -> &DbPath {
        &self.path
    }

    pub fn key(&self) -> Option<&str> {
        self.path.key()
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn exists(&self) -> bool {
        self.value.is_some()
    }

    /// Direct children in ascending key order
    pub fn children(&self) -> Vec<Snapshot> {
        let Some(Value::Object(map)) = &self.value else {
            return Vec::new();
        };
        let mut keys: Vec<&String> = map.keys().collect();
        keys.sort();
        keys.into_iter()
            .map(|key| Snapshot::new(self.path.child(key), map.get(key).cloned()))
            .collect()
    }

    /// Decode the whole value; an absent value decodes to `None`
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Option<T>, BackendError> {
        match &self.value {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    /// Decode every child, keyed by its child key
    ///
    /// Children that do not decode are skipped, the same way a missing or
    /// malformed record is simply absent from a listing.
    pub fn decode_children<T: DeserializeOwned>(&self) -> Vec<(String, T)> {
        self.children()
            .into_iter()
            .filter_map(|child| {
                let key = child.key()?.to_string();
                match child.decode::<T>() {
                    Ok(Some(item)) => Some((key, item)),
                    Ok(None) => None,
                    Err(e) => {
                        debug!("Skipping undecodable child {}: {}", child.path(), e);
                        None
                    }
                }
            })
            .collect()
    }
}

/// Live subscription to one location
///
/// Yields the current snapshot first, then one full snapshot per change. A
/// backend-side cancellation is delivered as `Err` and ends the stream.
/// Dropping the subscription unregisters it from the backend.
pub struct Subscription {
    path: DbPath,
    receiver: mpsc::UnboundedReceiver<SnapshotResult>,
    on_drop: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(
        path: DbPath,
        receiver: mpsc::UnboundedReceiver<SnapshotResult>,
        on_drop: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            path,
            receiver,
            on_drop: Some(Box::new(on_drop)),
        }
    }

    /// A subscription that reports `error` once and ends
    pub fn failed(path: DbPath, error: BackendError) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let _ = sender.send(Err(error));
        Self {
            path,
            receiver,
            on_drop: None,
        }
    }

    pub fn path(&self) -> &DbPath {
        &self.path
    }

    /// Wait for the next snapshot; `None` once the stream has ended
    pub async fn next(&mut self) -> Option<SnapshotResult> {
        self.receiver.recv().await
    }

    /// Tear the subscription down
    pub fn cancel(self) {
        drop(self);
    }
}

impl Stream for Subscription {
    type Item = SnapshotResult;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(on_drop) = self.on_drop.take() {
            on_drop();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Storage substituted under the sync layer
#[async_trait]
pub trait Backend: Send + Sync {
    /// Single-shot read
    async fn get(&self, path: &DbPath) -> Result<Snapshot, BackendError>;

    /// Atomic single-key write; `Value::Null` removes the key
    async fn set(&self, path: &DbPath, value: Value) -> Result<(), BackendError>;

    /// Children of `path` whose `field` equals `value`
    async fn query_equal(
        &self,
        path: &DbPath,
        field: &str,
        value: &Value,
    ) -> Result<Snapshot, BackendError>;

    /// Persistent change subscription returning full subtree snapshots
    fn subscribe(&self, path: &DbPath) -> Subscription;
}

/// Serialize `value` and write it at `path`
pub async fn put<T: Serialize + Sync + ?Sized>(
    backend: &dyn Backend,
    path: &DbPath,
    value: &T,
) -> Result<(), BackendError> {
    let value = serde_json::to_value(value)?;
    backend.set(path, value).await
}
