// Copyright 2024 Gigi Team.
//
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chatify_store::{put, Backend, Contact, MemoryBackend, Message, StoreLayout};
use chatify_sync::{ChatClient, Identity, MessageStore, SyncConfig};
use tokio::sync::watch;

pub const TIMEOUT: Duration = Duration::from_secs(2);

pub fn alice() -> Identity {
    Identity::new("alice", "+100")
}

pub fn bob() -> Identity {
    Identity::new("bob", "+200")
}

/// Backend pre-populated with Alice's and Bob's profiles
pub async fn seeded_backend() -> MemoryBackend {
    let backend = MemoryBackend::new();
    let layout = StoreLayout::default();
    for (identity, name) in [(alice(), "Alice"), (bob(), "Bob")] {
        let contact = Contact::new(&identity.user_id, name, &identity.phone_number);
        put(&backend, &layout.user(&identity.user_id), &contact)
            .await
            .unwrap();
    }
    backend
}

pub fn client(backend: &MemoryBackend, identity: Identity) -> ChatClient {
    ChatClient::new(Arc::new(backend.clone()), identity, SyncConfig::default())
}

/// A client whose contact list has finished its first load
pub async fn started_client(backend: &MemoryBackend, identity: Identity) -> ChatClient {
    let client = client(backend, identity);
    client.start();
    let mut view = client.directory().watch();
    wait_for(&mut view, |v| v.me.is_some()).await;
    client
}

pub fn store(backend: &MemoryBackend, identity: Identity) -> MessageStore {
    MessageStore::new(Arc::new(backend.clone()), identity, StoreLayout::default())
}

pub async fn wait_for<T: Clone>(
    receiver: &mut watch::Receiver<T>,
    predicate: impl FnMut(&T) -> bool,
) -> T {
    tokio::time::timeout(TIMEOUT, receiver.wait_for(predicate))
        .await
        .expect("timed out waiting for state")
        .expect("state channel closed")
        .clone()
}

/// Poll `condition` until it holds
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + TIMEOUT;
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Decode `owner`'s copy of the conversation with `peer`
pub async fn conversation(backend: &MemoryBackend, owner: &str, peer: &str) -> Vec<Message> {
    let snapshot = backend
        .get(&StoreLayout::default().conversation(owner, peer))
        .await
        .unwrap();
    chatify_sync::messages_from_snapshot(&snapshot)
}
