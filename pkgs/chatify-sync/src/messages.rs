//! Message store adapter - per-pair message logs and delivery status
//!
//! Every message is written twice with the same key:
//!
//! - `messages/{receiver}/{sender}/{key}`: the receiver's inbound copy
//! - `messages/{sender}/{receiver}/{key}`: the sender's own copy
//!
//! A self-chat collapses to the single sender copy. Status transitions read
//! the caller's inbound copy and write the new status into both copies, so
//! the sender sees delivery and view receipts and the receiver's unseen count
//! drops. Writes are fire-and-forget: failures are logged and dropped.
//!
//! Sweeps of one store run one at a time, so a delivered sweep can never
//! overwrite the result of a concurrent viewed sweep.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use chatify_store::{
    put, Backend, DbPath, Message, MessageStatus, PushKeyGenerator, Snapshot, StoreLayout,
    Subscription,
};
use futures::{Stream, StreamExt};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::identity::Identity;

/// Message store adapter for the signed-in user
pub struct MessageStore {
    backend: Arc<dyn Backend>,
    identity: Identity,
    layout: StoreLayout,
    keys: PushKeyGenerator,
    /// Held for a whole status sweep so two sweeps never interleave their
    /// read and write phases
    sweep: Mutex<()>,
}

impl MessageStore {
    pub fn new(backend: Arc<dyn Backend>, identity: Identity, layout: StoreLayout) -> Self {
        Self {
            backend,
            identity,
            layout,
            keys: PushKeyGenerator::new(),
            sweep: Mutex::new(()),
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Append a message to both participants' logs
    ///
    /// Returns the locally constructed message immediately; the caller gets
    /// no acknowledgement beyond that.
    pub async fn send(&self, receiver_id: &str, receiver_phone: &str, body: &str) -> Message {
        let timestamp = chrono::Utc::now().timestamp_millis();
        let message = Message {
            id: self.keys.generate_at(timestamp),
            sender_id: self.identity.user_id.clone(),
            receiver_id: receiver_id.to_string(),
            sender_phone: self.identity.phone_number.clone(),
            receiver_phone: receiver_phone.to_string(),
            body: body.to_string(),
            status: MessageStatus::Sent,
            timestamp,
        };

        let me = self.identity.user_id.as_str();
        if receiver_id != me {
            let inbound = self.layout.message(receiver_id, me, &message.id);
            self.write_logged(&inbound, &message).await;
        }
        let outbound = self.layout.message(me, receiver_id, &message.id);
        self.write_logged(&outbound, &message).await;

        debug!("Sent message {} to {}", message.id, receiver_id);
        message
    }

    /// Advance every `SENT` message from `peer_id` to `DELIVERED`
    ///
    /// Returns the number of messages advanced.
    pub async fn mark_delivered(&self, peer_id: &str) -> usize {
        debug!("Marking messages as delivered for {}", peer_id);
        self.advance_inbound(peer_id, MessageStatus::on_delivered)
            .await
    }

    /// Stamp every message from `peer_id` as `VIEWED`
    ///
    /// Messages still at `SENT` skip `DELIVERED`. Messages already viewed are
    /// left alone.
    pub async fn mark_viewed(&self, peer_id: &str) -> usize {
        debug!("Marking messages as viewed for {}", peer_id);
        self.advance_inbound(peer_id, MessageStatus::on_viewed).await
    }

    /// Live view of the conversation with `peer_id`, sorted oldest first
    pub fn subscribe(&self, peer_id: &str) -> ThreadSubscription {
        let path = self.layout.conversation(&self.identity.user_id, peer_id);
        ThreadSubscription::new(self.backend.subscribe(&path))
    }

    /// One-shot read of the conversation with `peer_id`, sorted oldest first
    pub async fn load(&self, peer_id: &str) -> Vec<Message> {
        let path = self.layout.conversation(&self.identity.user_id, peer_id);
        match self.backend.get(&path).await {
            Ok(snapshot) => messages_from_snapshot(&snapshot),
            Err(e) => {
                debug!("Failed to read conversation {}: {}", path, e);
                Vec::new()
            }
        }
    }

    async fn advance_inbound(
        &self,
        peer_id: &str,
        transition: fn(MessageStatus) -> Option<MessageStatus>,
    ) -> usize {
        let _sweep = self.sweep.lock().await;
        let me = self.identity.user_id.as_str();
        let inbound = match self
            .backend
            .get(&self.layout.conversation(me, peer_id))
            .await
        {
            Ok(snapshot) => messages_from_snapshot(&snapshot),
            Err(e) => {
                debug!("Failed to read messages from {}: {}", peer_id, e);
                return 0;
            }
        };

        // The sender's copy is only touched where it exists and lags behind
        let sender_copy: HashMap<String, MessageStatus> = if peer_id == me {
            HashMap::new()
        } else {
            match self
                .backend
                .get(&self.layout.conversation(peer_id, me))
                .await
            {
                Ok(snapshot) => messages_from_snapshot(&snapshot)
                    .into_iter()
                    .map(|m| (m.id, m.status))
                    .collect(),
                Err(e) => {
                    debug!("Failed to read {}'s copy of the conversation: {}", peer_id, e);
                    HashMap::new()
                }
            }
        };

        let mut advanced = 0;
        for message in inbound.iter().filter(|m| m.is_from(peer_id)) {
            let Some(next) = transition(message.status) else {
                continue;
            };

            let path = self.layout.message_status(me, peer_id, &message.id);
            if !self.write_logged(&path, &next).await {
                continue;
            }
            advanced += 1;

            if let Some(current) = sender_copy.get(&message.id) {
                if *current < next {
                    let path = self.layout.message_status(peer_id, me, &message.id);
                    self.write_logged(&path, &next).await;
                }
            }
        }

        if advanced > 0 {
            debug!("Advanced {} messages from {}", advanced, peer_id);
        }
        advanced
    }

    async fn write_logged<T: serde::Serialize + Sync>(&self, path: &DbPath, value: &T) -> bool {
        match put(&*self.backend, path, value).await {
            Ok(()) => true,
            Err(e) => {
                debug!("Dropping failed write to {}: {}", path, e);
                false
            }
        }
    }
}

/// Decode, attach keys and sort by `(timestamp, key)`
pub fn messages_from_snapshot(snapshot: &Snapshot) -> Vec<Message> {
    let mut messages: Vec<Message> = snapshot
        .decode_children::<Message>()
        .into_iter()
        .map(|(key, message)| message.with_id(key))
        .collect();
    messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
    messages
}

/// Stream of full, sorted message lists for one conversation
///
/// Every item replaces the previous one. If the backend cancels the
/// subscription, a single empty list is yielded and the stream ends.
pub struct ThreadSubscription {
    inner: Subscription,
    done: bool,
}

impl ThreadSubscription {
    fn new(inner: Subscription) -> Self {
        Self { inner, done: false }
    }

    pub fn path(&self) -> &DbPath {
        self.inner.path()
    }

    pub async fn next(&mut self) -> Option<Vec<Message>> {
        StreamExt::next(self).await
    }
}

impl Stream for ThreadSubscription {
    type Item = Vec<Message>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(snapshot))) => Poll::Ready(Some(messages_from_snapshot(&snapshot))),
            Poll::Ready(Some(Err(e))) => {
                warn!("Message subscription on {} ended: {}", this.inner.path(), e);
                this.done = true;
                Poll::Ready(Some(Vec::new()))
            }
            Poll::Ready(None) => {
                this.done = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Count messages from anyone but `self_id` that are not yet viewed
pub fn count_unseen<'a>(messages: impl IntoIterator<Item = &'a Message>, self_id: &str) -> usize {
    messages
        .into_iter()
        .filter(|m| m.status != MessageStatus::Viewed && !m.is_from(self_id))
        .count()
}
