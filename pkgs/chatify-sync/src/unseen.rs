//! Unseen message counter for one conversation
//!
//! Recomputed from scratch on every snapshot of the signed-in user's copy of
//! the conversation: messages not authored by the user and not yet viewed.

use std::sync::Arc;

use chatify_store::{Backend, StoreLayout};
use tokio::sync::watch;
use tracing::warn;

use crate::identity::Identity;
use crate::messages::{count_unseen, messages_from_snapshot};
use crate::task::TaskScope;

pub struct UnseenCounter {
    peer_id: String,
    count: watch::Receiver<usize>,
    tasks: TaskScope,
}

impl UnseenCounter {
    pub fn watch(
        backend: Arc<dyn Backend>,
        identity: &Identity,
        layout: &StoreLayout,
        peer_id: &str,
    ) -> Self {
        let (sender, receiver) = watch::channel(0);
        let mut subscription = backend.subscribe(&layout.conversation(&identity.user_id, peer_id));
        let self_id = identity.user_id.clone();
        let tasks = TaskScope::new();

        tasks.spawn(async move {
            while let Some(item) = subscription.next().await {
                match item {
                    Ok(snapshot) => {
                        let messages = messages_from_snapshot(&snapshot);
                        sender.send_replace(count_unseen(&messages, &self_id));
                    }
                    Err(e) => {
                        warn!("Cannot count unseen messages: {}", e);
                        sender.send_replace(0);
                    }
                }
            }
        });

        Self {
            peer_id: peer_id.to_string(),
            count: receiver,
            tasks,
        }
    }

    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    pub fn count(&self) -> usize {
        *self.count.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.count.clone()
    }

    pub fn close(self) {
        self.tasks.shutdown();
    }
}
