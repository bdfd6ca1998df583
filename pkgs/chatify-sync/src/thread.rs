//! An open conversation screen
//!
//! Follows the signed-in user's copy of one conversation and, after every
//! update, marks the peer's messages as viewed. Closing or dropping the
//! thread ends the subscription.

use std::sync::Arc;

use chatify_store::Message;
use tokio::sync::watch;
use tracing::debug;

use crate::messages::MessageStore;
use crate::task::TaskScope;

pub struct ConversationThread {
    peer_id: String,
    messages: watch::Receiver<Vec<Message>>,
    tasks: TaskScope,
}

impl ConversationThread {
    pub fn open(store: Arc<MessageStore>, peer_id: &str) -> Self {
        let (sender, receiver) = watch::channel(Vec::new());
        let mut subscription = store.subscribe(peer_id);
        let tasks = TaskScope::new();

        let peer = peer_id.to_string();
        tasks.spawn(async move {
            while let Some(messages) = subscription.next().await {
                let has_messages = !messages.is_empty();
                sender.send_replace(messages);
                if has_messages {
                    store.mark_viewed(&peer).await;
                }
            }
            debug!("Conversation with {} closed", peer);
        });

        Self {
            peer_id: peer_id.to_string(),
            messages: receiver,
            tasks,
        }
    }

    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    /// Current messages, oldest first
    pub fn messages(&self) -> Vec<Message> {
        self.messages.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<Vec<Message>> {
        self.messages.clone()
    }

    pub fn close(self) {
        self.tasks.shutdown();
    }
}
