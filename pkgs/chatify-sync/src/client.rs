//! Chat client - wires the sync components together for one signed-in user

use std::sync::Arc;

use chatify_store::{Backend, ChatSummary, Contact, Message};
use tracing::{debug, info};

use crate::chat_list::ChatList;
use crate::config::SyncConfig;
use crate::contacts::ContactDirectory;
use crate::identity::Identity;
use crate::messages::MessageStore;
use crate::profile::ProfileEditor;
use crate::thread::ConversationThread;
use crate::unseen::UnseenCounter;

/// Entry point for a signed-in user
///
/// Every component receives the backend handle explicitly; nothing reaches
/// for a global database or auth instance.
pub struct ChatClient {
    backend: Arc<dyn Backend>,
    identity: Identity,
    config: SyncConfig,
    directory: Arc<ContactDirectory>,
    messages: Arc<MessageStore>,
    chats: Arc<ChatList>,
    profile: ProfileEditor,
}

impl ChatClient {
    pub fn new(backend: Arc<dyn Backend>, identity: Identity, config: SyncConfig) -> Self {
        let layout = config.layout.clone();
        let directory = Arc::new(ContactDirectory::new(
            backend.clone(),
            identity.clone(),
            layout.clone(),
        ));
        let messages = Arc::new(MessageStore::new(
            backend.clone(),
            identity.clone(),
            layout.clone(),
        ));
        let chats = Arc::new(ChatList::new(
            backend.clone(),
            identity.clone(),
            layout.clone(),
            config.time_label_format.clone(),
            messages.clone(),
        ));
        let profile = ProfileEditor::new(backend.clone(), identity.clone(), layout);

        Self {
            backend,
            identity,
            config,
            directory,
            messages,
            chats,
            profile,
        }
    }

    /// Start the long-lived contact and chat list listeners
    pub fn start(&self) {
        info!("Starting chat client for {}", self.identity.user_id);
        self.directory.load_all();
        self.chats.load();
    }

    /// Send `body` to the contact registered with `receiver_phone`
    ///
    /// Writes both message copies and both chat rows. Returns `None` when the
    /// phone number is not in the loaded contact list.
    pub async fn send_message(&self, receiver_phone: &str, body: &str) -> Option<Message> {
        let Some(receiver) = self.directory.by_phone(receiver_phone) else {
            debug!("No contact with phone {}, message dropped", receiver_phone);
            return None;
        };
        Some(self.send_to(&receiver, body).await)
    }

    /// Send `body` to a known contact
    pub async fn send_to(&self, receiver: &Contact, body: &str) -> Message {
        let message = self
            .messages
            .send(&receiver.user_id, &receiver.phone_number, body)
            .await;
        let me = self.directory.me();
        self.chats
            .record_send(me.as_ref(), receiver, body, message.timestamp)
            .await;
        message
    }

    /// Open the conversation with the contact registered with `peer_phone`
    pub fn open_thread(&self, peer_phone: &str) -> Option<ConversationThread> {
        let peer_id = self.directory.resolve(peer_phone)?;
        Some(self.open_thread_with(&peer_id))
    }

    pub fn open_thread_with(&self, peer_id: &str) -> ConversationThread {
        ConversationThread::open(self.messages.clone(), peer_id)
    }

    pub fn unseen_count(&self, peer_id: &str) -> UnseenCounter {
        UnseenCounter::watch(
            self.backend.clone(),
            &self.identity,
            &self.config.layout,
            peer_id,
        )
    }

    pub fn search_chats(&self, query: &str) -> Vec<ChatSummary> {
        self.chats.search(query);
        self.chats.chats()
    }

    pub fn search_contacts(&self, query: &str) -> Vec<Contact> {
        self.directory.search(query);
        self.directory.contacts()
    }

    /// Look up a user who may not be in the loaded contact list yet
    pub async fn find_user_by_phone(&self, phone: &str) -> Option<Contact> {
        self.directory.find_by_phone(phone).await
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn directory(&self) -> &Arc<ContactDirectory> {
        &self.directory
    }

    pub fn messages(&self) -> &Arc<MessageStore> {
        &self.messages
    }

    pub fn chats(&self) -> &Arc<ChatList> {
        &self.chats
    }

    pub fn profile(&self) -> &ProfileEditor {
        &self.profile
    }

    /// Stop all listeners started by [`start`](Self::start)
    pub fn shutdown(&self) {
        self.directory.shutdown();
        self.chats.shutdown();
        info!("Chat client for {} shut down", self.identity.user_id);
    }
}
