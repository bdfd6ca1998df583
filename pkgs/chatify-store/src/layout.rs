//! Where each record lives in the backend tree

use serde::{Deserialize, Serialize};

use crate::path::DbPath;

/// Root names of the three top-level subtrees
///
/// ```text
/// users/{userId}                       Contact
/// chats/{owner}/{partner}              ChatSummary
/// messages/{owner}/{peer}/{messageId}  Message (owner's copy)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreLayout {
    pub users_root: String,
    pub chats_root: String,
    pub messages_root: String,
}

impl Default for StoreLayout {
    fn default() -> Self {
        Self {
            users_root: "users".to_string(),
            chats_root: "chats".to_string(),
            messages_root: "messages".to_string(),
        }
    }
}

impl StoreLayout {
    pub fn users(&self) -> DbPath {
        DbPath::new(&self.users_root)
    }

    pub fn user(&self, user_id: &str) -> DbPath {
        self.users().child(user_id)
    }

    /// The whole chat list of `owner`
    pub fn chats(&self, owner: &str) -> DbPath {
        DbPath::new(&self.chats_root).child(owner)
    }

    pub fn chat(&self, owner: &str, partner: &str) -> DbPath {
        self.chats(owner).child(partner)
    }

    /// `owner`'s copy of the conversation with `peer`
    pub fn conversation(&self, owner: &str, peer: &str) -> DbPath {
        DbPath::new(&self.messages_root).child(owner).child(peer)
    }

    pub fn message(&self, owner: &str, peer: &str, message_id: &str) -> DbPath {
        self.conversation(owner, peer).child(message_id)
    }

    pub fn message_status(&self, owner: &str, peer: &str, message_id: &str) -> DbPath {
        self.message(owner, peer, message_id).child("status")
    }
}
