//! Records stored in the backend tree
//!
//! Field names on the wire follow the tree the mobile clients already write
//! (`phoneNo`, `message`, `time`, ...), so the Rust names are mapped with serde.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Display name used when a profile has none yet
pub const DEFAULT_CONTACT_NAME: &str = "New User";

fn default_contact_name() -> String {
    DEFAULT_CONTACT_NAME.to_string()
}

/// A registered user's profile, stored at `users/{userId}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(rename = "userId", default)]
    pub user_id: String,
    #[serde(default = "default_contact_name")]
    pub name: String,
    #[serde(rename = "phoneNo", default)]
    pub phone_number: String,
    /// Base64 image payload, opaque to this crate
    #[serde(rename = "profileImage", default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Contact {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            phone_number: phone.into(),
            profile_image: None,
            status: None,
        }
    }
}

/// Receiver-side acknowledgement state of a message
///
/// Ordered: `Sent < Delivered < Viewed`. Status only moves forward.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageStatus {
    #[default]
    Sent,
    Delivered,
    Viewed,
}

impl MessageStatus {
    /// Next status when the receiver's client has seen the message arrive.
    /// Only `Sent` moves.
    pub fn on_delivered(self) -> Option<MessageStatus> {
        match self {
            MessageStatus::Sent => Some(MessageStatus::Delivered),
            _ => None,
        }
    }

    /// Next status when the receiver opens the conversation. Jumps straight
    /// from `Sent` when no delivery sweep ran first; `Viewed` is absorbing.
    pub fn on_viewed(self) -> Option<MessageStatus> {
        match self {
            MessageStatus::Viewed => None,
            _ => Some(MessageStatus::Viewed),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Sent => "SENT",
            MessageStatus::Delivered => "DELIVERED",
            MessageStatus::Viewed => "VIEWED",
        }
    }
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message, stored once per participant at
/// `messages/{owner}/{peer}/{id}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Child key, shared by both copies
    #[serde(skip)]
    pub id: String,
    #[serde(default)]
    pub sender_id: String,
    #[serde(default)]
    pub receiver_id: String,
    #[serde(rename = "senderPhoneNumber", default)]
    pub sender_phone: String,
    #[serde(rename = "receiverPhoneNumber", default)]
    pub receiver_phone: String,
    #[serde(rename = "message", default)]
    pub body: String,
    #[serde(default)]
    pub status: MessageStatus,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub timestamp: i64,
}

impl Message {
    pub fn is_from(&self, user_id: &str) -> bool {
        self.sender_id == user_id
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }

    /// Attach the child key a decoded record was stored under
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// Denormalized row of a user's chat list, stored at
/// `chats/{owner}/{partnerUserId}`
///
/// The partner's name, phone and image are copied at send time and are not
/// refreshed when the partner edits their profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSummary {
    #[serde(rename = "userId", default)]
    pub partner_user_id: String,
    #[serde(rename = "name", default, skip_serializing_if = "Option::is_none")]
    pub partner_name: Option<String>,
    #[serde(rename = "lastMessage", default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
    #[serde(rename = "lastMessageSenderId", default, skip_serializing_if = "Option::is_none")]
    pub last_message_sender_id: Option<String>,
    #[serde(rename = "time", default, skip_serializing_if = "Option::is_none")]
    pub last_message_time_label: Option<String>,
    #[serde(rename = "phoneNo", default, skip_serializing_if = "Option::is_none")]
    pub partner_phone: Option<String>,
    #[serde(rename = "profile", default, skip_serializing_if = "Option::is_none")]
    pub partner_profile_image: Option<String>,
    /// Milliseconds since the Unix epoch; rows written by older clients lack it
    #[serde(rename = "timestamp", default)]
    pub last_message_timestamp: i64,
}

impl ChatSummary {
    /// Case-insensitive match of an already lowercased needle against the
    /// partner name and last message text
    pub fn matches(&self, needle: &str) -> bool {
        let hit = |field: &Option<String>| {
            field
                .as_deref()
                .is_some_and(|text| text.to_lowercase().contains(needle))
        };
        hit(&self.partner_name) || hit(&self.last_message)
    }
}
