//! Chatify Sync - chat list, message thread and delivery status synchronization
//!
//! Projects a snapshot key-value backend into in-memory observable state for
//! one signed-in user, and writes user actions back through the same backend.
//!
//! # Components
//!
//! - **ContactDirectory**: cached, name-sorted contact list; phone ↔ user id
//! - **MessageStore**: paired message writes, delivery/viewed status sweeps,
//!   sorted conversation streams
//! - **ChatList**: one summary row per partner, replaced on every message;
//!   each reload sweeps pending messages to delivered
//! - **UnseenCounter**: unseen messages per conversation, recomputed per snapshot
//! - **ConversationThread**: open conversation that marks messages viewed
//! - **ProfileEditor**: the signed-in user's own profile record
//! - **ChatClient**: constructs all of the above around one backend handle
//!
//! # Threading
//!
//! Backend notifications are consumed on tokio tasks owned by the component
//! that subscribed. Derived state is republished through `tokio::sync::watch`
//! channels, which is the only hand-off readers need. Dropping a component
//! aborts its listener tasks.
//!
//! # Errors
//!
//! Nothing here returns backend errors to the caller. Failed writes are
//! logged at debug level and dropped; a cancelled subscription turns into an
//! empty list or a zero count; a missing profile or chat is an empty state.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chatify_store::MemoryBackend;
//! use chatify_sync::{ChatClient, Identity, SyncConfig};
//!
//! # async fn example() {
//! let backend = Arc::new(MemoryBackend::new());
//! let client = ChatClient::new(backend, Identity::new("u1", "+100"), SyncConfig::default());
//! client.start();
//!
//! client.send_message("+200", "Hello!").await;
//! for chat in client.chats().chats() {
//!     println!("{:?}: {:?}", chat.partner_name, chat.last_message);
//! }
//! # }
//! ```

pub mod chat_list;
pub mod client;
pub mod config;
pub mod contacts;
pub mod error;
pub mod identity;
pub mod messages;
pub mod profile;
pub mod task;
pub mod thread;
pub mod unseen;

pub use chat_list::{ChatList, ChatListView};
pub use client::ChatClient;
pub use config::{SyncConfig, DEFAULT_TIME_LABEL_FORMAT};
pub use contacts::{ContactDirectory, DirectoryView};
pub use error::SyncError;
pub use identity::Identity;
pub use messages::{count_unseen, messages_from_snapshot, MessageStore, ThreadSubscription};
pub use profile::{ProfileEditor, ProfileField};
pub use task::TaskScope;
pub use thread::ConversationThread;
pub use unseen::UnseenCounter;

pub use chatify_store::{ChatSummary, Contact, Message, MessageStatus};
