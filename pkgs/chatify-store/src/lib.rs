//! Chatify Store - backend contract and records for chat synchronization
//!
//! This crate defines what the sync layer expects from storage, without
//! committing to any particular database. The backend is modelled as a
//! hierarchical key-value tree with change notification.
//!
//! # Architecture
//!
//! - **Backend**: async trait with single-shot reads, single-key writes,
//!   equality queries and full-snapshot subscriptions
//! - **MemoryBackend**: in-process implementation used by tests and demos
//! - **StoreLayout**: where contacts, chat rows and message copies live
//! - **PushKeyGenerator**: time-ordered keys for appended messages
//!
//! # Records
//!
//! - `Contact`: a user's profile, unique by user id
//! - `Message`: stored twice, once under each participant, so each side keeps
//!   its own read state; only `status` is ever mutated
//! - `ChatSummary`: one row per conversation partner, replaced wholesale on
//!   every message
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use chatify_store::{Backend, DbPath, MemoryBackend};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), chatify_store::BackendError> {
//! let backend = MemoryBackend::new();
//! let mut sub = backend.subscribe(&DbPath::new("chats/u1"));
//!
//! backend
//!     .set(&DbPath::new("chats/u1/u2"), json!({ "lastMessage": "hi" }))
//!     .await?;
//!
//! while let Some(Ok(snapshot)) = sub.next().await {
//!     println!("{} rows", snapshot.children().len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod error;
pub mod layout;
pub mod memory;
pub mod models;
pub mod path;
pub mod push_id;

pub use backend::{put, Backend, Snapshot, SnapshotResult, Subscription};
pub use error::BackendError;
pub use layout::StoreLayout;
pub use memory::MemoryBackend;
pub use models::{ChatSummary, Contact, Message, MessageStatus, DEFAULT_CONTACT_NAME};
pub use path::DbPath;
pub use push_id::PushKeyGenerator;
