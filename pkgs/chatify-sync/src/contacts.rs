//! Contact directory - cached view of every registered profile
//!
//! The directory subscribes to the whole `users` subtree. Every notification
//! carries the complete set, which replaces the cache wholesale:
//!
//! - **all**: every decodable profile, sorted by name
//! - **visible**: `all` filtered by the active search query
//! - **me**: the signed-in user's own profile, if registered
//!
//! A cancelled subscription clears the cache rather than keeping stale data.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chatify_store::{Backend, Contact, Snapshot, StoreLayout};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::identity::Identity;
use crate::task::TaskScope;

/// Published state of the directory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectoryView {
    pub all: Vec<Contact>,
    pub visible: Vec<Contact>,
    pub query: String,
    pub me: Option<Contact>,
}

/// Contact directory
pub struct ContactDirectory {
    backend: Arc<dyn Backend>,
    identity: Identity,
    layout: StoreLayout,
    state: Arc<watch::Sender<DirectoryView>>,
    tasks: TaskScope,
    loading: Arc<AtomicBool>,
}

impl ContactDirectory {
    pub fn new(backend: Arc<dyn Backend>, identity: Identity, layout: StoreLayout) -> Self {
        let (state, _) = watch::channel(DirectoryView::default());
        Self {
            backend,
            identity,
            layout,
            state: Arc::new(state),
            tasks: TaskScope::new(),
            loading: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start following the full contact set. Calling it again is a no-op.
    pub fn load_all(&self) {
        if self.loading.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut subscription = self.backend.subscribe(&self.layout.users());
        let state = self.state.clone();
        let self_id = self.identity.user_id.clone();
        let loading = self.loading.clone();

        self.tasks.spawn(async move {
            while let Some(item) = subscription.next().await {
                match item {
                    Ok(snapshot) => {
                        let contacts = contacts_from_snapshot(&snapshot);
                        debug!("Loaded {} contacts", contacts.len());
                        state.send_modify(|view| {
                            view.me = contacts.iter().find(|c| c.user_id == self_id).cloned();
                            view.visible = filter_contacts(&contacts, &view.query);
                            view.all = contacts;
                        });
                    }
                    Err(e) => {
                        warn!("Failed to load contacts: {}", e);
                        state.send_modify(|view| {
                            view.all.clear();
                            view.visible.clear();
                            view.me = None;
                        });
                    }
                }
            }
            // A later load_all() starts a fresh listener
            loading.store(false, Ordering::SeqCst);
            info!("Contact listener ended");
        });

        info!("Contact directory listening on {}", self.layout.users());
    }

    /// Filter the last loaded list by name; an empty query restores it
    pub fn search(&self, query: &str) {
        self.state.send_modify(|view| {
            view.query = query.to_string();
            view.visible = filter_contacts(&view.all, query);
        });
    }

    /// Resolve a phone number to a user id using the cached contacts
    pub fn resolve(&self, phone_number: &str) -> Option<String> {
        self.by_phone(phone_number).map(|c| c.user_id)
    }

    pub fn by_phone(&self, phone_number: &str) -> Option<Contact> {
        self.state
            .borrow()
            .all
            .iter()
            .find(|c| c.phone_number == phone_number)
            .cloned()
    }

    pub fn get(&self, user_id: &str) -> Option<Contact> {
        self.state
            .borrow()
            .all
            .iter()
            .find(|c| c.user_id == user_id)
            .cloned()
    }

    /// Look a profile up directly in the backend by phone number
    ///
    /// Unlike [`resolve`](Self::resolve) this does not depend on the cache.
    /// Both a missing profile and a failed query yield `None`.
    pub async fn find_by_phone(&self, phone_number: &str) -> Option<Contact> {
        let result = self
            .backend
            .query_equal(
                &self.layout.users(),
                "phoneNo",
                &Value::String(phone_number.to_string()),
            )
            .await;

        match result {
            Ok(snapshot) => contacts_from_snapshot(&snapshot).into_iter().next(),
            Err(e) => {
                debug!("Phone lookup for {} failed: {}", phone_number, e);
                None
            }
        }
    }

    /// The signed-in user's own profile
    pub fn me(&self) -> Option<Contact> {
        self.state.borrow().me.clone()
    }

    /// Contacts matching the active search
    pub fn contacts(&self) -> Vec<Contact> {
        self.state.borrow().visible.clone()
    }

    /// The last fully loaded contact list
    pub fn all(&self) -> Vec<Contact> {
        self.state.borrow().all.clone()
    }

    pub fn watch(&self) -> watch::Receiver<DirectoryView> {
        self.state.subscribe()
    }

    pub fn shutdown(&self) {
        self.tasks.shutdown();
        self.loading.store(false, Ordering::SeqCst);
    }
}

fn contacts_from_snapshot(snapshot: &Snapshot) -> Vec<Contact> {
    let mut contacts: Vec<Contact> = snapshot
        .decode_children::<Contact>()
        .into_iter()
        .map(|(key, mut contact)| {
            if contact.user_id.is_empty() {
                contact.user_id = key;
            }
            contact
        })
        .collect();
    contacts.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.user_id.cmp(&b.user_id)));
    contacts
}

fn filter_contacts(contacts: &[Contact], query: &str) -> Vec<Contact> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return contacts.to_vec();
    }
    contacts
        .iter()
        .filter(|c| c.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}
