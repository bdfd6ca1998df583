//! Chat summary projection - one row per conversation partner
//!
//! Rows live at `chats/{owner}/{partner}` and are replaced wholesale on every
//! message in either direction; there is no merging. Name, phone and image
//! are copies taken at send time.
//!
//! Loading the list also acknowledges delivery: each reload sweeps every
//! partner's pending `SENT` messages to `DELIVERED`.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chatify_store::{put, Backend, ChatSummary, Contact, Snapshot, StoreLayout};
use chrono::{Local, TimeZone};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::identity::Identity;
use crate::messages::MessageStore;
use crate::task::TaskScope;

/// Published state of the chat list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatListView {
    /// Last fully loaded rows, most recent first
    pub all: Vec<ChatSummary>,
    /// `all` filtered by the active query
    pub visible: Vec<ChatSummary>,
    pub query: String,
}

pub struct ChatList {
    backend: Arc<dyn Backend>,
    identity: Identity,
    layout: StoreLayout,
    time_label_format: String,
    messages: Arc<MessageStore>,
    state: Arc<watch::Sender<ChatListView>>,
    tasks: TaskScope,
    loading: Arc<AtomicBool>,
}

impl ChatList {
    pub fn new(
        backend: Arc<dyn Backend>,
        identity: Identity,
        layout: StoreLayout,
        time_label_format: impl Into<String>,
        messages: Arc<MessageStore>,
    ) -> Self {
        let (state, _) = watch::channel(ChatListView::default());
        Self {
            backend,
            identity,
            layout,
            time_label_format: time_label_format.into(),
            messages,
            state: Arc::new(state),
            tasks: TaskScope::new(),
            loading: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Follow the signed-in user's chat rows. Calling it again is a no-op.
    pub fn load(&self) {
        if self.loading.swap(true, Ordering::SeqCst) {
            return;
        }

        let path = self.layout.chats(&self.identity.user_id);
        let mut subscription = self.backend.subscribe(&path);
        let state = self.state.clone();
        let messages = self.messages.clone();
        let loading = self.loading.clone();

        self.tasks.spawn(async move {
            while let Some(item) = subscription.next().await {
                match item {
                    Ok(snapshot) => {
                        let rows = rows_from_snapshot(&snapshot);
                        debug!("Loaded {} chats", rows.len());
                        let partners: Vec<String> =
                            rows.iter().map(|r| r.partner_user_id.clone()).collect();

                        state.send_modify(|view| {
                            view.visible = filter_rows(&rows, &view.query);
                            view.all = rows;
                        });

                        for partner in partners {
                            messages.mark_delivered(&partner).await;
                        }
                    }
                    Err(e) => {
                        warn!("Chat list subscription ended: {}", e);
                        state.send_modify(|view| {
                            view.all.clear();
                            view.visible.clear();
                        });
                    }
                }
            }
            // A later load() starts a fresh listener
            loading.store(false, Ordering::SeqCst);
            info!("Chat list listener ended");
        });

        info!("Chat list listening on {}", path);
    }

    /// Overwrite both participants' rows after a message from the signed-in
    /// user to `receiver`
    ///
    /// `me` is the sender's own profile when known; the row shown to the
    /// receiver falls back to the bare identity otherwise.
    pub async fn record_send(
        &self,
        me: Option<&Contact>,
        receiver: &Contact,
        body: &str,
        timestamp: i64,
    ) {
        let my_id = self.identity.user_id.as_str();
        let time_label = format_time_label(timestamp, &self.time_label_format);

        let receiver_row = ChatSummary {
            partner_user_id: receiver.user_id.clone(),
            partner_name: Some(receiver.name.clone()),
            last_message: Some(body.to_string()),
            last_message_sender_id: Some(my_id.to_string()),
            last_message_time_label: time_label.clone(),
            partner_phone: Some(receiver.phone_number.clone()),
            partner_profile_image: receiver.profile_image.clone(),
            last_message_timestamp: timestamp,
        };
        self.write_row(&receiver_row, my_id, &receiver.user_id).await;

        if receiver.user_id == my_id {
            return;
        }

        let sender_row = ChatSummary {
            partner_user_id: my_id.to_string(),
            partner_name: me.map(|c| c.name.clone()),
            last_message: Some(body.to_string()),
            last_message_sender_id: Some(my_id.to_string()),
            last_message_time_label: time_label,
            partner_phone: Some(
                me.map(|c| c.phone_number.clone())
                    .unwrap_or_else(|| self.identity.phone_number.clone()),
            ),
            partner_profile_image: me.and_then(|c| c.profile_image.clone()),
            last_message_timestamp: timestamp,
        };
        self.write_row(&sender_row, &receiver.user_id, my_id).await;
    }

    /// Filter by partner name or last message; an empty query restores the
    /// last loaded list
    pub fn search(&self, query: &str) {
        self.state.send_modify(|view| {
            view.query = query.to_string();
            view.visible = filter_rows(&view.all, query);
        });
    }

    /// Rows matching the active search
    pub fn chats(&self) -> Vec<ChatSummary> {
        self.state.borrow().visible.clone()
    }

    pub fn all(&self) -> Vec<ChatSummary> {
        self.state.borrow().all.clone()
    }

    pub fn watch(&self) -> watch::Receiver<ChatListView> {
        self.state.subscribe()
    }

    pub fn shutdown(&self) {
        self.tasks.shutdown();
        self.loading.store(false, Ordering::SeqCst);
    }

    async fn write_row(&self, row: &ChatSummary, owner: &str, partner: &str) {
        let path = self.layout.chat(owner, partner);
        if let Err(e) = put(&*self.backend, &path, row).await {
            debug!("Dropping failed chat row write to {}: {}", path, e);
        }
    }
}

fn rows_from_snapshot(snapshot: &Snapshot) -> Vec<ChatSummary> {
    let mut rows: Vec<ChatSummary> = snapshot
        .decode_children::<ChatSummary>()
        .into_iter()
        .map(|(key, mut row)| {
            if row.partner_user_id.is_empty() {
                row.partner_user_id = key;
            }
            row
        })
        .collect();
    // Stable: rows without a timestamp keep key order at the end
    rows.sort_by(|a, b| b.last_message_timestamp.cmp(&a.last_message_timestamp));
    rows
}

fn filter_rows(rows: &[ChatSummary], query: &str) -> Vec<ChatSummary> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return rows.to_vec();
    }
    rows.iter().filter(|r| r.matches(&needle)).cloned().collect()
}

/// Local wall-clock label; `None` for an unrepresentable timestamp or an
/// invalid format string
fn format_time_label(timestamp: i64, format: &str) -> Option<String> {
    let time = Local.timestamp_millis_opt(timestamp).single()?;
    let mut label = String::new();
    write!(label, "{}", time.format(format)).ok()?;
    Some(label)
}
