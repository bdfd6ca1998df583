// Copyright 2024 Gigi Team.
//
//! End-to-end tests for two signed-in users sharing one backend
//!
//! These cover the chat list projection, the automatic delivered/viewed
//! sweeps, unseen counts and search behaviour through `ChatClient`.

mod common;

use chatify_store::{ChatSummary, MessageStatus, StoreLayout};
use chatify_sync::ProfileField;
use common::*;

fn row(backend: &chatify_store::MemoryBackend, owner: &str, partner: &str) -> Option<ChatSummary> {
    backend
        .value_at(StoreLayout::default().chat(owner, partner))
        .map(|v| serde_json::from_value(v).unwrap())
}

#[tokio::test]
async fn test_send_message_writes_both_chat_rows() {
    let backend = seeded_backend().await;
    let alice = started_client(&backend, alice()).await;

    let sent = alice.send_message("+200", "hi bob").await.unwrap();

    let mine = row(&backend, "alice", "bob").unwrap();
    assert_eq!(mine.partner_user_id, "bob");
    assert_eq!(mine.partner_name.as_deref(), Some("Bob"));
    assert_eq!(mine.partner_phone.as_deref(), Some("+200"));
    assert_eq!(mine.last_message.as_deref(), Some("hi bob"));
    assert_eq!(mine.last_message_sender_id.as_deref(), Some("alice"));
    assert_eq!(mine.last_message_timestamp, sent.timestamp);
    assert!(mine.last_message_time_label.is_some());

    let theirs = row(&backend, "bob", "alice").unwrap();
    assert_eq!(theirs.partner_user_id, "alice");
    assert_eq!(theirs.partner_name.as_deref(), Some("Alice"));
    assert_eq!(theirs.last_message.as_deref(), Some("hi bob"));
}

#[tokio::test]
async fn test_unknown_phone_is_dropped() {
    let backend = seeded_backend().await;
    let alice = started_client(&backend, alice()).await;

    assert!(alice.send_message("+999", "anyone?").await.is_none());
    assert!(backend.value_at("messages").is_none());
    assert!(alice.open_thread("+999").is_none());
}

#[tokio::test]
async fn test_last_message_tracks_latest_send_from_either_side() {
    let backend = seeded_backend().await;
    let alice = started_client(&backend, alice()).await;
    let bob = started_client(&backend, bob()).await;

    for (sender, body) in [(&alice, "a1"), (&bob, "b1"), (&bob, "b2"), (&alice, "a2")] {
        let peer = if sender.identity().user_id == "alice" { "+200" } else { "+100" };
        sender.send_message(peer, body).await.unwrap();

        assert_eq!(row(&backend, "alice", "bob").unwrap().last_message.as_deref(), Some(body));
        assert_eq!(row(&backend, "bob", "alice").unwrap().last_message.as_deref(), Some(body));
    }

    let mut chats = bob.chats().watch();
    let view = wait_for(&mut chats, |v| {
        v.all.first().and_then(|r| r.last_message.as_deref()) == Some("a2")
    })
    .await;
    assert_eq!(view.all.len(), 1);
    assert_eq!(view.all[0].partner_user_id, "alice");
}

#[tokio::test]
async fn test_chat_list_reload_marks_messages_delivered() {
    let backend = seeded_backend().await;
    let alice = started_client(&backend, alice()).await;

    let sent = alice.send_message("+200", "are you there?").await.unwrap();
    let layout = StoreLayout::default();
    assert_eq!(
        backend.value_at(layout.message_status("alice", "bob", &sent.id)),
        Some(serde_json::json!("SENT"))
    );

    // Bob opening the app loads his chat list
    let _bob = started_client(&backend, bob()).await;

    eventually(|| {
        backend.value_at(layout.message_status("alice", "bob", &sent.id))
            == Some(serde_json::json!("DELIVERED"))
    })
    .await;
    assert_eq!(
        backend.value_at(layout.message_status("bob", "alice", &sent.id)),
        Some(serde_json::json!("DELIVERED"))
    );
}

#[tokio::test]
async fn test_unseen_count_and_opening_the_thread() {
    let backend = seeded_backend().await;
    let alice = started_client(&backend, alice()).await;
    let bob = started_client(&backend, bob()).await;

    let unseen = bob.unseen_count("alice");
    let mut count = unseen.subscribe();

    alice.send_message("+200", "one").await.unwrap();
    alice.send_message("+200", "two").await.unwrap();
    wait_for(&mut count, |c| *c == 2).await;

    // Bob's own messages never count towards his unseen total
    bob.send_message("+100", "typing...").await.unwrap();
    let messages = conversation(&backend, "bob", "alice").await;
    assert_eq!(messages.len(), 3);
    assert_eq!(chatify_sync::count_unseen(&messages, "bob"), 2);

    let thread = bob.open_thread("+100").unwrap();
    wait_for(&mut count, |c| *c == 0).await;

    let mut view = thread.watch();
    let messages = wait_for(&mut view, |m| {
        m.len() == 3
            && m.iter()
                .filter(|m| m.is_from("alice"))
                .all(|m| m.status == MessageStatus::Viewed)
    })
    .await;
    let bodies: Vec<&str> = messages.iter().map(|m| m.body.as_str()).collect();
    assert!(bodies.contains(&"typing..."));

    // Alice sees the read receipt on her copy
    eventually(|| {
        let layout = StoreLayout::default();
        messages.iter().filter(|m| m.is_from("alice")).all(|m| {
            backend.value_at(layout.message_status("alice", "bob", &m.id))
                == Some(serde_json::json!("VIEWED"))
        })
    })
    .await;

    // Alice still has Bob's message unseen
    let alice_unseen = alice.unseen_count("bob");
    let mut alice_count = alice_unseen.subscribe();
    wait_for(&mut alice_count, |c| *c == 1).await;
}

#[tokio::test]
async fn test_search_contacts_restores_full_list() {
    let backend = seeded_backend().await;
    let amy = chatify_store::Contact::new("amy", "Amy", "+300");
    chatify_store::put(&backend, &StoreLayout::default().user("amy"), &amy)
        .await
        .unwrap();

    let alice = client(&backend, alice());
    alice.start();
    let mut view = alice.directory().watch();
    wait_for(&mut view, |v| v.all.len() == 3).await;

    let names = |contacts: Vec<chatify_store::Contact>| {
        contacts.into_iter().map(|c| c.name).collect::<Vec<_>>()
    };
    assert_eq!(names(alice.search_contacts("am")), vec!["Amy"]);
    assert_eq!(names(alice.search_contacts("B")), vec!["Bob"]);
    assert!(alice.search_contacts("nobody").is_empty());
    assert_eq!(names(alice.search_contacts("")), vec!["Alice", "Amy", "Bob"]);
    assert_eq!(alice.directory().all().len(), 3);
}

#[tokio::test]
async fn test_search_applies_to_freshly_loaded_list() {
    let backend = seeded_backend().await;
    let alice = started_client(&backend, alice()).await;
    alice.search_contacts("am");
    assert!(alice.directory().contacts().is_empty());

    let amy = chatify_store::Contact::new("amy", "Amy", "+300");
    chatify_store::put(&backend, &StoreLayout::default().user("amy"), &amy)
        .await
        .unwrap();

    let mut view = alice.directory().watch();
    let loaded = wait_for(&mut view, |v| v.all.len() == 3).await;
    assert_eq!(loaded.visible.len(), 1);
    assert_eq!(loaded.visible[0].name, "Amy");
}

#[tokio::test]
async fn test_search_chats() {
    let backend = seeded_backend().await;
    let amy = chatify_store::Contact::new("amy", "Amy", "+300");
    chatify_store::put(&backend, &StoreLayout::default().user("amy"), &amy)
        .await
        .unwrap();

    let alice = client(&backend, alice());
    alice.start();
    let mut contacts = alice.directory().watch();
    wait_for(&mut contacts, |v| v.all.len() == 3).await;

    alice.send_message("+200", "lunch tomorrow?").await.unwrap();
    alice.send_message("+300", "see you").await.unwrap();

    let mut chats = alice.chats().watch();
    wait_for(&mut chats, |v| v.all.len() == 2).await;

    let partners = |rows: Vec<ChatSummary>| {
        rows.into_iter().map(|r| r.partner_user_id).collect::<Vec<_>>()
    };
    assert_eq!(partners(alice.search_chats("LUNCH")), vec!["bob"]);
    assert_eq!(partners(alice.search_chats("amy")), vec!["amy"]);
    assert_eq!(alice.search_chats("").len(), 2);
}

#[tokio::test]
async fn test_cancelled_subscriptions_fall_back_to_empty() {
    let backend = seeded_backend().await;
    let alice = started_client(&backend, alice()).await;
    let bob = started_client(&backend, bob()).await;

    bob.send_message("+100", "ping").await.unwrap();
    let unseen = alice.unseen_count("bob");
    let mut count = unseen.subscribe();
    wait_for(&mut count, |c| *c == 1).await;
    let mut chats = alice.chats().watch();
    wait_for(&mut chats, |v| v.all.len() == 1).await;

    backend.cancel_subscriptions(chatify_store::DbPath::root(), "signed out");

    wait_for(&mut chats, |v| v.all.is_empty() && v.visible.is_empty()).await;
    wait_for(&mut count, |c| *c == 0).await;
    let mut contacts = alice.directory().watch();
    let view = wait_for(&mut contacts, |v| v.all.is_empty()).await;
    assert!(view.me.is_none());
    assert!(alice.directory().resolve("+200").is_none());
}

#[tokio::test]
async fn test_start_after_cancellation_listens_again() {
    let backend = seeded_backend().await;
    let alice = started_client(&backend, alice()).await;
    alice.send_message("+200", "hello").await.unwrap();
    let mut chats = alice.chats().watch();
    wait_for(&mut chats, |v| v.all.len() == 1).await;

    backend.cancel_subscriptions(chatify_store::DbPath::root(), "token expired");
    wait_for(&mut chats, |v| v.all.is_empty()).await;
    assert_eq!(backend.listener_count(), 0);

    // Both listeners restart once their cancelled tasks have wound down
    eventually(|| {
        alice.start();
        backend.listener_count() == 2
    })
    .await;

    wait_for(&mut chats, |v| v.all.len() == 1).await;
    let mut contacts = alice.directory().watch();
    let view = wait_for(&mut contacts, |v| v.me.is_some()).await;
    assert_eq!(view.all.len(), 2);
}

#[tokio::test]
async fn test_failed_chat_row_write_is_dropped() {
    let backend = seeded_backend().await;
    backend.deny_writes("chats/bob");
    let alice = started_client(&backend, alice()).await;

    let sent = alice.send_message("+200", "hello").await;

    assert!(sent.is_some());
    assert!(row(&backend, "alice", "bob").is_some());
    assert!(row(&backend, "bob", "alice").is_none());
}

#[tokio::test]
async fn test_profile_update_does_not_rewrite_chat_rows() {
    let backend = seeded_backend().await;
    let alice = started_client(&backend, alice()).await;
    let bob = started_client(&backend, bob()).await;

    alice.send_message("+200", "hi").await.unwrap();
    bob.profile().update(ProfileField::Name, "Robert").await;

    let mut contacts = alice.directory().watch();
    wait_for(&mut contacts, |v| v.all.iter().any(|c| c.name == "Robert")).await;
    let mut bob_view = bob.directory().watch();
    wait_for(&mut bob_view, |v| v.me.as_ref().map(|c| c.name.as_str()) == Some("Robert")).await;

    // Rows keep the name copied at send time until the next message
    assert_eq!(row(&backend, "alice", "bob").unwrap().partner_name.as_deref(), Some("Bob"));

    alice.send_message("+200", "new name?").await.unwrap();
    assert_eq!(row(&backend, "alice", "bob").unwrap().partner_name.as_deref(), Some("Robert"));
}

#[tokio::test]
async fn test_find_user_by_phone_and_register() {
    let backend = seeded_backend().await;
    let alice = client(&backend, alice());

    let found = alice.find_user_by_phone("+200").await.unwrap();
    assert_eq!(found.user_id, "bob");
    assert!(alice.find_user_by_phone("+300").await.is_none());

    let carol = client(&backend, chatify_sync::Identity::new("carol", "+300"));
    carol.profile().register("Carol").await;
    carol.profile().update(ProfileField::Status, "Busy").await;

    let found = alice.find_user_by_phone("+300").await.unwrap();
    assert_eq!(found.name, "Carol");
    assert_eq!(found.status.as_deref(), Some("Busy"));
}

#[tokio::test]
async fn test_shutdown_releases_listeners() {
    let backend = seeded_backend().await;
    let alice = started_client(&backend, alice()).await;
    {
        let _thread = alice.open_thread_with("bob");
        let _unseen = alice.unseen_count("bob");
        eventually(|| backend.listener_count() == 4).await;
    }
    eventually(|| backend.listener_count() == 2).await;

    alice.shutdown();
    eventually(|| backend.listener_count() == 0).await;
}
