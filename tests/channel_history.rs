//! Scenario tests for channel delivery, suppression and bounded replay.

mod common;

use common::{TestHall, assert_any_contains, assert_none_contains};

#[tokio::test]
async fn test_replay_returns_newest_entries_in_order() {
    let mut t = TestHall::new().await;
    t.login("Alice", "secret1").await;
    t.login("Bob", "secret2").await;

    for i in 0..5 {
        t.line("Alice", &format!("chat message {i}")).await;
    }
    t.drain("Bob");

    let out = t.line("Bob", "chathistory 3").await;
    let replayed: Vec<&String> = out.iter().filter(|l| l.contains("chats:")).collect();
    assert_eq!(replayed.len(), 3);
    assert!(replayed[0].contains("message 2"));
    assert!(replayed[1].contains("message 3"));
    assert!(replayed[2].contains("message 4"));
}

#[tokio::test]
async fn test_muted_member_misses_live_delivery_but_can_replay() {
    let mut t = TestHall::new().await;
    t.login("Alice", "secret1").await;
    t.login("Bob", "secret2").await;

    let out = t.line("Bob", "chat").await;
    assert_eq!(out, vec!["Chat off.".to_string()]);

    t.line("Alice", "chat you there?").await;
    let out = t.drain("Bob");
    assert_none_contains(&out, "Alice chats: you there?");

    // Archived regardless of who was enabled; replay is pull-based.
    let out = t.line("Bob", "chathistory").await;
    assert_any_contains(&out, "Alice chats: you there?");
}

#[tokio::test]
async fn test_send_with_no_enabled_recipients_still_archives() {
    let mut t = TestHall::new().await;
    let alice = t.login("Alice", "secret1").await;

    let chan = t.hall.create_channel("quiet", false);
    t.hall
        .channel_mut(chan)
        .expect("channel exists")
        .subscribe_with(alice, false);

    let delivered = t.hall.channel_send(
        chan,
        None,
        "echo in the void",
        &[],
    );
    assert_eq!(delivered, 0);
    assert_eq!(t.drain("Alice"), Vec::<String>::new());

    t.hall.channel_replay(chan, alice, 10);
    assert_any_contains(&t.drain("Alice"), "echo in the void");
}

#[tokio::test]
async fn test_self_excluding_channel_suppresses_sender_only() {
    let mut t = TestHall::new().await;
    let alice = t.login("Alice", "secret1").await;
    let bob = t.login("Bob", "secret2").await;

    let chan = t.hall.create_channel("side", true);
    t.hall.channel_mut(chan).expect("channel exists").subscribe(alice);
    t.hall.channel_mut(chan).expect("channel exists").subscribe(bob);

    let delivered = t.hall.channel_send(
        chan,
        Some(alice),
        "{player} waves",
        &[("player", "Alice".to_string())],
    );
    assert_eq!(delivered, 1);
    assert_none_contains(&t.drain("Alice"), "Alice waves");
    assert_any_contains(&t.drain("Bob"), "Alice waves");

    // Replay applies the same suppression: history keeps the entry for
    // others, never for the sender.
    t.hall.channel_replay(chan, alice, 10);
    t.hall.channel_replay(chan, bob, 10);
    assert_none_contains(&t.drain("Alice"), "Alice waves");
    assert_any_contains(&t.drain("Bob"), "Alice waves");
}

#[tokio::test]
async fn test_mutual_ignore_blocks_delivery_both_directions() {
    let mut t = TestHall::new().await;
    t.login("Alice", "secret1").await;
    t.login("Bob", "secret2").await;

    let out = t.line("Alice", "ignore Bob").await;
    assert_any_contains(&out, "Ignoring Bob.");

    // One-sided ignore suppresses both directions on broadcast.
    t.line("Bob", "chat hello all").await;
    assert_none_contains(&t.drain("Alice"), "hello all");
    t.line("Alice", "chat anyone?").await;
    assert_none_contains(&t.drain("Bob"), "anyone?");

    // Tells are refused up front, in either direction.
    let out = t.line("Alice", "tell Bob psst").await;
    assert_any_contains(&out, "You are ignoring Bob.");
    assert_none_contains(&t.drain("Bob"), "psst");

    let out = t.line("Bob", "tell Alice hey").await;
    assert_any_contains(&out, "Alice is ignoring you.");
    assert_none_contains(&t.drain("Alice"), "hey");

    // Lifting the ignore restores delivery.
    t.line("Alice", "ignore Bob").await;
    t.line("Bob", "chat friends again").await;
    assert_any_contains(&t.drain("Alice"), "friends again");
}

#[tokio::test]
async fn test_tell_history_includes_sent_echo() {
    let mut t = TestHall::new().await;
    t.login("Alice", "secret1").await;
    t.login("Bob", "secret2").await;

    t.line("Alice", "tell Bob remember this").await;
    t.drain("Bob");

    let out = t.line("Alice", "tellhistory").await;
    assert_any_contains(&out, "You tell Bob: remember this");

    let out = t.line("Bob", "tellhistory").await;
    assert_any_contains(&out, "Alice tells you: remember this");
}

#[tokio::test]
async fn test_unsubscribed_recipient_keeps_history_entries_for_others() {
    let mut t = TestHall::new().await;
    let alice = t.login("Alice", "secret1").await;
    t.login("Bob", "secret2").await;

    t.line("Alice", "chat before leaving").await;
    t.drain("Bob");

    let chat = t.hall.chat();
    t.hall
        .channel_mut(chat)
        .expect("chat channel exists")
        .unsubscribe(alice);

    // The departed sender no longer receives anything, but replay for
    // others still names them.
    t.line("Bob", "chat still here").await;
    assert_none_contains(&t.drain("Alice"), "still here");
    let out = t.line("Bob", "chathistory").await;
    assert_any_contains(&out, "Alice chats: before leaving");
}
