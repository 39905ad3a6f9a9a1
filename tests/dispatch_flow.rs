//! Scenario tests for command dispatch: resolution, aliases,
//! authorization and the login flow.

mod common;

use common::{TestHall, assert_any_contains};

#[tokio::test]
async fn test_unknown_command_gets_mode_response() {
    let mut t = TestHall::new().await;
    t.login("Alice", "secret1").await;

    let out = t.line("Alice", "frobnicate").await;
    assert_eq!(out, vec!["Huh?".to_string()]);

    // Session state is untouched: the next valid command still works.
    let out = t.line("Alice", "echo still here").await;
    assert_eq!(out, vec!["still here".to_string()]);
}

#[tokio::test]
async fn test_unauthorized_is_indistinguishable_from_unknown() {
    let mut t = TestHall::new().await;
    t.login("Alice", "secret1").await;

    // `announce` exists but is admin-guarded; Alice is not an admin.
    let guarded = t.line("Alice", "announce big news").await;
    let unknown = t.line("Alice", "nosuchcommand big news").await;
    assert_eq!(guarded, unknown);
    assert_eq!(guarded, vec!["Huh?".to_string()]);
}

#[tokio::test]
async fn test_admin_guard_admits_configured_admin() {
    let mut t = TestHall::new().await;
    t.login("Admin", "secret1").await;
    t.login("Bob", "secret2").await;

    t.line("Admin", "announce server restarts soon").await;
    let out = t.drain("Bob");
    assert_any_contains(&out, "Announcement: server restarts soon");
}

#[tokio::test]
async fn test_alias_resolves_to_same_command() {
    let mut t = TestHall::new().await;
    t.login("Alice", "secret1").await;
    t.login("Bob", "secret2").await;

    t.line("Alice", "t Bob hi there").await;
    let out = t.drain("Bob");
    assert_any_contains(&out, "Alice tells you: hi there");
}

#[tokio::test]
async fn test_empty_argument_is_distinct_from_no_match() {
    let mut t = TestHall::new().await;
    t.login("Alice", "secret1").await;

    // `chat` with no text toggles rather than sending an empty message.
    let out = t.line("Alice", "chat").await;
    assert_eq!(out, vec!["Chat off.".to_string()]);
    let out = t.line("Alice", "chat").await;
    assert_eq!(out, vec!["Chat on.".to_string()]);
}

#[tokio::test]
async fn test_malformed_arguments_use_usage_message() {
    let mut t = TestHall::new().await;
    t.login("Alice", "secret1").await;

    let out = t.line("Alice", "tell").await;
    assert_eq!(out, vec!["Usage: tell <player> <message>".to_string()]);
}

#[tokio::test]
async fn test_duplicate_nick_is_rejected_at_login() {
    let mut t = TestHall::new().await;
    t.login("Alice", "secret1").await;

    let (tx, mut rx) = tokio::sync::mpsc::channel(64);
    let id = t.hall.connect(uuid::Uuid::new_v4(), tx);
    t.hall.handle_line(id, "Alice").await;
    let mut lines = Vec::new();
    while let Ok(line) = rx.try_recv() {
        lines.push(line);
    }
    assert_any_contains(&lines, "That player is already logged in.");
}

#[tokio::test]
async fn test_reply_targets_last_teller() {
    let mut t = TestHall::new().await;
    t.login("Alice", "secret1").await;
    t.login("Bob", "secret2").await;

    t.line("Alice", "tell Bob ping").await;
    t.drain("Bob");
    t.line("Bob", "reply pong").await;
    let out = t.drain("Alice");
    assert_any_contains(&out, "Bob tells you: pong");
}

#[tokio::test]
async fn test_afk_warning_on_tell() {
    let mut t = TestHall::new().await;
    t.login("Alice", "secret1").await;
    t.login("Bob", "secret2").await;

    t.line("Bob", "afk").await;
    let out = t.line("Alice", "tell Bob you there?").await;
    assert_any_contains(&out, "Bob is AFK and may not be paying attention.");
    // Delivery still happens.
    let out = t.drain("Bob");
    assert_any_contains(&out, "Alice tells you: you there?");
}
