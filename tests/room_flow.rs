//! Scenario tests for the room lifecycle and the hand-off into a duel.

mod common;

use common::{TestHall, assert_any_contains, assert_none_contains};
use std::sync::atomic::Ordering;

/// Walk two players through create/finish/join/move/deck/start.
async fn stage_duel(t: &mut TestHall) {
    t.line("Alice", "create").await;
    t.line("Alice", "finish").await;
    t.line("Bob", "join Alice").await;
    t.drain("Alice");
    t.line("Alice", "move 1").await;
    t.line("Bob", "move 2").await;
    t.give_deck("Alice", "main").await;
    t.give_deck("Bob", "main").await;
    t.line("Alice", "deck main").await;
    t.line("Bob", "deck main").await;
    t.drain("Alice");
    t.drain("Bob");
}

#[tokio::test]
async fn test_room_setup_blocks_joiners_until_finished() {
    let mut t = TestHall::new().await;
    t.login("Alice", "secret1").await;
    t.login("Bob", "secret2").await;

    t.line("Alice", "create").await;
    let out = t.line("Bob", "join Alice").await;
    assert_any_contains(
        &out,
        "This player currently doesn't prepare to duel or you may not enter the room.",
    );

    t.line("Alice", "finish").await;
    let out = t.line("Bob", "join Alice").await;
    assert_any_contains(&out, "Enter ? to show all commands");
    assert_any_contains(&t.drain("Alice"), "Bob joined the room.");
}

#[tokio::test]
async fn test_finish_announces_public_room_once() {
    let mut t = TestHall::new().await;
    t.login("Alice", "secret1").await;
    t.login("Carol", "secret3").await;

    t.line("Alice", "create").await;
    t.line("Alice", "finish").await;
    let out = t.drain("Carol");
    let announcements = out
        .iter()
        .filter(|l| l.contains("Alice created a new duel room."))
        .count();
    assert_eq!(announcements, 1);
}

#[tokio::test]
async fn test_private_room_needs_invitation() {
    let mut t = TestHall::new().await;
    t.login("Alice", "secret1").await;
    t.login("Bob", "secret2").await;
    t.login("Carol", "secret3").await;

    t.line("Alice", "create").await;
    let out = t.line("Alice", "private").await;
    assert_any_contains(&out, "This room is now private.");
    t.line("Alice", "finish").await;

    // No public announcement for a private room.
    assert_none_contains(&t.drain("Carol"), "created a new duel room");

    let out = t.line("Bob", "join Alice").await;
    assert_any_contains(
        &out,
        "This player currently doesn't prepare to duel or you may not enter the room.",
    );

    t.line("Alice", "invite Bob").await;
    assert_any_contains(&t.drain("Bob"), "invites you to join his duel room");
    let out = t.line("Bob", "join Alice").await;
    assert_any_contains(&out, "Enter ? to show all commands");
}

#[tokio::test]
async fn test_move_semantics() {
    let mut t = TestHall::new().await;
    t.login("Alice", "secret1").await;

    t.line("Alice", "create").await;
    t.line("Alice", "finish").await;
    t.line("Alice", "move 2").await;
    let out = t.line("Alice", "teams").await;
    assert_any_contains(&out, "Players in team 2: Alice");

    // Back to the pool, from any team.
    let out = t.line("Alice", "move 0").await;
    assert_any_contains(&out, "You were removed from any team.");
    let out = t.line("Alice", "teams").await;
    assert_any_contains(&out, "Players not yet in a team: Alice");
}

#[tokio::test]
async fn test_start_rejections_leave_room_untouched() {
    let mut t = TestHall::new().await;
    t.login("Alice", "secret1").await;
    t.login("Bob", "secret2").await;

    t.line("Alice", "create").await;
    t.line("Alice", "finish").await;
    t.line("Bob", "join Alice").await;
    t.drain("Alice");

    // Nobody assigned: empty teams.
    let out = t.line("Alice", "start").await;
    assert_any_contains(&out, "Both teams may only have one or two players.");

    // Uneven teams.
    t.line("Alice", "move 1").await;
    let out = t.line("Alice", "start").await;
    assert_any_contains(&out, "Both teams must have the same amount of players.");

    // Equal teams, but a missing deck.
    t.line("Bob", "move 2").await;
    t.drain("Alice");
    let out = t.line("Alice", "start").await;
    assert_any_contains(&out, "doesn't have a deck loaded yet.");

    // Rejection mutated nothing: assignment intact, no engine start.
    let out = t.line("Alice", "teams").await;
    assert_any_contains(&out, "Players in team 1: Alice");
    assert_any_contains(&out, "Players in team 2: Bob");
    assert_eq!(t.engine_started.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_handoff_creates_duel_and_destroys_room() {
    let mut t = TestHall::new().await;
    t.login("Alice", "secret1").await;
    t.login("Bob", "secret2").await;
    t.login("Carol", "secret3").await;
    stage_duel(&mut t).await;

    let out = t.line("Alice", "start").await;
    assert_any_contains(&out, "You start the duel.");
    assert_any_contains(&t.drain("Bob"), "Alice starts the duel.");
    assert_any_contains(
        &t.drain("Carol"),
        "The duel between Alice and Bob has begun!",
    );

    assert_eq!(t.engine_started.load(Ordering::SeqCst), 1);
    let alice = t.id("Alice");
    let bob = t.id("Bob");
    assert!(t.hall.room_of(alice).is_none());
    assert!(t.hall.room_of(bob).is_none());
    assert!(t.hall.duel_of(alice).is_some());
    assert_eq!(t.hall.duel_of(alice), t.hall.duel_of(bob));

    // Both now answer to the duel mode.
    let out = t.line("Alice", "watchers").await;
    assert_any_contains(&out, "No one is watching this duel.");
}

#[tokio::test]
async fn test_pool_players_become_watchers_on_handoff() {
    let mut t = TestHall::new().await;
    t.login("Alice", "secret1").await;
    t.login("Bob", "secret2").await;
    t.login("Carol", "secret3").await;
    stage_duel(&mut t).await;

    // Carol joins the open room but stays in the pool.
    t.line("Carol", "join Alice").await;
    t.drain("Alice");
    t.drain("Bob");

    t.line("Alice", "start").await;
    let carol = t.id("Carol");
    assert!(t.hall.duel_of(carol).is_some());
    assert!(t.hall.player(carol).is_some_and(|p| p.watching));

    let out = t.line("Alice", "watchers").await;
    assert_any_contains(&out, "People watching this duel:");
    assert_any_contains(&out, "Carol");
}

#[tokio::test]
async fn test_watch_attach_and_detach() {
    let mut t = TestHall::new().await;
    t.login("Alice", "secret1").await;
    t.login("Bob", "secret2").await;
    t.login("Carol", "secret3").await;
    stage_duel(&mut t).await;
    t.line("Alice", "start").await;
    t.drain("Alice");
    t.drain("Bob");
    t.drain("Carol");

    let out = t.line("Carol", "watch Alice").await;
    assert_any_contains(&out, "You are now watching this duel.");
    assert_any_contains(&t.drain("Alice"), "Carol is now watching this duel.");

    let out = t.line("Carol", "watch stop").await;
    assert_any_contains(&out, "You are no longer watching this duel.");
    assert_any_contains(&t.drain("Bob"), "Carol stopped watching this duel.");
    assert!(t.hall.duel_of(t.id("Carol")).is_none());
}

#[tokio::test]
async fn test_giveup_ends_duel_and_restores_lobby() {
    let mut t = TestHall::new().await;
    t.login("Alice", "secret1").await;
    t.login("Bob", "secret2").await;
    t.login("Carol", "secret3").await;
    stage_duel(&mut t).await;
    t.line("Alice", "start").await;
    t.drain("Alice");
    t.drain("Bob");
    t.drain("Carol");

    let out = t.line("Bob", "giveup").await;
    assert_any_contains(&out, "Bob has ended the duel.");
    assert_any_contains(
        &t.drain("Carol"),
        "Bob has cowardly submitted to Alice.",
    );
    assert_eq!(t.engine_ended.load(Ordering::SeqCst), 1);

    let alice = t.id("Alice");
    assert!(t.hall.duel_of(alice).is_none());
    // Back in the lobby mode.
    let out = t.line("Alice", "echo lobby again").await;
    assert_eq!(out, vec!["lobby again".to_string()]);
}

#[tokio::test]
async fn test_creator_leave_closes_room() {
    let mut t = TestHall::new().await;
    t.login("Alice", "secret1").await;
    t.login("Bob", "secret2").await;

    t.line("Alice", "create").await;
    t.line("Alice", "finish").await;
    t.line("Bob", "join Alice").await;
    t.drain("Alice");

    let out = t.line("Alice", "leave").await;
    assert_any_contains(&out, "You closed the room.");
    assert_any_contains(&t.drain("Bob"), "The room was closed.");
    assert!(t.hall.room_of(t.id("Alice")).is_none());
    assert!(t.hall.room_of(t.id("Bob")).is_none());

    // Both answer to the lobby again.
    let out = t.line("Bob", "echo free").await;
    assert_eq!(out, vec!["free".to_string()]);
}

#[tokio::test]
async fn test_say_is_scoped_to_the_room_channel() {
    let mut t = TestHall::new().await;
    t.login("Alice", "secret1").await;
    t.login("Bob", "secret2").await;
    t.login("Carol", "secret3").await;

    t.line("Alice", "create").await;
    t.line("Alice", "finish").await;
    t.line("Bob", "join Alice").await;
    t.drain("Alice");

    t.line("Alice", "say table talk").await;
    assert_any_contains(&t.drain("Bob"), "Alice says: table talk");
    assert_none_contains(&t.drain("Carol"), "table talk");

    // Say in the lobby is not a visible command.
    let out = t.line("Carol", "say hello?").await;
    assert_eq!(out, vec!["Huh?".to_string()]);

    // Replay through the room's own channel.
    let out = t.line("Bob", "sayhistory").await;
    assert_any_contains(&out, "Alice says: table talk");
}
