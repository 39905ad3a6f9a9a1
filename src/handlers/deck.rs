//! Deck management: persistence commands and the interactive browser.
//!
//! `deck edit` runs as a chained prompt: every accepted key re-installs
//! the browser for the next line, so the whole session stays inside the
//! one-shot prompt mechanism and the editing state travels with the
//! handler, never through globals.

use super::core::{Call, Command, CommandHandler, CommandTable, Mode, Prompt, PromptHandler};
use crate::error::{HandlerError, HandlerResult};
use crate::state::{Hall, PlayerId};
use async_trait::async_trait;
use std::sync::Arc;

pub(super) fn register(table: &mut CommandTable) {
    table.register(
        Command::new("deck", DeckCmd)
            .args(r"(\S+)(?:\s+(.*))?")
            .usage("Usage: deck <list/new/delete/rename/clear/check/edit> [name]")
            .guard(super::lobby::idle),
    );
}

struct DeckCmd;

#[async_trait]
impl CommandHandler for DeckCmd {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let id = call.player;
        let Some(account_id) = hall.player(id).and_then(|p| p.account_id) else {
            return Ok(());
        };
        let sub = call.args.get(0).unwrap_or("").to_string();
        let arg = call
            .args
            .get(1)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        match sub.as_str() {
            "list" => {
                let names = hall.db.decks().list_names(account_id).await?;
                if names.is_empty() {
                    hall.notify(id, "No decks.");
                } else {
                    hall.notify(id, format!("You own {} decks:", names.len()));
                    for name in names {
                        hall.notify(id, name);
                    }
                }
            }
            "check" => match arg {
                None => {
                    for name in hall.cards.banlist_names() {
                        hall.notify(id, name);
                    }
                }
                Some(banlist) => check_deck(hall, id, &banlist),
            },
            "new" => {
                let Some(name) = arg else {
                    return more_info(hall, id);
                };
                match hall.db.decks().create(account_id, &name).await {
                    Ok(_) => hall.notify(id, "Deck created."),
                    Err(crate::db::DbError::DeckExists(_)) => {
                        hall.notify(id, "That deck already exists.")
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            "clear" => {
                let Some(name) = arg else {
                    return more_info(hall, id);
                };
                if hall.db.decks().find(account_id, &name).await?.is_none() {
                    hall.notify(id, "Deck not found.");
                } else {
                    hall.db.decks().save_cards(account_id, &name, &[]).await?;
                    hall.notify(id, "Deck cleared.");
                }
            }
            "delete" => {
                let Some(name) = arg else {
                    return more_info(hall, id);
                };
                if hall.db.decks().delete(account_id, &name).await? {
                    hall.notify(id, "Deck deleted.");
                } else {
                    hall.notify(id, "Deck not found.");
                }
            }
            "rename" => {
                let Some(names) = arg else {
                    return more_info(hall, id);
                };
                rename_deck(hall, id, account_id, &names).await?;
            }
            "edit" => {
                let Some(name) = arg else {
                    return more_info(hall, id);
                };
                edit_deck(hall, id, account_id, &name).await?;
            }
            _ => hall.notify(id, "Invalid deck command."),
        }
        Ok(())
    }
}

fn more_info(hall: &Hall, id: PlayerId) -> HandlerResult {
    hall.notify(id, "This command requires more information to operate with.");
    Ok(())
}

/// Check the currently loaded deck against a named banlist.
fn check_deck(hall: &Hall, id: PlayerId, banlist: &str) {
    let deck = hall
        .player(id)
        .map(|p| p.deck.clone())
        .unwrap_or_default();
    let Some(violations) = hall.cards.banlist_violations(banlist, &deck) else {
        hall.notify(id, "Invalid entry.");
        return;
    };
    for v in &violations {
        hall.notify(id, format!("{}: limit {}, found {}.", v.name, v.limit, v.found));
    }
    hall.notify(id, format!("Check completed with {} errors.", violations.len()));
}

async fn rename_deck(
    hall: &mut Hall,
    id: PlayerId,
    account_id: i64,
    names: &str,
) -> HandlerResult {
    let Some((from, to)) = names.split_once('=') else {
        hall.notify(id, "Usage: deck rename <old>=<new>");
        return Ok(());
    };
    let (from, to) = (from.trim(), to.trim());
    if from.is_empty() || to.is_empty() {
        hall.notify(id, "Usage: deck rename <old>=<new>");
        return Ok(());
    }
    if to.contains('=') {
        hall.notify(id, "Deck names may not contain =.");
        return Ok(());
    }
    match hall.db.decks().rename(account_id, from, to).await {
        Ok(true) => hall.notify(id, "Deck renamed."),
        Ok(false) => hall.notify(id, "Deck not found."),
        Err(crate::db::DbError::DeckExists(_)) => {
            hall.notify(id, "Destination deck already exists.")
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Load (or begin) a deck and enter the interactive browser.
async fn edit_deck(hall: &mut Hall, id: PlayerId, account_id: i64, name: &str) -> HandlerResult {
    if hall.cards.is_empty() {
        hall.notify(id, "No cards available.");
        return Ok(());
    }
    let existing = hall.db.decks().find(account_id, name).await?;
    match existing {
        Some(deck) => {
            hall.notify(id, "Deck exists, loading.");
            let mut cards = deck.cards();
            let invalid = hall.cards.invalid_cards(&cards);
            if !invalid.is_empty() {
                cards.retain(|c| !invalid.contains(c));
                hall.notify(
                    id,
                    "Invalid cards were removed from this deck. This usually occurs after the server loading a new database which doesn't know those cards anymore.",
                );
            }
            if let Some(player) = hall.player_mut(id) {
                player.deck = cards;
            }
        }
        None => {
            hall.notify(id, format!("Creating new deck {name}."));
            if let Some(player) = hall.player_mut(id) {
                player.deck.clear();
            }
        }
    }
    let restore = hall
        .player(id)
        .map(|p| p.mode.clone())
        .unwrap_or_else(|| hall.modes.lobby.clone());
    let browser = Browser {
        account_id,
        deck_name: name.to_string(),
        pos: 0,
        last_search: String::new(),
        restore,
    };
    browser.install(hall, id);
    Ok(())
}

/// The deck-browser continuation. Carried from one prompt to the next;
/// every accepted key re-installs it.
struct Browser {
    account_id: i64,
    deck_name: String,
    pos: usize,
    last_search: String,
    restore: Arc<Mode>,
}

impl Browser {
    fn install(self, hall: &mut Hall, id: PlayerId) {
        self.show_current(hall, id);
        hall.notify(id, "u: up d: down /: search forward ?: search backward t: top");
        hall.notify(
            id,
            "s: send to deck r: remove from deck l: list deck g: go to card in deck q: quit",
        );
        hall.notify(id, "c: check deck against banlist");
        let deck = hall.player(id).map(|p| p.deck.clone()).unwrap_or_default();
        let (main, extra) = hall.cards.split_counts(&deck);
        let text =
            format!("Command ({main} cards in main deck, {extra} cards in extra deck):");
        let restore = self.restore.clone();
        hall.push_prompt(id, Prompt::new(text, "Deck editing aborted.", restore, self));
    }

    fn show_current(&self, hall: &Hall, id: PlayerId) {
        let Some(card) = hall.cards.at(self.pos) else {
            return;
        };
        let in_deck = hall
            .player(id)
            .map(|p| p.deck.iter().filter(|&&c| c == card.code).count())
            .unwrap_or(0);
        if in_deck > 0 {
            hall.notify(id, format!("{in_deck} in deck."));
        }
        if card.text.is_empty() {
            hall.notify(id, card.name);
        } else {
            hall.notify(id, format!("{}\n{}", card.name, card.text));
        }
    }

    async fn save(&self, hall: &mut Hall, id: PlayerId) -> HandlerResult {
        let deck = hall.player(id).map(|p| p.deck.clone()).unwrap_or_default();
        hall.db
            .decks()
            .save_cards(self.account_id, &self.deck_name, &deck)
            .await?;
        Ok(())
    }
}

/// Deck codes grouped in first-seen order with counts; the numbering the
/// l, r and g keys share.
fn grouped(deck: &[u32]) -> Vec<(u32, usize)> {
    let mut out: Vec<(u32, usize)> = Vec::new();
    for &code in deck {
        match out.iter_mut().find(|(c, _)| *c == code) {
            Some((_, count)) => *count += 1,
            None => out.push((code, 1)),
        }
    }
    out
}

#[async_trait]
impl PromptHandler for Browser {
    async fn feed(self: Box<Self>, hall: &mut Hall, id: PlayerId, line: &str) -> HandlerResult {
        let mut this = *self;
        let line = line.trim();
        let store_len = hall.cards.len();

        match line {
            "" => return Err(HandlerError::PromptAbort),
            "q" => {
                hall.notify(id, "Quit.");
                return Ok(());
            }
            "d" => {
                if this.pos + 1 >= store_len {
                    this.pos = store_len.saturating_sub(1);
                    hall.notify(id, "Bottom of list.");
                } else {
                    this.pos += 1;
                }
            }
            "u" => {
                if this.pos == 0 {
                    hall.notify(id, "Top of list.");
                } else {
                    this.pos -= 1;
                }
            }
            "t" => {
                hall.notify(id, "Top.");
                this.pos = 0;
            }
            "s" => {
                if let Some(card) = hall.cards.at(this.pos) {
                    let copies = hall
                        .player(id)
                        .map(|p| p.deck.iter().filter(|&&c| c == card.code).count())
                        .unwrap_or(0);
                    if copies >= 3 {
                        hall.notify(id, "You already have 3 of this card in your deck.");
                    } else {
                        if let Some(player) = hall.player_mut(id) {
                            player.deck.push(card.code);
                        }
                        this.save(hall, id).await?;
                    }
                }
            }
            "l" => {
                let deck = hall.player(id).map(|p| p.deck.clone()).unwrap_or_default();
                for (i, (code, count)) in grouped(&deck).iter().enumerate() {
                    let name = hall
                        .cards
                        .get(*code)
                        .map(|c| c.name)
                        .unwrap_or_else(|| code.to_string());
                    if *count > 1 {
                        hall.notify(id, format!("{}: {} (x {})", i + 1, name, count));
                    } else {
                        hall.notify(id, format!("{}: {}", i + 1, name));
                    }
                }
            }
            _ if line.starts_with('r') => {
                let deck = hall.player(id).map(|p| p.deck.clone()).unwrap_or_default();
                let groups = grouped(&deck);
                let code = match line[1..].trim().parse::<usize>() {
                    Ok(n) if (1..=groups.len()).contains(&n) => Some(groups[n - 1].0),
                    Ok(_) => {
                        hall.notify(id, "Invalid card.");
                        this.install(hall, id);
                        return Ok(());
                    }
                    Err(_) => hall.cards.at(this.pos).map(|c| c.code),
                };
                match code.filter(|c| deck.contains(c)) {
                    Some(code) => {
                        if let Some(player) = hall.player_mut(id) {
                            if let Some(at) = player.deck.iter().position(|&c| c == code) {
                                player.deck.remove(at);
                            }
                        }
                        let name = hall
                            .cards
                            .get(code)
                            .map(|c| c.name)
                            .unwrap_or_else(|| code.to_string());
                        hall.notify(id, format!("Removed {name} from your deck."));
                        this.save(hall, id).await?;
                    }
                    None => hall.notify(id, "This card isn't in your deck."),
                }
            }
            _ if line.starts_with('g') => {
                let deck = hall.player(id).map(|p| p.deck.clone()).unwrap_or_default();
                let groups = grouped(&deck);
                match line[1..].trim().parse::<usize>() {
                    Ok(n) if (1..=groups.len()).contains(&n) => {
                        if let Some(pos) = hall.cards.position_of(groups[n - 1].0) {
                            this.pos = pos;
                        }
                    }
                    _ => hall.notify(id, "Invalid card."),
                }
            }
            _ if line.starts_with('/') => {
                let text = search_text(&mut this, &line[1..]);
                let start = (this.pos + 1) % store_len.max(1);
                match hall.cards.find_next(&text, start) {
                    Some(pos) => this.pos = pos,
                    None => hall.notify(id, "Not found."),
                }
            }
            _ if line.starts_with('?') => {
                let text = search_text(&mut this, &line[1..]);
                let start = if this.pos == 0 {
                    store_len.saturating_sub(1)
                } else {
                    this.pos - 1
                };
                match hall.cards.find_prev(&text, start) {
                    Some(pos) => this.pos = pos,
                    None => hall.notify(id, "Not found."),
                }
            }
            _ if line.starts_with('c') => {
                let banlist = line[1..].trim();
                if banlist.is_empty() {
                    for name in hall.cards.banlist_names() {
                        hall.notify(id, name);
                    }
                } else {
                    check_deck(hall, id, banlist);
                }
            }
            _ => hall.notify(id, "Invalid command."),
        }

        this.install(hall, id);
        Ok(())
    }
}

fn search_text(browser: &mut Browser, typed: &str) -> String {
    let typed = typed.trim();
    if typed.is_empty() {
        browser.last_search.clone()
    } else {
        browser.last_search = typed.to_string();
        typed.to_string()
    }
}
