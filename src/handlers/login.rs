//! Connect-time login flow.
//!
//! A prompt chain walks a fresh connection through nickname and password,
//! creating the account on first sight. Nothing else is dispatchable
//! until the chain completes; abandoning the connection mid-chain just
//! discards the pending prompt.

use super::core::{Prompt, PromptHandler};
use crate::db::{Account, verify_password};
use crate::error::HandlerResult;
use crate::state::{DuelRules, Hall, Lang, PlayerId};
use async_trait::async_trait;
use tracing::info;
use zeroize::Zeroizing;

const MAX_ATTEMPTS: u8 = 3;
const ABORT: &str = "Login aborted.";

/// Greet a fresh connection and ask for a nickname.
pub fn begin_login(hall: &mut Hall, id: PlayerId) {
    let greeting = format!("Welcome to {}.", hall.config.server.name);
    hall.notify(id, greeting);
    prompt_nick(hall, id, 0);
}

fn prompt_nick(hall: &mut Hall, id: PlayerId, attempts: u8) {
    let restore = hall.modes.login.clone();
    hall.push_prompt(
        id,
        Prompt::new("Nickname:", ABORT, restore, NickStep { attempts }),
    );
}

fn valid_nick(nick: &str) -> bool {
    let mut chars = nick.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (3..=16).contains(&nick.len())
        && first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric())
}

struct NickStep {
    attempts: u8,
}

#[async_trait]
impl PromptHandler for NickStep {
    async fn feed(self: Box<Self>, hall: &mut Hall, id: PlayerId, line: &str) -> HandlerResult {
        let nick = line.trim();
        if !valid_nick(nick) {
            hall.notify(
                id,
                "Nicknames are 3 to 16 letters and digits, starting with a letter.",
            );
            return retry_nick(hall, id, self.attempts);
        }
        if hall.by_nick(nick).is_some() {
            hall.notify(id, "That player is already logged in.");
            return retry_nick(hall, id, self.attempts);
        }
        let account = hall.db.accounts().find_by_name(nick).await?;
        match account {
            Some(account) => {
                let restore = hall.modes.login.clone();
                hall.push_prompt(
                    id,
                    Prompt::new(
                        "Password:",
                        ABORT,
                        restore,
                        PasswordStep {
                            account,
                            attempts: 0,
                        },
                    ),
                );
            }
            None => {
                hall.notify(id, format!("Creating new account {nick}."));
                let restore = hall.modes.login.clone();
                hall.push_prompt(
                    id,
                    Prompt::new(
                        "Enter a password:",
                        ABORT,
                        restore,
                        NewAccountStep {
                            nick: nick.to_string(),
                        },
                    ),
                );
            }
        }
        Ok(())
    }
}

fn retry_nick(hall: &mut Hall, id: PlayerId, attempts: u8) -> HandlerResult {
    let attempts = attempts + 1;
    if attempts >= MAX_ATTEMPTS {
        hall.notify(id, "Goodbye.");
        hall.close_player(id);
    } else {
        prompt_nick(hall, id, attempts);
    }
    Ok(())
}

struct PasswordStep {
    account: Account,
    attempts: u8,
}

#[async_trait]
impl PromptHandler for PasswordStep {
    async fn feed(self: Box<Self>, hall: &mut Hall, id: PlayerId, line: &str) -> HandlerResult {
        if verify_password(line, &self.account.password_hash) {
            return finish_login(hall, id, self.account).await;
        }
        hall.notify(id, "Incorrect password.");
        let attempts = self.attempts + 1;
        if attempts >= MAX_ATTEMPTS {
            hall.notify(id, "Goodbye.");
            hall.close_player(id);
            return Ok(());
        }
        let restore = hall.modes.login.clone();
        hall.push_prompt(
            id,
            Prompt::new(
                "Password:",
                ABORT,
                restore,
                PasswordStep {
                    account: self.account,
                    attempts,
                },
            ),
        );
        Ok(())
    }
}

struct NewAccountStep {
    nick: String,
}

#[async_trait]
impl PromptHandler for NewAccountStep {
    async fn feed(self: Box<Self>, hall: &mut Hall, id: PlayerId, line: &str) -> HandlerResult {
        if line.len() < 6 {
            hall.notify(id, "Passwords must be at least 6 characters.");
            let restore = hall.modes.login.clone();
            hall.push_prompt(
                id,
                Prompt::new("Enter a password:", ABORT, restore, *self),
            );
            return Ok(());
        }
        let restore = hall.modes.login.clone();
        hall.push_prompt(
            id,
            Prompt::new(
                "Confirm password:",
                ABORT,
                restore,
                ConfirmAccountStep {
                    nick: self.nick,
                    password: Zeroizing::new(line.to_string()),
                },
            ),
        );
        Ok(())
    }
}

struct ConfirmAccountStep {
    nick: String,
    password: Zeroizing<String>,
}

#[async_trait]
impl PromptHandler for ConfirmAccountStep {
    async fn feed(self: Box<Self>, hall: &mut Hall, id: PlayerId, line: &str) -> HandlerResult {
        if line != self.password.as_str() {
            hall.notify(id, "Passwords don't match.");
            let restore = hall.modes.login.clone();
            hall.push_prompt(
                id,
                Prompt::new(
                    "Enter a password:",
                    ABORT,
                    restore,
                    NewAccountStep { nick: self.nick },
                ),
            );
            return Ok(());
        }
        let account = hall.db.accounts().create(&self.nick, &self.password).await?;
        finish_login(hall, id, account).await
    }
}

/// Bind the session to its account and drop it into the lobby.
async fn finish_login(hall: &mut Hall, id: PlayerId, account: Account) -> HandlerResult {
    let nick = account.name.clone();
    hall.bind_nick(id, &nick);

    let ignores = hall.db.ignores().list(account.id).await?;
    let is_admin = hall
        .config
        .server
        .admins
        .iter()
        .any(|a| a.eq_ignore_ascii_case(&nick));
    let lobby = hall.modes.lobby.clone();
    if let Some(player) = hall.player_mut(id) {
        player.account_id = Some(account.id);
        player.lang = Lang::from_code(&account.language).unwrap_or_default();
        player.is_admin = is_admin;
        player.ignores = ignores.into_iter().map(|n| n.to_lowercase()).collect();
        player.saved_banlist = account.banlist.clone();
        player.saved_rules = DuelRules::from_stored(account.duel_rules);
        player.mode = lobby;
    }

    let chat = hall.chat();
    let announce = hall.announce();
    if let Some(channel) = hall.channel_mut(chat) {
        channel.subscribe(id);
    }
    if let Some(channel) = hall.channel_mut(announce) {
        channel.subscribe(id);
    }

    if let Some(motd) = hall.config.server.motd.clone() {
        hall.notify(id, motd);
    }
    let count = hall.online_count();
    hall.notify(id, format!("Hello, {nick}. {count} players online."));
    info!(player = id.0, nick = %nick, "Login complete");
    Ok(())
}
