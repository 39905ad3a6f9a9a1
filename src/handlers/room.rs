//! Room mode: configuring, staffing and starting a duel.

use super::core::{Call, Command, CommandHandler, CommandTable};
use crate::engine::DuelSetup;
use crate::error::HandlerResult;
use crate::state::{Duel, DuelRules, Hall, PlayerId, RoomState};
use async_trait::async_trait;
use tracing::info;

pub(super) fn table() -> CommandTable {
    let mut t = CommandTable::new();
    t.register(Command::new("?", Settings));
    t.register(Command::new("finish", Finish).guard(setup_creator));
    t.register(Command::new("leave", Leave));
    t.register(
        Command::new("banlist", Banlist)
            .args(r"([a-zA-Z0-9\.\- ]+)?")
            .guard(setup_creator),
    );
    t.register(Command::new("teams", Teams).guard(room_open));
    t.register(Command::new("move", Move).args(r"([0-2])?").guard(room_open));
    t.register(Command::new("private", Private).guard(setup_creator));
    t.register(
        Command::new("rules", Rules)
            .args(r"([a-zA-Z]+)?")
            .guard(setup_creator),
    );
    t.register(Command::new("deck", LoadDeck).args(r"(.+)?").guard(room_open));
    t.register(Command::new("start", Start).guard(open_creator));
    t.register(
        Command::new("invite", Invite)
            .args(r"([A-Za-z][A-Za-z0-9]*)?")
            .guard(open_creator),
    );
    t.register(
        Command::new("lifepoints", Lifepoints)
            .args(r"([1-2])\s+(\d+)")
            .usage("Usage: lifepoints <team> <lp>")
            .guard(setup_creator),
    );
    t.register(Command::new("save", Save));
    t
}

/// The room mode's post-dispatch hook: keep the contextual help visible.
pub(super) fn reprompt(hall: &mut Hall, id: PlayerId) {
    hall.notify(id, "Enter ? to show all commands and room preferences");
}

// ----------------------------------------------------------------------
// Guards
// ----------------------------------------------------------------------

fn setup_creator(hall: &Hall, id: PlayerId) -> bool {
    hall.room_of(id)
        .and_then(|r| hall.room(r))
        .is_some_and(|room| room.state == RoomState::Setup && room.is_creator(id))
}

fn room_open(hall: &Hall, id: PlayerId) -> bool {
    hall.room_of(id)
        .and_then(|r| hall.room(r))
        .is_some_and(|room| room.is_open())
}

fn open_creator(hall: &Hall, id: PlayerId) -> bool {
    hall.room_of(id)
        .and_then(|r| hall.room(r))
        .is_some_and(|room| room.is_open() && room.is_creator(id))
}

// ----------------------------------------------------------------------
// Handlers
// ----------------------------------------------------------------------

struct Settings;

#[async_trait]
impl CommandHandler for Settings {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let id = call.player;
        let Some(room_id) = hall.room_of(id) else {
            return Ok(());
        };
        let Some(room) = hall.room(room_id) else {
            return Ok(());
        };
        let is_creator = room.is_creator(id);
        let open = room.is_open();

        let mut lines = vec![
            "The following settings are defined for this room:".to_string(),
            format!("Banlist: {}", room.banlist),
            format!("Duel Rules: {}", room.rules.label()),
            format!(
                "Lifepoints - team 1: {}, team 2: {}",
                room.lifepoints[0], room.lifepoints[1]
            ),
            format!(
                "Privacy: {}",
                if room.private { "private" } else { "public" }
            ),
            "The following commands are available for you:".to_string(),
        ];
        if !open {
            lines.push("banlist - define banlist".to_string());
            lines.push("finish - finish room creation and open it to other players".to_string());
            lines.push("lifepoints - set lifepoints per team".to_string());
            lines.push("private - toggles privacy".to_string());
            lines.push("rules - define duel rules".to_string());
            lines.push("save - save settings for all your future rooms".to_string());
        } else {
            lines.push("deck - select a deck to duel with".to_string());
            lines.push("move - move yourself into a team of your choice".to_string());
            lines.push("teams - show teams and associated players".to_string());
            if is_creator {
                lines.push("invite - invite player into this room".to_string());
                lines.push("start - start duel with current teams".to_string());
            }
        }
        if is_creator {
            lines.push("leave - leave this room and close it".to_string());
        } else {
            lines.push("leave - leave this room".to_string());
        }
        for line in lines {
            hall.notify(id, line);
        }
        Ok(())
    }
}

struct Finish;

#[async_trait]
impl CommandHandler for Finish {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let id = call.player;
        let Some(room_id) = hall.room_of(id) else {
            return Ok(());
        };
        let private = {
            let Some(room) = hall.room_mut(room_id) else {
                return Ok(());
            };
            room.state = RoomState::Open;
            room.private
        };
        hall.notify(id, "You finished the room setup.");
        if private {
            hall.notify(id, "You can now invite players to join this room.");
        } else {
            hall.notify(
                id,
                "Players can now join this room, or you can invite them to join you.",
            );
            let nick = hall.nick_of(id);
            let announce = hall.announce();
            hall.channel_send(
                announce,
                None,
                "{player} created a new duel room.",
                &[("player", nick)],
            );
        }
        Ok(())
    }
}

struct Leave;

#[async_trait]
impl CommandHandler for Leave {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        hall.leave_room(call.player);
        Ok(())
    }
}

struct Banlist;

#[async_trait]
impl CommandHandler for Banlist {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let id = call.player;
        let Some(room_id) = hall.room_of(id) else {
            return Ok(());
        };
        let Some(name) = call.args.get(0).map(|s| s.trim().to_string()) else {
            hall.notify(id, "You can set the banlist to none or one of the following:");
            for name in hall.cards.banlist_names() {
                hall.notify(id, name);
            }
            return Ok(());
        };
        if name != "none" && !hall.cards.has_banlist(&name) {
            hall.notify(
                id,
                "This game doesn't know this banlist. Check the banlist command to get all possible arguments to this command.",
            );
            return Ok(());
        }
        if let Some(room) = hall.room_mut(room_id) {
            room.banlist = name.clone();
        }
        hall.notify(id, format!("The banlist for this room was set to {name}."));
        Ok(())
    }
}

struct Teams;

#[async_trait]
impl CommandHandler for Teams {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let id = call.player;
        let Some(room) = hall.room_of(id).and_then(|r| hall.room(r)) else {
            return Ok(());
        };
        let mut lines = Vec::new();
        for team in 1..=2 {
            if room.teams[team].is_empty() {
                lines.push(format!("No players in team {team}."));
            } else {
                let nicks: Vec<String> = room.teams[team]
                    .iter()
                    .map(|&p| hall.nick_of(p))
                    .collect();
                lines.push(format!("Players in team {team}: {}", nicks.join(", ")));
            }
        }
        if room.teams[0].is_empty() {
            lines.push("No remaining players in this room.".to_string());
        } else {
            let nicks: Vec<String> = room.teams[0].iter().map(|&p| hall.nick_of(p)).collect();
            lines.push(format!("Players not yet in a team: {}", nicks.join(", ")));
        }
        for line in lines {
            hall.notify(id, line);
        }
        Ok(())
    }
}

struct Move;

#[async_trait]
impl CommandHandler for Move {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let id = call.player;
        let Some(room_id) = hall.room_of(id) else {
            return Ok(());
        };
        let Some(team) = call.args.get(0).and_then(|s| s.parse::<usize>().ok()) else {
            hall.notify(
                id,
                "You can move yourself into team 0, 1 or 2, where 0 means that you remove yourself from any team.",
            );
            return Ok(());
        };
        let members = {
            let Some(room) = hall.room_mut(room_id) else {
                return Ok(());
            };
            room.move_player(id, team);
            room.members()
        };
        let nick = hall.nick_of(id);
        for member in members {
            let text = if member == id {
                if team == 0 {
                    "You were removed from any team.".to_string()
                } else {
                    format!("You were moved into team {team}.")
                }
            } else if team == 0 {
                format!("{nick} was removed from any team.")
            } else {
                format!("{nick} was moved into team {team}.")
            };
            hall.notify(member, text);
        }
        Ok(())
    }
}

struct Private;

#[async_trait]
impl CommandHandler for Private {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let id = call.player;
        let Some(room_id) = hall.room_of(id) else {
            return Ok(());
        };
        let private = {
            let Some(room) = hall.room_mut(room_id) else {
                return Ok(());
            };
            room.private = !room.private;
            room.private
        };
        if private {
            hall.notify(id, "This room is now private.");
        } else {
            hall.notify(id, "This room is now public.");
        }
        Ok(())
    }
}

struct Rules;

#[async_trait]
impl CommandHandler for Rules {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let id = call.player;
        let Some(room_id) = hall.room_of(id) else {
            return Ok(());
        };
        let Some(name) = call.args.get(0).map(|s| s.trim().to_lowercase()) else {
            hall.notify(id, "Following rules can be defined:");
            hall.notify(
                id,
                "Default - The default duelling behaviour before link summons came in",
            );
            hall.notify(id, "Link - Enable link summons");
            hall.notify(id, "Traditional - Duel rules from the first days of the game");
            return Ok(());
        };
        let Some(rules) = DuelRules::from_name(&name) else {
            hall.notify(
                id,
                "Invalid duel rules specified. See rules command to get the possible arguments.",
            );
            return Ok(());
        };
        if let Some(room) = hall.room_mut(room_id) {
            room.rules = rules;
        }
        hall.notify(id, format!("Duel rules were set to {}.", rules.label()));
        Ok(())
    }
}

struct LoadDeck;

#[async_trait]
impl CommandHandler for LoadDeck {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let id = call.player;
        let Some(room_id) = hall.room_of(id) else {
            return Ok(());
        };
        let Some(account_id) = hall.player(id).and_then(|p| p.account_id) else {
            return Ok(());
        };
        let Some(name) = call.args.get(0).map(|s| s.trim().to_string()) else {
            let names = hall.db.decks().list_names(account_id).await?;
            if names.is_empty() {
                hall.notify(id, "No decks.");
            } else {
                hall.notify(id, format!("You own {} decks:", names.len()));
                for name in names {
                    hall.notify(id, name);
                }
            }
            return Ok(());
        };

        // A "public/" prefix loads from the shared Public account instead.
        let (owner, deck_name) = match name.strip_prefix("public/") {
            Some(rest) => match hall.db.accounts().find_by_name("Public").await? {
                Some(public) => (public.id, rest.to_string()),
                None => {
                    hall.notify(id, "Deck doesn't exist.");
                    return Ok(());
                }
            },
            None => (account_id, name.clone()),
        };
        let Some(deck) = hall.db.decks().find(owner, &deck_name).await? else {
            hall.notify(id, "Deck doesn't exist.");
            return Ok(());
        };

        let mut cards = deck.cards();
        let invalid = hall.cards.invalid_cards(&cards);
        if !invalid.is_empty() {
            cards.retain(|c| !invalid.contains(c));
            hall.notify(
                id,
                "Invalid cards were removed from this deck. This usually occurs after the server loading a new database which doesn't know those cards anymore.",
            );
        }

        let (main, extra) = hall.cards.split_counts(&cards);
        if !(40..=200).contains(&main) {
            hall.notify(
                id,
                format!("Your main deck must contain between 40 and 200 cards (currently {main})."),
            );
            return Ok(());
        }
        if extra > 15 {
            hall.notify(
                id,
                format!("Your extra deck may not contain more than 15 cards (currently {extra})."),
            );
            return Ok(());
        }

        let banlist = hall
            .room(room_id)
            .map(|r| r.banlist.clone())
            .unwrap_or_default();
        if banlist != "none" {
            if let Some(violations) = hall.cards.banlist_violations(&banlist, &cards) {
                if !violations.is_empty() {
                    for v in &violations {
                        hall.notify(
                            id,
                            format!("{}: limit {}, found {}.", v.name, v.limit, v.found),
                        );
                    }
                    hall.notify(
                        id,
                        format!("Check completed with {} errors.", violations.len()),
                    );
                    return Ok(());
                }
            }
        }

        let count = cards.len();
        if let Some(player) = hall.player_mut(id) {
            player.deck = cards;
        }
        hall.notify(id, format!("Deck loaded with {count} cards."));
        let nick = hall.nick_of(id);
        let members = hall.room(room_id).map(|r| r.members()).unwrap_or_default();
        for member in members {
            if member != id {
                hall.notify(member, format!("{nick} loaded a deck."));
            }
        }
        Ok(())
    }
}

struct Start;

#[async_trait]
impl CommandHandler for Start {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let id = call.player;
        let Some(room_id) = hall.room_of(id) else {
            return Ok(());
        };

        // All-or-nothing: validate before any mutation begins.
        let rejection = {
            let Some(room) = hall.room(room_id) else {
                return Ok(());
            };
            room.validate_start(
                |p| hall.player(p).map_or(0, |pl| pl.deck.len()),
                |p| hall.nick_of(p),
            )
        };
        if let Err(rejection) = rejection {
            hall.notify(id, rejection.to_string());
            return Ok(());
        }

        let nick = hall.nick_of(id);
        let members = hall.room(room_id).map(|r| r.members()).unwrap_or_default();
        for member in &members {
            if *member == id {
                hall.notify(*member, "You start the duel.");
            } else {
                hall.notify(*member, format!("{nick} starts the duel."));
            }
        }

        let Some(room) = hall.remove_room_for_handoff(room_id) else {
            return Ok(());
        };
        let tag = room.teams[1].len() > 1;
        let options = (room.rules.option_bits() << 16) | if tag { 0x20 } else { 0 };
        let team_nicks = |team: &[PlayerId]| -> Vec<String> {
            team.iter().map(|&p| hall.nick_of(p)).collect()
        };
        let setup = DuelSetup {
            teams: [team_nicks(&room.teams[1]), team_nicks(&room.teams[2])],
            lifepoints: room.lifepoints,
            options,
        };
        let session = hall.engine.clone().start(setup);

        let private = room.private;
        let duel_id = hall.insert_duel(|hall, duel_id| {
            let say = hall.create_channel(format!("duel:{}:say", duel_id.0), false);
            let watch = hall.create_channel(format!("duel:{}:watch", duel_id.0), true);
            let tags = [
                hall.create_channel(format!("duel:{}:team1", duel_id.0), false),
                hall.create_channel(format!("duel:{}:team2", duel_id.0), false),
            ];
            Duel {
                id: duel_id,
                teams: [room.teams[1].clone(), room.teams[2].clone()],
                watchers: Vec::new(),
                private,
                tag,
                say,
                watch,
                tags,
                session,
            }
        });

        // Rebind everyone: duelists to their sides, pool players as
        // watchers, all into duel mode with the duel's channels.
        let (say, watch, tags) = hall
            .duel(duel_id)
            .map(|d| (d.say, d.watch, d.tags))
            .expect("duel just inserted");
        for side in 0..2 {
            let team = hall
                .duel(duel_id)
                .map(|d| d.teams[side].clone())
                .unwrap_or_default();
            for member in team {
                let (say_on, watch_on) = hall
                    .player(member)
                    .map(|p| (p.say_on, p.watch_on))
                    .unwrap_or((true, true));
                if let Some(channel) = hall.channel_mut(say) {
                    channel.subscribe_with(member, say_on);
                }
                if let Some(channel) = hall.channel_mut(watch) {
                    channel.subscribe_with(member, watch_on);
                }
                if let Some(channel) = hall.channel_mut(tags[side]) {
                    channel.subscribe(member);
                }
                let duel_mode = hall.modes.duel.clone();
                if let Some(player) = hall.player_mut(member) {
                    player.room = None;
                    player.duel = Some(duel_id);
                    player.duel_team = side;
                    player.watching = false;
                    player.mode = duel_mode;
                }
            }
        }
        for member in room.teams[0].clone() {
            let duel_mode = hall.modes.duel.clone();
            if let Some(player) = hall.player_mut(member) {
                player.room = None;
                player.mode = duel_mode;
            }
            if let Some(duel) = hall.duel_mut(duel_id) {
                duel.add_watcher(member);
            }
            let (say_on, watch_on) = hall
                .player(member)
                .map(|p| (p.say_on, p.watch_on))
                .unwrap_or((true, true));
            if let Some(channel) = hall.channel_mut(say) {
                channel.subscribe_with(member, say_on);
            }
            if let Some(channel) = hall.channel_mut(watch) {
                channel.subscribe_with(member, watch_on);
            }
            if let Some(player) = hall.player_mut(member) {
                player.duel = Some(duel_id);
                player.duel_team = 0;
                player.watching = true;
            }
        }

        if !private {
            let (side0, side1) = {
                let duel = hall.duel(duel_id).expect("duel just inserted");
                (
                    duel.side_label(0, |p| hall.nick_of(p)),
                    duel.side_label(1, |p| hall.nick_of(p)),
                )
            };
            let announce = hall.announce();
            hall.channel_send(
                announce,
                None,
                "The duel between {player1} and {player2} has begun!",
                &[("player1", side0), ("player2", side1)],
            );
        }
        info!(duel = duel_id.0, room = room_id.0, "Room handed off into duel");
        Ok(())
    }
}

struct Invite;

#[async_trait]
impl CommandHandler for Invite {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let id = call.player;
        let Some(room_id) = hall.room_of(id) else {
            return Ok(());
        };
        let Some(name) = call.args.get(0).map(str::to_string) else {
            hall.notify(
                id,
                "You can invite any player to join this room. Simply type invite <player> to do so.",
            );
            return Ok(());
        };
        let me = hall.nick_of(id);
        let matches = hall.guess_players(&name, &me);
        let target = match matches.as_slice() {
            [] => {
                hall.notify(id, "No player with this name found.");
                return Ok(());
            }
            [target] => *target,
            _ => {
                let nicks: Vec<String> = matches.iter().map(|&p| hall.nick_of(p)).collect();
                hall.notify(
                    id,
                    format!("Multiple players match this name: {}", nicks.join(", ")),
                );
                return Ok(());
            }
        };
        let target_nick = hall.nick_of(target);
        if hall.player(target).is_some_and(|p| p.duel.is_some()) {
            hall.notify(id, "This player is already in a duel.");
            return Ok(());
        }
        if hall.player(target).is_some_and(|p| p.room.is_some()) {
            hall.notify(id, "This player is already preparing to duel.");
            return Ok(());
        }
        if hall.player(id).is_some_and(|p| p.ignoring(&target_nick)) {
            hall.notify(id, "You're ignoring this player.");
            return Ok(());
        }
        if hall.player(target).is_some_and(|p| p.ignoring(&me)) {
            hall.notify(id, "This player ignores you.");
            return Ok(());
        }
        if let Some(room) = hall.room_mut(room_id) {
            room.invite(&target_nick);
        }
        if hall.player(target).is_some_and(|p| p.afk) {
            hall.notify(
                id,
                format!("{target_nick} is AFK and may not be paying attention."),
            );
        }
        hall.notify(
            target,
            format!("{me} invites you to join his duel room. Type join {me} to do so."),
        );
        hall.notify(id, format!("An invitation was sent to {target_nick}."));
        Ok(())
    }
}

struct Lifepoints;

#[async_trait]
impl CommandHandler for Lifepoints {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let id = call.player;
        let Some(room_id) = hall.room_of(id) else {
            return Ok(());
        };
        let (Some(team), Some(lp)) = (
            call.args.get(0).and_then(|s| s.parse::<usize>().ok()),
            call.args.get(1).and_then(|s| s.parse::<u32>().ok()),
        ) else {
            hall.notify(id, "Usage: lifepoints <team> <lp>");
            return Ok(());
        };
        if let Some(room) = hall.room_mut(room_id) {
            room.lifepoints[team - 1] = lp;
        }
        hall.notify(id, format!("Lifepoints for team {team} set to {lp}."));
        Ok(())
    }
}

struct Save;

#[async_trait]
impl CommandHandler for Save {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let id = call.player;
        let Some(room_id) = hall.room_of(id) else {
            return Ok(());
        };
        let Some(account_id) = hall.player(id).and_then(|p| p.account_id) else {
            return Ok(());
        };
        let (banlist, rules) = {
            let Some(room) = hall.room(room_id) else {
                return Ok(());
            };
            (room.banlist.clone(), room.rules)
        };
        hall.db
            .accounts()
            .set_room_defaults(account_id, &banlist, rules.stored())
            .await?;
        if let Some(player) = hall.player_mut(id) {
            player.saved_banlist = banlist;
            player.saved_rules = rules;
        }
        hall.notify(id, "Settings saved.");
        Ok(())
    }
}
