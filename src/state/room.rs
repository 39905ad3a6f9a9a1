//! Pre-duel staging rooms.
//!
//! A room moves through `Setup` (the creator tunes configuration, nobody
//! else may join) into `Open` (players assign themselves to teams, the
//! creator may invite and start). Hand-off into a duel destroys the room;
//! team constraints are enforced only then, not at every move.

use super::{ChannelId, PlayerId, RoomId};
use crate::error::StartRejection;
use std::collections::HashSet;

/// Room lifecycle state. Hand-off removes the room entirely, so there is
/// no handed-off variant to observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoomState {
    #[default]
    Setup,
    Open,
}

/// Rules variant for the duel built from this room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuelRules {
    /// The behavior before link summons came in.
    #[default]
    Standard,
    /// Rules from the game's first days.
    Traditional,
    /// Link summons enabled.
    Link,
}

impl DuelRules {
    pub fn label(self) -> &'static str {
        match self {
            DuelRules::Standard => "Default",
            DuelRules::Traditional => "Traditional",
            DuelRules::Link => "Link",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "default" => Some(DuelRules::Standard),
            "traditional" => Some(DuelRules::Traditional),
            "link" => Some(DuelRules::Link),
            _ => None,
        }
    }

    /// Bits packed into the engine start options.
    pub fn option_bits(self) -> u64 {
        match self {
            DuelRules::Standard => 0,
            DuelRules::Traditional => 1,
            DuelRules::Link => 4,
        }
    }

    /// Stored form on the account record.
    pub fn stored(self) -> i64 {
        self.option_bits() as i64
    }

    pub fn from_stored(value: i64) -> Self {
        match value {
            1 => DuelRules::Traditional,
            4 => DuelRules::Link,
            _ => DuelRules::Standard,
        }
    }
}

/// A staging room.
#[derive(Debug)]
pub struct Room {
    pub id: RoomId,
    pub creator: PlayerId,
    pub state: RoomState,
    pub private: bool,
    pub rules: DuelRules,
    pub lifepoints: [u32; 2],
    pub banlist: String,
    /// Lowercased nicknames permitted to join while private.
    pub invitations: HashSet<String>,
    /// Index 0 is the unassigned pool; 1 and 2 are the teams.
    pub teams: [Vec<PlayerId>; 3],
    /// The room's private say channel, torn down with the room.
    pub say: ChannelId,
}

impl Room {
    pub fn new(
        id: RoomId,
        creator: PlayerId,
        say: ChannelId,
        lifepoints: u32,
        banlist: String,
    ) -> Self {
        Self {
            id,
            creator,
            state: RoomState::Setup,
            private: false,
            rules: DuelRules::default(),
            lifepoints: [lifepoints, lifepoints],
            banlist,
            invitations: HashSet::new(),
            teams: [Vec::new(), Vec::new(), Vec::new()],
            say,
        }
    }

    pub fn is_creator(&self, player: PlayerId) -> bool {
        self.creator == player
    }

    pub fn is_open(&self) -> bool {
        self.state == RoomState::Open
    }

    /// Add a player to the unassigned pool. Idempotent.
    pub fn join(&mut self, player: PlayerId) {
        if self.team_of(player).is_none() {
            self.teams[0].push(player);
        }
    }

    /// Remove a player from wherever they are.
    pub fn remove(&mut self, player: PlayerId) {
        for team in &mut self.teams {
            team.retain(|&p| p != player);
        }
    }

    /// Reassign a player among pool (0) and teams (1, 2). Moving to the
    /// current team is a no-op; team 0 always lands in the pool.
    pub fn move_player(&mut self, player: PlayerId, team: usize) {
        debug_assert!(team <= 2, "team index out of range");
        if self.team_of(player) == Some(team) {
            return;
        }
        self.remove(player);
        self.teams[team].push(player);
    }

    /// Which list the player is on, if any.
    pub fn team_of(&self, player: PlayerId) -> Option<usize> {
        self.teams
            .iter()
            .position(|team| team.contains(&player))
    }

    /// Everyone in the room: pool first, then team 1, then team 2.
    pub fn members(&self) -> Vec<PlayerId> {
        self.teams.iter().flatten().copied().collect()
    }

    pub fn invite(&mut self, nick: &str) {
        self.invitations.insert(nick.to_lowercase());
    }

    pub fn is_invited(&self, nick: &str) -> bool {
        self.invitations.contains(&nick.to_lowercase())
    }

    /// Check the hand-off constraints without mutating anything: equal
    /// team sizes, one or two players per team, every assigned player
    /// holding a nonempty deck.
    pub fn validate_start(
        &self,
        deck_size: impl Fn(PlayerId) -> usize,
        nick_of: impl Fn(PlayerId) -> String,
    ) -> Result<(), StartRejection> {
        if self.teams[1].len() != self.teams[2].len() {
            return Err(StartRejection::UnevenTeams);
        }
        if self.teams[1].is_empty() || self.teams[1].len() > 2 {
            return Err(StartRejection::BadTeamSize);
        }
        for &player in self.teams[1].iter().chain(self.teams[2].iter()) {
            if deck_size(player) == 0 {
                return Err(StartRejection::MissingDeck(nick_of(player)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room() -> Room {
        Room::new(RoomId(1), PlayerId(1), ChannelId(1), 8000, "tcg".into())
    }

    #[test]
    fn test_move_to_pool_from_any_team() {
        let mut room = room();
        room.join(PlayerId(1));
        room.move_player(PlayerId(1), 2);
        assert_eq!(room.team_of(PlayerId(1)), Some(2));
        room.move_player(PlayerId(1), 0);
        assert_eq!(room.team_of(PlayerId(1)), Some(0));
    }

    #[test]
    fn test_move_is_idempotent_on_same_team() {
        let mut room = room();
        room.join(PlayerId(1));
        room.move_player(PlayerId(1), 1);
        room.move_player(PlayerId(1), 1);
        assert_eq!(room.teams[1], vec![PlayerId(1)]);
    }

    #[test]
    fn test_validate_start_rejects_uneven_teams() {
        let mut room = room();
        room.join(PlayerId(1));
        room.join(PlayerId(2));
        room.move_player(PlayerId(1), 1);
        assert_eq!(
            room.validate_start(|_| 40, |_| "p".into()),
            Err(StartRejection::UnevenTeams)
        );
    }

    #[test]
    fn test_validate_start_rejects_empty_and_oversized_teams() {
        let mut room = room();
        assert_eq!(
            room.validate_start(|_| 40, |_| "p".into()),
            Err(StartRejection::BadTeamSize)
        );

        for i in 1..=6 {
            room.join(PlayerId(i));
            room.move_player(PlayerId(i), if i <= 3 { 1 } else { 2 });
        }
        assert_eq!(
            room.validate_start(|_| 40, |_| "p".into()),
            Err(StartRejection::BadTeamSize)
        );
    }

    #[test]
    fn test_validate_start_requires_loaded_decks() {
        let mut room = room();
        room.join(PlayerId(1));
        room.join(PlayerId(2));
        room.move_player(PlayerId(1), 1);
        room.move_player(PlayerId(2), 2);

        let result = room.validate_start(
            |p| if p == PlayerId(2) { 0 } else { 40 },
            |p| format!("p{}", p.0),
        );
        assert_eq!(result, Err(StartRejection::MissingDeck("p2".into())));

        // Rejection mutated nothing.
        assert_eq!(room.team_of(PlayerId(1)), Some(1));
        assert_eq!(room.team_of(PlayerId(2)), Some(2));

        assert!(room.validate_start(|_| 40, |p| format!("p{}", p.0)).is_ok());
    }

    #[test]
    fn test_invitations_are_case_insensitive() {
        let mut room = room();
        room.invite("Friend");
        assert!(room.is_invited("friend"));
        assert!(room.is_invited("FRIEND"));
        assert!(!room.is_invited("stranger"));
    }
}
