//! Duel stubs: the lobby's handle onto an externally adjudicated match.
//!
//! Created by room hand-off, destroyed on match end. Watcher membership
//! changes are the only mutations the lobby performs directly; everything
//! else goes through the engine session.

use super::{ChannelId, DuelId, PlayerId};
use crate::engine::EngineSession;

/// A running duel as the lobby sees it.
pub struct Duel {
    pub id: DuelId,
    /// The two team rosters, one or two players each.
    pub teams: [Vec<PlayerId>; 2],
    pub watchers: Vec<PlayerId>,
    pub private: bool,
    /// Two players per team.
    pub tag: bool,
    /// Side channel for table talk.
    pub say: ChannelId,
    /// Watcher arrival/departure notices; never echoes the subject.
    pub watch: ChannelId,
    /// Per-team private coordination channels.
    pub tags: [ChannelId; 2],
    /// The external rules core's session.
    pub session: Box<dyn EngineSession>,
}

impl Duel {
    /// All duelists, team 1 first.
    pub fn participants(&self) -> Vec<PlayerId> {
        self.teams.iter().flatten().copied().collect()
    }

    /// Duelists and watchers.
    pub fn everyone(&self) -> Vec<PlayerId> {
        self.participants()
            .into_iter()
            .chain(self.watchers.iter().copied())
            .collect()
    }

    pub fn is_participant(&self, player: PlayerId) -> bool {
        self.teams.iter().any(|team| team.contains(&player))
    }

    pub fn team_of(&self, player: PlayerId) -> Option<usize> {
        self.teams.iter().position(|team| team.contains(&player))
    }

    pub fn add_watcher(&mut self, player: PlayerId) {
        if !self.watchers.contains(&player) {
            self.watchers.push(player);
        }
    }

    pub fn remove_watcher(&mut self, player: PlayerId) {
        self.watchers.retain(|&p| p != player);
    }

    /// Display label for one side: a single nickname, or "team A, B".
    pub fn side_label(&self, side: usize, nick_of: impl Fn(PlayerId) -> String) -> String {
        let names: Vec<String> = self.teams[side].iter().map(|&p| nick_of(p)).collect();
        if names.len() > 1 {
            format!("team {}", names.join(", "))
        } else {
            names.into_iter().next().unwrap_or_default()
        }
    }
}
