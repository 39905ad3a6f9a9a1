//! Broadcast channels: membership, per-recipient enablement, bounded
//! history.
//!
//! A channel is a named broadcast group. Each subscriber record carries an
//! enabled flag: a disabled member still appears in listings but receives
//! no live delivery (a personal mute, distinct from unsubscription).
//! History is a bounded ring: every send is archived even when nobody is
//! enabled, the oldest entry falling out beyond capacity, so replay is
//! always a suffix of actual past sends.

use super::PlayerId;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// One archived send.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub at: DateTime<Utc>,
    /// Sender nickname at send time; `None` for server-originated sends.
    /// Kept by name so the entry outlives the sender's session.
    pub sender: Option<String>,
    pub template: String,
    pub params: Vec<(String, String)>,
}

/// A membership record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscriber {
    pub player: PlayerId,
    pub enabled: bool,
}

/// A named broadcast group.
#[derive(Debug)]
pub struct Channel {
    name: String,
    exclude_sender: bool,
    capacity: usize,
    subscribers: Vec<Subscriber>,
    history: VecDeque<HistoryEntry>,
}

impl Channel {
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            exclude_sender: false,
            capacity,
            subscribers: Vec::new(),
            history: VecDeque::new(),
        }
    }

    /// Never deliver a sender's own message back to them.
    pub fn excluding_sender(mut self) -> Self {
        self.exclude_sender = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn excludes_sender(&self) -> bool {
        self.exclude_sender
    }

    /// Add a recipient, enabled. Idempotent.
    pub fn subscribe(&mut self, player: PlayerId) {
        self.subscribe_with(player, true);
    }

    /// Add a recipient with an initial enabled state. Idempotent; an
    /// existing record keeps its current state.
    pub fn subscribe_with(&mut self, player: PlayerId, enabled: bool) {
        if !self.is_subscribed(player) {
            self.subscribers.push(Subscriber { player, enabled });
        }
    }

    /// Remove a recipient. Idempotent. Historical entries referencing
    /// them stay intact.
    pub fn unsubscribe(&mut self, player: PlayerId) {
        self.subscribers.retain(|s| s.player != player);
    }

    /// Flip a member's live-delivery flag. Returns false for non-members.
    pub fn set_enabled(&mut self, player: PlayerId, enabled: bool) -> bool {
        match self.subscribers.iter_mut().find(|s| s.player == player) {
            Some(sub) => {
                sub.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn is_subscribed(&self, player: PlayerId) -> bool {
        self.subscribers.iter().any(|s| s.player == player)
    }

    pub fn is_enabled(&self, player: PlayerId) -> bool {
        self.subscribers
            .iter()
            .any(|s| s.player == player && s.enabled)
    }

    /// Membership in subscription order.
    pub fn subscribers(&self) -> impl Iterator<Item = &Subscriber> {
        self.subscribers.iter()
    }

    /// Archive one send, evicting the oldest entry beyond capacity.
    pub fn record(&mut self, sender: Option<String>, template: &str, params: &[(&str, String)]) {
        if self.capacity == 0 {
            return;
        }
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(HistoryEntry {
            at: Utc::now(),
            sender,
            template: template.to_string(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        });
    }

    /// The most recent `count` entries, oldest first.
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &HistoryEntry> {
        let skip = self.history.len().saturating_sub(count);
        self.history.iter().skip(skip)
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

/// Substitute `{name}` placeholders into a message template.
pub fn render(template: &str, params: &[(String, String)]) -> String {
    let mut out = template.to_string();
    for (key, value) in params {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}

/// Render an archived entry for replay, timestamp first.
pub fn render_entry(entry: &HistoryEntry) -> String {
    format!(
        "{} - {}",
        entry.at.format("%H:%M"),
        render(&entry.template, &entry.params)
    )
}
