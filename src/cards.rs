//! Card store and banlists.
//!
//! The numeric content lookup boundary: resolves card codes to display
//! text and type flags, supports positional browsing with wrap-around
//! search, and answers banlist queries by name. The store is read-mostly
//! and reloadable, so it sits behind a [`parking_lot::RwLock`].

use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;

/// Card type bits relevant to deck construction.
pub mod card_type {
    pub const MONSTER: u32 = 0x1;
    pub const SPELL: u32 = 0x2;
    pub const TRAP: u32 = 0x4;
    pub const FUSION: u32 = 0x40;
    pub const SYNCHRO: u32 = 0x2000;
    pub const XYZ: u32 = 0x80_0000;
    pub const LINK: u32 = 0x400_0000;
    /// Cards that live in the extra deck rather than the main deck.
    pub const EXTRA: u32 = FUSION | SYNCHRO | XYZ | LINK;
}

/// Card store errors.
#[derive(Debug, Error)]
pub enum CardStoreError {
    #[error("failed to read card data: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse card data: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A single card's display data.
#[derive(Debug, Clone, Deserialize)]
pub struct CardInfo {
    pub code: u32,
    pub name: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub card_type: u32,
}

impl CardInfo {
    /// Whether this card belongs to the extra deck.
    pub fn is_extra(&self) -> bool {
        self.card_type & card_type::EXTRA != 0
    }
}

/// One over-limit finding from a banlist check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanlistViolation {
    pub name: String,
    pub limit: u8,
    pub found: usize,
}

/// On-disk card data layout.
#[derive(Debug, Default, Deserialize)]
struct CardFile {
    #[serde(default)]
    cards: Vec<CardInfo>,
    #[serde(default)]
    banlists: BTreeMap<String, HashMap<u32, u8>>,
}

#[derive(Debug, Default)]
struct StoreInner {
    /// Card codes in browse order.
    ordered: Vec<u32>,
    cards: HashMap<u32, CardInfo>,
    banlists: BTreeMap<String, HashMap<u32, u8>>,
}

impl StoreInner {
    fn from_file(file: CardFile) -> Self {
        let ordered: Vec<u32> = file.cards.iter().map(|c| c.code).collect();
        let cards = file.cards.into_iter().map(|c| (c.code, c)).collect();
        Self {
            ordered,
            cards,
            banlists: file.banlists,
        }
    }
}

/// The card store. Cheap to share; all queries take a read lock.
#[derive(Debug, Default)]
pub struct CardStore {
    inner: RwLock<StoreInner>,
}

impl CardStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from a JSON data file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CardStoreError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Build a store from JSON card data.
    pub fn from_json(content: &str) -> Result<Self, CardStoreError> {
        let file: CardFile = serde_json::from_str(content)?;
        Ok(Self {
            inner: RwLock::new(StoreInner::from_file(file)),
        })
    }

    /// Replace the store contents from a data file.
    pub fn reload<P: AsRef<Path>>(&self, path: P) -> Result<(), CardStoreError> {
        let content = std::fs::read_to_string(path)?;
        let file: CardFile = serde_json::from_str(&content)?;
        *self.inner.write() = StoreInner::from_file(file);
        Ok(())
    }

    /// Number of known cards.
    pub fn len(&self) -> usize {
        self.inner.read().ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve a card code.
    pub fn get(&self, code: u32) -> Option<CardInfo> {
        self.inner.read().cards.get(&code).cloned()
    }

    /// Card at a browse position.
    pub fn at(&self, pos: usize) -> Option<CardInfo> {
        let inner = self.inner.read();
        let code = *inner.ordered.get(pos)?;
        inner.cards.get(&code).cloned()
    }

    /// Browse position of a card code.
    pub fn position_of(&self, code: u32) -> Option<usize> {
        self.inner.read().ordered.iter().position(|&c| c == code)
    }

    /// First card whose name contains `name`, case-insensitively.
    pub fn find_by_name(&self, name: &str) -> Option<CardInfo> {
        let needle = name.to_lowercase();
        let inner = self.inner.read();
        inner
            .ordered
            .iter()
            .filter_map(|code| inner.cards.get(code))
            .find(|c| c.name.to_lowercase().contains(&needle))
            .cloned()
    }

    /// Next browse position at or after `start` whose card name contains
    /// `text`, wrapping around once.
    pub fn find_next(&self, text: &str, start: usize) -> Option<usize> {
        let needle = text.to_lowercase();
        let inner = self.inner.read();
        let len = inner.ordered.len();
        if len == 0 {
            return None;
        }
        (0..len)
            .map(|offset| (start + offset) % len)
            .find(|&pos| Self::name_at(&inner, pos).contains(&needle))
    }

    /// Previous browse position at or before `start` whose card name
    /// contains `text`, wrapping around once.
    pub fn find_prev(&self, text: &str, start: usize) -> Option<usize> {
        let needle = text.to_lowercase();
        let inner = self.inner.read();
        let len = inner.ordered.len();
        if len == 0 {
            return None;
        }
        (0..len)
            .map(|offset| (start + len - offset % len) % len)
            .find(|&pos| Self::name_at(&inner, pos).contains(&needle))
    }

    fn name_at(inner: &StoreInner, pos: usize) -> String {
        inner
            .ordered
            .get(pos)
            .and_then(|code| inner.cards.get(code))
            .map(|c| c.name.to_lowercase())
            .unwrap_or_default()
    }

    /// Known banlist names, sorted.
    pub fn banlist_names(&self) -> Vec<String> {
        self.inner.read().banlists.keys().cloned().collect()
    }

    pub fn has_banlist(&self, name: &str) -> bool {
        self.inner.read().banlists.contains_key(name)
    }

    /// Card codes present in a deck but unknown to the store.
    pub fn invalid_cards(&self, deck: &[u32]) -> Vec<u32> {
        let inner = self.inner.read();
        let mut seen = Vec::new();
        for &code in deck {
            if !inner.cards.contains_key(&code) && !seen.contains(&code) {
                seen.push(code);
            }
        }
        seen
    }

    /// Split a deck into (main, extra) card counts.
    pub fn split_counts(&self, deck: &[u32]) -> (usize, usize) {
        let inner = self.inner.read();
        let mut main = 0;
        let mut extra = 0;
        for code in deck {
            match inner.cards.get(code) {
                Some(card) if card.is_extra() => extra += 1,
                _ => main += 1,
            }
        }
        (main, extra)
    }

    /// Check a deck against a named banlist. Codes the list does not
    /// mention are unrestricted. Returns `None` for an unknown list.
    pub fn banlist_violations(&self, list: &str, deck: &[u32]) -> Option<Vec<BanlistViolation>> {
        let inner = self.inner.read();
        let limits = inner.banlists.get(list)?;
        let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
        for &code in deck {
            *counts.entry(code).or_default() += 1;
        }
        let violations = counts
            .into_iter()
            .filter_map(|(code, found)| {
                let limit = *limits.get(&code)?;
                if found <= limit as usize {
                    return None;
                }
                let name = inner
                    .cards
                    .get(&code)
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| code.to_string());
                Some(BanlistViolation { name, limit, found })
            })
            .collect();
        Some(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CardStore {
        let file = CardFile {
            cards: vec![
                CardInfo {
                    code: 100,
                    name: "Blue Dragon".into(),
                    text: "A big dragon.".into(),
                    card_type: card_type::MONSTER,
                },
                CardInfo {
                    code: 200,
                    name: "Dark Ritual".into(),
                    text: String::new(),
                    card_type: card_type::SPELL,
                },
                CardInfo {
                    code: 300,
                    name: "Chimera Fusion".into(),
                    text: String::new(),
                    card_type: card_type::MONSTER | card_type::FUSION,
                },
            ],
            banlists: BTreeMap::from([(
                "tcg".to_string(),
                HashMap::from([(200u32, 1u8), (100u32, 0u8)]),
            )]),
        };
        CardStore {
            inner: RwLock::new(StoreInner::from_file(file)),
        }
    }

    #[test]
    fn test_find_by_name_is_case_insensitive() {
        let store = store();
        assert_eq!(store.find_by_name("blue dragon").map(|c| c.code), Some(100));
        assert_eq!(store.find_by_name("RITUAL").map(|c| c.code), Some(200));
        assert!(store.find_by_name("missing").is_none());
    }

    #[test]
    fn test_search_wraps_around() {
        let store = store();
        // Searching forward from past the match wraps to the start.
        assert_eq!(store.find_next("dragon", 2), Some(0));
        assert_eq!(store.find_prev("fusion", 0), Some(2));
        assert_eq!(store.find_next("nothing", 0), None);
    }

    #[test]
    fn test_split_counts_separates_extra_deck() {
        let store = store();
        let deck = vec![100, 100, 200, 300];
        assert_eq!(store.split_counts(&deck), (3, 1));
    }

    #[test]
    fn test_banlist_violations() {
        let store = store();
        // Two copies of a forbidden card, two of a limited one.
        let deck = vec![100, 100, 200, 200, 300];
        let violations = store
            .banlist_violations("tcg", &deck)
            .expect("tcg list exists");
        assert_eq!(violations.len(), 2);
        assert!(violations.iter().any(|v| v.name == "Blue Dragon" && v.limit == 0 && v.found == 2));
        assert!(violations.iter().any(|v| v.name == "Dark Ritual" && v.limit == 1 && v.found == 2));
        assert!(store.banlist_violations("ocg", &deck).is_none());
    }

    #[test]
    fn test_invalid_cards_deduplicates() {
        let store = store();
        assert_eq!(store.invalid_cards(&[100, 999, 999, 200]), vec![999]);
    }
}
