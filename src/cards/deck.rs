//! Deck runtime - draw pools, dealt hands and inventories

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::cards::catalog::{CardCatalog, DeckEntry};
use crate::core::types::CardId;

/// A player's persisted deck turned into a draw pool
///
/// `deck` is the full composition; `pool` holds what is left to draw. Draws are
/// weighted by remaining count and the pool refills from the deck once empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeckRuntime {
    deck: BTreeMap<CardId, u32>,
    pool: BTreeMap<CardId, u32>,
}

impl DeckRuntime {
    /// Build from deck entries, dropping cards the catalog does not know
    pub fn from_entries(entries: &[DeckEntry], catalog: &dyn CardCatalog) -> Self {
        let mut deck = BTreeMap::new();
        for entry in entries {
            if entry.count == 0 {
                continue;
            }
            if catalog.lookup(&entry.card_id).is_none() {
                tracing::warn!("Deck card {} missing from catalog, skipping", entry.card_id);
                continue;
            }
            *deck.entry(entry.card_id.clone()).or_insert(0) += entry.count;
        }

        Self {
            pool: deck.clone(),
            deck,
        }
    }

    /// Cards left in the draw pool
    pub fn remaining(&self) -> u32 {
        self.pool.values().sum()
    }

    /// Total cards in the deck
    pub fn deck_size(&self) -> u32 {
        self.deck.values().sum()
    }

    /// Remaining copies of one card in the pool
    pub fn remaining_of(&self, card: &CardId) -> u32 {
        self.pool.get(card).copied().unwrap_or(0)
    }

    /// Draw one card; `None` only when the deck itself is empty
    pub fn draw<R: Rng>(&mut self, rng: &mut R) -> Option<CardId> {
        if self.remaining() == 0 {
            self.pool = self.deck.clone();
        }

        let total = self.remaining();
        if total == 0 {
            return None;
        }

        let mut pick = rng.gen_range(0..total);
        let mut chosen = None;
        for (card, count) in self.pool.iter() {
            if pick < *count {
                chosen = Some(card.clone());
                break;
            }
            pick -= count;
        }

        let card = chosen?;
        if let Some(count) = self.pool.get_mut(&card) {
            *count -= 1;
            if *count == 0 {
                self.pool.remove(&card);
            }
        }
        Some(card)
    }

    /// Deal a hand of up to `size` cards; draws missing from the catalog are skipped
    pub fn deal_hand<R: Rng>(
        &mut self,
        size: usize,
        catalog: &dyn CardCatalog,
        rng: &mut R,
    ) -> Vec<CardId> {
        let mut hand = Vec::with_capacity(size);
        // Bounded so a catalog that lost every deck card cannot spin forever
        let max_draws = size + self.deck_size() as usize;
        for _ in 0..max_draws {
            if hand.len() == size {
                break;
            }
            let Some(card) = self.draw(rng) else {
                break;
            };
            if catalog.lookup(&card).is_some() {
                hand.push(card);
            } else {
                tracing::debug!("Drew unknown card {}, skipping", card);
            }
        }
        hand
    }
}

/// Multiset of cards a player owns but has not yet used
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    cards: BTreeMap<CardId, u32>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, card: CardId) {
        *self.cards.entry(card).or_insert(0) += 1;
    }

    /// Remove one copy; returns false if none was held
    pub fn remove(&mut self, card: &CardId) -> bool {
        match self.cards.get_mut(card) {
            Some(count) => {
                *count -= 1;
                if *count == 0 {
                    self.cards.remove(card);
                }
                true
            }
            None => false,
        }
    }

    pub fn count(&self, card: &CardId) -> u32 {
        self.cards.get(card).copied().unwrap_or(0)
    }

    pub fn contains(&self, card: &CardId) -> bool {
        self.count(card) > 0
    }

    pub fn total(&self) -> u32 {
        self.cards.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Distinct cards held
    pub fn card_ids(&self) -> impl Iterator<Item = &CardId> {
        self.cards.keys()
    }

    /// Flattened list, one entry per copy
    pub fn to_list(&self) -> Vec<CardId> {
        self.cards
            .iter()
            .flat_map(|(card, count)| std::iter::repeat(card.clone()).take(*count as usize))
            .collect()
    }
}
