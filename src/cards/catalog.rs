//! Card catalog - stats for every card a deck can contain
//!
//! The catalog and the persisted decks are owned by an external service; the
//! session engine only consumes them through the `CardCatalog` and
//! `DeckProvider` traits.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::error::ServerError;
use crate::core::types::{CardId, PlayerId};

/// Combat stats for an attacking unit card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitStats {
    pub health: f32,
    /// Tiles per second
    pub speed: f32,
    /// Damage per shot against structures
    pub damage: f32,
    /// Attack range in tiles
    pub range: u32,
    /// Seconds between shots
    pub attack_interval: f32,
    /// Damage dealt to the target city on arrival
    pub city_damage: u32,
}

/// Combat stats for a defensive structure card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureStats {
    pub health: f32,
    pub damage: f32,
    pub range: u32,
    pub attack_interval: f32,
}

/// What a card does once played
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CardEffect {
    Unit(UnitStats),
    Defensive(StructureStats),
}

/// A card definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardDef {
    pub id: CardId,
    pub name: String,
    /// Gold cost to move the card from hand to inventory
    pub cost: u32,
    /// Defensive cards only: returned to inventory when the structure falls
    #[serde(default)]
    pub reusable: bool,
    pub effect: CardEffect,
}

impl CardDef {
    pub fn is_unit(&self) -> bool {
        matches!(self.effect, CardEffect::Unit(_))
    }

    pub fn is_defensive(&self) -> bool {
        matches!(self.effect, CardEffect::Defensive(_))
    }

    pub fn unit_stats(&self) -> Option<&UnitStats> {
        match &self.effect {
            CardEffect::Unit(stats) => Some(stats),
            CardEffect::Defensive(_) => None,
        }
    }

    pub fn structure_stats(&self) -> Option<&StructureStats> {
        match &self.effect {
            CardEffect::Defensive(stats) => Some(stats),
            CardEffect::Unit(_) => None,
        }
    }
}

/// Card lookup. A missing entry means "skip this card".
pub trait CardCatalog: Send + Sync {
    fn lookup(&self, id: &CardId) -> Option<CardDef>;
}

/// One line of a persisted deck
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckEntry {
    pub card_id: CardId,
    pub count: u32,
}

impl DeckEntry {
    pub fn new(card_id: impl Into<String>, count: u32) -> Self {
        Self {
            card_id: CardId::new(card_id),
            count,
        }
    }
}

/// Source of each player's validated deck
pub trait DeckProvider: Send + Sync {
    fn deck_for(&self, player: &PlayerId) -> Vec<DeckEntry>;
}

/// In-memory catalog, loaded from TOML/JSON or built from defaults
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    cards: AHashMap<CardId, CardDef>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in starter set
    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();

        catalog.add(CardDef {
            id: CardId::new("militia"),
            name: "Militia".into(),
            cost: 2,
            reusable: false,
            effect: CardEffect::Unit(UnitStats {
                health: 10.0,
                speed: 1.0,
                damage: 2.0,
                range: 1,
                attack_interval: 1.0,
                city_damage: 3,
            }),
        });

        catalog.add(CardDef {
            id: CardId::new("knight"),
            name: "Knight".into(),
            cost: 4,
            reusable: false,
            effect: CardEffect::Unit(UnitStats {
                health: 25.0,
                speed: 1.5,
                damage: 4.0,
                range: 1,
                attack_interval: 1.2,
                city_damage: 6,
            }),
        });

        catalog.add(CardDef {
            id: CardId::new("archer_tower"),
            name: "Archer Tower".into(),
            cost: 3,
            reusable: true,
            effect: CardEffect::Defensive(StructureStats {
                health: 20.0,
                damage: 4.0,
                range: 2,
                attack_interval: 1.0,
            }),
        });

        catalog.add(CardDef {
            id: CardId::new("palisade"),
            name: "Palisade".into(),
            cost: 1,
            reusable: false,
            effect: CardEffect::Defensive(StructureStats {
                health: 30.0,
                damage: 0.0,
                range: 0,
                attack_interval: 1.0,
            }),
        });

        catalog
    }

    /// Add (or replace) a card
    pub fn add(&mut self, card: CardDef) {
        self.cards.insert(card.id.clone(), card);
    }

    /// Get a card by ID
    pub fn get(&self, id: &CardId) -> Option<&CardDef> {
        self.cards.get(id)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Card ids in sorted order
    pub fn ids(&self) -> Vec<CardId> {
        let mut ids: Vec<CardId> = self.cards.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Parse cards from a TOML string (`[[cards]]` tables)
    pub fn parse_toml(content: &str) -> Result<Self, ServerError> {
        let file: CatalogFile = toml::from_str(content)?;
        Ok(Self::from_cards(file.cards))
    }

    /// Parse cards from a JSON string (`{"cards": [...]}`)
    pub fn parse_json(content: &str) -> Result<Self, ServerError> {
        let file: CatalogFile = serde_json::from_str(content)?;
        Ok(Self::from_cards(file.cards))
    }

    /// Load from disk; `.json` files are parsed as JSON, anything else as TOML
    pub fn load(path: &Path) -> Result<Self, ServerError> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::parse_json(&content),
            _ => Self::parse_toml(&content),
        }
    }

    fn from_cards(cards: Vec<CardDef>) -> Self {
        let mut catalog = Self::new();
        for card in cards {
            catalog.add(card);
        }
        catalog
    }
}

impl CardCatalog for StaticCatalog {
    fn lookup(&self, id: &CardId) -> Option<CardDef> {
        self.get(id).cloned()
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    cards: Vec<CardDef>,
}

/// Gives every player the same deck
#[derive(Debug, Clone)]
pub struct DefaultDecks {
    deck: Vec<DeckEntry>,
}

impl DefaultDecks {
    pub fn new(deck: Vec<DeckEntry>) -> Self {
        Self { deck }
    }

    /// Three copies of every card in the catalog
    pub fn from_catalog(catalog: &StaticCatalog) -> Self {
        Self::new(
            catalog
                .ids()
                .into_iter()
                .map(|card_id| DeckEntry { card_id, count: 3 })
                .collect(),
        )
    }
}

impl DeckProvider for DefaultDecks {
    fn deck_for(&self, _player: &PlayerId) -> Vec<DeckEntry> {
        self.deck.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_have_both_kinds() {
        let catalog = StaticCatalog::with_defaults();
        assert!(catalog.get(&CardId::new("militia")).unwrap().is_unit());
        assert!(catalog.get(&CardId::new("archer_tower")).unwrap().is_defensive());
    }

    #[test]
    fn test_missing_card_lookup_is_none() {
        let catalog = StaticCatalog::with_defaults();
        assert!(catalog.lookup(&CardId::new("dragon")).is_none());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[[cards]]
id = "scout"
name = "Scout"
cost = 1

[cards.effect]
kind = "unit"
health = 5.0
speed = 2.0
damage = 1.0
range = 1
attack_interval = 1.0
city_damage = 1

[[cards]]
id = "wall"
name = "Wall"
cost = 2
reusable = true

[cards.effect]
kind = "defensive"
health = 50.0
damage = 0.0
range = 0
attack_interval = 1.0
"#;
        let catalog = StaticCatalog::parse_toml(toml).unwrap();
        assert_eq!(catalog.len(), 2);
        let scout = catalog.get(&CardId::new("scout")).unwrap();
        assert_eq!(scout.unit_stats().unwrap().speed, 2.0);
        assert!(!scout.reusable);
        assert!(catalog.get(&CardId::new("wall")).unwrap().reusable);
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{"cards":[{"id":"pike","name":"Pike","cost":2,
            "effect":{"kind":"unit","health":12.0,"speed":1.0,"damage":2.0,
            "range":1,"attack_interval":1.0,"city_damage":2}}]}"#;
        let catalog = StaticCatalog::parse_json(json).unwrap();
        assert!(catalog.get(&CardId::new("pike")).is_some());
    }

    #[test]
    fn test_default_decks_cover_catalog() {
        let catalog = StaticCatalog::with_defaults();
        let decks = DefaultDecks::from_catalog(&catalog);
        let deck = decks.deck_for(&PlayerId::new("p1"));
        assert_eq!(deck.len(), catalog.len());
        assert!(deck.iter().all(|e| e.count == 3));
    }
}
