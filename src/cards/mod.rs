//! Card deck runtime and the external card catalog contract

pub mod catalog;
pub mod deck;

pub use catalog::{
    CardCatalog, CardDef, CardEffect, DeckEntry, DeckProvider, DefaultDecks, StaticCatalog,
    StructureStats, UnitStats,
};
pub use deck::{DeckRuntime, Inventory};
