//! Session data model: players, cities, structures and per-match state

pub mod city;
pub mod player;
pub mod session;
pub mod structure;

pub use city::{City, CityType};
pub use player::{BattlePlan, Player, Resources};
pub use session::{Phase, SessionState, TurnStep};
pub use structure::Structure;
