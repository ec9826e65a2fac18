//! Hex Dominion - authoritative session engine for a multiplayer hex strategy game

pub mod battle;
pub mod cards;
pub mod core;
pub mod engine;
pub mod hex;
pub mod net;
pub mod session;
pub mod state;
