//! Session configuration with documented constants
//!
//! All fixed delays, costs and caps are collected here with explanations of
//! their purpose and how they interact with each other.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::core::error::ServerError;

/// Configuration shared by every session on a server
///
/// Loaded once at startup (TOML) and handed to each session behind an `Arc`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    // === ECONOMY ===
    /// Production each player starts the match with
    ///
    /// Must cover at least one `city_cost`, otherwise nobody can build a capital.
    pub starting_production: u32,

    /// Gold each player starts the match with
    pub starting_gold: u32,

    /// Production deducted for every city, the capital included
    pub city_cost: u32,

    /// Production deducted for every defensive structure
    pub structure_cost: u32,

    /// Gold granted to every connected player at the start of a turn
    pub gold_per_turn: u32,

    /// Additional gold per standing (non-razed) city at the start of a turn
    pub gold_per_city: u32,

    /// Production income per city type, multiplied by the city level
    pub capital_income: u32,
    pub base_income: u32,
    pub fortified_income: u32,

    // === CARDS ===
    /// Cards dealt into a hand at match start and every new turn
    pub hand_size: usize,

    /// Units a player may queue per city owned
    ///
    /// The army cap is `cities * army_per_city`.
    pub army_per_city: usize,

    // === CITIES & TERRITORY ===
    /// Upper bound on expansion rings for any city, whatever its radius
    pub max_expansion_rings: u32,

    /// Territory influence radius per city type (rings)
    pub capital_radius: u32,
    pub base_radius: u32,
    pub fortified_radius: u32,

    /// Starting (and maximum) health per city type
    ///
    /// A city reduced to 0 is razed: it stays on the map but yields nothing.
    pub capital_health: u32,
    pub base_health: u32,
    pub fortified_health: u32,

    // === TIMING ===
    /// Delay between expansion rings so clients can animate growth
    pub ring_delay_ms: u64,

    /// Grace window before players with nothing to do are marked ready
    pub auto_ready_delay_ms: u64,

    /// Window after a new turn starts during which advancement is deferred
    ///
    /// Absorbs readiness signals still in flight from the previous turn.
    pub new_turn_cooldown_ms: u64,

    /// How long a disconnected player's slot is held for reconnection
    pub disconnect_grace_ms: u64,

    /// Battle simulation tick interval
    ///
    /// Unit speeds are tiles per second; each tick advances them by
    /// `speed * battle_tick_ms / 1000`.
    pub battle_tick_ms: u64,

    /// Safety cap on battle length. Units still marching when it is hit are
    /// removed without reaching their target.
    pub max_battle_ticks: u64,

    // === RANDOMNESS ===
    /// Seed for hand dealing. `None` seeds each session from system entropy.
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            // Economy
            starting_production: 10,
            starting_gold: 10,
            city_cost: 5,
            structure_cost: 3,
            gold_per_turn: 5,
            gold_per_city: 1,
            capital_income: 5,
            base_income: 3,
            fortified_income: 2,

            // Cards
            hand_size: 5,
            army_per_city: 3,

            // Cities
            max_expansion_rings: 3,
            capital_radius: 2,
            base_radius: 1,
            fortified_radius: 1,
            capital_health: 30,
            base_health: 20,
            fortified_health: 40,

            // Timing
            ring_delay_ms: 400,
            auto_ready_delay_ms: 1500,
            new_turn_cooldown_ms: 1000,
            disconnect_grace_ms: 30_000,
            battle_tick_ms: 100,
            max_battle_ticks: 6000,

            seed: None,
        }
    }
}

impl GameConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML. Missing keys keep their defaults.
    pub fn parse_toml(content: &str) -> Result<Self, ServerError> {
        let config: GameConfig = toml::from_str(content)?;
        config.validate().map_err(ServerError::InvalidConfig)?;
        Ok(config)
    }

    /// Load a config from a TOML file
    pub fn load(path: &Path) -> Result<Self, ServerError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.starting_production < self.city_cost {
            return Err(format!(
                "starting_production ({}) must cover city_cost ({})",
                self.starting_production, self.city_cost
            ));
        }

        if self.battle_tick_ms == 0 {
            return Err("battle_tick_ms must be positive".into());
        }

        if self.max_battle_ticks == 0 {
            return Err("max_battle_ticks must be positive".into());
        }

        if self.capital_health == 0 || self.base_health == 0 || self.fortified_health == 0 {
            return Err("city health values must be positive".into());
        }

        Ok(())
    }

    pub fn ring_delay(&self) -> Duration {
        Duration::from_millis(self.ring_delay_ms)
    }

    pub fn auto_ready_delay(&self) -> Duration {
        Duration::from_millis(self.auto_ready_delay_ms)
    }

    pub fn new_turn_cooldown(&self) -> Duration {
        Duration::from_millis(self.new_turn_cooldown_ms)
    }

    pub fn disconnect_grace(&self) -> Duration {
        Duration::from_millis(self.disconnect_grace_ms)
    }

    pub fn battle_tick(&self) -> Duration {
        Duration::from_millis(self.battle_tick_ms)
    }

    /// Simulated seconds per battle tick
    pub fn tick_seconds(&self) -> f32 {
        self.battle_tick_ms as f32 / 1000.0
    }
}
