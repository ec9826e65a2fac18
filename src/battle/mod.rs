//! Battle system - attacking armies walk their planned path while enemy
//! structures shoot at them
//!
//! All attacks in a session share one tick clock; see `simulator::step` for
//! the per-tick resolution order.

pub mod constants;
pub mod simulator;
pub mod units;

pub use constants::*;
pub use simulator::{spawn_army, step, Arrival, BattleTally, Casualty, StepOutcome, TowerShot};
pub use units::{BattleUnit, UnitSnapshot};
