//! Battle system constants - fixed tolerances the simulator relies on
//!
//! Tunable timing (tick length, tick cap) lives in `GameConfig`.

/// Slack when comparing accumulated edge progress against a whole tile.
/// Repeated f32 additions of `speed * dt` drift by far less than this.
pub const PROGRESS_EPSILON: f32 = 1e-4;

/// Slack when deciding whether an attack cooldown has elapsed
pub const COOLDOWN_EPSILON: f32 = 1e-4;

/// Attack intervals below this are clamped so nothing fires more than once a tick
pub const MIN_ATTACK_INTERVAL: f32 = 0.05;

/// Units with no plan-derived speed never move; this keeps them from stalling a turn
pub const MIN_UNIT_SPEED: f32 = 0.01;
