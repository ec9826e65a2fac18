pub mod config;
pub mod error;
pub mod types;

pub use config::GameConfig;
pub use error::{GameError, Result, ServerError};
pub use types::{CardId, ConnectionId, PlayerColor, PlayerId, SessionId, StructureId, Tick, UnitId};
