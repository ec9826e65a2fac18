use thiserror::Error;

use crate::core::types::{CardId, PlayerId, SessionId};
use crate::hex::TileCoord;
use crate::state::TurnStep;

/// Validation failures. Reported to the originating connection only; never fatal
/// to the session.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GameError {
    #[error("the match has not started")]
    MatchNotStarted,

    #[error("the match has already started")]
    MatchAlreadyStarted,

    #[error("player {0} is not in this session")]
    UnknownPlayer(PlayerId),

    #[error("no map data was supplied")]
    NoMap,

    #[error("invalid map: {0}")]
    InvalidMap(String),

    #[error("{action} is not allowed during {step}")]
    WrongStep { action: &'static str, step: TurnStep },

    #[error("tile {0} is not buildable")]
    InvalidTile(TileCoord),

    #[error("tile {0} is already occupied")]
    TileOccupied(TileCoord),

    #[error("tile {0} belongs to another player")]
    TileOwnedByOther(TileCoord),

    #[error("tile {0} is outside your territory")]
    OutsideTerritory(TileCoord),

    #[error("not enough {resource}: need {needed}, have {available}")]
    InsufficientResources {
        resource: &'static str,
        needed: u32,
        available: u32,
    },

    #[error("card {0} is not in your hand")]
    CardNotInHand(CardId),

    #[error("card {0} is not in your inventory")]
    CardNotInInventory(CardId),

    #[error("card {0} is not in the catalog")]
    UnknownCard(CardId),

    #[error("card {0} cannot be used for this action")]
    WrongCardKind(CardId),

    #[error("army of {requested} exceeds the cap of {cap}")]
    ArmyTooLarge { requested: usize, cap: usize },

    #[error("no army is queued")]
    NoArmyQueued,

    #[error("you have no city at {0}")]
    NotYourCity(TileCoord),

    #[error("no enemy city at {0}")]
    NoEnemyCity(TileCoord),

    #[error("city at {0} is already razed")]
    CityRazed(TileCoord),

    #[error("no path from {from} to {to}")]
    NoPath { from: TileCoord, to: TileCoord },

    #[error("session is full")]
    SessionFull,

    #[error("no session {0}")]
    UnknownSession(SessionId),
}

/// Process-level failures: loading configuration or catalogs, socket I/O
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, GameError>;
