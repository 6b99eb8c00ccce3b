use std::time::Duration;

use minesync_core::BoardError;
use thiserror::Error;

use crate::{ConnectionId, GameId, Session};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Session {0} not found")]
    NotFound(GameId),
    #[error("Session {} already exists", .0.id())]
    AlreadyExists(Box<Session>),
    #[error("Session {id} changed concurrently (expected version {expected}, found {actual})")]
    Conflict {
        id: GameId,
        expected: u64,
        actual: u64,
    },
    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Delivery to a single connection failed; the connection is gone.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Connection {0} is unreachable")]
pub struct Unreachable(pub ConnectionId);

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Game {0} not found")]
    NotFound(GameId),
    #[error("Invalid game id {0:?}")]
    InvalidGameId(String),
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error("Game {0} kept changing concurrently, gave up after {1} attempts")]
    Conflict(GameId, u32),
    #[error("Session store failure: {0}")]
    Store(#[source] StoreError),
    #[error("Malformed request: {0}")]
    Protocol(String),
}

impl SessionError {
    /// Rejections caused by the request itself. These never change state and
    /// are reported back to the requesting connection only.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::InvalidGameId(_) | Self::Board(_) | Self::Protocol(_)
        )
    }

    /// Failures a caller may retry as a whole.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Conflict(..) | Self::Store(_))
    }
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            err => Self::Store(err),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid default board: {0}")]
    Board(#[from] BoardError),
    #[error("Invalid setting: {0}")]
    Invalid(&'static str),
}
