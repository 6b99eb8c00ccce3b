use std::collections::BTreeSet;
use std::fmt;

use minesync_core::{BoardState, BoardValues, CellCount, Coord, Outcome, TileView};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::SessionError;

/// Opaque id players share to meet on one board.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    pub fn parse(raw: impl Into<String>) -> Result<Self, SessionError> {
        let raw = raw.into();
        if raw.is_empty() || raw.trim() != raw {
            return Err(SessionError::InvalidGameId(raw));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transport-assigned id of one live connection.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One shared game as held by the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    id: GameId,
    board: BoardState,
    connections: BTreeSet<ConnectionId>,
    #[serde(with = "time::serde::rfc3339")]
    time_started: OffsetDateTime,
    /// Bumped on every committed write; conditional updates compare it.
    version: u64,
}

impl Session {
    pub fn new(id: GameId, values: BoardValues) -> Self {
        Self {
            id,
            board: BoardState::new(values),
            connections: BTreeSet::new(),
            time_started: OffsetDateTime::now_utc(),
            version: 1,
        }
    }

    pub fn id(&self) -> &GameId {
        &self.id
    }

    pub fn board(&self) -> &BoardState {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut BoardState {
        &mut self.board
    }

    pub fn connections(&self) -> &BTreeSet<ConnectionId> {
        &self.connections
    }

    pub fn has_connection(&self, connection: &ConnectionId) -> bool {
        self.connections.contains(connection)
    }

    /// Returns `false` when the connection was already attached.
    pub fn add_connection(&mut self, connection: ConnectionId) -> bool {
        self.connections.insert(connection)
    }

    /// Returns `false` when the connection was not attached.
    pub fn remove_connection(&mut self, connection: &ConnectionId) -> bool {
        self.connections.remove(connection)
    }

    pub fn time_started(&self) -> OffsetDateTime {
        self.time_started
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn bump_version(&mut self) {
        self.version += 1;
    }

    pub fn is_concluded(&self) -> bool {
        self.board.is_concluded()
    }

    pub fn view(&self) -> BoardView {
        BoardView {
            game_id: self.id.clone(),
            board_size: self.board.size(),
            bomb_count: self.board.bomb_count(),
            remaining_tiles: self.board.remaining_tiles(),
            outcome: self.board.outcome(),
            connections: self.connections.len(),
            time_started: self.time_started,
            tiles: self.board.view(),
        }
    }
}

/// What any player may see of a session, `tiles[y][x]`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    pub game_id: GameId,
    pub board_size: Coord,
    pub bomb_count: CellCount,
    pub remaining_tiles: CellCount,
    pub outcome: Option<Outcome>,
    pub connections: usize,
    #[serde(with = "time::serde::rfc3339")]
    pub time_started: OffsetDateTime,
    pub tiles: Vec<Vec<TileView>>,
}
