//! JSON messages exchanged between players and the session service.
//!
//! Every message is an object tagged by its `action` field. Field names are
//! camelCase on the wire.

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: i64,
    pub y: i64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileUpdate {
    pub x: i64,
    pub y: i64,
    pub value: u8,
}

/// Inbound actions sent by a connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all_fields = "camelCase")]
pub enum ClientAction {
    CreateBoard {
        game_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        board_size: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bomb_count: Option<u32>,
    },
    JoinGame {
        game_id: String,
    },
    RevealTile {
        game_id: String,
        coordinates: Coordinates,
    },
    ToggleFlagOnTile {
        game_id: String,
        coordinates: Coordinates,
    },
    LeaveGame,
}

impl ClientAction {
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    pub fn game_id(&self) -> Option<&str> {
        match self {
            Self::CreateBoard { game_id, .. }
            | Self::JoinGame { game_id }
            | Self::RevealTile { game_id, .. }
            | Self::ToggleFlagOnTile { game_id, .. } => Some(game_id),
            Self::LeaveGame => None,
        }
    }
}

/// Outbound notifications delivered to connections.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all_fields = "camelCase")]
pub enum Notification {
    PlayerJoined {
        details: String,
    },
    UpdateTiles {
        tiles: Vec<TileUpdate>,
    },
    SetFlagState {
        coordinates: Coordinates,
        flagged: bool,
    },
    DisplayMessage {
        data: String,
    },
    GameReady {
        game_id: String,
        board_size: u32,
        bomb_count: u32,
    },
}

impl Notification {
    pub fn message(data: impl Into<String>) -> Self {
        Self::DisplayMessage { data: data.into() }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
