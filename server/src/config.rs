use std::path::Path;
use std::time::Duration;

use minesync_core::{BoardConfig, DEFAULT_BOARD_SIZE, DEFAULT_BOMB_COUNT};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Service settings, all optional in the TOML file.
///
/// ```toml
/// [board]
/// size = 25
/// bombs = 65
///
/// [store]
/// timeout_ms = 2000
/// max_conflict_retries = 8
///
/// [session]
/// min_game_id_len = 5
///
/// [broadcast]
/// send_timeout_ms = 1000
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub board: BoardSettings,
    pub store: StoreSettings,
    pub session: SessionSettings,
    pub broadcast: BroadcastSettings,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoardSettings {
    pub size: u32,
    pub bombs: u32,
    /// Fixes the layout sequence; random when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl BoardSettings {
    pub fn config(&self) -> Result<BoardConfig, ConfigError> {
        Ok(BoardConfig::new(self.size, self.bombs)?)
    }
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            size: DEFAULT_BOARD_SIZE.into(),
            bombs: DEFAULT_BOMB_COUNT.into(),
            seed: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSettings {
    pub timeout_ms: u64,
    pub max_conflict_retries: u32,
}

impl StoreSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 2_000,
            max_conflict_retries: 8,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionSettings {
    pub min_game_id_len: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self { min_game_id_len: 5 }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BroadcastSettings {
    /// A connection that takes longer than this to accept a notification
    /// counts as unreachable.
    pub send_timeout_ms: u64,
}

impl BroadcastSettings {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

impl Default for BroadcastSettings {
    fn default() -> Self {
        Self {
            send_timeout_ms: 1_000,
        }
    }
}

impl ServiceConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&raw)?;
        log::debug!("Loaded config from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.board.config()?;
        if self.store.timeout_ms == 0 {
            return Err(ConfigError::Invalid("store.timeout_ms must be positive"));
        }
        if self.broadcast.send_timeout_ms == 0 {
            return Err(ConfigError::Invalid("broadcast.send_timeout_ms must be positive"));
        }
        if self.session.min_game_id_len == 0 {
            return Err(ConfigError::Invalid("session.min_game_id_len must be positive"));
        }
        Ok(())
    }
}
