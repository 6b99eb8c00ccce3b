use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

use crate::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Won,
    Lost,
}

/// Result of a committed reveal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RevealReport {
    pub tiles: Vec<RevealedTile>,
    /// Set when this reveal concluded the game.
    pub outcome: Option<Outcome>,
}

/// What a player may see of one tile.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileView {
    pub value: Option<u8>,
    pub revealed: bool,
    pub flagged: bool,
}

/// Mutable board of one session: the fixed values plus revealed and flag
/// layers, the remaining safe tile counter and the final outcome.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredBoard")]
pub struct BoardState {
    values: BoardValues,
    revealed: TileMask,
    flags: TileMask,
    remaining_tiles: CellCount,
    outcome: Option<Outcome>,
}

/// Unchecked shape of a persisted [`BoardState`].
#[derive(Deserialize)]
struct StoredBoard {
    values: BoardValues,
    revealed: TileMask,
    flags: TileMask,
    remaining_tiles: CellCount,
    outcome: Option<Outcome>,
}

impl TryFrom<StoredBoard> for BoardState {
    type Error = BoardError;

    fn try_from(stored: StoredBoard) -> Result<Self> {
        let size = usize::from(stored.values.size());
        let dim = (size, size);
        if stored.revealed.dim() != dim
            || stored.flags.dim() != dim
            || stored.remaining_tiles > stored.values.safe_tiles()
        {
            return Err(BoardError::InvalidBoardShape);
        }
        Ok(Self {
            values: stored.values,
            revealed: stored.revealed,
            flags: stored.flags,
            remaining_tiles: stored.remaining_tiles,
            outcome: stored.outcome,
        })
    }
}

impl BoardState {
    pub fn new(values: BoardValues) -> Self {
        let size = values.size();
        Self {
            remaining_tiles: values.safe_tiles(),
            values,
            revealed: empty_mask(size),
            flags: empty_mask(size),
            outcome: None,
        }
    }

    pub fn values(&self) -> &BoardValues {
        &self.values
    }

    pub fn size(&self) -> Coord {
        self.values.size()
    }

    pub fn bomb_count(&self) -> CellCount {
        self.values.bomb_count()
    }

    pub fn remaining_tiles(&self) -> CellCount {
        self.remaining_tiles
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn is_concluded(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn is_revealed(&self, coords: Coord2) -> bool {
        self.revealed[coords.to_nd_index()]
    }

    pub fn is_flagged(&self, coords: Coord2) -> bool {
        self.flags[coords.to_nd_index()]
    }

    /// Validates wire coordinates against this board.
    pub fn tile_at(&self, x: i64, y: i64) -> Result<Coord2> {
        checked_coords(x, y, self.size())
    }

    pub fn reveal_at(&mut self, x: i64, y: i64) -> Result<RevealReport> {
        self.check_active()?;
        let coords = self.tile_at(x, y)?;
        if self.is_revealed(coords) {
            return Err(BoardError::TileAlreadyRevealed {
                x: coords.0,
                y: coords.1,
            });
        }
        if self.is_flagged(coords) {
            return Err(BoardError::TileFlagged {
                x: coords.0,
                y: coords.1,
            });
        }

        let reveal = reveal(&self.values, &self.revealed, &self.flags, coords);
        for tile_coords in reveal.coords() {
            self.revealed[tile_coords.to_nd_index()] = true;
        }
        self.remaining_tiles = self.remaining_tiles.saturating_sub(reveal.safe_count());

        let outcome = if reveal.hit_mine {
            Some(Outcome::Lost)
        } else if self.remaining_tiles == 0 {
            Some(Outcome::Won)
        } else {
            None
        };
        if outcome.is_some() {
            self.outcome = outcome;
        }

        Ok(RevealReport {
            tiles: reveal.tiles,
            outcome,
        })
    }

    pub fn toggle_flag_at(&mut self, x: i64, y: i64) -> Result<bool> {
        self.check_active()?;
        let coords = self.tile_at(x, y)?;
        let flagged = toggle_flag(&self.revealed, &self.flags, coords)?;
        self.flags[coords.to_nd_index()] = flagged;
        Ok(flagged)
    }

    /// Every revealed tile, row by row.
    pub fn revealed_tiles(&self) -> Vec<RevealedTile> {
        self.coords()
            .filter(|&coords| self.is_revealed(coords))
            .map(|(x, y)| RevealedTile {
                x,
                y,
                value: self.values.value_at((x, y)),
            })
            .collect()
    }

    pub fn flagged_coords(&self) -> Vec<Coord2> {
        self.coords()
            .filter(|&coords| self.is_flagged(coords))
            .collect()
    }

    /// Player-visible projection, `view()[y][x]`. Hidden values stay hidden.
    pub fn view(&self) -> Vec<Vec<TileView>> {
        let size = self.size();
        (0..size)
            .map(|y| {
                (0..size)
                    .map(|x| {
                        let revealed = self.is_revealed((x, y));
                        TileView {
                            value: revealed.then(|| self.values.value_at((x, y))),
                            revealed,
                            flagged: self.is_flagged((x, y)),
                        }
                    })
                    .collect()
            })
            .collect()
    }

    fn coords(&self) -> impl Iterator<Item = Coord2> + use<> {
        let size = self.size();
        (0..size).flat_map(move |y| (0..size).map(move |x| (x, y)))
    }

    fn check_active(&self) -> Result<()> {
        if self.is_concluded() {
            Err(BoardError::GameConcluded)
        } else {
            Ok(())
        }
    }
}
