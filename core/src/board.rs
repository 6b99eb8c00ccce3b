#[cfg(test)]
use alloc::vec::Vec;
use core::ops::Index;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::*;

/// Tile value marking a mine.
pub const MINE: u8 = 9;

pub const DEFAULT_BOARD_SIZE: Coord = 25;
pub const DEFAULT_BOMB_COUNT: CellCount = 65;

/// Validated board parameters: a square edge and a bomb count that leaves at
/// least one safe tile.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BoardConfig {
    size: Coord,
    bombs: CellCount,
}

impl BoardConfig {
    pub fn new(size: u32, bombs: u32) -> Result<Self> {
        let invalid = BoardError::InvalidConfiguration { size, bombs };
        let size = Coord::try_from(size)
            .ok()
            .filter(|&size| size > 0)
            .ok_or(invalid)?;
        let bombs = CellCount::try_from(bombs)
            .ok()
            .filter(|&bombs| bombs > 0 && bombs < area(size))
            .ok_or(invalid)?;
        Ok(Self { size, bombs })
    }

    pub const fn size(&self) -> Coord {
        self.size
    }

    pub const fn bombs(&self) -> CellCount {
        self.bombs
    }

    pub const fn total_tiles(&self) -> CellCount {
        area(self.size)
    }

    pub const fn safe_tiles(&self) -> CellCount {
        self.total_tiles() - self.bombs
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_BOARD_SIZE,
            bombs: DEFAULT_BOMB_COUNT,
        }
    }
}

/// Immutable tile values of a board: [`MINE`] or the number of adjacent mines.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Array2<u8>", into = "Array2<u8>")]
pub struct BoardValues {
    values: Array2<u8>,
    bombs: CellCount,
}

impl BoardValues {
    pub fn from_mine_coords(size: Coord, mines: &[Coord2]) -> Result<Self> {
        let mut mine_mask = empty_mask(size);
        for &(x, y) in mines {
            if x >= size || y >= size {
                return Err(BoardError::InvalidTile {
                    x: x.into(),
                    y: y.into(),
                });
            }
            mine_mask[(x, y).to_nd_index()] = true;
        }

        let layout = Self::from_mine_mask(&mine_mask);
        BoardConfig::new(size.into(), layout.bombs.into())?;
        Ok(layout)
    }

    /// Counts neighbors for every safe tile of `mine_mask`.
    pub(crate) fn from_mine_mask(mine_mask: &TileMask) -> Self {
        let mut bombs = 0;
        let values = Array2::from_shape_fn(mine_mask.dim(), |(x, y)| {
            if mine_mask[(x, y)] {
                bombs += 1;
                return MINE;
            }
            let coords = (x as Coord, y as Coord);
            let count = mine_mask
                .neighbors(coords)
                .filter(|&pos| mine_mask[pos.to_nd_index()])
                .count();
            count as u8
        });
        Self { values, bombs }
    }

    /// Accepts a stored grid only if it is square and every count agrees with
    /// the mines around it.
    pub fn from_values(values: Array2<u8>) -> Result<Self> {
        let (width, height) = values.dim();
        if width != height || width == 0 || width > Coord::MAX.into() {
            return Err(BoardError::InvalidBoardShape);
        }
        if values.iter().any(|&value| value > MINE) {
            return Err(BoardError::InvalidBoardShape);
        }

        let mine_mask = values.mapv(|value| value == MINE);
        let layout = Self::from_mine_mask(&mine_mask);
        if layout.values != values {
            return Err(BoardError::InvalidBoardShape);
        }
        BoardConfig::new(layout.size().into(), layout.bombs.into())?;
        Ok(layout)
    }

    pub fn size(&self) -> Coord {
        self.values.edge()
    }

    pub fn bomb_count(&self) -> CellCount {
        self.bombs
    }

    pub fn total_tiles(&self) -> CellCount {
        area(self.size())
    }

    pub fn safe_tiles(&self) -> CellCount {
        self.total_tiles() - self.bombs
    }

    pub fn contains(&self, coords: Coord2) -> bool {
        self.values.contains_coords(coords)
    }

    pub fn value_at(&self, coords: Coord2) -> u8 {
        self[coords]
    }

    pub fn is_mine(&self, coords: Coord2) -> bool {
        self[coords] == MINE
    }

    pub fn neighbors(&self, coords: Coord2) -> Neighbors {
        self.values.neighbors(coords)
    }

    /// Values as rows, `rows()[y][x]`.
    #[cfg(test)]
    pub fn rows(&self) -> Vec<Vec<u8>> {
        let size = self.size();
        (0..size)
            .map(|y| (0..size).map(|x| self[(x, y)]).collect())
            .collect()
    }
}

impl Index<Coord2> for BoardValues {
    type Output = u8;

    fn index(&self, coords: Coord2) -> &Self::Output {
        &self.values[coords.to_nd_index()]
    }
}

impl TryFrom<Array2<u8>> for BoardValues {
    type Error = BoardError;

    fn try_from(values: Array2<u8>) -> Result<Self> {
        Self::from_values(values)
    }
}

impl From<BoardValues> for Array2<u8> {
    fn from(board: BoardValues) -> Self {
        board.values
    }
}
