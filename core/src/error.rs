use thiserror::Error;

use crate::Coord;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("Invalid board configuration: {bombs} bombs on a {size}x{size} board")]
    InvalidConfiguration { size: u32, bombs: u32 },
    #[error("Invalid coordinates ({x}, {y})")]
    InvalidTile { x: i64, y: i64 },
    #[error("Tile ({x}, {y}) is already revealed")]
    TileAlreadyRevealed { x: Coord, y: Coord },
    #[error("Tile ({x}, {y}) is flagged")]
    TileFlagged { x: Coord, y: Coord },
    #[error("Game already concluded, no new moves are accepted")]
    GameConcluded,
    #[error("Board values do not describe a valid square board")]
    InvalidBoardShape,
}

pub type Result<T> = core::result::Result<T, BoardError>;
