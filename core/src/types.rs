use ndarray::Array2;

use crate::{BoardError, Result};

/// Single board axis, used for the board edge length and tile positions.
pub type Coord = u8;

/// Count type used for bomb counts, tile counts and the remaining-tile counter.
pub type CellCount = u16;

/// Tile position `(x, y)`.
pub type Coord2 = (Coord, Coord);

/// Per-tile boolean layer of a board, indexed `[x, y]`.
pub type TileMask = Array2<bool>;

pub trait ToNdIndex {
    type Output;
    fn to_nd_index(self) -> Self::Output;
}

impl ToNdIndex for Coord2 {
    type Output = [usize; 2];

    fn to_nd_index(self) -> Self::Output {
        [self.0.into(), self.1.into()]
    }
}

/// Number of tiles on a square board with the given edge.
pub const fn area(size: Coord) -> CellCount {
    let size = size as CellCount;
    size.saturating_mul(size)
}

/// Creates an all-false mask for a `size`×`size` board.
pub fn empty_mask(size: Coord) -> TileMask {
    TileMask::default((size.into(), size.into()))
}

/// Narrows coordinates coming off the wire to a tile on a `size` board.
pub fn checked_coords(x: i64, y: i64, size: Coord) -> Result<Coord2> {
    let narrow = |value: i64| Coord::try_from(value).ok().filter(|&value| value < size);
    match (narrow(x), narrow(y)) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => Err(BoardError::InvalidTile { x, y }),
    }
}

pub trait SquareGridExt {
    /// Edge length of the grid, saturated to [`Coord::MAX`].
    fn edge(&self) -> Coord;

    fn contains_coords(&self, coords: Coord2) -> bool {
        let edge = self.edge();
        coords.0 < edge && coords.1 < edge
    }

    fn neighbors(&self, coords: Coord2) -> Neighbors {
        Neighbors::new(coords, self.edge())
    }
}

impl<T> SquareGridExt for Array2<T> {
    fn edge(&self) -> Coord {
        let (width, height) = self.dim();
        Coord::try_from(width.min(height)).unwrap_or(Coord::MAX)
    }
}

/// Fixed neighbor visiting order; flood-fill output order depends on it.
const OFFSETS: [(i8, i8); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Shifts `coords` by `offset`, returning a value only when it stays on the board.
fn shift(coords: Coord2, offset: (i8, i8), edge: Coord) -> Option<Coord2> {
    let x = coords.0.checked_add_signed(offset.0).filter(|&x| x < edge)?;
    let y = coords.1.checked_add_signed(offset.1).filter(|&y| y < edge)?;
    Some((x, y))
}

/// In-bounds neighbors of a tile, self excluded.
#[derive(Debug, Clone)]
pub struct Neighbors {
    center: Coord2,
    edge: Coord,
    next: usize,
}

impl Neighbors {
    pub fn new(center: Coord2, edge: Coord) -> Self {
        Self {
            center,
            edge,
            next: 0,
        }
    }
}

impl Iterator for Neighbors {
    type Item = Coord2;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(&offset) = OFFSETS.get(self.next) {
            self.next += 1;
            if let Some(coords) = shift(self.center, offset, self.edge) {
                return Some(coords);
            }
        }
        None
    }
}
