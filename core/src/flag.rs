use crate::*;

/// Returns the flag state `target` would have after a toggle.
pub fn toggle_flag(revealed: &TileMask, flags: &TileMask, target: Coord2) -> Result<bool> {
    let (x, y) = target;
    if !revealed.contains_coords(target) || !flags.contains_coords(target) {
        return Err(BoardError::InvalidTile {
            x: x.into(),
            y: y.into(),
        });
    }
    if revealed[target.to_nd_index()] {
        return Err(BoardError::TileAlreadyRevealed { x, y });
    }
    Ok(!flags[target.to_nd_index()])
}
