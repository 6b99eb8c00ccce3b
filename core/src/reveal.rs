use alloc::collections::VecDeque;
use alloc::vec;
use alloc::vec::Vec;
use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::*;

/// A tile uncovered by a reveal, with the value players now see.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RevealedTile {
    pub x: Coord,
    pub y: Coord,
    pub value: u8,
}

impl RevealedTile {
    fn at(values: &BoardValues, (x, y): Coord2) -> Self {
        Self {
            x,
            y,
            value: values.value_at((x, y)),
        }
    }

    pub const fn coords(&self) -> Coord2 {
        (self.x, self.y)
    }

    pub const fn is_mine(&self) -> bool {
        self.value == MINE
    }
}

/// Tiles newly revealed by one action, in discovery order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reveal {
    pub tiles: Vec<RevealedTile>,
    pub hit_mine: bool,
}

impl Reveal {
    pub fn coords(&self) -> impl Iterator<Item = Coord2> + '_ {
        self.tiles.iter().map(RevealedTile::coords)
    }

    /// Number of non-mine tiles among the revealed ones.
    pub fn safe_count(&self) -> CellCount {
        let count = self.tiles.iter().filter(|tile| !tile.is_mine()).count();
        CellCount::try_from(count).unwrap_or(CellCount::MAX)
    }
}

/// Computes what revealing `target` uncovers, without touching any state.
///
/// The caller guarantees `target` is on the board, hidden and not flagged.
/// A mine discloses every hidden tile (target first, then row by row). A
/// numbered tile reveals only itself. A zero tile floods outwards: every
/// hidden, unflagged neighbor is revealed, and zero neighbors keep expanding.
pub fn reveal(
    values: &BoardValues,
    revealed: &TileMask,
    flags: &TileMask,
    target: Coord2,
) -> Reveal {
    if values.is_mine(target) {
        return disclose(values, revealed, target);
    }

    let mut tiles = vec![RevealedTile::at(values, target)];
    if values.value_at(target) != 0 {
        return Reveal {
            tiles,
            hit_mine: false,
        };
    }

    let mut visited = HashSet::new();
    visited.insert(target);
    let mut to_visit = VecDeque::from([target]);

    while let Some(current) = to_visit.pop_front() {
        for next in values.neighbors(current) {
            let index = next.to_nd_index();
            if revealed[index] || flags[index] || !visited.insert(next) {
                continue;
            }

            // neighbors of a zero are never mines
            let tile = RevealedTile::at(values, next);
            tiles.push(tile);
            if tile.value == 0 {
                to_visit.push_back(next);
            }
        }
    }

    Reveal {
        tiles,
        hit_mine: false,
    }
}

fn disclose(values: &BoardValues, revealed: &TileMask, target: Coord2) -> Reveal {
    let size = values.size();
    let hidden = (0..size)
        .flat_map(|y| (0..size).map(move |x| (x, y)))
        .filter(|&coords| coords != target && !revealed[coords.to_nd_index()]);

    let tiles = core::iter::once(target)
        .chain(hidden)
        .map(|coords| RevealedTile::at(values, coords))
        .collect();

    Reveal {
        tiles,
        hit_mine: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashbrown::HashSet;
    use proptest::prelude::*;

    fn layout(size: Coord, mines: &[Coord2]) -> BoardValues {
        BoardValues::from_mine_coords(size, mines).unwrap()
    }

    fn coord_set(reveal: &Reveal) -> HashSet<Coord2> {
        reveal.coords().collect()
    }

    fn all_safe(values: &BoardValues) -> HashSet<Coord2> {
        let size = values.size();
        (0..size)
            .flat_map(|y| (0..size).map(move |x| (x, y)))
            .filter(|&coords| !values.is_mine(coords))
            .collect()
    }

    #[test]
    fn zero_tile_floods_whole_safe_area() {
        let values = layout(3, &[(0, 0)]);
        let mask = empty_mask(3);

        let reveal = reveal(&values, &mask, &mask, (2, 2));

        assert!(!reveal.hit_mine);
        assert_eq!(reveal.tiles.len(), 8);
        assert_eq!(coord_set(&reveal), all_safe(&values));
        assert_eq!(reveal.tiles[0], RevealedTile { x: 2, y: 2, value: 0 });
    }

    #[test]
    fn numbered_tile_reveals_only_itself() {
        let values = layout(3, &[(0, 0)]);
        let mask = empty_mask(3);

        let reveal = reveal(&values, &mask, &mask, (1, 1));

        assert_eq!(reveal.tiles, [RevealedTile { x: 1, y: 1, value: 1 }]);
        assert_eq!(reveal.safe_count(), 1);
    }

    #[test]
    fn mine_discloses_every_hidden_tile_target_first() {
        let values = layout(3, &[(0, 0)]);
        let mut revealed = empty_mask(3);
        revealed[[2, 2]] = true;
        let mut flags = empty_mask(3);
        flags[[1, 0]] = true;

        let reveal = reveal(&values, &revealed, &flags, (0, 0));

        assert!(reveal.hit_mine);
        assert_eq!(reveal.tiles[0], RevealedTile { x: 0, y: 0, value: 9 });
        assert_eq!(reveal.tiles.len(), 8);
        assert!(reveal.coords().all(|coords| coords != (2, 2)));
        assert!(reveal.coords().any(|coords| coords == (1, 0)));
        assert_eq!(reveal.safe_count(), 7);
    }

    #[test]
    fn flags_stop_the_flood() {
        // a wall of flags down column 2 splits the board
        let values = layout(5, &[(4, 4)]);
        let mask = empty_mask(5);
        let mut flags = empty_mask(5);
        for y in 0..5 {
            flags[[2, y]] = true;
        }

        let reveal = reveal(&values, &mask, &flags, (0, 0));

        let expected: HashSet<Coord2> = (0..5).flat_map(|y| [(0, y), (1, y)]).collect();
        assert_eq!(coord_set(&reveal), expected);
        for y in 0..5 {
            assert!(flags[[2, y]]);
        }
    }

    #[test]
    fn already_revealed_tiles_are_not_reported_again() {
        let values = layout(4, &[(3, 3)]);
        let mut revealed = empty_mask(4);
        revealed[[0, 3]] = true;
        revealed[[1, 3]] = true;
        let mask = empty_mask(4);

        let reveal = reveal(&values, &revealed, &mask, (0, 0));

        assert_eq!(reveal.tiles.len(), 13);
        assert!(!coord_set(&reveal).contains(&(0, 3)));
        assert!(!coord_set(&reveal).contains(&(3, 3)));
    }

    #[test]
    fn border_numbers_are_revealed_but_not_expanded() {
        // mines at x = 2 fence the left zero column in with numbered tiles
        let values = layout(5, &[(2, 0), (2, 1), (2, 2), (2, 3), (2, 4)]);
        let mask = empty_mask(5);

        let reveal = reveal(&values, &mask, &mask, (0, 2));

        let expected: HashSet<Coord2> = (0..5).flat_map(|y| [(0, y), (1, y)]).collect();
        assert_eq!(coord_set(&reveal), expected);
        assert!(reveal.tiles.iter().filter(|tile| tile.x == 1).all(|tile| tile.value > 0));
    }

    prop_compose! {
        fn board_with_flags()(size in 2u8..12)(
            size in Just(size),
            mines in proptest::collection::vec((0..size, 0..size), 1..(usize::from(size) * 2)),
            flags in proptest::collection::vec((0..size, 0..size), 0..6),
            target in (0..size, 0..size),
        ) -> (BoardValues, TileMask, Coord2) {
            let values = BoardValues::from_mine_coords(size, &mines)
                .unwrap_or_else(|_| BoardValues::from_mine_coords(size, &[(0, 0)]).unwrap());
            let mut mask = empty_mask(size);
            for coords in flags {
                mask[coords.to_nd_index()] = true;
            }
            (values, mask, target)
        }
    }

    proptest! {
        #[test]
        fn flood_region_is_closed_and_never_repeats(
            (values, flags, target) in board_with_flags()
        ) {
            prop_assume!(!values.is_mine(target) && !flags[target.to_nd_index()]);
            let revealed = empty_mask(values.size());

            let reveal = reveal(&values, &revealed, &flags, target);

            let found = coord_set(&reveal);
            prop_assert_eq!(found.len(), reveal.tiles.len());
            prop_assert!(!reveal.hit_mine);
            for tile in &reveal.tiles {
                prop_assert!(!tile.is_mine());
                prop_assert!(!flags[tile.coords().to_nd_index()]);
                if tile.value == 0 {
                    for next in values.neighbors(tile.coords()) {
                        prop_assert!(flags[next.to_nd_index()] || found.contains(&next));
                    }
                }
            }
            if values.value_at(target) != 0 {
                prop_assert_eq!(reveal.tiles.len(), 1);
            }
        }
    }
}
