use alloc::vec::Vec;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

use super::*;

/// Places mines uniformly at random without replacement. Successive boards
/// from one generator differ, but the sequence is fixed by the seed.
#[derive(Clone, Debug)]
pub struct RandomBoardGenerator {
    rng: SmallRng,
}

impl RandomBoardGenerator {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl BoardGenerator for RandomBoardGenerator {
    fn generate(&mut self, config: BoardConfig) -> BoardValues {
        let size = config.size();
        let edge = CellCount::from(size);

        let mut tiles: Vec<CellCount> = (0..config.total_tiles()).collect();
        let (mines, _) = tiles.partial_shuffle(&mut self.rng, config.bombs().into());

        let mut mine_mask = empty_mask(size);
        for &index in mines.iter() {
            let coords = ((index % edge) as Coord, (index / edge) as Coord);
            mine_mask[coords.to_nd_index()] = true;
        }

        let board = BoardValues::from_mine_mask(&mine_mask);
        log::debug!(
            "Generated {}x{} board with {} bombs",
            size,
            size,
            board.bomb_count()
        );
        board
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn brute_force_count(board: &BoardValues, (x, y): Coord2) -> u8 {
        let size = i16::from(board.size());
        let mut count = 0;
        for dy in -1..=1i16 {
            for dx in -1..=1i16 {
                let (nx, ny) = (i16::from(x) + dx, i16::from(y) + dy);
                if (dx, dy) == (0, 0) || nx < 0 || ny < 0 || nx >= size || ny >= size {
                    continue;
                }
                if board.is_mine((nx as Coord, ny as Coord)) {
                    count += 1;
                }
            }
        }
        count
    }

    #[test]
    fn same_seed_gives_same_boards() {
        let config = BoardConfig::new(10, 20).unwrap();
        let mut first = RandomBoardGenerator::from_seed(7);
        let mut second = RandomBoardGenerator::from_seed(7);

        assert_eq!(first.generate(config), second.generate(config));
        assert_eq!(first.generate(config), second.generate(config));
    }

    #[test]
    fn nearly_full_board_leaves_one_safe_tile() {
        let board = generate(4, 15, 3).unwrap();

        assert_eq!(board.bomb_count(), 15);
        assert_eq!(board.safe_tiles(), 1);
    }

    #[test]
    fn default_config_matches_service_defaults() {
        let board = RandomBoardGenerator::from_seed(1).generate(BoardConfig::default());

        assert_eq!(board.size(), 25);
        assert_eq!(board.bomb_count(), 65);
    }

    #[test]
    fn raw_parameters_are_validated() {
        assert_eq!(
            generate(5, 25, 0),
            Err(BoardError::InvalidConfiguration { size: 5, bombs: 25 })
        );
    }

    proptest! {
        #[test]
        fn generated_boards_have_exact_counts(
            size in 1u32..=30,
            fill in 0.0f64..1.0,
            seed in any::<u64>(),
        ) {
            let total = size * size;
            prop_assume!(total > 1);
            let bombs = 1 + ((f64::from(total - 2)) * fill) as u32;
            let board = generate(size, bombs, seed).unwrap();

            let mines = (0..board.size())
                .flat_map(|y| (0..board.size()).map(move |x| (x, y)))
                .filter(|&coords| board.is_mine(coords))
                .count();
            prop_assert_eq!(mines, bombs as usize);

            for y in 0..board.size() {
                for x in 0..board.size() {
                    if !board.is_mine((x, y)) {
                        prop_assert_eq!(board.value_at((x, y)), brute_force_count(&board, (x, y)));
                    }
                }
            }
        }
    }
}
