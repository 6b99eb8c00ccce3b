use crate::*;
pub use random::*;

mod random;

pub trait BoardGenerator {
    fn generate(&mut self, config: BoardConfig) -> BoardValues;
}

/// Hands out the same prepared layout for every request, whatever the config.
#[derive(Clone, Debug, PartialEq)]
pub struct FixedBoardGenerator {
    layout: BoardValues,
}

impl FixedBoardGenerator {
    pub fn new(layout: BoardValues) -> Self {
        Self { layout }
    }
}

impl BoardGenerator for FixedBoardGenerator {
    fn generate(&mut self, config: BoardConfig) -> BoardValues {
        if config.size() != self.layout.size() || config.bombs() != self.layout.bomb_count() {
            log::debug!(
                "Fixed layout {}x{} with {} bombs ignores requested {}x{} with {} bombs",
                self.layout.size(),
                self.layout.size(),
                self.layout.bomb_count(),
                config.size(),
                config.size(),
                config.bombs()
            );
        }
        self.layout.clone()
    }
}

/// Generates a single board from raw parameters.
pub fn generate(size: u32, bombs: u32, seed: u64) -> Result<BoardValues> {
    let config = BoardConfig::new(size, bombs)?;
    Ok(RandomBoardGenerator::from_seed(seed).generate(config))
}
