use thiserror::Error;

/// Errors that prevent a level from starting.
///
/// Everything else (bad input, failed lookups, timer expiry) is absorbed
/// where it happens and never reaches the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("grid of {width}x{height} has an odd number of cells")]
    OddCellCount { width: usize, height: usize },

    #[error("grid of {cells} cells cannot be split into groups of {match_size}")]
    InvalidMatchSize { cells: usize, match_size: usize },

    #[error("no letters available to place on the grid")]
    EmptyLetterSource,

    #[error("at least one tile type is required")]
    NoTileTypes,

    #[error("no word available for difficulty {difficulty}")]
    NoWordAvailable { difficulty: u8 },

    #[error("level {0} is out of range, levels start at 1")]
    LevelOutOfRange(u32),

    #[error("level {level} is locked, highest unlocked level is {max_unlocked}")]
    LevelLocked { level: u32, max_unlocked: u32 },
}

pub type GameResult<T> = Result<T, GameError>;
