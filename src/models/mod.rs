pub mod event;
pub mod game;
pub mod word;

pub use event::GameEvent;
pub use game::{
    // Grid types
    Position, Tile, TileView,
    // Level lifecycle
    BonusBreakdown, CompletionStage, LevelState, Progress,
};
pub use word::{DefinitionDetails, DefinitionStatus, WordEntry};
