use serde::{Deserialize, Serialize};

use crate::models::{BonusBreakdown, CompletionStage, LevelState, Position, Progress, TileView};

/// Events emitted by the game core for renderers, audio and storage.
///
/// The core never reads anything back from the subscriber.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    LevelStarted {
        level: u32,
        difficulty: u8,
        time_limit_secs: u32,
        width: usize,
        height: usize,
        tiles: Vec<TileView>,
    },
    WordSelected {
        word_length: usize,
        display: String,
        difficulty: u8,
        category: String,
        definition: String,
    },
    DefinitionUpdated {
        definition: String,
        pronunciation: Option<String>,
        examples: Vec<String>,
        fallback: bool,
    },
    TileSelected {
        position: Position,
    },
    TileDeselected {
        position: Position,
    },
    MatchResult {
        tiles: Vec<Position>,
        success: bool,
    },
    ScoreAwarded {
        amount: u32,
        combo: u32,
    },
    LetterProgress {
        letter: char,
        revealed: u32,
        required: u32,
        display: String,
    },
    AllLettersRevealed,
    WordCompleted {
        word: String,
    },
    GameStateChanged {
        state: LevelState,
    },
    Timer {
        remaining_secs: u32,
    },
    CompletionStage {
        stage: CompletionStage,
    },
    BonusAwarded {
        breakdown: BonusBreakdown,
        total: u32,
        score: u32,
    },
    LevelCompleted {
        level: u32,
        score: u32,
        progress: Progress,
    },
}
