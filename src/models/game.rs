use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Grid coordinate of a tile. `x` is the column, `y` the row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tile {
    pub position: Position,
    /// Match category. Two tiles match when their types are equal.
    pub tile_type: u8,
    /// Hidden letter, `None` for a blank tile.
    pub letter: Option<char>,
    pub is_matched: bool,
    pub is_selected: bool,
}

impl Tile {
    pub fn new(position: Position, tile_type: u8, letter: Option<char>) -> Self {
        Self {
            position,
            tile_type,
            letter,
            is_matched: false,
            is_selected: false,
        }
    }
}

/// Client-facing view of a tile. The letter stays hidden until the tile is matched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TileView {
    pub position: Position,
    pub tile_type: u8,
    pub letter: Option<char>,
    pub is_matched: bool,
    pub is_selected: bool,
}

impl From<&Tile> for TileView {
    fn from(tile: &Tile) -> Self {
        Self {
            position: tile.position,
            tile_type: tile.tile_type,
            letter: if tile.is_matched { tile.letter } else { None },
            is_matched: tile.is_matched,
            is_selected: tile.is_selected,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LevelState {
    #[default]
    Menu,
    Playing,
    Paused,
    LevelComplete,
    GameOver,
}

impl LevelState {
    /// Whether the grid accepts tile selections in this state
    pub fn accepts_input(self) -> bool {
        matches!(self, LevelState::Playing)
    }
}

/// Stages of the level-completion sequence, in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStage {
    PauseGameplay,
    AssembleWord,
    ShowDefinition,
    AwardBonuses,
    UnlockNextLevel,
}

impl CompletionStage {
    pub fn next(self) -> Option<Self> {
        match self {
            CompletionStage::PauseGameplay => Some(CompletionStage::AssembleWord),
            CompletionStage::AssembleWord => Some(CompletionStage::ShowDefinition),
            CompletionStage::ShowDefinition => Some(CompletionStage::AwardBonuses),
            CompletionStage::AwardBonuses => Some(CompletionStage::UnlockNextLevel),
            CompletionStage::UnlockNextLevel => None,
        }
    }
}

/// Itemised end-of-level bonus
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct BonusBreakdown {
    pub time_bonus: u32,
    pub perfect_bonus: u32,
    pub level_bonus: u32,
}

impl BonusBreakdown {
    pub fn total(&self) -> u32 {
        self.time_bonus + self.perfect_bonus + self.level_bonus
    }
}

/// Durable player progress. Both fields only ever grow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Progress {
    pub max_level_unlocked: u32,
    pub high_score: u32,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            max_level_unlocked: 1,
            high_score: 0,
            updated_at: None,
        }
    }
}

impl Progress {
    /// Fold a level result in with `max` semantics. Returns true if anything grew.
    pub fn record(&mut self, unlocked_level: u32, score: u32) -> bool {
        let changed = unlocked_level > self.max_level_unlocked || score > self.high_score;
        self.max_level_unlocked = self.max_level_unlocked.max(unlocked_level);
        self.high_score = self.high_score.max(score);
        if changed {
            self.updated_at = Some(Utc::now());
        }
        changed
    }

    /// Merge another snapshot of progress into this one
    pub fn merge(&mut self, other: &Progress) -> bool {
        self.record(other.max_level_unlocked, other.high_score)
    }
}
