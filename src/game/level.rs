use std::sync::Arc;

use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{
    config::GameConfig,
    dictionary::WordCatalog,
    error::{GameError, GameResult},
    game::{
        events::EventSink,
        grid::{GridLayout, GridModel},
        matcher::{EngineState, MatchEngine, Resolution, SelectOutcome},
        scheduler::Scheduler,
        scorer::Scorer,
        word::WordModel,
    },
    models::{
        BonusBreakdown, CompletionStage, DefinitionDetails, DefinitionStatus, GameEvent, LevelState,
        Position, Progress, TileView, WordEntry,
    },
    utils::letters::tracked_letters,
};

/// Delayed continuations. `epoch` ties a task to the level that scheduled
/// it; tasks from an earlier level are discarded when they fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    ResolveMatch { epoch: u64 },
    FinishMismatch { epoch: u64 },
    Completion { epoch: u64, stage: CompletionStage },
}

/// Full view of the game for a client that (re)connects
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameSnapshot {
    pub level: u32,
    pub state: LevelState,
    pub engine: EngineState,
    pub score: u32,
    pub combo: u32,
    pub remaining_secs: u32,
    pub time_limit_secs: u32,
    pub display: String,
    pub progress_fraction: f32,
    pub definition: Option<String>,
    pub width: usize,
    pub height: usize,
    pub tiles: Vec<TileView>,
    pub bonus: Option<BonusBreakdown>,
    pub progress: Progress,
}

/// Level lifecycle controller. Owns the word, the grid and the match engine
/// for one player and is the only writer of all three.
pub struct LevelOrchestrator {
    config: GameConfig,
    catalog: Arc<WordCatalog>,
    categories: Option<Vec<String>>,
    rng: StdRng,
    events: EventSink,

    word: WordModel,
    grid: GridModel,
    engine: MatchEngine,
    scheduler: Scheduler<Task>,
    epoch: u64,

    state: LevelState,
    level: u32,
    score: u32,
    level_start_score: u32,
    time_limit_ms: u64,
    remaining_ms: u64,
    reported_secs: u32,
    total_matches: u32,
    perfect_matches: u32,
    letters_announced: bool,
    completion_started: bool,
    completion_finished: bool,
    last_bonus: Option<BonusBreakdown>,
    progress: Progress,
}

impl LevelOrchestrator {
    pub fn new(config: GameConfig, catalog: Arc<WordCatalog>, events: EventSink) -> Self {
        Self::with_rng(config, catalog, events, StdRng::from_os_rng())
    }

    pub fn with_rng(
        config: GameConfig,
        catalog: Arc<WordCatalog>,
        events: EventSink,
        rng: StdRng,
    ) -> Self {
        let engine = MatchEngine::new(config.tiles_per_match);
        Self {
            config,
            catalog,
            categories: None,
            rng,
            events,
            word: WordModel::new(),
            grid: GridModel::default(),
            engine,
            scheduler: Scheduler::new(),
            epoch: 0,
            state: LevelState::Menu,
            level: 0,
            score: 0,
            level_start_score: 0,
            time_limit_ms: 0,
            remaining_ms: 0,
            reported_secs: 0,
            total_matches: 0,
            perfect_matches: 0,
            letters_announced: false,
            completion_started: false,
            completion_finished: false,
            last_bonus: None,
            progress: Progress::default(),
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn word(&self) -> &WordModel {
        &self.word
    }

    pub fn set_progress(&mut self, progress: Progress) {
        self.progress = progress;
    }

    pub fn set_categories(&mut self, categories: Option<Vec<String>>) {
        self.categories = categories.filter(|c| !c.is_empty());
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            level: self.level,
            state: self.state,
            engine: self.engine.state(),
            score: self.score,
            combo: self.engine.combo(),
            remaining_secs: Self::whole_secs(self.remaining_ms),
            time_limit_secs: Self::whole_secs(self.time_limit_ms),
            display: self.word.display_string(),
            progress_fraction: self.word.progress_fraction(),
            definition: self.word.entry().map(|e| e.definition.clone()),
            width: self.grid.width(),
            height: self.grid.height(),
            tiles: self.grid.views(),
            bonus: self.last_bonus,
            progress: self.progress.clone(),
        }
    }

    fn whole_secs(ms: u64) -> u32 {
        ms.div_ceil(1000) as u32
    }

    fn set_state(&mut self, state: LevelState) {
        if self.state != state {
            tracing::debug!("Level state {:?} -> {:?}", self.state, state);
            self.state = state;
            self.events.emit(GameEvent::GameStateChanged { state });
        }
    }

    /// Start a fresh run at `level`, zeroing the running score. Levels past
    /// the highest unlocked one are refused.
    pub fn new_game(&mut self, level: u32) -> GameResult<()> {
        if level == 0 {
            return Err(GameError::LevelOutOfRange(level));
        }
        if level > self.progress.max_level_unlocked {
            return Err(GameError::LevelLocked {
                level,
                max_unlocked: self.progress.max_level_unlocked,
            });
        }
        self.score = 0;
        self.start_level(level)
    }

    /// Start `level` with a word drawn from the catalog
    pub fn start_level(&mut self, level: u32) -> GameResult<()> {
        if level == 0 {
            return Err(GameError::LevelOutOfRange(level));
        }
        self.reset_level();

        let entry = match self.word.select_word(
            &self.catalog,
            level,
            self.categories.as_deref(),
            &mut self.rng,
        ) {
            Ok(entry) => entry.clone(),
            Err(e) => {
                self.set_state(LevelState::Menu);
                return Err(e);
            }
        };
        self.begin(level, entry)
    }

    fn reset_level(&mut self) {
        self.epoch += 1;
        self.scheduler.clear();
        self.engine.reset();
        self.grid.clear();
        self.word.clear();
        self.total_matches = 0;
        self.perfect_matches = 0;
        self.letters_announced = false;
        self.completion_started = false;
        self.completion_finished = false;
        self.last_bonus = None;
    }

    fn begin(&mut self, level: u32, entry: WordEntry) -> GameResult<()> {
        let entry = self.word.set_entry(entry).clone();
        let letters = tracked_letters(&entry.word);
        let layout = GridLayout::new(
            self.config.grid_width,
            self.config.grid_height,
            self.config.tile_types,
        )
        .with_match_size(self.config.tiles_per_match);

        self.grid = match GridModel::build(&layout, &letters, &mut self.rng) {
            Ok(grid) => grid,
            Err(e) => {
                self.word.clear();
                self.set_state(LevelState::Menu);
                return Err(e);
            }
        };

        self.level = level;
        self.level_start_score = self.score;
        let limit_secs = Scorer::time_limit_secs(&self.config, level);
        self.time_limit_ms = limit_secs as u64 * 1000;
        self.remaining_ms = self.time_limit_ms;
        self.reported_secs = limit_secs;

        tracing::info!(
            "Starting level {} (difficulty {}, {}s, {} letters)",
            level,
            entry.difficulty,
            limit_secs,
            letters.len()
        );

        self.events.emit(GameEvent::LevelStarted {
            level,
            difficulty: entry.difficulty,
            time_limit_secs: limit_secs,
            width: self.grid.width(),
            height: self.grid.height(),
            tiles: self.grid.views(),
        });
        self.events.emit(GameEvent::WordSelected {
            word_length: entry.word.chars().count(),
            display: self.word.display_string(),
            difficulty: entry.difficulty,
            category: entry.category.clone(),
            definition: entry.definition.clone(),
        });
        self.set_state(LevelState::Playing);
        Ok(())
    }

    /// Advance to the level after the one just completed
    pub fn next_level(&mut self) -> GameResult<bool> {
        if !self.completion_finished {
            tracing::debug!("next_level ignored, completion sequence not finished");
            return Ok(false);
        }
        self.start_level(self.level + 1).map(|_| true)
    }

    /// Play the current level again from its starting score
    pub fn replay_level(&mut self) -> GameResult<bool> {
        let replayable = self.completion_finished || self.state == LevelState::GameOver;
        if !replayable || self.level == 0 {
            tracing::debug!("replay_level ignored in state {:?}", self.state);
            return Ok(false);
        }
        self.score = self.level_start_score;
        self.start_level(self.level).map(|_| true)
    }

    pub fn pause(&mut self) -> bool {
        if self.state != LevelState::Playing {
            return false;
        }
        self.set_state(LevelState::Paused);
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.state != LevelState::Paused {
            return false;
        }
        self.set_state(LevelState::Playing);
        true
    }

    /// Player taps a tile. Ignored unless the level is being played.
    pub fn select_tile(&mut self, pos: Position) {
        if !self.state.accepts_input() {
            tracing::debug!("Tile {:?} ignored in state {:?}", pos, self.state);
            return;
        }
        match self.engine.select_tile(&mut self.grid, pos) {
            SelectOutcome::Ignored(reason) => {
                tracing::debug!("Tile {:?} ignored: {:?}", pos, reason);
            }
            SelectOutcome::Selected(position) => {
                self.events.emit(GameEvent::TileSelected { position });
            }
            SelectOutcome::Deselected(position) => {
                self.events.emit(GameEvent::TileDeselected { position });
            }
            SelectOutcome::CheckQueued(position) => {
                self.events.emit(GameEvent::TileSelected { position });
                let epoch = self.epoch;
                self.scheduler
                    .schedule(self.config.check_delay_ms, Task::ResolveMatch { epoch });
            }
        }
    }

    /// Apply a finished definition lookup for `word`. `None` means the lookup
    /// failed and the fallback definition is used.
    pub fn apply_definition(&mut self, word: &str, result: Option<DefinitionDetails>) {
        if !self.word.apply_definition(word, result) {
            tracing::debug!("Dropping definition for inactive word {}", word);
            return;
        }
        if let Some(entry) = self.word.entry() {
            self.events.emit(GameEvent::DefinitionUpdated {
                definition: entry.definition.clone(),
                pronunciation: entry.pronunciation.clone(),
                examples: entry.examples.clone(),
                fallback: entry.definition_status == DefinitionStatus::Fallback,
            });
        }
    }

    /// Advance game time by `elapsed_ms`. Fires every task that falls due in
    /// that window in order, and runs the level timer while playing.
    pub fn tick(&mut self, elapsed_ms: u64) {
        let target = self.scheduler.now_ms() + elapsed_ms;

        loop {
            let now = self.scheduler.now_ms();
            let expiry = (self.state == LevelState::Playing).then(|| now + self.remaining_ms);
            let step_to = expiry.map_or(target, |e| e.min(target));

            while let Some(due) = self.next_due_before(step_to) {
                self.advance_clock(due);
                if self.state == LevelState::Playing && self.remaining_ms == 0 {
                    // Expiry at the same instant as a task ends the level first
                    self.time_up();
                }
                if let Some(task) = self.scheduler.pop_due(due) {
                    self.run_task(task);
                }
            }

            self.advance_clock(step_to.max(self.scheduler.now_ms()));
            if self.state == LevelState::Playing && self.remaining_ms == 0 {
                self.time_up();
            }

            if self.scheduler.now_ms() >= target {
                // Drain anything due exactly at the target after a state change
                while let Some(task) = self.scheduler.pop_due(target) {
                    self.run_task(task);
                }
                break;
            }
        }

        self.engine.expire_combo(&self.config, self.scheduler.now_ms());
    }

    fn next_due_before(&self, limit: u64) -> Option<u64> {
        self.scheduler.next_due().filter(|&due| due <= limit)
    }

    /// Move the clock to `to_ms`, charging the elapsed time to the level
    /// timer when the level is being played
    fn advance_clock(&mut self, to_ms: u64) {
        let now = self.scheduler.now_ms();
        if to_ms <= now {
            return;
        }
        if self.state == LevelState::Playing {
            self.remaining_ms = self.remaining_ms.saturating_sub(to_ms - now);
            let secs = Self::whole_secs(self.remaining_ms);
            if secs != self.reported_secs {
                self.reported_secs = secs;
                self.events.emit(GameEvent::Timer {
                    remaining_secs: secs,
                });
            }
        }
        self.scheduler.advance_to(to_ms);
    }

    fn time_up(&mut self) {
        tracing::info!("Time up on level {} with score {}", self.level, self.score);
        self.set_state(LevelState::GameOver);
    }

    fn run_task(&mut self, task: Task) {
        match task {
            Task::ResolveMatch { epoch } if epoch == self.epoch => self.resolve_match(),
            Task::FinishMismatch { epoch } if epoch == self.epoch => {
                for position in self.engine.finish_mismatch(&mut self.grid) {
                    self.events.emit(GameEvent::TileDeselected { position });
                }
            }
            Task::Completion { epoch, stage } if epoch == self.epoch => {
                self.run_completion_stage(stage)
            }
            stale => tracing::debug!("Discarding task from an earlier level: {:?}", stale),
        }
    }

    fn resolve_match(&mut self) {
        if self.state == LevelState::GameOver {
            // No scoring after time has run out
            for position in self.engine.finish_mismatch(&mut self.grid) {
                self.events.emit(GameEvent::TileDeselected { position });
            }
            return;
        }

        let now = self.scheduler.now_ms();
        match self.engine.resolve(&mut self.grid, &self.config, now) {
            Resolution::Idle => {}
            Resolution::Mismatched { tiles } => {
                self.total_matches += 1;
                self.events.emit(GameEvent::MatchResult {
                    tiles,
                    success: false,
                });
                let epoch = self.epoch;
                self.scheduler
                    .schedule(self.config.mismatch_delay_ms, Task::FinishMismatch { epoch });
            }
            Resolution::Matched {
                tiles,
                letters,
                combo,
                score,
                grid_cleared,
            } => {
                self.total_matches += 1;
                self.perfect_matches += 1;
                self.score += score;
                self.events.emit(GameEvent::MatchResult {
                    tiles,
                    success: true,
                });
                self.events.emit(GameEvent::ScoreAwarded {
                    amount: score,
                    combo,
                });

                for letter in letters {
                    if self.word.reveal_letter(letter) {
                        let tracker = self.word.tracker();
                        self.events.emit(GameEvent::LetterProgress {
                            letter,
                            revealed: tracker.revealed(letter),
                            required: tracker.required(letter),
                            display: self.word.display_string(),
                        });
                    }
                }

                if !self.letters_announced && self.word.is_complete() {
                    self.letters_announced = true;
                    self.events.emit(GameEvent::AllLettersRevealed);
                }

                if grid_cleared {
                    self.begin_completion();
                }
            }
        }
    }

    fn begin_completion(&mut self) {
        if self.completion_started {
            return;
        }
        self.completion_started = true;
        tracing::info!("Level {} cleared, running completion sequence", self.level);
        self.run_completion_stage(CompletionStage::PauseGameplay);
    }

    fn stage_duration_ms(&self, stage: CompletionStage) -> u64 {
        match stage {
            CompletionStage::PauseGameplay => self.config.pause_stage_ms,
            CompletionStage::AssembleWord => self.config.assemble_stage_ms,
            CompletionStage::ShowDefinition => self.config.definition_stage_ms,
            CompletionStage::AwardBonuses => self.config.bonus_stage_ms,
            CompletionStage::UnlockNextLevel => 0,
        }
    }

    fn run_completion_stage(&mut self, stage: CompletionStage) {
        tracing::debug!("Completion stage {:?}", stage);
        self.events.emit(GameEvent::CompletionStage { stage });

        match stage {
            CompletionStage::PauseGameplay => {
                self.set_state(LevelState::LevelComplete);
                let word = self
                    .word
                    .entry()
                    .map(|e| e.word.clone())
                    .unwrap_or_default();
                self.events.emit(GameEvent::WordCompleted { word });
            }
            CompletionStage::AssembleWord | CompletionStage::ShowDefinition => {}
            CompletionStage::AwardBonuses => {
                let breakdown = Scorer::calculate_bonuses(
                    &self.config,
                    self.remaining_ms,
                    self.time_limit_ms,
                    self.perfect_matches,
                    self.total_matches,
                );
                let total = breakdown.total();
                self.score += total;
                self.last_bonus = Some(breakdown);
                self.events.emit(GameEvent::BonusAwarded {
                    breakdown,
                    total,
                    score: self.score,
                });
            }
            CompletionStage::UnlockNextLevel => {
                self.progress.record(self.level + 1, self.score);
                self.completion_finished = true;
                tracing::info!(
                    "Level {} complete with score {}, max level unlocked {}",
                    self.level,
                    self.score,
                    self.progress.max_level_unlocked
                );
                self.events.emit(GameEvent::LevelCompleted {
                    level: self.level,
                    score: self.score,
                    progress: self.progress.clone(),
                });
            }
        }

        if let Some(next) = stage.next() {
            let epoch = self.epoch;
            self.scheduler.schedule(
                self.stage_duration_ms(stage),
                Task::Completion { epoch, stage: next },
            );
        }
    }
}

/// Inspection and fixed-word setup for tests
#[cfg(test)]
impl LevelOrchestrator {
    pub fn state(&self) -> LevelState {
        self.state
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    pub fn time_limit_ms(&self) -> u64 {
        self.time_limit_ms
    }

    pub fn total_matches(&self) -> u32 {
        self.total_matches
    }

    pub fn perfect_matches(&self) -> u32 {
        self.perfect_matches
    }

    pub fn grid(&self) -> &GridModel {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut GridModel {
        &mut self.grid
    }

    pub fn engine(&self) -> &MatchEngine {
        &self.engine
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn last_bonus(&self) -> Option<BonusBreakdown> {
        self.last_bonus
    }

    /// True once the completion sequence has run all five stages
    pub fn completion_finished(&self) -> bool {
        self.completion_finished
    }

    /// Start `level` with a fixed word
    pub fn start_level_with(&mut self, level: u32, entry: WordEntry) -> GameResult<()> {
        if level == 0 {
            return Err(GameError::LevelOutOfRange(level));
        }
        self.reset_level();
        self.begin(level, entry)
    }
}
