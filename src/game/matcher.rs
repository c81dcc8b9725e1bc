use serde::{Deserialize, Serialize};

use crate::{
    config::GameConfig,
    game::{grid::GridModel, scorer::Scorer},
    models::Position,
};

/// Selection state. `Checking` holds from the moment the selection is full
/// until it has been resolved, and doubles as the lock that keeps a second
/// resolution from starting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    #[default]
    Idle,
    Selecting,
    Checking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Checking,
    AlreadyMatched,
    AtCapacity,
    OutOfBounds,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    Ignored(IgnoreReason),
    Selected(Position),
    Deselected(Position),
    /// The selection is full; a resolution must be scheduled
    CheckQueued(Position),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Matched {
        tiles: Vec<Position>,
        /// One entry per matched tile, blanks skipped
        letters: Vec<char>,
        combo: u32,
        score: u32,
        /// Set on the first success that leaves every tile matched
        grid_cleared: bool,
    },
    Mismatched {
        tiles: Vec<Position>,
    },
    /// Nothing was waiting to be resolved
    Idle,
}

#[derive(Debug, Clone)]
pub struct MatchEngine {
    match_size: usize,
    selection: Vec<Position>,
    state: EngineState,
    combo: u32,
    last_match_ms: Option<u64>,
    completion_signalled: bool,
}

impl MatchEngine {
    pub fn new(match_size: usize) -> Self {
        Self {
            match_size: match_size.max(2),
            selection: Vec::with_capacity(match_size),
            state: EngineState::Idle,
            combo: 0,
            last_match_ms: None,
            completion_signalled: false,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    #[cfg(test)]
    pub fn selection(&self) -> &[Position] {
        &self.selection
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    /// Drop a streak whose window has run out, so the reported combo
    /// matches what the next success would build on
    pub fn expire_combo(&mut self, config: &GameConfig, now_ms: u64) {
        if self.combo > 0 && Scorer::combo_expired(config, self.last_match_ms, now_ms) {
            self.combo = 0;
        }
    }

    fn settle_state(&mut self) {
        self.state = if self.selection.is_empty() {
            EngineState::Idle
        } else {
            EngineState::Selecting
        };
    }

    /// Handle a tap on `pos`. Invalid taps are expected during play and
    /// are reported as `Ignored`, never as errors.
    pub fn select_tile(&mut self, grid: &mut GridModel, pos: Position) -> SelectOutcome {
        if self.state == EngineState::Checking {
            return SelectOutcome::Ignored(IgnoreReason::Checking);
        }
        let Some(tile) = grid.tile_mut(pos) else {
            return SelectOutcome::Ignored(IgnoreReason::OutOfBounds);
        };
        if tile.is_matched {
            return SelectOutcome::Ignored(IgnoreReason::AlreadyMatched);
        }

        if let Some(index) = self.selection.iter().position(|&p| p == pos) {
            tile.is_selected = false;
            self.selection.remove(index);
            self.settle_state();
            return SelectOutcome::Deselected(pos);
        }

        if self.selection.len() >= self.match_size {
            return SelectOutcome::Ignored(IgnoreReason::AtCapacity);
        }

        tile.is_selected = true;
        self.selection.push(pos);

        if self.selection.len() == self.match_size {
            self.state = EngineState::Checking;
            SelectOutcome::CheckQueued(pos)
        } else {
            self.state = EngineState::Selecting;
            SelectOutcome::Selected(pos)
        }
    }

    /// Validate the full selection. Every selected tile must share one type.
    ///
    /// On success the tiles are matched and the selection is cleared. On a
    /// mismatch the engine stays in `Checking` until `finish_mismatch`.
    pub fn resolve(&mut self, grid: &mut GridModel, config: &GameConfig, now_ms: u64) -> Resolution {
        if self.state != EngineState::Checking || self.selection.len() != self.match_size {
            return Resolution::Idle;
        }

        let types: Vec<Option<u8>> = self
            .selection
            .iter()
            .map(|&p| grid.tile(p).map(|t| t.tile_type))
            .collect();
        let first = types[0];
        let success = first.is_some() && types.iter().all(|t| *t == first);

        if !success {
            self.combo = 0;
            return Resolution::Mismatched {
                tiles: self.selection.clone(),
            };
        }

        self.combo = Scorer::next_combo(config, self.combo, self.last_match_ms, now_ms);
        self.last_match_ms = Some(now_ms);
        let score = Scorer::match_score(config, self.combo);

        let tiles = std::mem::take(&mut self.selection);
        let mut letters = Vec::with_capacity(tiles.len());
        for &pos in &tiles {
            if let Some(tile) = grid.tile_mut(pos) {
                tile.is_matched = true;
                tile.is_selected = false;
                letters.extend(tile.letter);
            }
        }
        self.state = EngineState::Idle;

        let grid_cleared = !self.completion_signalled && grid.all_matched();
        if grid_cleared {
            self.completion_signalled = true;
        }

        Resolution::Matched {
            tiles,
            letters,
            combo: self.combo,
            score,
            grid_cleared,
        }
    }

    /// Release the tiles of a failed match and accept input again
    pub fn finish_mismatch(&mut self, grid: &mut GridModel) -> Vec<Position> {
        let released = std::mem::take(&mut self.selection);
        for &pos in &released {
            if let Some(tile) = grid.tile_mut(pos) {
                tile.is_selected = false;
            }
        }
        self.state = EngineState::Idle;
        released
    }

    /// Drop any selection without touching tiles, for a fresh level
    pub fn reset(&mut self) {
        self.selection.clear();
        self.state = EngineState::Idle;
        self.combo = 0;
        self.last_match_ms = None;
        self.completion_signalled = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::grid::GridLayout;
    use rand::{rngs::StdRng, SeedableRng};

    /// 4x1 grid with types [0, 0, 1, 1]
    fn small_grid() -> GridModel {
        let mut rng = StdRng::seed_from_u64(3);
        let mut grid = GridModel::build(&GridLayout::new(4, 1, 2), &['A', 'B'], &mut rng).unwrap();
        grid.set_types(&[0, 0, 1, 1]);
        grid
    }

    fn p(x: usize) -> Position {
        Position::new(x, 0)
    }

    #[test]
    fn test_select_then_deselect() {
        let mut grid = small_grid();
        let mut engine = MatchEngine::new(2);

        assert_eq!(engine.select_tile(&mut grid, p(0)), SelectOutcome::Selected(p(0)));
        assert_eq!(engine.state(), EngineState::Selecting);
        assert!(grid.tile(p(0)).unwrap().is_selected);

        assert_eq!(engine.select_tile(&mut grid, p(0)), SelectOutcome::Deselected(p(0)));
        assert_eq!(engine.state(), EngineState::Idle);
        assert!(!grid.tile(p(0)).unwrap().is_selected);
        assert!(engine.selection().is_empty());
    }

    #[test]
    fn test_deselect_preserves_order_of_rest() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut grid = GridModel::build(&GridLayout::new(6, 1, 1), &['A'], &mut rng).unwrap();
        let mut engine = MatchEngine::new(3);

        engine.select_tile(&mut grid, p(4));
        engine.select_tile(&mut grid, p(1));
        engine.select_tile(&mut grid, p(4));
        assert_eq!(engine.selection(), &[p(1)]);
        engine.select_tile(&mut grid, p(2));
        assert_eq!(engine.selection(), &[p(1), p(2)]);
    }

    #[test]
    fn test_equal_types_match() {
        let mut grid = small_grid();
        let mut engine = MatchEngine::new(2);
        let config = GameConfig::default();

        engine.select_tile(&mut grid, p(0));
        assert_eq!(engine.select_tile(&mut grid, p(1)), SelectOutcome::CheckQueued(p(1)));
        assert_eq!(engine.state(), EngineState::Checking);

        match engine.resolve(&mut grid, &config, 1_000) {
            Resolution::Matched {
                tiles,
                letters,
                combo,
                score,
                grid_cleared,
            } => {
                assert_eq!(tiles, vec![p(0), p(1)]);
                assert_eq!(letters.len(), 2);
                assert_eq!(combo, 1);
                assert_eq!(score, config.base_match_score + config.combo_multiplier);
                assert!(!grid_cleared);
            }
            other => panic!("expected match, got {:?}", other),
        }
        assert!(grid.tile(p(0)).unwrap().is_matched);
        assert!(grid.tile(p(1)).unwrap().is_matched);
        assert!(!grid.tile(p(0)).unwrap().is_selected);
        assert_eq!(engine.state(), EngineState::Idle);
        assert_eq!(engine.combo(), 1);
    }

    #[test]
    fn test_different_types_mismatch() {
        let mut grid = small_grid();
        let mut engine = MatchEngine::new(2);
        let config = GameConfig::default();

        engine.select_tile(&mut grid, p(0));
        engine.select_tile(&mut grid, p(1));
        engine.resolve(&mut grid, &config, 100);
        assert_eq!(engine.combo(), 1);

        engine.select_tile(&mut grid, p(2));
        engine.select_tile(&mut grid, p(0));
        // p(0) is matched, so it is ignored and the selection stays at one
        assert_eq!(engine.selection(), &[p(2)]);

        let mut grid = small_grid();
        let mut engine = MatchEngine::new(2);
        engine.select_tile(&mut grid, p(1));
        engine.select_tile(&mut grid, p(2));
        assert_eq!(
            engine.resolve(&mut grid, &config, 100),
            Resolution::Mismatched {
                tiles: vec![p(1), p(2)]
            }
        );
        assert_eq!(engine.combo(), 0);
        assert!(!grid.tile(p(1)).unwrap().is_matched);
        assert!(!grid.tile(p(2)).unwrap().is_matched);

        // Input stays locked until the mismatch is released
        assert_eq!(
            engine.select_tile(&mut grid, p(0)),
            SelectOutcome::Ignored(IgnoreReason::Checking)
        );
        assert_eq!(engine.finish_mismatch(&mut grid), vec![p(1), p(2)]);
        assert_eq!(engine.state(), EngineState::Idle);
        assert!(!grid.tile(p(1)).unwrap().is_selected);
        assert!(!grid.tile(p(2)).unwrap().is_selected);
    }

    #[test]
    fn test_matched_tile_is_ignored() {
        let mut grid = small_grid();
        let mut engine = MatchEngine::new(2);
        engine.select_tile(&mut grid, p(0));
        engine.select_tile(&mut grid, p(1));
        engine.resolve(&mut grid, &GameConfig::default(), 0);

        assert_eq!(
            engine.select_tile(&mut grid, p(0)),
            SelectOutcome::Ignored(IgnoreReason::AlreadyMatched)
        );
        assert_eq!(
            engine.select_tile(&mut grid, Position::new(9, 9)),
            SelectOutcome::Ignored(IgnoreReason::OutOfBounds)
        );
    }

    #[test]
    fn test_three_tile_match_needs_full_agreement() {
        let mut rng = StdRng::seed_from_u64(5);
        let layout = GridLayout::new(6, 1, 2).with_match_size(3);
        let mut grid = GridModel::build(&layout, &['A'], &mut rng).unwrap();
        grid.set_types(&[0, 0, 1, 1, 1, 0]);
        let mut engine = MatchEngine::new(3);
        let config = GameConfig::default();

        for x in [0, 1, 2] {
            engine.select_tile(&mut grid, p(x));
        }
        assert!(matches!(
            engine.resolve(&mut grid, &config, 0),
            Resolution::Mismatched { .. }
        ));
        engine.finish_mismatch(&mut grid);

        for x in [0, 1, 5] {
            engine.select_tile(&mut grid, p(x));
        }
        assert!(matches!(
            engine.resolve(&mut grid, &config, 10),
            Resolution::Matched { .. }
        ));
    }

    #[test]
    fn test_combo_sequence_and_window_reset() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut grid = GridModel::build(&GridLayout::new(8, 1, 1), &['A'], &mut rng).unwrap();
        let mut engine = MatchEngine::new(2);
        let config = GameConfig::default();

        let times = [1_000, 2_000, 3_000, 3_000 + config.combo_window_ms + 1];
        let mut combos = Vec::new();
        for (pair, now) in times.iter().enumerate() {
            engine.select_tile(&mut grid, p(pair * 2));
            engine.select_tile(&mut grid, p(pair * 2 + 1));
            if let Resolution::Matched { combo, .. } = engine.resolve(&mut grid, &config, *now) {
                combos.push(combo);
            }
        }
        assert_eq!(combos, vec![1, 2, 3, 1]);
    }

    #[test]
    fn test_combo_expires_after_window() {
        let mut grid = small_grid();
        let mut engine = MatchEngine::new(2);
        let config = GameConfig::default();

        engine.select_tile(&mut grid, p(0));
        engine.select_tile(&mut grid, p(1));
        engine.resolve(&mut grid, &config, 1_000);
        assert_eq!(engine.combo(), 1);

        engine.expire_combo(&config, 1_000 + config.combo_window_ms);
        assert_eq!(engine.combo(), 1);
        engine.expire_combo(&config, 1_000 + config.combo_window_ms + 1);
        assert_eq!(engine.combo(), 0);
    }

    #[test]
    fn test_grid_cleared_signalled_once() {
        let mut grid = small_grid();
        let mut engine = MatchEngine::new(2);
        let config = GameConfig::default();

        let mut cleared = 0;
        for pair in [[0, 1], [2, 3]] {
            for x in pair {
                engine.select_tile(&mut grid, p(x));
            }
            if let Resolution::Matched { grid_cleared: true, .. } = engine.resolve(&mut grid, &config, 0) {
                cleared += 1;
            }
        }
        assert_eq!(cleared, 1);
        assert_eq!(engine.resolve(&mut grid, &config, 0), Resolution::Idle);
    }
}
