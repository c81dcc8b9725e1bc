use crate::{config::GameConfig, game::word::difficulty_for_level, models::BonusBreakdown};

pub struct Scorer;

impl Scorer {
    /// Points for one successful match: `base + combo * multiplier`
    pub fn match_score(config: &GameConfig, combo: u32) -> u32 {
        config.base_match_score + combo * config.combo_multiplier
    }

    /// Next combo value after a successful match at `now_ms`.
    ///
    /// Within the window of the previous success the streak grows (capped);
    /// otherwise it restarts at 1.
    pub fn next_combo(config: &GameConfig, combo: u32, last_match_ms: Option<u64>, now_ms: u64) -> u32 {
        if combo > 0 && !Self::combo_expired(config, last_match_ms, now_ms) {
            (combo + 1).min(config.max_combo.max(1))
        } else {
            1
        }
    }

    /// True once more than the combo window has passed since the last success
    pub fn combo_expired(config: &GameConfig, last_match_ms: Option<u64>, now_ms: u64) -> bool {
        match last_match_ms {
            Some(last) => now_ms.saturating_sub(last) > config.combo_window_ms,
            None => true,
        }
    }

    /// Time limit for a level in seconds. Drops by one step per difficulty
    /// tier and never goes below the configured floor.
    pub fn time_limit_secs(config: &GameConfig, level: u32) -> u32 {
        let tier = difficulty_for_level(level) as u32;
        config
            .base_time_secs
            .saturating_sub((tier - 1) * config.time_step_secs)
            .max(config.min_time_secs)
    }

    /// `round(remaining / limit * time_bonus)`, zero once time has run out
    pub fn time_bonus(remaining_ms: u64, limit_ms: u64, time_bonus: u32) -> u32 {
        if remaining_ms == 0 || limit_ms == 0 {
            return 0;
        }
        let fraction = remaining_ms.min(limit_ms) as f64 / limit_ms as f64;
        (fraction * time_bonus as f64).round() as u32
    }

    /// All end-of-level bonuses. The perfect bonus needs at least one match
    /// attempt and no mismatches.
    pub fn calculate_bonuses(
        config: &GameConfig,
        remaining_ms: u64,
        limit_ms: u64,
        perfect_matches: u32,
        total_matches: u32,
    ) -> BonusBreakdown {
        let perfect = total_matches > 0 && perfect_matches == total_matches;
        BonusBreakdown {
            time_bonus: Self::time_bonus(remaining_ms, limit_ms, config.time_bonus),
            perfect_bonus: if perfect { config.perfect_bonus } else { 0 },
            level_bonus: config.level_complete_bonus,
        }
    }
}
