use anyhow::{Context, Result};
use serde::Deserialize;
use std::{env, str::FromStr};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub game: GameConfig,
    pub dictionary: DictionaryConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Gameplay tuning. All durations are milliseconds of game time unless the
/// name says otherwise.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GameConfig {
    pub grid_width: usize,
    pub grid_height: usize,
    pub tile_types: u8,
    pub tiles_per_match: usize,

    pub base_match_score: u32,
    pub combo_multiplier: u32,
    pub combo_window_ms: u64,
    pub max_combo: u32,
    pub check_delay_ms: u64,
    pub mismatch_delay_ms: u64,
    pub tick_interval_ms: u64,

    pub base_time_secs: u32,
    pub time_step_secs: u32,
    pub min_time_secs: u32,

    pub time_bonus: u32,
    pub perfect_bonus: u32,
    pub level_complete_bonus: u32,

    pub pause_stage_ms: u64,
    pub assemble_stage_ms: u64,
    pub definition_stage_ms: u64,
    pub bonus_stage_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_width: 6,
            grid_height: 6,
            tile_types: 6,
            tiles_per_match: 2,
            base_match_score: 100,
            combo_multiplier: 50,
            combo_window_ms: 3_000,
            max_combo: 10,
            check_delay_ms: 300,
            mismatch_delay_ms: 800,
            tick_interval_ms: 100,
            base_time_secs: 180,
            time_step_secs: 15,
            min_time_secs: 60,
            time_bonus: 1_000,
            perfect_bonus: 500,
            level_complete_bonus: 250,
            pause_stage_ms: 500,
            assemble_stage_ms: 2_000,
            definition_stage_ms: 3_000,
            bonus_stage_ms: 1_500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DictionaryConfig {
    /// Optional word list; the built-in catalog is used when unset
    pub word_list_path: Option<String>,
    /// Optional definition API base URL; fallback definitions are used when unset
    pub definition_api_url: Option<String>,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub progress_path: String,
}

/// Read `key`, falling back to `default` when unset. A value that is set but
/// does not parse is an error.
fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number", key)),
        Err(_) => Ok(default),
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl GameConfig {
    pub fn from_env() -> Result<Self> {
        let d = GameConfig::default();
        Ok(GameConfig {
            grid_width: env_or("GRID_WIDTH", d.grid_width)?,
            grid_height: env_or("GRID_HEIGHT", d.grid_height)?,
            tile_types: env_or("TILE_TYPES", d.tile_types)?,
            tiles_per_match: env_or("TILES_PER_MATCH", d.tiles_per_match)?,
            base_match_score: env_or("BASE_MATCH_SCORE", d.base_match_score)?,
            combo_multiplier: env_or("COMBO_MULTIPLIER", d.combo_multiplier)?,
            combo_window_ms: env_or("COMBO_WINDOW_MS", d.combo_window_ms)?,
            max_combo: env_or("MAX_COMBO", d.max_combo)?,
            check_delay_ms: env_or("CHECK_DELAY_MS", d.check_delay_ms)?,
            mismatch_delay_ms: env_or("MISMATCH_DELAY_MS", d.mismatch_delay_ms)?,
            tick_interval_ms: env_or("TICK_INTERVAL_MS", d.tick_interval_ms)?,
            base_time_secs: env_or("BASE_TIME_SECS", d.base_time_secs)?,
            time_step_secs: env_or("TIME_STEP_SECS", d.time_step_secs)?,
            min_time_secs: env_or("MIN_TIME_SECS", d.min_time_secs)?,
            time_bonus: env_or("TIME_BONUS", d.time_bonus)?,
            perfect_bonus: env_or("PERFECT_BONUS", d.perfect_bonus)?,
            level_complete_bonus: env_or("LEVEL_COMPLETE_BONUS", d.level_complete_bonus)?,
            pause_stage_ms: env_or("PAUSE_STAGE_MS", d.pause_stage_ms)?,
            assemble_stage_ms: env_or("ASSEMBLE_STAGE_MS", d.assemble_stage_ms)?,
            definition_stage_ms: env_or("DEFINITION_STAGE_MS", d.definition_stage_ms)?,
            bonus_stage_ms: env_or("BONUS_STAGE_MS", d.bonus_stage_ms)?,
        })
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let server = ServerConfig {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_or("PORT", 3000)?,
        };

        let game = GameConfig::from_env()?;

        let dictionary = DictionaryConfig {
            word_list_path: env_opt("WORD_LIST_PATH"),
            definition_api_url: env_opt("DEFINITION_API_URL"),
            request_timeout_secs: env_or("DEFINITION_TIMEOUT_SECS", 10)?,
        };

        let storage = StorageConfig {
            progress_path: env::var("PROGRESS_PATH")
                .unwrap_or_else(|_| "./progress.json".to_string()),
        };

        Ok(Config {
            server,
            game,
            dictionary,
            storage,
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_or_uses_default_when_unset() {
        let value: u32 = env_or("WORD_TILES_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_env_or_rejects_garbage() {
        env::set_var("WORD_TILES_TEST_BAD_NUMBER", "twelve");
        let result: Result<u32> = env_or("WORD_TILES_TEST_BAD_NUMBER", 1);
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("WORD_TILES_TEST_BAD_NUMBER"));
        env::remove_var("WORD_TILES_TEST_BAD_NUMBER");
    }

    #[test]
    fn test_default_grid_is_buildable() {
        let game = GameConfig::default();
        assert_eq!((game.grid_width * game.grid_height) % 2, 0);
        assert_eq!((game.grid_width * game.grid_height) % game.tiles_per_match, 0);
        assert!(game.min_time_secs <= game.base_time_secs);
    }
}
