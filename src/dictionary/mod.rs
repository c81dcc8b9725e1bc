pub mod definitions;

use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use tokio::fs;

use crate::{
    game::word::{MAX_DIFFICULTY, MIN_DIFFICULTY},
    utils::letters::is_catalog_word,
};

pub use definitions::{DefinitionService, HttpDefinitionService, OfflineDefinitionService};

/// A catalog word with its difficulty tier and category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogWord {
    pub word: String,
    pub difficulty: u8,
    pub category: String,
}

impl CatalogWord {
    pub fn new(word: &str, difficulty: u8, category: &str) -> Self {
        Self {
            word: word.to_uppercase(),
            difficulty: difficulty.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY),
            category: category.to_lowercase(),
        }
    }
}

/// Built-in word list, grouped by tier
static BUILTIN_WORDS: Lazy<Vec<CatalogWord>> = Lazy::new(|| {
    let tiers: [(u8, &[(&str, &str)]); 5] = [
        (
            1,
            &[
                ("CAT", "animals"),
                ("DOG", "animals"),
                ("SUN", "nature"),
                ("TREE", "nature"),
                ("BOOK", "objects"),
                ("CAKE", "food"),
                ("FISH", "animals"),
                ("RAIN", "nature"),
            ],
        ),
        (
            2,
            &[
                ("APPLE", "food"),
                ("HOUSE", "objects"),
                ("RIVER", "nature"),
                ("TIGER", "animals"),
                ("BREAD", "food"),
                ("CLOUD", "nature"),
                ("CHAIR", "objects"),
            ],
        ),
        (
            3,
            &[
                ("GARDEN", "nature"),
                ("RABBIT", "animals"),
                ("PUZZLE", "games"),
                ("CASTLE", "places"),
                ("ORANGE", "food"),
                ("WINTER", "nature"),
                ("MARKET", "places"),
            ],
        ),
        (
            4,
            &[
                ("BALLOON", "objects"),
                ("DOLPHIN", "animals"),
                ("LANTERN", "objects"),
                ("HARVEST", "nature"),
                ("VOLCANO", "nature"),
                ("PENGUIN", "animals"),
            ],
        ),
        (
            5,
            &[
                ("ADVENTURE", "concepts"),
                ("BUTTERFLY", "animals"),
                ("LIGHTHOUSE", "places"),
                ("CHOCOLATE", "food"),
                ("TELESCOPE", "objects"),
                ("WATERFALL", "nature"),
            ],
        ),
    ];

    tiers
        .iter()
        .flat_map(|(difficulty, words)| {
            words
                .iter()
                .map(move |(word, category)| CatalogWord::new(word, *difficulty, category))
        })
        .collect()
});

/// Read-only source of candidate words
#[derive(Debug, Clone)]
pub struct WordCatalog {
    words: Vec<CatalogWord>,
}

impl WordCatalog {
    pub fn builtin() -> Self {
        Self::from_entries(BUILTIN_WORDS.clone())
    }

    pub fn from_entries(words: Vec<CatalogWord>) -> Self {
        Self { words }
    }

    /// Load a catalog from a file.
    ///
    /// One word per line, optionally followed by `,difficulty,category`.
    /// Blank lines and lines starting with `#` are skipped. Without an explicit
    /// tier the difficulty is derived from the word length.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read word list {}", path.display()))?;
        let catalog = Self::parse(&content)?;

        tracing::info!("Loaded {} words into catalog", catalog.len());

        Ok(catalog)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut words = Vec::new();
        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.split(',').map(str::trim);
            let word = fields.next().unwrap_or_default();
            if !is_catalog_word(word) {
                tracing::debug!("Skipping non-alphabetic catalog entry {:?}", word);
                continue;
            }

            let difficulty = match fields.next().filter(|f| !f.is_empty()) {
                Some(tier) => tier
                    .parse::<u8>()
                    .with_context(|| format!("Invalid difficulty on line {}", index + 1))?,
                None => Self::difficulty_from_length(word.len()),
            };
            let category = fields.next().filter(|f| !f.is_empty()).unwrap_or("general");

            words.push(CatalogWord::new(word, difficulty, category));
        }

        Ok(Self::from_entries(words))
    }

    fn difficulty_from_length(len: usize) -> u8 {
        match len {
            0..=4 => 1,
            5 => 2,
            6 => 3,
            7 => 4,
            _ => 5,
        }
    }

    /// Words of the given tier, optionally restricted to a set of categories
    pub fn candidates(&self, difficulty: u8, categories: Option<&[String]>) -> Vec<&CatalogWord> {
        self.words
            .iter()
            .filter(|w| w.difficulty == difficulty)
            .filter(|w| match categories {
                Some(filter) if !filter.is_empty() => {
                    filter.iter().any(|c| c.eq_ignore_ascii_case(&w.category))
                }
                _ => true,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
