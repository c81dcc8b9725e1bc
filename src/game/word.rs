use std::collections::BTreeMap;

use rand::{seq::SliceRandom, Rng};

use crate::{
    dictionary::WordCatalog,
    error::{GameError, GameResult},
    models::{DefinitionDetails, WordEntry},
    utils::letters::{letter_counts, normalize_letter},
};

pub const MIN_DIFFICULTY: u8 = 1;
pub const MAX_DIFFICULTY: u8 = 5;
pub const MASK_CHAR: char = '_';

/// Difficulty tier for a level: `clamp(level / 3 + 1, 1, 5)`
pub fn difficulty_for_level(level: u32) -> u8 {
    (level / 3 + 1).clamp(MIN_DIFFICULTY as u32, MAX_DIFFICULTY as u32) as u8
}

/// Required and revealed letter multisets for one word.
///
/// `revealed[l] <= required[l]` holds for every letter at all times.
#[derive(Debug, Clone, Default)]
pub struct LetterTracker {
    required: BTreeMap<char, u32>,
    revealed: BTreeMap<char, u32>,
}

impl LetterTracker {
    pub fn new(word: &str) -> Self {
        let required = letter_counts(word);
        let revealed = required.keys().map(|&letter| (letter, 0)).collect();
        Self { required, revealed }
    }

    /// Count one occurrence of `letter` as revealed.
    /// Untracked letters and letters already at their cap are ignored.
    pub fn reveal(&mut self, letter: char) -> bool {
        let Some(letter) = normalize_letter(letter) else {
            return false;
        };
        let Some(&required) = self.required.get(&letter) else {
            return false;
        };
        let revealed = self.revealed.entry(letter).or_insert(0);
        if *revealed >= required {
            return false;
        }
        *revealed += 1;
        true
    }

    pub fn required(&self, letter: char) -> u32 {
        normalize_letter(letter)
            .and_then(|l| self.required.get(&l).copied())
            .unwrap_or(0)
    }

    pub fn revealed(&self, letter: char) -> u32 {
        normalize_letter(letter)
            .and_then(|l| self.revealed.get(&l).copied())
            .unwrap_or(0)
    }

    pub fn total_required(&self) -> u32 {
        self.required.values().sum()
    }

    pub fn total_revealed(&self) -> u32 {
        self.required
            .iter()
            .map(|(letter, &required)| self.revealed.get(letter).copied().unwrap_or(0).min(required))
            .sum()
    }

    pub fn is_complete(&self) -> bool {
        !self.required.is_empty()
            && self
                .required
                .iter()
                .all(|(letter, required)| self.revealed.get(letter) == Some(required))
    }

    pub fn progress_fraction(&self) -> f32 {
        let total = self.total_required();
        if total == 0 {
            return 0.0;
        }
        self.total_revealed() as f32 / total as f32
    }

    /// Rebuild `word` with unrevealed letters masked. Revealed counts are
    /// spent on occurrences left to right.
    pub fn display(&self, word: &str) -> String {
        let mut available = self.revealed.clone();
        word.chars()
            .map(|ch| match normalize_letter(ch) {
                Some(letter) => match available.get_mut(&letter) {
                    Some(count) if *count > 0 => {
                        *count -= 1;
                        letter
                    }
                    _ => MASK_CHAR,
                },
                None => ch,
            })
            .collect()
    }
}

/// Active word for a level and its letter tracking
#[derive(Debug, Default)]
pub struct WordModel {
    entry: Option<WordEntry>,
    tracker: LetterTracker,
}

impl WordModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick a word for `level` from the catalog and start tracking it.
    /// The entry starts with a placeholder definition.
    pub fn select_word<R: Rng + ?Sized>(
        &mut self,
        catalog: &WordCatalog,
        level: u32,
        categories: Option<&[String]>,
        rng: &mut R,
    ) -> GameResult<&WordEntry> {
        let difficulty = difficulty_for_level(level);
        let mut candidates = catalog.candidates(difficulty, categories);
        candidates.shuffle(rng);
        let chosen = candidates
            .into_iter()
            .next()
            .ok_or(GameError::NoWordAvailable { difficulty })?;

        let entry = WordEntry::pending(chosen.word.clone(), difficulty, chosen.category.clone());
        self.initialize_letter_tracking(&entry.word);
        Ok(self.entry.insert(entry))
    }

    /// Use a fixed entry instead of drawing from a catalog
    pub fn set_entry(&mut self, entry: WordEntry) -> &WordEntry {
        self.initialize_letter_tracking(&entry.word);
        self.entry.insert(entry)
    }

    pub fn initialize_letter_tracking(&mut self, word: &str) {
        self.tracker = LetterTracker::new(word);
    }

    pub fn reveal_letter(&mut self, letter: char) -> bool {
        self.tracker.reveal(letter)
    }

    pub fn is_complete(&self) -> bool {
        self.tracker.is_complete()
    }

    pub fn display_string(&self) -> String {
        self.entry
            .as_ref()
            .map(|entry| self.tracker.display(&entry.word))
            .unwrap_or_default()
    }

    pub fn progress_fraction(&self) -> f32 {
        self.tracker.progress_fraction()
    }

    pub fn tracker(&self) -> &LetterTracker {
        &self.tracker
    }

    pub fn entry(&self) -> Option<&WordEntry> {
        self.entry.as_ref()
    }

    /// Apply a finished definition lookup. Results for a word that is no
    /// longer active are dropped; returns whether the entry changed.
    pub fn apply_definition(&mut self, word: &str, result: Option<DefinitionDetails>) -> bool {
        let Some(entry) = self.entry.as_mut() else {
            return false;
        };
        if !entry.word.eq_ignore_ascii_case(word) {
            return false;
        }
        match result {
            Some(details) => entry.enrich(details),
            None => entry.apply_fallback(),
        }
        true
    }

    pub fn clear(&mut self) {
        self.entry = None;
        self.tracker = LetterTracker::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DefinitionStatus;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_difficulty_for_level() {
        assert_eq!(difficulty_for_level(1), 1);
        assert_eq!(difficulty_for_level(2), 1);
        assert_eq!(difficulty_for_level(3), 2);
        assert_eq!(difficulty_for_level(9), 4);
        assert_eq!(difficulty_for_level(12), 5);
        assert_eq!(difficulty_for_level(100), 5);
    }

    #[test]
    fn test_required_counts_alphabetic_chars() {
        for word in ["CAT", "BALLOON", "ice-cream", "New York", "a"] {
            let tracker = LetterTracker::new(word);
            let alphabetic = word.chars().filter(|c| c.is_alphabetic()).count() as u32;
            assert_eq!(tracker.total_required(), alphabetic, "word {word}");
        }
    }

    #[test]
    fn test_reveal_never_exceeds_required() {
        let mut tracker = LetterTracker::new("BALLOON");
        for _ in 0..5 {
            for letter in ['B', 'A', 'L', 'O', 'N', 'Z', 'l'] {
                tracker.reveal(letter);
                for l in ['B', 'A', 'L', 'O', 'N'] {
                    assert!(tracker.revealed(l) <= tracker.required(l));
                }
            }
        }
        assert_eq!(tracker.revealed('L'), 2);
        assert_eq!(tracker.revealed('Z'), 0);
        assert!(tracker.is_complete());
    }

    #[test]
    fn test_redundant_reveal_is_silent() {
        let mut tracker = LetterTracker::new("CAT");
        assert!(tracker.reveal('c'));
        assert!(!tracker.reveal('C'));
        assert!(!tracker.reveal('-'));
        assert_eq!(tracker.revealed('C'), 1);
    }

    #[test]
    fn test_is_complete_requires_every_letter() {
        let mut tracker = LetterTracker::new("TOOT");
        assert!(!tracker.is_complete());
        tracker.reveal('T');
        tracker.reveal('T');
        tracker.reveal('O');
        assert!(!tracker.is_complete());
        tracker.reveal('O');
        assert!(tracker.is_complete());
    }

    #[test]
    fn test_empty_tracking_is_never_complete() {
        let tracker = LetterTracker::new("--- ");
        assert!(!tracker.is_complete());
        assert_eq!(tracker.progress_fraction(), 0.0);
        assert!(!LetterTracker::default().is_complete());
    }

    #[test]
    fn test_display_reveals_leftmost_occurrence_first() {
        let mut tracker = LetterTracker::new("LEVEL");
        assert_eq!(tracker.display("LEVEL"), "_____");
        tracker.reveal('E');
        assert_eq!(tracker.display("LEVEL"), "_E___");
        tracker.reveal('L');
        assert_eq!(tracker.display("LEVEL"), "LE___");
        tracker.reveal('L');
        tracker.reveal('E');
        assert_eq!(tracker.display("LEVEL"), "LE_EL");
    }

    #[test]
    fn test_display_passes_non_letters_through() {
        let mut tracker = LetterTracker::new("ice-cream");
        tracker.reveal('C');
        assert_eq!(tracker.display("ice-cream"), "_C_-_____");
    }

    #[test]
    fn test_progress_fraction() {
        let mut tracker = LetterTracker::new("BOOK");
        assert_eq!(tracker.progress_fraction(), 0.0);
        tracker.reveal('O');
        assert!((tracker.progress_fraction() - 0.25).abs() < f32::EPSILON);
        tracker.reveal('B');
        tracker.reveal('O');
        tracker.reveal('O');
        assert!((tracker.progress_fraction() - 0.75).abs() < f32::EPSILON);
        tracker.reveal('K');
        assert_eq!(tracker.progress_fraction(), 1.0);
    }

    #[test]
    fn test_select_word_matches_level_difficulty() {
        let catalog = WordCatalog::builtin();
        let mut model = WordModel::new();
        let mut rng = StdRng::seed_from_u64(7);

        let entry = model.select_word(&catalog, 7, None, &mut rng).unwrap();
        assert_eq!(entry.difficulty, 3);
        assert_eq!(entry.definition_status, DefinitionStatus::Pending);
        assert!(!model.display_string().is_empty());
        assert!(model.display_string().chars().all(|c| c == MASK_CHAR));
    }

    #[test]
    fn test_select_word_fails_without_candidates() {
        let catalog = WordCatalog::from_entries(Vec::new());
        let mut model = WordModel::new();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            model.select_word(&catalog, 1, None, &mut rng).unwrap_err(),
            GameError::NoWordAvailable { difficulty: 1 }
        );
    }

    #[test]
    fn test_stale_definition_is_dropped() {
        let mut model = WordModel::new();
        model.set_entry(WordEntry::pending("CAT", 1, "animals"));
        assert!(!model.apply_definition("DOG", None));
        assert!(model.apply_definition("cat", None));
        assert_eq!(model.entry().unwrap().definition, "A word meaning cat.");
    }
}
