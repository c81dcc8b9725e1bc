use std::collections::BTreeMap;

/// Normalise a character to a trackable letter.
/// Returns `None` for anything that is not alphabetic (spaces, hyphens, digits).
pub fn normalize_letter(ch: char) -> Option<char> {
    if ch.is_alphabetic() {
        ch.to_uppercase().next()
    } else {
        None
    }
}

/// Letters of a word in order, uppercased, with non-letters skipped
pub fn tracked_letters(word: &str) -> Vec<char> {
    word.chars().filter_map(normalize_letter).collect()
}

/// Multiset of the letters of a word
pub fn letter_counts(word: &str) -> BTreeMap<char, u32> {
    let mut counts = BTreeMap::new();
    for letter in word.chars().filter_map(normalize_letter) {
        *counts.entry(letter).or_insert(0) += 1;
    }
    counts
}

/// True if the word is non-empty and made only of ASCII letters
pub fn is_catalog_word(word: &str) -> bool {
    !word.is_empty() && word.chars().all(|c| c.is_ascii_alphabetic())
}
