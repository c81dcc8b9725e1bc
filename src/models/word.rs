use serde::{Deserialize, Serialize};

pub const DEFINITION_PLACEHOLDER: &str = "Loading definition...";

/// Where the current definition text came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DefinitionStatus {
    Pending,
    Fetched,
    Fallback,
}

/// Result of a definition lookup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DefinitionDetails {
    pub definition: String,
    pub pronunciation: Option<String>,
    pub examples: Vec<String>,
    pub synonyms: Vec<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WordEntry {
    pub word: String,
    pub definition: String,
    pub definition_status: DefinitionStatus,
    /// Difficulty tier, 1 through 5
    pub difficulty: u8,
    pub category: String,
    pub pronunciation: Option<String>,
    pub examples: Vec<String>,
    pub synonyms: Vec<String>,
}

impl WordEntry {
    /// New entry awaiting enrichment
    pub fn pending(word: impl Into<String>, difficulty: u8, category: impl Into<String>) -> Self {
        Self {
            word: word.into().to_uppercase(),
            definition: DEFINITION_PLACEHOLDER.to_string(),
            definition_status: DefinitionStatus::Pending,
            difficulty,
            category: category.into(),
            pronunciation: None,
            examples: Vec::new(),
            synonyms: Vec::new(),
        }
    }

    pub fn fallback_definition(word: &str) -> String {
        format!("A word meaning {}.", word.to_lowercase())
    }

    /// Replace the placeholder with fetched details
    pub fn enrich(&mut self, details: DefinitionDetails) {
        self.definition = details.definition;
        self.pronunciation = details.pronunciation;
        self.examples = details.examples;
        self.synonyms = details.synonyms;
        if let Some(category) = details.category {
            self.category = category;
        }
        self.definition_status = DefinitionStatus::Fetched;
    }

    /// Substitute the deterministic fallback after a failed lookup
    pub fn apply_fallback(&mut self) {
        self.definition = Self::fallback_definition(&self.word);
        self.definition_status = DefinitionStatus::Fallback;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_entry_uses_placeholder() {
        let entry = WordEntry::pending("cat", 1, "animals");
        assert_eq!(entry.word, "CAT");
        assert_eq!(entry.definition, DEFINITION_PLACEHOLDER);
        assert_eq!(entry.definition_status, DefinitionStatus::Pending);
    }

    #[test]
    fn test_fallback_definition_lowercases_word() {
        let mut entry = WordEntry::pending("OCEAN", 2, "nature");
        entry.apply_fallback();
        assert_eq!(entry.definition, "A word meaning ocean.");
        assert_eq!(entry.definition_status, DefinitionStatus::Fallback);
    }

    #[test]
    fn test_enrich_keeps_category_when_lookup_has_none() {
        let mut entry = WordEntry::pending("OCEAN", 2, "nature");
        entry.enrich(DefinitionDetails {
            definition: "A very large expanse of sea.".to_string(),
            pronunciation: Some("/ˈəʊʃən/".to_string()),
            ..Default::default()
        });
        assert_eq!(entry.category, "nature");
        assert_eq!(entry.definition_status, DefinitionStatus::Fetched);
        assert!(entry.pronunciation.is_some());
    }
}
