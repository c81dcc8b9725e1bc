use std::collections::HashSet;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::models::DefinitionDetails;

/// Looks up definitions for words. Failures are never fatal; callers fall
/// back to a generated definition.
#[async_trait]
pub trait DefinitionService: Send + Sync {
    async fn lookup(&self, word: &str) -> Result<DefinitionDetails>;
}

/// Used when no definition API is configured. Every lookup fails, so every
/// word gets the fallback definition.
#[derive(Debug, Default, Clone)]
pub struct OfflineDefinitionService;

#[async_trait]
impl DefinitionService for OfflineDefinitionService {
    async fn lookup(&self, word: &str) -> Result<DefinitionDetails> {
        Err(anyhow!("no definition service configured for {}", word))
    }
}

/// Client for a free-dictionary style API: `GET {base_url}/{word}`
#[derive(Debug, Clone)]
pub struct HttpDefinitionService {
    base_url: String,
    client: reqwest::Client,
}

/// Response entry from the definition API
#[derive(Debug, Deserialize)]
struct ApiEntry {
    #[serde(default)]
    phonetic: Option<String>,
    #[serde(default)]
    meanings: Vec<ApiMeaning>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiMeaning {
    #[serde(default)]
    part_of_speech: Option<String>,
    #[serde(default)]
    definitions: Vec<ApiDefinition>,
    #[serde(default)]
    synonyms: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ApiDefinition {
    definition: String,
    #[serde(default)]
    example: Option<String>,
    #[serde(default)]
    synonyms: Vec<String>,
}

impl HttpDefinitionService {
    pub fn new(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    fn parse_entries(entries: Vec<ApiEntry>) -> Result<DefinitionDetails> {
        let entry = entries
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("definition response was empty"))?;

        let meaning = entry
            .meanings
            .into_iter()
            .find(|m| !m.definitions.is_empty())
            .ok_or_else(|| anyhow!("definition response had no meanings"))?;

        let mut synonyms = meaning.synonyms;
        let mut examples = Vec::new();
        for def in &meaning.definitions {
            if let Some(example) = &def.example {
                examples.push(example.clone());
            }
            synonyms.extend(def.synonyms.iter().cloned());
        }
        let mut seen = HashSet::new();
        synonyms.retain(|s| seen.insert(s.to_lowercase()));

        let definition = meaning
            .definitions
            .into_iter()
            .next()
            .map(|d| d.definition)
            .unwrap_or_default();

        Ok(DefinitionDetails {
            definition,
            pronunciation: entry.phonetic,
            examples,
            synonyms,
            category: meaning.part_of_speech,
        })
    }
}

#[async_trait]
impl DefinitionService for HttpDefinitionService {
    async fn lookup(&self, word: &str) -> Result<DefinitionDetails> {
        let url = format!("{}/{}", self.base_url, word.to_lowercase());
        tracing::debug!("Fetching definition from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Definition request for {} failed", word))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Definition API returned {} for {}",
                response.status(),
                word
            ));
        }

        let entries: Vec<ApiEntry> = response
            .json()
            .await
            .context("Failed to parse definition response")?;

        Self::parse_entries(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<DefinitionDetails> {
        let entries: Vec<ApiEntry> = serde_json::from_str(json)?;
        HttpDefinitionService::parse_entries(entries)
    }

    #[test]
    fn test_parse_first_meaning() {
        let details = parse(
            r#"[{
                "word": "cat",
                "phonetic": "/kæt/",
                "meanings": [{
                    "partOfSpeech": "noun",
                    "definitions": [
                        {"definition": "A small domesticated carnivorous mammal.", "example": "The cat sat on the mat.", "synonyms": ["kitty"]},
                        {"definition": "A person.", "synonyms": []}
                    ],
                    "synonyms": ["feline"]
                }]
            }]"#,
        )
        .unwrap();

        assert_eq!(details.definition, "A small domesticated carnivorous mammal.");
        assert_eq!(details.pronunciation.as_deref(), Some("/kæt/"));
        assert_eq!(details.examples, vec!["The cat sat on the mat.".to_string()]);
        assert_eq!(details.synonyms, vec!["feline".to_string(), "kitty".to_string()]);
        assert_eq!(details.category.as_deref(), Some("noun"));
    }

    #[test]
    fn test_synonyms_are_unique_across_definitions() {
        let details = parse(
            r#"[{
                "word": "happy",
                "meanings": [{
                    "partOfSpeech": "adjective",
                    "definitions": [
                        {"definition": "Feeling joy.", "synonyms": ["glad", "cheerful"]},
                        {"definition": "Fortunate.", "synonyms": ["lucky", "Glad"]}
                    ],
                    "synonyms": ["glad", "content"]
                }]
            }]"#,
        )
        .unwrap();

        assert_eq!(
            details.synonyms,
            vec!["glad", "content", "cheerful", "lucky"]
        );
    }

    #[test]
    fn test_parse_empty_response_fails() {
        assert!(parse("[]").is_err());
        assert!(parse(r#"[{"word": "cat", "meanings": []}]"#).is_err());
    }

    #[test]
    fn test_offline_service_always_fails() {
        let service = OfflineDefinitionService;
        assert!(tokio_test::block_on(service.lookup("CAT")).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_api_reports_error() {
        let service = HttpDefinitionService::new("http://127.0.0.1:9/", reqwest::Client::new());
        assert!(service.lookup("cat").await.is_err());
    }
}
