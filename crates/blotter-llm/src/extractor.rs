//! Prompt assembly and response parsing for the model fallback
//!
//! Builds a bounded prompt (transcript line, instructions, allowed keyword
//! vocabulary, previously rejected spans) and parses the model's fenced or
//! bare JSON answer into a [`ModelExtraction`]. A malformed answer yields an
//! empty extraction, never an error: only transport failures propagate.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use blotter_core::{
    AddressCandidate, FallbackExtractor, ModelClient, ModelExtraction, Result,
};

/// Markdown code fences around the model's JSON, with or without a language
static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json)?").expect("code fence pattern is valid"));

/// Raw answer shape; `keyword` tolerates both a string and an array
#[derive(Debug, Deserialize)]
struct RawExtraction {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    keyword: Option<KeywordField>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum KeywordField {
    One(String),
    Many(Vec<String>),
}

/// Model-backed extraction fallback.
///
/// Holds the vocabulary it advertises in the prompt so the model's keyword
/// answer can be filtered to members before the pipeline sees it.
pub struct ModelExtractor {
    client: Arc<dyn ModelClient>,
    vocabulary: Vec<String>,
}

impl ModelExtractor {
    pub fn new(client: Arc<dyn ModelClient>, vocabulary: Vec<String>) -> Self {
        Self { client, vocabulary }
    }

    /// Assemble the extraction prompt for one transcript line
    fn build_prompt(&self, text: &str, prior_candidates: &[AddressCandidate]) -> String {
        let mut prompt = String::from(
            "You extract information from emergency scanner transcripts.\n\n\
             Tasks:\n\
             1. Extract the full street address if present (number, street, \
             city, state, zip where available).\n\
             \x20  - Convert spelled-out numbers to digits.\n\
             \x20  - Use standard postal formatting.\n\
             2. Identify the single most relevant incident keyword from this \
             list:\n",
        );
        prompt.push_str(&self.vocabulary.join(", "));
        prompt.push_str(
            "\n3. Return ONLY valid JSON with two keys:\n\
             \x20  - \"address\": string or null\n\
             \x20  - \"keyword\": string or null\n",
        );

        if !prior_candidates.is_empty() {
            prompt.push_str("\nThese spans were found but could not be parsed as addresses:\n");
            for candidate in prior_candidates {
                prompt.push_str("- ");
                prompt.push_str(&candidate.raw_text);
                prompt.push('\n');
            }
        }

        prompt.push_str("\nTranscript:\n");
        prompt.push_str(text);
        prompt.push('\n');
        prompt
    }

    /// Parse a model answer; anything that does not fit the contract
    /// degrades to an empty extraction
    fn parse_response(&self, response: &str) -> ModelExtraction {
        let cleaned = CODE_FENCE.replace_all(response, "");
        let cleaned = cleaned.trim();

        let raw: RawExtraction = match serde_json::from_str(cleaned) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(error = %e, "model answer was not the expected JSON shape");
                return ModelExtraction::default();
            }
        };

        let address = raw
            .address
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());

        // Keep only vocabulary members, case-insensitively; first hit wins
        let keyword = match raw.keyword {
            Some(KeywordField::One(k)) => self.vocabulary_member(&k),
            Some(KeywordField::Many(ks)) => {
                ks.iter().find_map(|k| self.vocabulary_member(k))
            }
            None => None,
        };

        ModelExtraction { address, keyword }
    }

    fn vocabulary_member(&self, keyword: &str) -> Option<String> {
        let lowered = keyword.trim().to_lowercase();
        self.vocabulary
            .iter()
            .find(|k| k.to_lowercase() == lowered)
            .cloned()
    }
}

#[async_trait::async_trait]
impl FallbackExtractor for ModelExtractor {
    async fn extract(
        &self,
        text: &str,
        prior_candidates: &[AddressCandidate],
    ) -> Result<ModelExtraction> {
        let prompt = self.build_prompt(text, prior_candidates);
        let response = self.client.generate(&prompt).await?;
        Ok(self.parse_response(&response))
    }
}
