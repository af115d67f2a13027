//! Keyword vocabulary and prefilter matcher
//!
//! The matcher doubles as the prefilter gate: a transcript with no keyword
//! match never reaches the address extractors or the model fallback. This is
//! the primary cost-control mechanism for multi-hundred-line batches.

/// Built-in incident vocabulary, mirroring the reportable incident types the
/// review sheet tracks. A config file may replace it entirely.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "Fire",
    "Explosion",
    "Collapse",
    "House fire",
    "Structure fire",
    "Residential fire",
    "Working structure fire",
    "Fire damage",
    "Fatal fire",
    "Arson",
    "Suspicious fire",
    "Roof collapse",
    "Building collapse",
    "Structure collapse",
    "Major water damage",
    "Flooded home",
    "Severe water damage",
    "Forced vacate",
    "Unsafe structure",
    "Red-tagged building",
    "Condemned property",
    "Code enforcement closure",
    "Uninhabitable dwelling",
    "Homicide",
    "Death investigation",
    "Fatal accident",
    "Meth lab",
    "Drug lab contamination",
    "Hazmat cleanup",
];

/// An ordered, read-only set of reportable incident keywords.
///
/// Loaded once at startup and shared across the batch. Ordering is by
/// specificity: longer phrases sort before their substrings so "house fire"
/// wins over "fire" when both occur.
#[derive(Debug, Clone)]
pub struct KeywordVocabulary {
    /// Canonical spellings, most specific first
    keywords: Vec<String>,
    /// Lowercased forms, parallel to `keywords`
    lowered: Vec<String>,
}

impl KeywordVocabulary {
    /// Build a vocabulary from keyword phrases.
    ///
    /// Blank entries and case-insensitive duplicates are dropped; the first
    /// spelling seen is kept as canonical.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen: Vec<String> = Vec::new();
        let mut canonical: Vec<String> = Vec::new();

        for keyword in keywords {
            let keyword = keyword.into();
            let trimmed = keyword.trim();
            if trimmed.is_empty() {
                continue;
            }
            let lowered = trimmed.to_lowercase();
            if seen.contains(&lowered) {
                continue;
            }
            seen.push(lowered);
            canonical.push(trimmed.to_string());
        }

        // Longest phrase first, ties broken by original order (stable sort)
        let mut indexed: Vec<usize> = (0..canonical.len()).collect();
        indexed.sort_by_key(|&i| std::cmp::Reverse(canonical[i].len()));

        let keywords: Vec<String> = indexed.iter().map(|&i| canonical[i].clone()).collect();
        let lowered = keywords.iter().map(|k| k.to_lowercase()).collect();

        Self { keywords, lowered }
    }

    /// Number of keywords
    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// Canonical keywords, most specific first
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Case-insensitive membership check, returning the canonical spelling
    pub fn canonical(&self, keyword: &str) -> Option<&str> {
        let lowered = keyword.trim().to_lowercase();
        self.lowered
            .iter()
            .position(|k| *k == lowered)
            .map(|i| self.keywords[i].as_str())
    }
}

impl Default for KeywordVocabulary {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORDS.iter().copied())
    }
}

/// Case-insensitive scanner of transcript text against the vocabulary.
///
/// The vocabulary is injected at construction rather than read from ambient
/// state, so tests can run against custom vocabularies.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    vocabulary: KeywordVocabulary,
}

impl KeywordMatcher {
    pub fn new(vocabulary: KeywordVocabulary) -> Self {
        Self { vocabulary }
    }

    pub fn vocabulary(&self) -> &KeywordVocabulary {
        &self.vocabulary
    }

    /// Scan `text` for the first (most specific) vocabulary match.
    ///
    /// Returns the canonical keyword spelling, or `None` when the transcript
    /// mentions no reportable incident. No side effects.
    pub fn match_keyword(&self, text: &str) -> Option<&str> {
        let lowered = text.to_lowercase();
        self.vocabulary
            .lowered
            .iter()
            .position(|k| lowered.contains(k.as_str()))
            .map(|i| self.vocabulary.keywords[i].as_str())
    }
}
