//! Rule-based location and facility tagging
//!
//! Second opinion behind the street regex: pattern rules with per-rule
//! confidence plus a small gazetteer of facility nouns, in place of a
//! full statistical tagger. Spans are returned longest-first so the most
//! informative candidate is normalized before its fragments.

use once_cell::sync::Lazy;
use regex::Regex;

use blotter_core::AddressCandidate;

use crate::CandidateSource;

/// One tagging rule: pattern plus the confidence assigned to its spans
struct TagRule {
    regex: Regex,
    confidence: f32,
}

static TAG_RULES: Lazy<Vec<TagRule>> = Lazy::new(|| {
    let mut rules = Vec::new();

    let mut add = |pattern: &str, confidence: f32| {
        rules.push(TagRule {
            regex: Regex::new(pattern).expect("tag rule pattern is valid"),
            confidence,
        });
    };

    // "1200 block of Sycamore Avenue"
    add(
        r"(?i)\b\d{2,5}\s+block\s+of\s+(?:[a-z]+\s+){1,3}(?:street|st|avenue|ave|boulevard|blvd|road|rd|drive|dr|lane|ln|way)\b",
        0.85,
    );

    // "Fifth Street and Grand Avenue" intersections
    add(
        r"(?i)\b[a-z]+\s+(?:street|avenue|boulevard|road|drive)\s+(?:and|at)\s+[a-z]+\s+(?:street|avenue|boulevard|road|drive)\b",
        0.75,
    );

    // Named facilities: "Mercy General Hospital", "Lincoln Park"
    add(
        r"\b(?:[A-Z][a-z]+\s+){1,3}(?:Hospital|School|Park|Church|Station|Library|Mall|Motel|Hotel|Plaza|Center|Apartments|Complex|Tower)\b",
        0.8,
    );

    // "Springfield, IL" place references
    add(r"\b(?:[A-Z][a-z]+\s+){0,2}[A-Z][a-z]+,\s+[A-Z]{2}\b", 0.7);

    // "Highway 99", "Route 12", "I-80"
    add(
        r"(?i)\b(?:highway|hwy|route|rt|interstate)\s*\d{1,3}\b|\bI-\d{1,3}\b",
        0.65,
    );

    rules
});

/// Rule-based entity tagger for location and facility spans, tagged `Ner`
#[derive(Debug, Clone, Copy, Default)]
pub struct LocationTagger;

impl LocationTagger {
    pub fn new() -> Self {
        Self
    }
}

impl CandidateSource for LocationTagger {
    fn extract(&self, text: &str) -> Vec<AddressCandidate> {
        let mut candidates: Vec<AddressCandidate> = Vec::new();

        for rule in TAG_RULES.iter() {
            for mat in rule.regex.find_iter(text) {
                let span = mat.as_str().trim();
                if candidates.iter().any(|c| c.raw_text == span) {
                    continue;
                }
                candidates.push(AddressCandidate::ner(span, rule.confidence));
            }
        }

        // Longest span first; rule confidence breaks ties
        candidates.sort_by(|a, b| {
            b.raw_text
                .len()
                .cmp(&a.raw_text.len())
                .then_with(|| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal))
        });

        candidates
    }

    fn name(&self) -> &str {
        "location-tagger"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_reference() {
        let found = LocationTagger::new().extract("fire in the 1200 block of Sycamore Avenue");
        assert!(!found.is_empty());
        assert_eq!(found[0].raw_text, "1200 block of Sycamore Avenue");
        assert!(found[0].confidence.unwrap() > 0.8);
    }

    #[test]
    fn test_intersection() {
        let found = LocationTagger::new().extract("collision at Fifth Street and Grand Avenue");
        assert!(found
            .iter()
            .any(|c| c.raw_text == "Fifth Street and Grand Avenue"));
    }

    #[test]
    fn test_facility_name() {
        let found = LocationTagger::new().extract("transport to Mercy General Hospital");
        assert!(found.iter().any(|c| c.raw_text == "Mercy General Hospital"));
    }

    #[test]
    fn test_no_location_returns_empty() {
        assert!(LocationTagger::new()
            .extract("be advised channel two is down")
            .is_empty());
    }

    #[test]
    fn test_longest_span_first() {
        let tagger = LocationTagger::new();
        let found = tagger.extract("crews at Lincoln Park near Mercy General Hospital tonight");
        assert!(found.len() >= 2);
        assert!(found[0].raw_text.len() >= found[1].raw_text.len());
    }
}
