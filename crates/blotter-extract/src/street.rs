//! Street-address regex extraction
//!
//! The cheapest and most trusted extraction stage: a hand-built pattern
//! recognizing "<number> <name words> <street suffix>" shapes, optionally
//! followed by city/state/zip tokens. Spelled-out house numbers ("twelve
//! forty Oak Street") are not expanded here; the model fallback covers them.

use once_cell::sync::Lazy;
use regex::Regex;

use blotter_core::AddressCandidate;

use crate::CandidateSource;

/// "221B Baker Street" / "450 N Main St, Springfield IL 62704"
///
/// Name words are bounded at four tokens so the pattern cannot swallow a
/// whole sentence between the house number and a late suffix word.
static STREET_ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        \b
        \d{1,5} [a-z]?                                  # house number, optional unit letter
        \s+
        (?: [a-z]+ \s+ ){1,4}?                          # street name words
        (?: street|st|avenue|ave|boulevard|blvd|road|rd
          | drive|dr|court|ct|lane|ln|way|terrace|ter|place|pl )
        \b
        (?: ,? \s+ [a-z]+ (?: \s+ [a-z]+ )?             # optional city
            ,? \s+ [a-z]{2} \s+ \d{5} (?: -\d{4} )?     # state and zip
        )?
        ",
    )
    .expect("street address pattern is valid")
});

/// Deterministic extractor for street-address shapes, tagged `Regex`
#[derive(Debug, Clone, Copy, Default)]
pub struct StreetAddressExtractor;

impl StreetAddressExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl CandidateSource for StreetAddressExtractor {
    fn extract(&self, text: &str) -> Vec<AddressCandidate> {
        STREET_ADDRESS
            .find_iter(text)
            .filter(|m| {
                // "1200 block of ..." references belong to the tagger
                !m.as_str().to_lowercase().contains(" block of ")
            })
            .map(|m| AddressCandidate::regex(m.as_str().trim()))
            .collect()
    }

    fn name(&self) -> &str {
        "street-regex"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> Vec<String> {
        StreetAddressExtractor::new()
            .extract(text)
            .into_iter()
            .map(|c| c.raw_text)
            .collect()
    }

    #[test]
    fn test_basic_street_shape() {
        let found = extract("Units responding to 221B Baker Street for a reported fire");
        assert_eq!(found, vec!["221B Baker Street"]);
    }

    #[test]
    fn test_abbreviated_suffix() {
        let found = extract("caller at 1400 Oak Ave reporting smoke");
        assert_eq!(found, vec!["1400 Oak Ave"]);
    }

    #[test]
    fn test_city_state_zip_tail() {
        let found = extract("structure fire at 450 N Main St, Springfield IL 62704 second alarm");
        assert_eq!(found, vec!["450 N Main St, Springfield IL 62704"]);
    }

    #[test]
    fn test_no_match_returns_empty() {
        assert!(extract("engine four returning to quarters").is_empty());
        assert!(extract("fire reported near the river").is_empty());
    }

    #[test]
    fn test_multiple_candidates() {
        let found =
            extract("started at 12 Elm Street then spread to 14 Elm Street before containment");
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_block_reference_left_to_tagger() {
        assert!(extract("fire in the 1200 block of Sycamore Avenue").is_empty());
    }

    #[test]
    fn test_spelled_out_number_not_matched() {
        // Documented gap: digits only, no word-number expansion
        assert!(extract("fire at twelve forty Oak Street").is_empty());
    }
}
