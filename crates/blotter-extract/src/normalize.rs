//! Postal address normalization
//!
//! Parses a raw candidate string into components with a left-to-right
//! tagger (house number, directional, street name, suffix, occupancy,
//! city, state, zip) and re-renders a canonical `formatted` string.
//!
//! Conventions (one choice, applied everywhere):
//! - suffix and directional abbreviations are EXPANDED ("St" -> "Street",
//!   "N" -> "North")
//! - street and city words are title-cased, state codes uppercased
//! - partial addresses are accepted as long as a street name is present
//!
//! Normalization is idempotent: feeding a `formatted` string back through
//! the parser reproduces it unchanged.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use blotter_core::{BlotterError, NormalizedAddress, Result};

static SUFFIXES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    for (abbrev, full) in [
        ("st", "Street"),
        ("street", "Street"),
        ("ave", "Avenue"),
        ("avenue", "Avenue"),
        ("blvd", "Boulevard"),
        ("boulevard", "Boulevard"),
        ("rd", "Road"),
        ("road", "Road"),
        ("dr", "Drive"),
        ("drive", "Drive"),
        ("ct", "Court"),
        ("court", "Court"),
        ("ln", "Lane"),
        ("lane", "Lane"),
        ("way", "Way"),
        ("ter", "Terrace"),
        ("terrace", "Terrace"),
        ("pl", "Place"),
        ("place", "Place"),
    ] {
        m.insert(abbrev, full);
    }
    m
});

static DIRECTIONALS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    for (abbrev, full) in [
        ("n", "North"),
        ("north", "North"),
        ("s", "South"),
        ("south", "South"),
        ("e", "East"),
        ("east", "East"),
        ("w", "West"),
        ("west", "West"),
        ("ne", "Northeast"),
        ("northeast", "Northeast"),
        ("nw", "Northwest"),
        ("northwest", "Northwest"),
        ("se", "Southeast"),
        ("southeast", "Southeast"),
        ("sw", "Southwest"),
        ("southwest", "Southwest"),
    ] {
        m.insert(abbrev, full);
    }
    m
});

const STATE_CODES: &[&str] = &[
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "DC", "FL", "GA", "HI", "ID", "IL", "IN",
    "IA", "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH",
    "NJ", "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT",
    "VT", "VA", "WA", "WV", "WI", "WY",
];

static HOUSE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,5}[A-Za-z]?$").expect("house number pattern is valid"));

static ZIP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{5}(-\d{4})?$").expect("zip pattern is valid"));

const OCCUPANCY_TYPES: &[&str] = &["apt", "apartment", "unit", "suite", "ste", "#"];

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

/// Canonicalizes raw address strings into [`NormalizedAddress`] values.
///
/// Failure is recoverable by design: an unparseable candidate signals
/// "try the next one or escalate", never a pipeline fault.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddressNormalizer;

impl AddressNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Parse and canonicalize a raw address string.
    ///
    /// Requires at least one street-name word, reached either through a
    /// recognized suffix or following a house number; anything else is a
    /// `ParseFailure`.
    pub fn normalize(&self, raw: &str) -> Result<NormalizedAddress> {
        let mut tokens: Vec<String> = raw
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| c == ',' || c == '.').to_string())
            .filter(|t| !t.is_empty())
            .collect();

        if tokens.is_empty() {
            return Err(BlotterError::ParseFailure(raw.to_string()));
        }

        let mut idx = 0;

        // House number, unit letter uppercased ("221b" -> "221B")
        let house_number = if HOUSE_NUMBER.is_match(&tokens[idx]) {
            let number = tokens[idx].to_uppercase();
            idx += 1;
            Some(number)
        } else {
            None
        };

        // "1200 block of Sycamore Avenue": the block number stands in for
        // the house number and the connective words are dropped
        if house_number.is_some()
            && idx + 1 < tokens.len()
            && tokens[idx].eq_ignore_ascii_case("block")
            && tokens[idx + 1].eq_ignore_ascii_case("of")
        {
            idx += 2;
        }

        // Pre-directional
        let directional = if idx < tokens.len() {
            DIRECTIONALS
                .get(tokens[idx].to_lowercase().as_str())
                .map(|full| {
                    idx += 1;
                    (*full).to_string()
                })
        } else {
            None
        };

        // Street name words up to a suffix token
        let mut name_words: Vec<String> = Vec::new();
        let mut suffix: Option<String> = None;
        while idx < tokens.len() {
            let lowered = tokens[idx].to_lowercase();
            if let Some(full) = SUFFIXES.get(lowered.as_str()) {
                // A suffix with no name words yet is the name itself
                // ("Park Place" reaches here with name_words empty on "Place"
                // only when nothing preceded it, which is not an address)
                if !name_words.is_empty() {
                    suffix = Some((*full).to_string());
                    idx += 1;
                    break;
                }
            }
            if self.is_tail_token(&tokens, idx) {
                break;
            }
            name_words.push(title_case(&tokens[idx]));
            idx += 1;
        }

        if name_words.is_empty() {
            return Err(BlotterError::ParseFailure(raw.to_string()));
        }
        // Without a suffix the shape is only trusted behind a house number
        if suffix.is_none() && house_number.is_none() {
            return Err(BlotterError::ParseFailure(raw.to_string()));
        }

        let mut street_parts: Vec<String> = Vec::new();
        if let Some(directional) = directional {
            street_parts.push(directional);
        }
        street_parts.extend(name_words);
        if let Some(suffix) = &suffix {
            street_parts.push(suffix.clone());
        }
        let street = street_parts.join(" ");

        // Cross-street connectives end the parse; the grammar has no
        // intersection form, so "Fifth Street and Grand Avenue" keeps only
        // the first street
        if idx < tokens.len() && is_connective(&tokens[idx]) {
            tokens.truncate(idx);
        }

        // Occupancy ("Apt 4B", "Unit 12"); kept in the formatted string
        let mut occupancy: Option<String> = None;
        if idx + 1 < tokens.len()
            && OCCUPANCY_TYPES.contains(&tokens[idx].to_lowercase().as_str())
        {
            occupancy = Some(format!(
                "{} {}",
                title_case(&tokens[idx]),
                tokens[idx + 1].to_uppercase()
            ));
            idx += 2;
        }

        // Remaining tail: [city words] [state] [zip]
        let mut zip: Option<String> = None;
        let mut state: Option<String> = None;
        let mut tail: Vec<String> = tokens[idx..].to_vec();

        if let Some(last) = tail.last() {
            if ZIP.is_match(last) {
                zip = Some(last.clone());
                tail.pop();
            }
        }
        if let Some(last) = tail.last() {
            let upper = last.to_uppercase();
            if last.len() == 2 && STATE_CODES.contains(&upper.as_str()) {
                state = Some(upper);
                tail.pop();
            }
        }
        let city = if tail.is_empty() {
            None
        } else {
            Some(
                tail.iter()
                    .map(|w| title_case(w))
                    .collect::<Vec<_>>()
                    .join(" "),
            )
        };

        // Zip without a state is noise, not an address tail
        if state.is_none() && zip.is_some() && city.is_none() {
            zip = None;
        }

        let formatted = render(
            house_number.as_deref(),
            &street,
            occupancy.as_deref(),
            city.as_deref(),
            state.as_deref(),
            zip.as_deref(),
        );

        Ok(NormalizedAddress {
            house_number,
            street,
            city,
            state,
            zip,
            formatted,
        })
    }

    /// Whether the token at `idx` starts the city/state/zip tail rather
    /// than continuing the street name
    fn is_tail_token(&self, tokens: &[String], idx: usize) -> bool {
        let token = &tokens[idx];
        if ZIP.is_match(token) {
            return true;
        }
        if OCCUPANCY_TYPES.contains(&token.to_lowercase().as_str()) || is_connective(token) {
            return true;
        }
        // A two-letter state code only terminates the name when something
        // follows it or it is the final token after at least one name word
        token.len() == 2
            && STATE_CODES.contains(&token.to_uppercase().as_str())
            && idx + 1 < tokens.len()
            && ZIP.is_match(&tokens[idx + 1])
    }
}

fn is_connective(token: &str) -> bool {
    token.eq_ignore_ascii_case("and") || token.eq_ignore_ascii_case("at") || token == "&"
}

fn render(
    house_number: Option<&str>,
    street: &str,
    occupancy: Option<&str>,
    city: Option<&str>,
    state: Option<&str>,
    zip: Option<&str>,
) -> String {
    let mut out = String::new();
    if let Some(number) = house_number {
        out.push_str(number);
        out.push(' ');
    }
    out.push_str(street);
    if let Some(occupancy) = occupancy {
        out.push(' ');
        out.push_str(occupancy);
    }
    if let Some(city) = city {
        out.push_str(", ");
        out.push_str(city);
    }
    if let Some(state) = state {
        out.push_str(", ");
        out.push_str(state);
    }
    if let Some(zip) = zip {
        out.push(' ');
        out.push_str(zip);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn normalize(raw: &str) -> Result<NormalizedAddress> {
        AddressNormalizer::new().normalize(raw)
    }

    #[test]
    fn test_basic_address() {
        let address = normalize("221B Baker Street").unwrap();
        assert_eq!(address.house_number.as_deref(), Some("221B"));
        assert_eq!(address.street, "Baker Street");
        assert_eq!(address.formatted, "221B Baker Street");
        assert!(address.city.is_none());
    }

    #[test]
    fn test_abbreviations_expanded() {
        let address = normalize("450 N Main St").unwrap();
        assert_eq!(address.street, "North Main Street");
        assert_eq!(address.formatted, "450 North Main Street");
    }

    #[test]
    fn test_full_address_with_tail() {
        let address = normalize("450 n main st, springfield IL 62704").unwrap();
        assert_eq!(address.city.as_deref(), Some("Springfield"));
        assert_eq!(address.state.as_deref(), Some("IL"));
        assert_eq!(address.zip.as_deref(), Some("62704"));
        assert_eq!(
            address.formatted,
            "450 North Main Street, Springfield, IL 62704"
        );
    }

    #[test]
    fn test_casing_canonicalized() {
        let address = normalize("1400 OAK AVENUE").unwrap();
        assert_eq!(address.formatted, "1400 Oak Avenue");
    }

    #[test]
    fn test_occupancy_preserved() {
        let address = normalize("12 Elm Street Apt 4b").unwrap();
        assert_eq!(address.formatted, "12 Elm Street Apt 4B");
    }

    #[test]
    fn test_block_reference_collapsed() {
        let address = normalize("1200 block of Sycamore Avenue").unwrap();
        assert_eq!(address.formatted, "1200 Sycamore Avenue");
        assert_eq!(address.street, "Sycamore Avenue");
    }

    #[test]
    fn test_intersection_keeps_first_street() {
        let address = normalize("Fifth Street and Grand Avenue").unwrap();
        assert_eq!(address.formatted, "Fifth Street");
    }

    #[test]
    fn test_partial_without_house_number() {
        // Accepted: suffix proves the street shape
        let address = normalize("Baker Street").unwrap();
        assert!(address.house_number.is_none());
        assert_eq!(address.street, "Baker Street");
    }

    #[test]
    fn test_rejects_non_addresses() {
        assert!(normalize("").is_err());
        assert!(normalize("engine four returning").is_err());
        assert!(normalize("Mercy General Hospital").is_err());
        assert!(normalize("12").is_err());
    }

    #[test]
    fn test_idempotent_on_formatted() {
        for raw in [
            "221b baker street",
            "450 N Main St, Springfield IL 62704",
            "12 Elm Street Apt 4b",
            "1400 oak ave",
        ] {
            let first = normalize(raw).unwrap();
            let second = normalize(&first.formatted).unwrap();
            assert_eq!(first.formatted, second.formatted, "raw input: {raw}");
            assert_eq!(first, second);
        }
    }

    proptest! {
        #[test]
        fn prop_formatted_is_fixed_point(
            number in 1u32..99999,
            name in "[A-Za-z]{3,10}",
        ) {
            prop_assume!(!OCCUPANCY_TYPES.contains(&name.to_lowercase().as_str()));
            let raw = format!("{number} {name} St");
            let first = normalize(&raw).unwrap();
            let second = normalize(&first.formatted).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_never_panics(raw in ".{0,80}") {
            let _ = normalize(&raw);
        }
    }
}
