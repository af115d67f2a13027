//! Blotter Extract - Multi-stage address and keyword extraction
//!
//! Implements the extraction cascade over scanner transcripts:
//! - Keyword prefilter against a configured incident vocabulary
//! - Deterministic street-address regex extraction
//! - Rule-based location/facility tagging as a second opinion
//! - Postal normalization of raw candidates
//! - Orchestration with a cost-gated model fallback
//!
//! Deterministic stages are pure and synchronous; only the model fallback
//! suspends, and the pipeline bounds how many of those calls are in flight.

use blotter_core::AddressCandidate;

pub mod keyword;
pub mod ner;
pub mod normalize;
pub mod pipeline;
pub mod street;

pub use keyword::{KeywordMatcher, KeywordVocabulary, DEFAULT_KEYWORDS};
pub use ner::LocationTagger;
pub use normalize::AddressNormalizer;
pub use pipeline::ExtractionPipeline;
pub use street::StreetAddressExtractor;

/// Trait for deterministic candidate extraction strategies.
///
/// The pipeline holds an ordered list of these and walks them cheapest and
/// most trusted first, stopping at the first candidate that normalizes.
pub trait CandidateSource: Send + Sync {
    /// Extract address candidates from transcript text. Returns an empty
    /// vector, never an error: deterministic stages have nothing to fail on.
    fn extract(&self, text: &str) -> Vec<AddressCandidate>;

    /// Strategy name for logging
    fn name(&self) -> &str;
}
