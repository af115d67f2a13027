//! Blotter Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout the Blotter
//! system:
//! - Transcript and extraction result models
//! - Address candidate and normalized address types
//! - Common error types
//! - Shared traits for the model fallback and record sinks
//! - Configuration management

pub mod config;

pub use config::{
    AppConfig, ConfigError, LlmConfig, LoggingConfig, PipelineConfig, SinkConfig, SinkFormat,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for Blotter operations
#[derive(Error, Debug)]
pub enum BlotterError {
    /// An address string could not be normalized. Recoverable: the pipeline
    /// tries the next candidate or escalates to the model fallback.
    #[error("Unparseable address: {0}")]
    ParseFailure(String),

    /// The model endpoint failed, timed out, or returned garbage.
    /// Recoverable: the record degrades to an unresolved result.
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// A sink rejected an append.
    #[error("Sink error: {0}")]
    SinkError(String),

    /// Startup configuration is unusable. Fatal for the whole run.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, BlotterError>;

// ============================================================================
// Transcript Input
// ============================================================================

/// One unit of input: a single transcribed line from a scanner feed.
///
/// Immutable once received. Created by the upstream fetch/filter stage and
/// consumed exactly once by the extraction pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptRecord {
    /// Raw transcript text
    pub text: String,

    /// Identifier of the originating feed (URL or file stem)
    pub source_id: String,

    /// When the audio was transcribed
    pub timestamp: DateTime<Utc>,
}

impl TranscriptRecord {
    /// Create a new transcript record
    pub fn new(
        text: impl Into<String>,
        source_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            text: text.into(),
            source_id: source_id.into(),
            timestamp,
        }
    }
}

// ============================================================================
// Address Candidates
// ============================================================================

/// Which extraction stage proposed a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMethod {
    /// Hand-built street-address regex
    Regex,
    /// Rule-based location/facility tagger
    Ner,
    /// External reasoning model
    Model,
}

impl std::fmt::Display for SourceMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Regex => write!(f, "regex"),
            Self::Ner => write!(f, "ner"),
            Self::Model => write!(f, "model"),
        }
    }
}

/// An unvalidated span of text proposed as an address.
///
/// Ephemeral: produced by one extraction stage, then either normalized into
/// a [`NormalizedAddress`] or discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressCandidate {
    /// The extracted span, verbatim
    pub raw_text: String,

    /// Which stage produced it
    pub source_method: SourceMethod,

    /// Span score where the producing stage has one
    pub confidence: Option<f32>,
}

impl AddressCandidate {
    /// Candidate from the street-address regex
    pub fn regex(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            source_method: SourceMethod::Regex,
            confidence: None,
        }
    }

    /// Candidate from the entity tagger, carrying the rule's confidence
    pub fn ner(raw_text: impl Into<String>, confidence: f32) -> Self {
        Self {
            raw_text: raw_text.into(),
            source_method: SourceMethod::Ner,
            confidence: Some(confidence),
        }
    }

    /// Candidate recovered by the model fallback
    pub fn model(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            source_method: SourceMethod::Model,
            confidence: None,
        }
    }
}

// ============================================================================
// Normalized Addresses
// ============================================================================

/// A canonical postal address.
///
/// Produced only by the address normalizer and never mutated afterwards.
/// `formatted` is always present; component fields are populated as far as
/// the source string allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedAddress {
    /// House number, including unit letters ("221B")
    pub house_number: Option<String>,

    /// Street name with expanded suffix ("Baker Street")
    pub street: String,

    pub city: Option<String>,

    /// Two-letter state code, uppercased
    pub state: Option<String>,

    pub zip: Option<String>,

    /// Canonical rendering of the full address
    pub formatted: String,
}

impl std::fmt::Display for NormalizedAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.formatted)
    }
}

// ============================================================================
// Extraction Results
// ============================================================================

/// Which strategy resolved a record, for auditability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    /// No keyword matched; the record never reached the extractors
    PrefilteredOut,
    /// Street-address regex produced the accepted address
    Regex,
    /// Entity tagger produced the accepted address
    Ner,
    /// Model fallback produced the accepted address
    Model,
    /// Keyword matched but no method yielded a normalizable address
    #[serde(rename = "none")]
    Unresolved,
}

impl std::fmt::Display for ResolutionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PrefilteredOut => write!(f, "prefiltered_out"),
            Self::Regex => write!(f, "regex"),
            Self::Ner => write!(f, "ner"),
            Self::Model => write!(f, "model"),
            Self::Unresolved => write!(f, "none"),
        }
    }
}

impl From<SourceMethod> for ResolutionMethod {
    fn from(method: SourceMethod) -> Self {
        match method {
            SourceMethod::Regex => Self::Regex,
            SourceMethod::Ner => Self::Ner,
            SourceMethod::Model => Self::Model,
        }
    }
}

/// The terminal record for one transcript.
///
/// Created by the extraction pipeline, handed to a [`RecordSink`], and never
/// updated in place; corrections require a new record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub source_id: String,

    pub timestamp: DateTime<Utc>,

    pub extracted_address: Option<NormalizedAddress>,

    /// A member of the configured vocabulary, in its canonical spelling
    pub extracted_keyword: Option<String>,

    /// Provenance of the accepted address (or why there is none)
    pub method: ResolutionMethod,
}

impl ExtractionResult {
    /// Result for a record that failed the keyword prefilter
    pub fn prefiltered_out(record: &TranscriptRecord) -> Self {
        Self {
            source_id: record.source_id.clone(),
            timestamp: record.timestamp,
            extracted_address: None,
            extracted_keyword: None,
            method: ResolutionMethod::PrefilteredOut,
        }
    }

    /// Result with an accepted address
    pub fn resolved(
        record: &TranscriptRecord,
        address: NormalizedAddress,
        keyword: impl Into<String>,
        method: ResolutionMethod,
    ) -> Self {
        Self {
            source_id: record.source_id.clone(),
            timestamp: record.timestamp,
            extracted_address: Some(address),
            extracted_keyword: Some(keyword.into()),
            method,
        }
    }

    /// Result for a record whose keyword matched but whose address could not
    /// be recovered by any method
    pub fn unresolved(record: &TranscriptRecord, keyword: impl Into<String>) -> Self {
        Self {
            source_id: record.source_id.clone(),
            timestamp: record.timestamp,
            extracted_address: None,
            extracted_keyword: Some(keyword.into()),
            method: ResolutionMethod::Unresolved,
        }
    }
}

// ============================================================================
// Batch Summary
// ============================================================================

/// Per-batch resolution counts, reported after each run
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub prefiltered_out: usize,
    pub regex_resolved: usize,
    pub ner_resolved: usize,
    pub model_resolved: usize,
    pub unresolved: usize,
}

impl BatchSummary {
    /// Record one finalized result
    pub fn observe(&mut self, method: ResolutionMethod) {
        self.total += 1;
        match method {
            ResolutionMethod::PrefilteredOut => self.prefiltered_out += 1,
            ResolutionMethod::Regex => self.regex_resolved += 1,
            ResolutionMethod::Ner => self.ner_resolved += 1,
            ResolutionMethod::Model => self.model_resolved += 1,
            ResolutionMethod::Unresolved => self.unresolved += 1,
        }
    }

    /// Records that produced an address
    pub fn resolved(&self) -> usize {
        self.regex_resolved + self.ner_resolved + self.model_resolved
    }

    /// Merge counts from another summary
    pub fn merge(&mut self, other: &BatchSummary) {
        self.total += other.total;
        self.prefiltered_out += other.prefiltered_out;
        self.regex_resolved += other.regex_resolved;
        self.ner_resolved += other.ner_resolved;
        self.model_resolved += other.model_resolved;
        self.unresolved += other.unresolved;
    }
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "total={} prefiltered_out={} regex={} ner={} model={} unresolved={}",
            self.total,
            self.prefiltered_out,
            self.regex_resolved,
            self.ner_resolved,
            self.model_resolved,
            self.unresolved
        )
    }
}

// ============================================================================
// Model Fallback Types
// ============================================================================

/// Structured output recovered from the model fallback.
///
/// Untrusted until re-validated: the address must pass the normalizer and
/// the keyword must be a vocabulary member before either is accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelExtraction {
    pub address: Option<String>,
    pub keyword: Option<String>,
}

impl ModelExtraction {
    /// True when the model recovered nothing
    pub fn is_empty(&self) -> bool {
        self.address.is_none() && self.keyword.is_none()
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Trait for chat-completion model clients
#[async_trait::async_trait]
pub trait ModelClient: Send + Sync {
    /// Generate a response for a prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Client name for logging
    fn name(&self) -> &str;
}

/// Trait for the expensive extraction fallback invoked when the
/// deterministic cascade fails
#[async_trait::async_trait]
pub trait FallbackExtractor: Send + Sync {
    /// Extract an address and keyword from transcript text, given the
    /// candidates the deterministic stages already rejected
    async fn extract(
        &self,
        text: &str,
        prior_candidates: &[AddressCandidate],
    ) -> Result<ModelExtraction>;
}

/// Trait for result persistence backends
#[async_trait::async_trait]
pub trait RecordSink: Send + Sync {
    /// Append a small batch of finalized results.
    ///
    /// Assumed atomic per call; the core never retries a partial append.
    async fn append(&self, results: &[ExtractionResult]) -> Result<()>;

    /// Sink name for logging
    fn name(&self) -> &str;
}

// ============================================================================
// Tests
// ============================================================================
