//! Extraction pipeline orchestration
//!
//! Per transcript: prefilter -> deterministic cascade -> normalization ->
//! conditional model fallback -> final record. The ordering is a cost
//! control, not an accuracy nicety: cheap deterministic stages always run
//! before the metered model call, and the model only runs when a keyword
//! matched AND no deterministic candidate normalized.
//!
//! Every record that enters produces exactly one result; per-record
//! failures surface only through the result's `method` field.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use blotter_core::{
    AddressCandidate, BatchSummary, ExtractionResult, FallbackExtractor, NormalizedAddress,
    ResolutionMethod, TranscriptRecord,
};

use crate::keyword::{KeywordMatcher, KeywordVocabulary};
use crate::ner::LocationTagger;
use crate::normalize::AddressNormalizer;
use crate::street::StreetAddressExtractor;
use crate::CandidateSource;

/// Model fallback plus its concurrency and timeout discipline
struct ModelGate {
    extractor: Arc<dyn FallbackExtractor>,
    semaphore: Arc<Semaphore>,
    timeout: Duration,
}

/// Orchestrates the extraction cascade over transcript records.
///
/// Deterministic strategies are held as an ordered list and walked with
/// early exit on the first normalizable candidate; the model fallback is
/// attached separately because it is metered and asynchronous.
pub struct ExtractionPipeline {
    matcher: KeywordMatcher,
    sources: Vec<Box<dyn CandidateSource>>,
    normalizer: AddressNormalizer,
    model: Option<ModelGate>,
    batch_window: usize,
}

impl ExtractionPipeline {
    /// Create a pipeline with the default deterministic cascade
    /// (street regex, then location tagger) and no model fallback
    pub fn new(vocabulary: KeywordVocabulary) -> Self {
        Self {
            matcher: KeywordMatcher::new(vocabulary),
            sources: vec![
                Box::new(StreetAddressExtractor::new()),
                Box::new(LocationTagger::new()),
            ],
            normalizer: AddressNormalizer::new(),
            model: None,
            batch_window: 32,
        }
    }

    /// Replace the deterministic cascade (order is trust order)
    pub fn with_sources(mut self, sources: Vec<Box<dyn CandidateSource>>) -> Self {
        self.sources = sources;
        self
    }

    /// Attach the model fallback with a bound on in-flight calls and a
    /// per-call timeout
    pub fn with_fallback(
        mut self,
        extractor: Arc<dyn FallbackExtractor>,
        max_concurrency: usize,
        timeout: Duration,
    ) -> Self {
        self.batch_window = (max_concurrency * 4).max(self.batch_window);
        self.model = Some(ModelGate {
            extractor,
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
            timeout,
        });
        self
    }

    /// Process one transcript into exactly one result. Never fails: every
    /// per-record error degrades to a `method` value.
    pub async fn process(&self, record: &TranscriptRecord) -> ExtractionResult {
        // 1. Prefilter gate: no keyword, no further work
        let Some(keyword) = self.matcher.match_keyword(&record.text) else {
            debug!(source_id = %record.source_id, "prefiltered out");
            return ExtractionResult::prefiltered_out(record);
        };
        let keyword = keyword.to_string();

        // 2-4. Deterministic cascade with early exit on first normalizable
        // candidate; rejected candidates are kept as model context
        let mut rejected: Vec<AddressCandidate> = Vec::new();
        for source in &self.sources {
            for candidate in source.extract(&record.text) {
                match self.normalizer.normalize(&candidate.raw_text) {
                    Ok(address) => {
                        debug!(
                            source_id = %record.source_id,
                            strategy = source.name(),
                            address = %address,
                            "deterministic extraction succeeded"
                        );
                        return ExtractionResult::resolved(
                            record,
                            address,
                            keyword,
                            candidate.source_method.into(),
                        );
                    }
                    Err(_) => rejected.push(candidate),
                }
            }
        }

        // 5. Escalate to the model, still gated by the keyword match
        if let Some(gate) = &self.model {
            if let Some((address, model_keyword)) =
                self.try_model(gate, record, &rejected).await
            {
                let keyword = model_keyword.unwrap_or(keyword);
                return ExtractionResult::resolved(
                    record,
                    address,
                    keyword,
                    ResolutionMethod::Model,
                );
            }
        }

        // 6. Nothing recovered an address; the prefilter keyword survives
        ExtractionResult::unresolved(record, keyword)
    }

    /// Run the model fallback under the semaphore and timeout, returning a
    /// normalized address (and an optionally upgraded keyword) on success
    async fn try_model(
        &self,
        gate: &ModelGate,
        record: &TranscriptRecord,
        rejected: &[AddressCandidate],
    ) -> Option<(NormalizedAddress, Option<String>)> {
        let _permit = gate
            .semaphore
            .acquire()
            .await
            .expect("pipeline semaphore is never closed");

        let extraction = match tokio::time::timeout(
            gate.timeout,
            gate.extractor.extract(&record.text, rejected),
        )
        .await
        {
            Ok(Ok(extraction)) => extraction,
            Ok(Err(e)) => {
                warn!(source_id = %record.source_id, error = %e, "model fallback failed");
                return None;
            }
            Err(_) => {
                warn!(source_id = %record.source_id, "model fallback timed out");
                return None;
            }
        };

        // Model output is untrusted: the address must survive the
        // normalizer and the keyword must be a vocabulary member
        let keyword = extraction
            .keyword
            .as_deref()
            .and_then(|k| self.matcher.vocabulary().canonical(k))
            .map(str::to_string);

        let address = extraction
            .address
            .as_deref()
            .and_then(|raw| match self.normalizer.normalize(raw) {
                Ok(address) => Some(address),
                Err(e) => {
                    debug!(source_id = %record.source_id, error = %e, "model address rejected");
                    None
                }
            })?;

        Some((address, keyword))
    }

    /// Process a whole batch concurrently. Output order is not guaranteed;
    /// the summary is exact regardless.
    pub async fn process_batch(
        &self,
        records: &[TranscriptRecord],
    ) -> (Vec<ExtractionResult>, BatchSummary) {
        let results: Vec<ExtractionResult> = stream::iter(records)
            .map(|record| self.process(record))
            .buffer_unordered(self.batch_window)
            .collect()
            .await;

        let mut summary = BatchSummary::default();
        for result in &results {
            summary.observe(result.method);
        }

        (results, summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(text: &str) -> TranscriptRecord {
        TranscriptRecord::new(text, "test-feed", Utc::now())
    }

    fn pipeline() -> ExtractionPipeline {
        ExtractionPipeline::new(KeywordVocabulary::default())
    }

    #[tokio::test]
    async fn test_prefilter_short_circuits() {
        let result = pipeline()
            .process(&record("engine four returning to quarters at 12 Elm Street"))
            .await;
        assert_eq!(result.method, ResolutionMethod::PrefilteredOut);
        assert!(result.extracted_address.is_none());
        assert!(result.extracted_keyword.is_none());
    }

    #[tokio::test]
    async fn test_regex_path() {
        let result = pipeline()
            .process(&record(
                "Units responding to 221B Baker Street for a reported fire",
            ))
            .await;
        assert_eq!(result.method, ResolutionMethod::Regex);
        assert_eq!(
            result.extracted_address.unwrap().formatted,
            "221B Baker Street"
        );
        assert_eq!(result.extracted_keyword.as_deref(), Some("Fire"));
    }

    #[tokio::test]
    async fn test_ner_path_when_regex_finds_nothing() {
        let result = pipeline()
            .process(&record(
                "structure fire in the 1200 block of Sycamore Avenue",
            ))
            .await;
        assert_eq!(result.method, ResolutionMethod::Ner);
        assert!(result.extracted_address.is_some());
    }

    #[tokio::test]
    async fn test_unresolved_without_fallback() {
        let result = pipeline()
            .process(&record("possible arson, location unclear, near the old mill"))
            .await;
        assert_eq!(result.method, ResolutionMethod::Unresolved);
        assert_eq!(result.extracted_keyword.as_deref(), Some("Arson"));
        assert!(result.extracted_address.is_none());
    }

    #[tokio::test]
    async fn test_batch_summary_counts() {
        let records = vec![
            record("all quiet on the north side"),
            record("fire at 14 Oak Street"),
            record("homicide investigation, no address given"),
        ];
        let (results, summary) = pipeline().process_batch(&records).await;
        assert_eq!(results.len(), 3);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.prefiltered_out, 1);
        assert_eq!(summary.regex_resolved, 1);
        assert_eq!(summary.unresolved, 1);
    }

    #[tokio::test]
    async fn test_batch_is_deterministic() {
        let records = vec![
            record("fire at 14 Oak Street"),
            record("collapse reported in the 900 block of Pine Road"),
            record("nothing to report"),
        ];
        let pipeline = pipeline();
        let (_, first) = pipeline.process_batch(&records).await;
        let (_, second) = pipeline.process_batch(&records).await;
        assert_eq!(first.total, second.total);
        assert_eq!(first.regex_resolved, second.regex_resolved);
        assert_eq!(first.ner_resolved, second.ner_resolved);
        assert_eq!(first.unresolved, second.unresolved);
    }
}
