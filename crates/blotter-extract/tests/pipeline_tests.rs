//! End-to-end pipeline tests with a scripted model fallback.
//!
//! The real model endpoint is nondeterministic and metered; these tests
//! substitute a fake that returns canned extractions so the escalation and
//! re-validation behavior can be pinned down exactly.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use blotter_core::{
    AddressCandidate, BlotterError, FallbackExtractor, ModelExtraction, ResolutionMethod, Result,
    TranscriptRecord,
};
use blotter_extract::{ExtractionPipeline, KeywordVocabulary};

/// Fake fallback that returns a fixed extraction and counts invocations
struct ScriptedFallback {
    extraction: ModelExtraction,
    calls: AtomicUsize,
}

impl ScriptedFallback {
    fn returning(address: Option<&str>, keyword: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            extraction: ModelExtraction {
                address: address.map(str::to_string),
                keyword: keyword.map(str::to_string),
            },
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl FallbackExtractor for ScriptedFallback {
    async fn extract(
        &self,
        _text: &str,
        _prior_candidates: &[AddressCandidate],
    ) -> Result<ModelExtraction> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.extraction.clone())
    }
}

/// Fake fallback that always fails, as a dead endpoint would
struct UnavailableFallback;

#[async_trait::async_trait]
impl FallbackExtractor for UnavailableFallback {
    async fn extract(
        &self,
        _text: &str,
        _prior_candidates: &[AddressCandidate],
    ) -> Result<ModelExtraction> {
        Err(BlotterError::ModelUnavailable("connection refused".to_string()))
    }
}

/// Fake fallback that hangs past any reasonable timeout
struct HangingFallback;

#[async_trait::async_trait]
impl FallbackExtractor for HangingFallback {
    async fn extract(
        &self,
        _text: &str,
        _prior_candidates: &[AddressCandidate],
    ) -> Result<ModelExtraction> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(ModelExtraction::default())
    }
}

fn record(text: &str) -> TranscriptRecord {
    TranscriptRecord::new(text, "feed-9", Utc::now())
}

fn pipeline_with(fallback: Arc<dyn FallbackExtractor>) -> ExtractionPipeline {
    ExtractionPipeline::new(KeywordVocabulary::default()).with_fallback(
        fallback,
        2,
        Duration::from_secs(5),
    )
}

#[tokio::test]
async fn model_resolves_mangled_address() {
    // Deterministic stages find nothing usable; the model recovers an
    // address which must still pass the normalizer
    let fallback = ScriptedFallback::returning(Some("1240 oak st"), None);
    let result = pipeline_with(fallback.clone())
        .process(&record("fire at, uh, somewhere on oak, hard copy garbled"))
        .await;
    assert_eq!(result.method, ResolutionMethod::Model);
    let address = result.extracted_address.unwrap();
    // Canonical form, not the model's verbatim string
    assert_eq!(address.formatted, "1240 Oak Street");
    assert_eq!(fallback.calls(), 1);
}

#[tokio::test]
async fn unparseable_model_address_rejected() {
    let fallback = ScriptedFallback::returning(Some("location unknown"), None);
    let result = pipeline_with(fallback.clone())
        .process(&record("fire at, uh, somewhere on oak, hard copy garbled"))
        .await;
    assert_eq!(result.method, ResolutionMethod::Unresolved);
    assert!(result.extracted_address.is_none());
    assert_eq!(fallback.calls(), 1);
}

#[tokio::test]
async fn model_not_called_when_deterministic_succeeds() {
    let fallback = ScriptedFallback::returning(Some("99 Fake Street"), None);
    let result = pipeline_with(fallback.clone())
        .process(&record("working structure fire at 221B Baker Street"))
        .await;
    assert_eq!(result.method, ResolutionMethod::Regex);
    assert_eq!(fallback.calls(), 0);
}

#[tokio::test]
async fn model_not_called_for_prefiltered_records() {
    let fallback = ScriptedFallback::returning(Some("99 Fake Street"), None);
    let result = pipeline_with(fallback.clone())
        .process(&record("dispatch requesting a second tow truck"))
        .await;
    assert_eq!(result.method, ResolutionMethod::PrefilteredOut);
    assert_eq!(fallback.calls(), 0);
}

#[tokio::test]
async fn out_of_vocabulary_model_keyword_discarded() {
    let fallback = ScriptedFallback::returning(Some("17 Birch Lane"), Some("volcano eruption"));
    let result = pipeline_with(fallback)
        .process(&record("explosion reported, address unreadable in transcript"))
        .await;
    assert_eq!(result.method, ResolutionMethod::Model);
    // The prefilter's match survives; the model's invented keyword does not
    assert_eq!(result.extracted_keyword.as_deref(), Some("Explosion"));
}

#[tokio::test]
async fn vocabulary_valid_model_keyword_upgrades_match() {
    let fallback = ScriptedFallback::returning(Some("17 Birch Lane"), Some("fatal fire"));
    let result = pipeline_with(fallback)
        .process(&record("fire with one confirmed deceased, address garbled"))
        .await;
    assert_eq!(result.method, ResolutionMethod::Model);
    assert_eq!(result.extracted_keyword.as_deref(), Some("Fatal fire"));
}

#[tokio::test]
async fn unavailable_model_degrades_to_unresolved() {
    let result = pipeline_with(Arc::new(UnavailableFallback))
        .process(&record("hazmat cleanup requested, location cut off"))
        .await;
    assert_eq!(result.method, ResolutionMethod::Unresolved);
    assert_eq!(result.extracted_keyword.as_deref(), Some("Hazmat cleanup"));
    assert!(result.extracted_address.is_none());
}

#[tokio::test]
async fn model_timeout_degrades_to_unresolved() {
    let pipeline = ExtractionPipeline::new(KeywordVocabulary::default()).with_fallback(
        Arc::new(HangingFallback),
        1,
        Duration::from_millis(50),
    );
    let result = pipeline
        .process(&record("suspicious fire, poor audio, no address captured"))
        .await;
    assert_eq!(result.method, ResolutionMethod::Unresolved);
}

#[tokio::test]
async fn batch_contains_one_result_per_record() {
    let fallback = ScriptedFallback::returning(None, None);
    let pipeline = pipeline_with(fallback);
    let records: Vec<TranscriptRecord> = vec![
        record("fire at 14 Oak Street"),
        record("nothing to report"),
        record("roof collapse, unclear where"),
        record("explosion at Fifth Street and Grand Avenue"),
    ];
    let (results, summary) = pipeline.process_batch(&records).await;
    assert_eq!(results.len(), records.len());
    assert_eq!(summary.total, records.len());
    assert_eq!(summary.prefiltered_out, 1);
}
