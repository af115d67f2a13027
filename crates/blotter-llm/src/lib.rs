//! Blotter LLM - Model-backed extraction fallback
//!
//! Provides the expensive last stage of the extraction cascade:
//! - An OpenAI-compatible chat-completions client (OpenRouter by default)
//! - A prompt-and-parse layer that turns transcript text into a structured
//!   `{address, keyword}` extraction
//!
//! Everything the model returns is treated as untrusted input; the caller
//! re-normalizes addresses and re-checks keyword membership.

pub mod client;
pub mod extractor;

pub use client::OpenRouterClient;
pub use extractor::ModelExtractor;
