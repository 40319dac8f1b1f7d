/*!
 * Subtitle translation using AI providers.
 *
 * - `core`: the `TextTranslator` seam and the provider-backed `TranslationService`
 * - `batch`: the chunk driver that splits files, calls the translator and merges
 */

// Re-export main types for easier usage
pub use self::batch::{BatchTranslator, ChunkOutcome, ChunkSettings, TranslationReport};
pub use self::core::{TextTranslator, TranslationRequest, TranslationService};

// Submodules
pub mod batch;
pub mod core;
