//! Error types for the ocr2json library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`OcrJsonError`]: **Fatal**: the run cannot produce a normal record
//!   (engine missing, rasterised PDF cannot be opened, no input at all).
//!   Returned as `Err(OcrJsonError)` from [`crate::convert::process`] and
//!   turned into a failure record plus a non-zero exit status by the caller.
//!
//! * [`RecognitionError`]: **Non-fatal**: decoding, rendering or OCR of the
//!   document failed. Carried inside [`TextOutcome::Failed`] so the emitter
//!   can decide, per [`FailurePolicy`], whether to surface the reason or
//!   blank it out.

use crate::config::FailurePolicy;
use thiserror::Error;

/// All fatal errors returned by the ocr2json library.
#[derive(Debug, Error)]
pub enum OcrJsonError {
    // ── Startup errors ────────────────────────────────────────────────────
    /// A required external engine (PDF renderer, OCR) is unavailable.
    #[error("{dependency}: {detail}")]
    DependencyMissing { dependency: String, detail: String },

    // ── Input errors ──────────────────────────────────────────────────────
    /// No file argument and nothing usable on standard input.
    #[error("No input provided: pass a file path or pipe a document on stdin")]
    MissingInput,

    /// The PDF could not be opened for rasterisation.
    #[error("PDF processing error: cannot open '{source_name}': {detail}")]
    DocumentOpen { source_name: String, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Output errors ─────────────────────────────────────────────────────
    #[error("Failed to serialise output record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OcrJsonError {
    /// Process exit status for this failure. Every fatal failure exits 1.
    pub fn exit_code(&self) -> u8 {
        1
    }

    /// Shorthand for [`OcrJsonError::DependencyMissing`].
    pub fn missing(dependency: impl Into<String>, detail: impl Into<String>) -> Self {
        OcrJsonError::DependencyMissing {
            dependency: dependency.into(),
            detail: detail.into(),
        }
    }
}

/// A non-fatal failure while turning a document into text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecognitionError {
    /// The image bytes could not be decoded into a bitmap.
    #[error("cannot decode image: {0}")]
    Decode(String),

    /// The OCR engine rejected the bitmap or failed while reading it.
    #[error("{0}")]
    Engine(String),

    /// A PDF page could not be rasterised.
    #[error("PDF processing error: page {page}: {detail}")]
    Render { page: usize, detail: String },
}

/// Tagged result of the Renderer + Recognizer stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextOutcome {
    /// Recognised (or extracted) text, pages joined with `\n`.
    Text(String),
    /// Recognition failed; the reason is kept until emission.
    Failed(RecognitionError),
}

impl TextOutcome {
    /// Render the outcome as the string placed in the output record.
    pub fn render(&self, policy: FailurePolicy) -> String {
        match (self, policy) {
            (TextOutcome::Text(text), _) => text.clone(),
            (TextOutcome::Failed(_), FailurePolicy::Empty) => String::new(),
            (TextOutcome::Failed(e), FailurePolicy::Descriptive) => format!("OCR failed: {e}"),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TextOutcome::Failed(_))
    }
}
