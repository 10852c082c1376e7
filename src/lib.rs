//! # ocr2json
//!
//! Extract text from a PDF or image with OCR and emit it as one JSON line,
//! optionally with a few receipt fields (date, amount, category) mined from
//! the text.
//!
//! ## Pipeline Overview
//!
//! ```text
//! path / stdin
//!  │
//!  ├─ 1. Input      classify as PDF (suffix or %PDF magic) or image
//!  ├─ 2. Render     rasterise pages via pdfium, or read the text layer
//!  ├─ 3. Recognize  Tesseract OCR per page, joined with "\n"
//!  ├─ 4. Fields     Date / Amount / Source / Category / Notes / Type
//!  └─ 5. Emit       one compact JSON object on stdout
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ocr2json::{process_document, ExtractionConfig, InputDocument};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::default();
//!     let doc = InputDocument::from_path("receipt.pdf");
//!     let record = process_document(&doc, &config)?;
//!     println!("{}", serde_json::to_string(&record)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature     | Default | Description |
//! |-------------|---------|-------------|
//! | `cli`       | on      | Enables the `ocr2json` binary (clap + anyhow + indicatif + tracing-subscriber) |
//! | `tesseract` | off     | Links the Tesseract OCR engine through `leptess` |
//!
//! Without `tesseract`, every run that needs OCR reports the engine as a
//! missing dependency; text-layer extraction of PDFs still works.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ExtractionConfig, ExtractionConfigBuilder, FailurePolicy, OutputShape, RenderStrategy,
};
pub use convert::{extract_text, process, process_document, settle, Backends};
pub use error::{OcrJsonError, RecognitionError, TextOutcome};
pub use output::{Category, ExtractedRecord, OutputRecord, RecordKind, TextField};
pub use pipeline::fields::extract_fields;
pub use pipeline::input::{resolve_input, DocumentKind, InputDocument};
pub use pipeline::recognize::{MockRecognizer, OcrBackend};
pub use pipeline::render::{PageImage, PdfBackend, PdfiumBackend, RasterOptions, RenderError};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
