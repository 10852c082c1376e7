//! Pipeline stages for document-to-JSON extraction.
//!
//! Each submodule implements exactly one transformation step.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ recognize ──▶ fields ──▶ emit
//! (path/stdin) (pdfium)  (PNG)    (tesseract)  (regex)    (JSON line)
//! ```
//!
//! 1. [`input`]: classify the path argument or stdin bytes as PDF or image
//! 2. [`render`]: rasterise PDF pages, or read their text layer
//! 3. [`encode`]: PNG-encode each bitmap for the OCR engine
//! 4. [`recognize`]: OCR one bitmap; decode image inputs
//! 5. [`fields`]: date/amount/category heuristics over the joined text
//! 6. [`emit`]: assemble the output record and serialise it
//!
//! Orchestration across stages lives in [`crate::convert`].

pub mod emit;
pub mod encode;
pub mod fields;
pub mod input;
pub mod recognize;
pub mod render;
