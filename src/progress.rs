//! Progress-callback trait for per-page extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to observe
//! the pipeline as it renders and recognises each page. Pages are processed
//! strictly in document order on the calling thread.
//!
//! # Example
//!
//! ```rust
//! use ocr2json::{ExtractionConfig, ExtractionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     recognised: AtomicUsize,
//! }
//!
//! impl ExtractionProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, text_len: usize) {
//!         self.recognised.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {page_num}/{total_pages}: {text_len} chars");
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { recognised: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it processes each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. An image input counts as a one-page document.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once the page count is known, before the first page.
    fn on_document_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called before a page is rendered or recognised (1-indexed).
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page produced text. `text_len` is its byte length.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, text_len: usize) {
        let _ = (page_num, total_pages, text_len);
    }

    /// Called when a page failed to render, extract or recognise.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after the last attempted page.
    fn on_document_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
