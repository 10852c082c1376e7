//! Top-level orchestration: drive one [`InputDocument`] through the stages
//! and produce the [`OutputRecord`] to emit.
//!
//! Engines are acquired up front into [`Backends`], only for what the run
//! needs, so a missing dependency is reported before any page is touched.
//! Callers that already hold engines (tests, embedding applications) build
//! `Backends` themselves and call [`process`] directly.

use crate::config::{ExtractionConfig, RenderStrategy};
use crate::error::{OcrJsonError, RecognitionError, TextOutcome};
use crate::output::OutputRecord;
use crate::pipeline::emit;
use crate::pipeline::input::{DocumentKind, InputDocument};
use crate::pipeline::recognize::{self, OcrBackend};
use crate::pipeline::render::{
    PageImage, PageText, PdfBackend, PdfiumBackend, RasterOptions, RenderError,
};
use crate::progress::ProgressCallback;
use std::ops::ControlFlow;
use std::time::Instant;
use tracing::{debug, info, warn};

/// The engines available to a run.
#[derive(Default)]
pub struct Backends {
    pub pdf: Option<Box<dyn PdfBackend>>,
    pub ocr: Option<Box<dyn OcrBackend>>,
}

impl Backends {
    /// No engines at all.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pdf(mut self, pdf: impl PdfBackend + 'static) -> Self {
        self.pdf = Some(Box::new(pdf));
        self
    }

    pub fn with_ocr(mut self, ocr: impl OcrBackend + 'static) -> Self {
        self.ocr = Some(Box::new(ocr));
        self
    }

    /// Acquire the real engines a document of `kind` needs under `config`.
    ///
    /// PDFs need PDFium; images and OCR-ing PDF strategies need the OCR
    /// engine. The first unavailable engine is returned as
    /// [`OcrJsonError::DependencyMissing`].
    pub fn load(config: &ExtractionConfig, kind: DocumentKind) -> Result<Self, OcrJsonError> {
        let mut backends = Self::new();

        if kind == DocumentKind::Pdf {
            let pdfium = PdfiumBackend::bind(config.pdfium_library.as_deref())?;
            backends.pdf = Some(Box::new(pdfium));
        }

        let needs_ocr = match kind {
            DocumentKind::Image => true,
            DocumentKind::Pdf => config.pdf_needs_ocr(),
        };
        if needs_ocr {
            backends.ocr = Some(recognize::load_ocr_backend(config)?);
        }

        Ok(backends)
    }

    fn require_pdf(&self) -> Result<&dyn PdfBackend, OcrJsonError> {
        self.pdf
            .as_deref()
            .ok_or_else(|| OcrJsonError::missing("PDFium", "no PDF renderer available"))
    }

    fn require_ocr(&self) -> Result<&dyn OcrBackend, OcrJsonError> {
        self.ocr
            .as_deref()
            .ok_or_else(|| OcrJsonError::missing("Tesseract", "no OCR engine available"))
    }
}

/// Acquire the default engines for `doc` and process it.
///
/// # Errors
/// Returns `Err(OcrJsonError)` only for fatal conditions:
/// - a required engine is unavailable
/// - the PDF cannot be opened for rasterisation
pub fn process_document(
    doc: &InputDocument,
    config: &ExtractionConfig,
) -> Result<OutputRecord, OcrJsonError> {
    let backends = Backends::load(config, doc.kind())?;
    process(doc, config, &backends)
}

/// Process one document with the given engines.
///
/// Recognition failures are not errors here: they are rendered into the
/// record's text according to [`ExtractionConfig::on_failure`].
pub fn process(
    doc: &InputDocument,
    config: &ExtractionConfig,
    backends: &Backends,
) -> Result<OutputRecord, OcrJsonError> {
    let start = Instant::now();
    info!("Starting extraction: {} ({:?})", doc.display_name(), doc.kind());

    let outcome = extract_text(doc, config, backends)?;
    if let TextOutcome::Failed(ref e) = outcome {
        warn!("Recognition failed for {}: {}", doc.display_name(), e);
    }

    let text = outcome.render(config.on_failure);
    let record = emit::build_record(config.shape, doc.identifier(), text);

    info!(
        "Extraction complete: {} in {}ms",
        doc.display_name(),
        start.elapsed().as_millis()
    );
    Ok(record)
}

/// Run the Renderer and Recognizer stages, producing the document text.
pub fn extract_text(
    doc: &InputDocument,
    config: &ExtractionConfig,
    backends: &Backends,
) -> Result<TextOutcome, OcrJsonError> {
    match doc.kind() {
        DocumentKind::Image => {
            let ocr = backends.require_ocr()?;
            Ok(recognize_image(doc, ocr, config))
        }
        DocumentKind::Pdf => {
            let pdf = backends.require_pdf()?;
            match config.strategy {
                RenderStrategy::Rasterize => {
                    let ocr = backends.require_ocr()?;
                    rasterize_and_recognize(doc, pdf, ocr, config)
                }
                RenderStrategy::DirectText => Ok(TextOutcome::Text(direct_text(doc, pdf, config))),
                RenderStrategy::Auto => {
                    let ocr = backends.require_ocr()?;
                    let pages = read_text_layer(doc, pdf, config).unwrap_or_default();
                    let has_text = pages
                        .iter()
                        .any(|page| matches!(page, Ok(text) if !text.trim().is_empty()));
                    if has_text {
                        let cb = config.progress_callback.as_ref();
                        return Ok(TextOutcome::Text(report_text_layer(pages, pdf, cb)));
                    }
                    info!("No text layer in {}; falling back to OCR", doc.display_name());
                    rasterize_and_recognize(doc, pdf, ocr, config)
                }
            }
        }
    }
}

/// Collapse a run result into the record to print and the exit status.
pub fn settle(
    config: &ExtractionConfig,
    source: Option<String>,
    result: Result<OutputRecord, OcrJsonError>,
) -> (OutputRecord, u8) {
    match result {
        Ok(record) => (record, 0),
        Err(e) => {
            warn!("{}", e);
            (emit::failure_record(config.shape, source, &e), e.exit_code())
        }
    }
}

// ── Stages ───────────────────────────────────────────────────────────────

fn recognize_image(doc: &InputDocument, ocr: &dyn OcrBackend, config: &ExtractionConfig) -> TextOutcome {
    let cb = config.progress_callback.as_ref();
    if let Some(cb) = cb {
        cb.on_document_start(1);
        cb.on_page_start(1, 1);
    }

    let result = recognize::decode_image(doc).and_then(|image| {
        ocr.recognize(&PageImage {
            page_num: 1,
            total_pages: 1,
            image,
            dpi: None,
        })
    });

    match result {
        Ok(text) => {
            debug!("{} recognised {} chars from image", ocr.name(), text.len());
            notify_done(cb, 1, text.len());
            TextOutcome::Text(text)
        }
        Err(e) => {
            notify_failed(cb, 1, 1, &e.to_string());
            notify_complete(cb, 1, 0);
            TextOutcome::Failed(e)
        }
    }
}

fn rasterize_and_recognize(
    doc: &InputDocument,
    pdf: &dyn PdfBackend,
    ocr: &dyn OcrBackend,
    config: &ExtractionConfig,
) -> Result<TextOutcome, OcrJsonError> {
    let cb = config.progress_callback.as_ref();
    let opts = RasterOptions::from(config);
    let mut texts: Vec<String> = Vec::new();
    let mut failure: Option<RecognitionError> = None;
    let mut total_pages = 0;

    let rendered = pdf.rasterize(doc, &opts, &mut |page: PageImage| {
        if total_pages == 0 {
            total_pages = page.total_pages;
            if let Some(cb) = cb {
                cb.on_document_start(total_pages);
            }
        }
        if let Some(cb) = cb {
            cb.on_page_start(page.page_num, page.total_pages);
        }

        match ocr.recognize(&page) {
            Ok(text) => {
                debug!("Page {}: {} chars", page.page_num, text.len());
                if let Some(cb) = cb {
                    cb.on_page_complete(page.page_num, page.total_pages, text.len());
                }
                texts.push(text);
                ControlFlow::Continue(())
            }
            Err(e) => {
                notify_failed(cb, page.page_num, page.total_pages, &e.to_string());
                failure = Some(e);
                ControlFlow::Break(())
            }
        }
    });

    match rendered {
        Ok(()) => {}
        Err(RenderError::Open(detail)) => {
            return Err(OcrJsonError::DocumentOpen {
                source_name: doc.display_name(),
                detail,
            });
        }
        Err(RenderError::Page { page, detail }) => {
            let total = total_pages.max(page);
            notify_failed(cb, page, total, &detail);
            failure = Some(RecognitionError::Render { page, detail });
        }
    }

    notify_complete(cb, total_pages, texts.len());
    info!(
        "Recognised {} of {} pages with {}",
        texts.len(),
        total_pages,
        ocr.name()
    );

    Ok(match failure {
        Some(e) => TextOutcome::Failed(e),
        None => TextOutcome::Text(texts.join("\n")),
    })
}

/// Text-layer extraction. Never fails: an unopenable document yields `""`
/// and an unreadable page contributes `""`.
fn direct_text(doc: &InputDocument, pdf: &dyn PdfBackend, config: &ExtractionConfig) -> String {
    match read_text_layer(doc, pdf, config) {
        Some(pages) => report_text_layer(pages, pdf, config.progress_callback.as_ref()),
        None => String::new(),
    }
}

/// Read every page's text layer without reporting progress.
fn read_text_layer(
    doc: &InputDocument,
    pdf: &dyn PdfBackend,
    config: &ExtractionConfig,
) -> Option<Vec<PageText>> {
    match pdf.extract_text(doc, config.password.as_deref()) {
        Ok(pages) => Some(pages),
        Err(e) => {
            warn!("Cannot read text layer of {}: {}", doc.display_name(), e);
            None
        }
    }
}

/// Join page texts, replacing unreadable pages with `""`, and report each
/// page to `cb`.
fn report_text_layer(
    pages: Vec<PageText>,
    pdf: &dyn PdfBackend,
    cb: Option<&ProgressCallback>,
) -> String {
    let total_pages = pages.len();
    if let Some(cb) = cb {
        cb.on_document_start(total_pages);
    }

    let mut succeeded = 0;
    let mut texts = Vec::with_capacity(total_pages);
    for (idx, page) in pages.into_iter().enumerate() {
        let page_num = idx + 1;
        if let Some(cb) = cb {
            cb.on_page_start(page_num, total_pages);
        }
        match page {
            Ok(text) => {
                if let Some(cb) = cb {
                    cb.on_page_complete(page_num, total_pages, text.len());
                }
                succeeded += 1;
                texts.push(text);
            }
            Err(e) => {
                warn!("Page {} text unavailable: {}", page_num, e);
                notify_failed(cb, page_num, total_pages, &e.to_string());
                texts.push(String::new());
            }
        }
    }

    notify_complete(cb, total_pages, succeeded);
    debug!("{} read {} pages of text", pdf.name(), total_pages);
    texts.join("\n")
}

// ── Progress helpers ─────────────────────────────────────────────────────

fn notify_done(cb: Option<&ProgressCallback>, total: usize, text_len: usize) {
    if let Some(cb) = cb {
        cb.on_page_complete(1, total, text_len);
        cb.on_document_complete(total, 1);
    }
}

fn notify_failed(cb: Option<&ProgressCallback>, page: usize, total: usize, error: &str) {
    if let Some(cb) = cb {
        cb.on_page_error(page, total, error);
    }
}

fn notify_complete(cb: Option<&ProgressCallback>, total: usize, succeeded: usize) {
    if let Some(cb) = cb {
        cb.on_document_complete(total, succeeded);
    }
}
