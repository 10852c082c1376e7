//! Text recognition: the OCR capability and image decoding.
//!
//! [`OcrBackend`] is the seam between the pipeline and the OCR engine. The
//! Tesseract implementation links system libraries, so it lives behind the
//! `tesseract` feature; without it [`load_ocr_backend`] reports the engine
//! as a missing dependency. [`MockRecognizer`] is always available for
//! exercising the pipeline without an engine installed.

use crate::config::ExtractionConfig;
use crate::error::{OcrJsonError, RecognitionError};
use crate::pipeline::input::{DocumentSource, InputDocument};
use crate::pipeline::render::PageImage;
use image::DynamicImage;
use tracing::debug;

/// Abstraction over an OCR engine.
pub trait OcrBackend {
    /// Short engine name for logs.
    fn name(&self) -> &'static str;

    /// Recognise the text in one bitmap.
    fn recognize(&self, page: &PageImage) -> Result<String, RecognitionError>;
}

/// Acquire the OCR engine selected by `config`.
pub fn load_ocr_backend(config: &ExtractionConfig) -> Result<Box<dyn OcrBackend>, OcrJsonError> {
    #[cfg(feature = "tesseract")]
    {
        let backend = tesseract_backend::TesseractRecognizer::new(
            config.tessdata_dir.as_deref(),
            &config.language,
        )?;
        Ok(Box::new(backend))
    }

    #[cfg(not(feature = "tesseract"))]
    {
        let _ = config;
        Err(OcrJsonError::missing(
            "Tesseract",
            "OCR engine not compiled in; rebuild with `--features tesseract`",
        ))
    }
}

/// Decode an image input into a bitmap.
pub fn decode_image(doc: &InputDocument) -> Result<DynamicImage, RecognitionError> {
    let decoded = match doc.source() {
        DocumentSource::File(path) => image::ImageReader::open(path)
            .map_err(|e| RecognitionError::Decode(format!("{}: {}", path.display(), e)))?
            .with_guessed_format()
            .map_err(|e| RecognitionError::Decode(format!("{}: {}", path.display(), e)))?
            .decode(),
        DocumentSource::Memory(bytes) => image::load_from_memory(bytes),
    };

    let image = decoded.map_err(|e| RecognitionError::Decode(e.to_string()))?;
    debug!(
        "Decoded {} → {}x{} px",
        doc.display_name(),
        image.width(),
        image.height()
    );
    Ok(image)
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns pre-set text for every page, in order; the last entry repeats.
/// Useful for exercising the pipeline without Tesseract installed.
pub struct MockRecognizer {
    pages: Vec<String>,
    calls: std::cell::Cell<usize>,
}

impl MockRecognizer {
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_pages([text])
    }

    pub fn with_pages<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pages: pages.into_iter().map(Into::into).collect(),
            calls: std::cell::Cell::new(0),
        }
    }

    /// Number of bitmaps recognised so far.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl OcrBackend for MockRecognizer {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn recognize(&self, _page: &PageImage) -> Result<String, RecognitionError> {
        let n = self.calls.get();
        self.calls.set(n + 1);
        Ok(self
            .pages
            .get(n)
            .or_else(|| self.pages.last())
            .cloned()
            .unwrap_or_default())
    }
}

// ── Tesseract backend (optional, gated behind `tesseract` feature) ─────────────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::OcrBackend;
    use crate::error::{OcrJsonError, RecognitionError};
    use crate::pipeline::encode::encode_png;
    use crate::pipeline::render::PageImage;
    use leptess::LepTess;
    use std::path::Path;
    use tracing::debug;

    pub struct TesseractRecognizer {
        data_path: Option<String>,
        lang: String,
    }

    impl TesseractRecognizer {
        /// Probe the engine once so a missing install or language pack is
        /// reported before any page is processed.
        pub fn new(data_path: Option<&Path>, lang: &str) -> Result<Self, OcrJsonError> {
            let data_path = match data_path {
                Some(p) => Some(
                    p.to_str()
                        .ok_or_else(|| {
                            OcrJsonError::InvalidConfig(format!(
                                "tessdata path is not valid UTF-8: {}",
                                p.display()
                            ))
                        })?
                        .to_string(),
                ),
                None => None,
            };

            LepTess::new(data_path.as_deref(), lang).map_err(|e| {
                OcrJsonError::missing("Tesseract", format!("cannot initialise '{lang}': {e}"))
            })?;

            Ok(Self {
                data_path,
                lang: lang.to_string(),
            })
        }
    }

    impl OcrBackend for TesseractRecognizer {
        fn name(&self) -> &'static str {
            "tesseract"
        }

        fn recognize(&self, page: &PageImage) -> Result<String, RecognitionError> {
            let png = encode_png(&page.image).map_err(|e| RecognitionError::Engine(e.to_string()))?;

            let mut lt = LepTess::new(self.data_path.as_deref(), &self.lang)
                .map_err(|e| RecognitionError::Engine(e.to_string()))?;
            lt.set_image_from_mem(&png)
                .map_err(|e| RecognitionError::Decode(e.to_string()))?;
            if let Some(dpi) = page.dpi {
                lt.set_source_resolution(dpi as i32);
            }
            let text = lt
                .get_utf8_text()
                .map_err(|e| RecognitionError::Engine(e.to_string()))?;

            debug!("Recognised page {} → {} chars", page.page_num, text.len());
            Ok(text)
        }
    }
}
