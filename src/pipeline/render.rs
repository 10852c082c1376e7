//! PDF rendering: rasterise pages to `DynamicImage`, or read the embedded
//! text layer, via pdfium.
//!
//! The stage is expressed as the [`PdfBackend`] trait so the pipeline can be
//! driven by a deterministic backend in tests; [`PdfiumBackend`] is the real
//! implementation.
//!
//! Rasterised pages are handed to a visitor one at a time, in document
//! order, and dropped after the visitor returns. The visitor can stop the
//! walk early (the Recognizer does so on the first OCR failure). Document
//! handles are scoped to a single call and released on every exit path.

use crate::config::ExtractionConfig;
use crate::error::OcrJsonError;
use crate::pipeline::input::{DocumentSource, InputDocument};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// PDF user-space units per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// One rendered page (or the sole image of an image input).
pub struct PageImage {
    /// 1-indexed page number.
    pub page_num: usize,
    pub total_pages: usize,
    pub image: DynamicImage,
    /// Density the bitmap was rendered at; `None` for decoded image files.
    pub dpi: Option<u32>,
}

/// Rasterisation parameters, taken from [`ExtractionConfig`].
#[derive(Debug, Clone)]
pub struct RasterOptions {
    pub dpi: u32,
    pub max_pixels: u32,
    pub password: Option<String>,
}

impl From<&ExtractionConfig> for RasterOptions {
    fn from(config: &ExtractionConfig) -> Self {
        Self {
            dpi: config.dpi,
            max_pixels: config.max_rendered_pixels,
            password: config.password.clone(),
        }
    }
}

impl RasterOptions {
    /// Page scale factor that yields `dpi` pixels per inch.
    pub fn scale(&self) -> f32 {
        self.dpi as f32 / POINTS_PER_INCH
    }
}

/// Renderer failures. Which of these are fatal is decided by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The document could not be opened or parsed.
    #[error("{0}")]
    Open(String),

    /// A single page could not be loaded, rendered or read.
    #[error("page {page}: {detail}")]
    Page { page: usize, detail: String },
}

/// Text of one page from the embedded text layer.
pub type PageText = Result<String, RenderError>;

/// PDF rendering capability consumed by the pipeline.
pub trait PdfBackend {
    /// Short engine name for logs and dependency errors.
    fn name(&self) -> &'static str;

    /// Rasterise every page in order, passing each bitmap to `visit`.
    ///
    /// Returns `Err(RenderError::Open)` if the document cannot be opened and
    /// `Err(RenderError::Page)` for the first page that fails to render;
    /// later pages are not attempted.
    fn rasterize(
        &self,
        doc: &InputDocument,
        opts: &RasterOptions,
        visit: &mut dyn FnMut(PageImage) -> ControlFlow<()>,
    ) -> Result<(), RenderError>;

    /// Read the embedded text layer, one entry per page in order.
    fn extract_text(
        &self,
        doc: &InputDocument,
        password: Option<&str>,
    ) -> Result<Vec<PageText>, RenderError>;
}

// ── pdfium implementation ────────────────────────────────────────────────

/// [`PdfBackend`] backed by the PDFium shared library.
pub struct PdfiumBackend {
    pdfium: Pdfium,
}

impl PdfiumBackend {
    /// Bind to PDFium.
    ///
    /// Resolution order:
    /// 1. `explicit` (from `--pdfium-lib`); no fallback when it fails to bind.
    /// 2. `PDFIUM_LIB_PATH`, when it points at an existing file.
    /// 3. The platform library name in the current directory.
    /// 4. The system library search path.
    pub fn bind(explicit: Option<&Path>) -> Result<Self, OcrJsonError> {
        if let Some(path) = explicit {
            let bindings = Pdfium::bind_to_library(path).map_err(|e| {
                OcrJsonError::missing(
                    "PDFium",
                    format!("cannot load '{}': {:?}", path.display(), e),
                )
            })?;
            info!("Bound PDFium from {}", path.display());
            return Ok(Self {
                pdfium: Pdfium::new(bindings),
            });
        }

        let mut attempts: Vec<String> = Vec::new();

        if let Ok(env_path) = std::env::var("PDFIUM_LIB_PATH") {
            let p = PathBuf::from(env_path);
            if p.exists() {
                match Pdfium::bind_to_library(&p) {
                    Ok(bindings) => {
                        info!("Bound PDFium from PDFIUM_LIB_PATH={}", p.display());
                        return Ok(Self {
                            pdfium: Pdfium::new(bindings),
                        });
                    }
                    Err(e) => attempts.push(format!("{}: {:?}", p.display(), e)),
                }
            } else {
                warn!("PDFIUM_LIB_PATH '{}' not found; trying defaults", p.display());
            }
        }

        let local = Pdfium::pdfium_platform_library_name_at_path("./");
        match Pdfium::bind_to_library(&local) {
            Ok(bindings) => {
                debug!("Bound PDFium from working directory");
                return Ok(Self {
                    pdfium: Pdfium::new(bindings),
                });
            }
            Err(e) => attempts.push(format!("./: {:?}", e)),
        }

        match Pdfium::bind_to_system_library() {
            Ok(bindings) => {
                debug!("Bound system PDFium library");
                Ok(Self {
                    pdfium: Pdfium::new(bindings),
                })
            }
            Err(e) => {
                attempts.push(format!("system: {:?}", e));
                Err(OcrJsonError::missing(
                    "PDFium",
                    format!(
                        "library not found ({}). Set PDFIUM_LIB_PATH or pass --pdfium-lib.",
                        attempts.join("; ")
                    ),
                ))
            }
        }
    }

    fn load<'a>(
        &'a self,
        doc: &'a InputDocument,
        password: Option<&'a str>,
    ) -> Result<PdfDocument<'a>, RenderError> {
        let loaded = match doc.source() {
            DocumentSource::File(path) => self.pdfium.load_pdf_from_file(path, password),
            DocumentSource::Memory(bytes) => self.pdfium.load_pdf_from_byte_slice(bytes, password),
        };
        loaded.map_err(|e| RenderError::Open(format!("{:?}", e)))
    }
}

impl PdfBackend for PdfiumBackend {
    fn name(&self) -> &'static str {
        "pdfium"
    }

    fn rasterize(
        &self,
        doc: &InputDocument,
        opts: &RasterOptions,
        visit: &mut dyn FnMut(PageImage) -> ControlFlow<()>,
    ) -> Result<(), RenderError> {
        let document = self.load(doc, opts.password.as_deref())?;
        let pages = document.pages();
        let total_pages = pages.len() as usize;
        info!("PDF loaded: {} pages", total_pages);

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(opts.scale())
            .set_maximum_width(opts.max_pixels as i32)
            .set_maximum_height(opts.max_pixels as i32);

        for (idx, page) in pages.iter().enumerate() {
            let page_num = idx + 1;
            let bitmap = page
                .render_with_config(&render_config)
                .map_err(|e| RenderError::Page {
                    page: page_num,
                    detail: format!("{:?}", e),
                })?;

            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                page_num,
                image.width(),
                image.height()
            );

            let flow = visit(PageImage {
                page_num,
                total_pages,
                image,
                dpi: Some(opts.dpi),
            });
            if flow.is_break() {
                debug!("Rasterisation stopped after page {}", page_num);
                break;
            }
        }

        Ok(())
    }

    fn extract_text(
        &self,
        doc: &InputDocument,
        password: Option<&str>,
    ) -> Result<Vec<PageText>, RenderError> {
        let document = self.load(doc, password)?;
        let pages = document.pages();
        info!("PDF loaded: {} pages (text layer)", pages.len());

        let texts: Vec<PageText> = pages
            .iter()
            .enumerate()
            .map(|(idx, page)| {
                page.text()
                    .map(|text| text.all())
                    .map_err(|e| RenderError::Page {
                        page: idx + 1,
                        detail: format!("{:?}", e),
                    })
            })
            .collect();

        Ok(texts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raster_options_from_config() {
        let config = ExtractionConfig::builder()
            .dpi(150)
            .max_rendered_pixels(4000)
            .password("pw")
            .build()
            .unwrap();
        let opts = RasterOptions::from(&config);
        assert_eq!(opts.dpi, 150);
        assert_eq!(opts.max_pixels, 4000);
        assert_eq!(opts.password.as_deref(), Some("pw"));
    }

    #[test]
    fn scale_matches_dpi() {
        let opts = RasterOptions {
            dpi: 300,
            max_pixels: 10_000,
            password: None,
        };
        assert!((opts.scale() - 300.0 / 72.0).abs() < f32::EPSILON);
    }

    #[test]
    fn explicit_bogus_library_is_missing_dependency() {
        let err = PdfiumBackend::bind(Some(Path::new("/definitely/not/libpdfium.so")))
            .err()
            .expect("binding a nonexistent library must fail");
        match err {
            OcrJsonError::DependencyMissing { dependency, detail } => {
                assert_eq!(dependency, "PDFium");
                assert!(detail.contains("/definitely/not/libpdfium.so"), "got: {detail}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn render_error_display() {
        assert_eq!(RenderError::Open("FormatError".into()).to_string(), "FormatError");
        assert_eq!(
            RenderError::Page {
                page: 2,
                detail: "oom".into()
            }
            .to_string(),
            "page 2: oom"
        );
    }
}
