//! Configuration types for a single extraction run.
//!
//! All pipeline behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. The four output variants this tool
//! supports (OCR with field extraction, OCR with source, bare text, PDF text
//! layer) are not separate code paths: they are combinations of
//! [`RenderStrategy`], [`FailurePolicy`], [`OutputShape`] and
//! `truncate_output` on this one struct.

use crate::error::OcrJsonError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default rasterisation density.
pub const DEFAULT_DPI: u32 = 300;

/// Number of characters kept by [`ExtractionConfig::truncate_output`].
pub const TRUNCATE_CHARS: usize = 1000;

/// Configuration for one extraction run.
///
/// # Example
/// ```rust
/// use ocr2json::{ExtractionConfig, OutputShape, RenderStrategy};
///
/// let config = ExtractionConfig::builder()
///     .strategy(RenderStrategy::DirectText)
///     .shape(OutputShape::Text)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 300);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// How PDF pages become text. Default: [`RenderStrategy::Rasterize`].
    pub strategy: RenderStrategy,

    /// What a recognition failure looks like in the output. Default: [`FailurePolicy::Descriptive`].
    pub on_failure: FailurePolicy,

    /// Which keys the emitted JSON object carries. Default: [`OutputShape::Fields`].
    pub shape: OutputShape,

    /// Cut the serialised JSON line to its first 1000 characters. Default: false.
    ///
    /// The cut applies to this tool's compact JSON, so the result is usually
    /// not valid JSON. Only enable this for consumers that expect a capped line.
    pub truncate_output: bool,

    /// Rasterisation DPI. Range: 72–600. Default: 300.
    pub dpi: u32,

    /// Maximum rendered edge length in pixels. Default: 10000.
    ///
    /// Caps memory for oversized pages (posters, engineering drawings)
    /// independently of DPI.
    pub max_rendered_pixels: u32,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// OCR language, in Tesseract notation (`eng`, `eng+deu`). Default: `eng`.
    pub language: String,

    /// Directory holding the OCR engine's trained data. If None, the engine's
    /// own lookup (`TESSDATA_PREFIX`, install prefix) applies.
    pub tessdata_dir: Option<PathBuf>,

    /// Explicit path to the PDFium shared library. If None, `PDFIUM_LIB_PATH`,
    /// the current directory and the system library path are tried in turn.
    pub pdfium_library: Option<PathBuf>,

    /// Per-page progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            strategy: RenderStrategy::default(),
            on_failure: FailurePolicy::default(),
            shape: OutputShape::default(),
            truncate_output: false,
            dpi: DEFAULT_DPI,
            max_rendered_pixels: 10_000,
            password: None,
            language: "eng".to_string(),
            tessdata_dir: None,
            pdfium_library: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("strategy", &self.strategy)
            .field("on_failure", &self.on_failure)
            .field("shape", &self.shape)
            .field("truncate_output", &self.truncate_output)
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("language", &self.language)
            .field("tessdata_dir", &self.tessdata_dir)
            .field("pdfium_library", &self.pdfium_library)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Whether this run needs the OCR engine for a PDF input.
    pub fn pdf_needs_ocr(&self) -> bool {
        !matches!(self.strategy, RenderStrategy::DirectText)
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn strategy(mut self, strategy: RenderStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    pub fn on_failure(mut self, policy: FailurePolicy) -> Self {
        self.config.on_failure = policy;
        self
    }

    pub fn shape(mut self, shape: OutputShape) -> Self {
        self.config.shape = shape;
        self
    }

    pub fn truncate_output(mut self, v: bool) -> Self {
        self.config.truncate_output = v;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn language(mut self, lang: impl Into<String>) -> Self {
        self.config.language = lang.into();
        self
    }

    pub fn tessdata_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.tessdata_dir = Some(dir.into());
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, OcrJsonError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(OcrJsonError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        let lang = c.language.trim();
        if lang.is_empty() {
            return Err(OcrJsonError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        if lang.contains(char::is_whitespace) {
            return Err(OcrJsonError::InvalidConfig(format!(
                "OCR language must not contain whitespace, got '{lang}'"
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How a PDF document is turned into page text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStrategy {
    /// Rasterise every page and OCR the bitmaps. (default)
    #[default]
    Rasterize,
    /// Read the embedded text layer; no OCR.
    DirectText,
    /// Read the text layer, and rasterise + OCR when it is blank.
    Auto,
}

/// What the emitted text field holds when recognition fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// `"OCR failed: <reason>"`. (default)
    #[default]
    Descriptive,
    /// An empty string.
    Empty,
}

/// Key set of the emitted JSON object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputShape {
    /// `{"text": …}`
    Text,
    /// `{"source": …, "ocr_text": …}`
    Source,
    /// `{"source": …, "ocr_text": …}` plus the extracted receipt fields. (default)
    #[default]
    Fields,
}
