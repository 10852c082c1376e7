//! Input resolution: turn the command-line argument or the stdin stream into
//! an [`InputDocument`] tagged with its [`DocumentKind`].
//!
//! A path is classified by its suffix alone (`.pdf`, any case, is a PDF;
//! everything else is an image). The file is not touched here: a missing or
//! unreadable file surfaces later, in the stage that opens it. Raw stdin
//! bytes are classified by the `%PDF` signature.

use crate::error::OcrJsonError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// PDF files start with this signature.
pub const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Detected document type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Image,
}

/// Where the document bytes live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// A path given on the command line.
    File(PathBuf),
    /// The whole document, read from stdin.
    Memory(Vec<u8>),
}

/// The resolved input. Immutable for the rest of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDocument {
    source: DocumentSource,
    kind: DocumentKind,
}

impl InputDocument {
    /// Classify a path by its filename suffix.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let kind = if has_pdf_suffix(&path) {
            DocumentKind::Pdf
        } else {
            DocumentKind::Image
        };
        Self {
            source: DocumentSource::File(path),
            kind,
        }
    }

    /// Classify an in-memory buffer by its leading bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let kind = if bytes.starts_with(PDF_MAGIC) {
            DocumentKind::Pdf
        } else {
            DocumentKind::Image
        };
        Self {
            source: DocumentSource::Memory(bytes),
            kind,
        }
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn source(&self) -> &DocumentSource {
        &self.source
    }

    /// Identifier written to the `source` output key: the path as given,
    /// or `None` for stdin input.
    pub fn identifier(&self) -> Option<String> {
        match &self.source {
            DocumentSource::File(p) => Some(p.to_string_lossy().into_owned()),
            DocumentSource::Memory(_) => None,
        }
    }

    /// Human-readable name for log lines and error messages.
    pub fn display_name(&self) -> String {
        self.identifier().unwrap_or_else(|| "<stdin>".to_string())
    }
}

fn has_pdf_suffix(path: &Path) -> bool {
    path.to_string_lossy().to_lowercase().ends_with(".pdf")
}

/// Resolve the run's input.
///
/// * `arg`: the positional argument; `None` or `-` selects stdin.
/// * `stdin`: the stream to read when no path is given.
/// * `stdin_is_terminal`: an interactive terminal is never read, so the
///   tool does not block waiting for keyboard input.
///
/// Returns [`OcrJsonError::MissingInput`] when there is no path and stdin is
/// a terminal or empty.
pub fn resolve_input(
    arg: Option<&Path>,
    stdin: &mut dyn Read,
    stdin_is_terminal: bool,
) -> Result<InputDocument, OcrJsonError> {
    if let Some(path) = arg.filter(|p| p.as_os_str() != "-") {
        let doc = InputDocument::from_path(path);
        debug!("Resolved file input: {} ({:?})", path.display(), doc.kind());
        return Ok(doc);
    }

    if stdin_is_terminal {
        return Err(OcrJsonError::MissingInput);
    }

    let mut bytes = Vec::new();
    stdin.read_to_end(&mut bytes)?;
    if bytes.is_empty() {
        return Err(OcrJsonError::MissingInput);
    }

    let doc = InputDocument::from_bytes(bytes);
    debug!("Resolved stdin input ({:?})", doc.kind());
    Ok(doc)
}
