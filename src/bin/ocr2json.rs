//! CLI binary for ocr2json.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig`, resolves the input and prints exactly one JSON line.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use ocr2json::pipeline::emit::write_record;
use ocr2json::{
    process_document, resolve_input, settle, ExtractionConfig, ExtractionProgressCallback,
    FailurePolicy, InputDocument, OutputShape, ProgressCallback, RenderStrategy,
};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// Terminal progress callback: a live bar on stderr plus one line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start of the page currently being processed.
    page_started: Mutex<Option<Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner only; the bar length is set by `on_document_start`.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening document…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            page_started: Mutex::new(None),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Recognising");
    }

    /// Remove the spinner if no document lifecycle ever finished it.
    fn clear(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }

    fn page_elapsed_secs(&self) -> f64 {
        self.page_started
            .lock()
            .ok()
            .and_then(|mut started| started.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_document_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut started) = self.page_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, text_len: usize) {
        let elapsed = self.page_elapsed_secs();
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{text_len:>5} chars")),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let elapsed = self.page_elapsed_secs();
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Keep long engine messages on one line.
        let msg: String = if error.chars().count() > 80 {
            let head: String = error.chars().take(79).collect();
            format!("{head}\u{2026}")
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_document_complete(&self, total_pages: usize, success_count: usize) {
        self.bar.finish_and_clear();
        if self.errors.load(Ordering::SeqCst) == 0 {
            eprintln!(
                "{} {} pages recognised",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages recognised",
                red("✘"),
                bold(&success_count.to_string()),
                total_pages
            );
        }
    }
}

impl Drop for CliProgressCallback {
    fn drop(&mut self) {
        self.clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # OCR a receipt photo, with extracted fields (default)
  ocr2json receipt.jpg

  # Scanned PDF from stdin
  cat scan.pdf | ocr2json

  # Read the text layer of a digital PDF, no OCR
  ocr2json --strategy direct-text --shape text invoice.pdf

  # Blank text instead of "OCR failed: …" on recognition errors
  ocr2json --on-ocr-failure empty photo.png

OUTPUT:
  Exactly one JSON line on stdout. Logs and progress go to stderr.
  Exit status 1 when an engine is missing, a rasterised PDF cannot be
  opened, or no input was given.

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Path to an existing libpdfium
  TESSDATA_PREFIX   Tesseract trained-data directory
  RUST_LOG          Log filter (overrides -v / -q)
"#;

/// Extract text from a PDF or image with OCR and print it as JSON.
#[derive(Parser, Debug)]
#[command(
    name = "ocr2json",
    version,
    about = "Extract text from a PDF or image with OCR and print it as JSON",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF or image path. Omit (or pass `-`) to read the document from stdin.
    input: Option<PathBuf>,

    /// How PDF pages become text.
    #[arg(long, env = "OCR2JSON_STRATEGY", value_enum, default_value = "rasterize")]
    strategy: StrategyArg,

    /// Text emitted when recognition fails.
    #[arg(long, env = "OCR2JSON_ON_OCR_FAILURE", value_enum, default_value = "descriptive")]
    on_ocr_failure: FailureArg,

    /// Keys of the emitted JSON object.
    #[arg(long, env = "OCR2JSON_SHAPE", value_enum, default_value = "fields")]
    shape: ShapeArg,

    /// Cut the JSON line to its first 1000 characters (output is usually invalid JSON).
    #[arg(long, env = "OCR2JSON_TRUNCATE_OUTPUT")]
    truncate_output: bool,

    /// Rasterisation DPI (72–600).
    #[arg(long, env = "OCR2JSON_DPI", default_value_t = ocr2json::config::DEFAULT_DPI,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Longest rendered page edge in pixels.
    #[arg(long, env = "OCR2JSON_MAX_PIXELS", default_value_t = 10_000)]
    max_pixels: u32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "OCR2JSON_PASSWORD")]
    password: Option<String>,

    /// OCR language(s), e.g. eng or eng+deu.
    #[arg(long, env = "OCR2JSON_LANG", default_value = "eng")]
    lang: String,

    /// Tesseract trained-data directory.
    #[arg(long, env = "OCR2JSON_TESSDATA")]
    tessdata: Option<PathBuf>,

    /// Path to the PDFium shared library.
    #[arg(long, env = "OCR2JSON_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,

    /// Show a per-page progress bar on stderr.
    #[arg(long, env = "OCR2JSON_PROGRESS")]
    progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "OCR2JSON_VERBOSE")]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long, env = "OCR2JSON_QUIET", conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum StrategyArg {
    Rasterize,
    DirectText,
    Auto,
}

impl From<StrategyArg> for RenderStrategy {
    fn from(v: StrategyArg) -> Self {
        match v {
            StrategyArg::Rasterize => RenderStrategy::Rasterize,
            StrategyArg::DirectText => RenderStrategy::DirectText,
            StrategyArg::Auto => RenderStrategy::Auto,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FailureArg {
    Descriptive,
    Empty,
}

impl From<FailureArg> for FailurePolicy {
    fn from(v: FailureArg) -> Self {
        match v {
            FailureArg::Descriptive => FailurePolicy::Descriptive,
            FailureArg::Empty => FailurePolicy::Empty,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ShapeArg {
    Text,
    Source,
    Fields,
}

impl From<ShapeArg> for OutputShape {
    fn from(v: ShapeArg) -> Self {
        match v {
            ShapeArg::Text => OutputShape::Text,
            ShapeArg::Source => OutputShape::Source,
            ShapeArg::Fields => OutputShape::Fields,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // stderr only: stdout carries nothing but the JSON line.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match run(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{} {:#}", red("error:"), e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> Result<u8> {
    let bar = cli.progress.then(CliProgressCallback::new_dynamic);
    let progress = bar.clone().map(|cb| cb as ProgressCallback);
    let config = build_config(cli, progress).context("Invalid configuration")?;

    // ── Resolve input ────────────────────────────────────────────────────
    let stdin = io::stdin();
    let stdin_is_terminal = stdin.is_terminal();
    let input = resolve_input(cli.input.as_deref(), &mut stdin.lock(), stdin_is_terminal);
    let source = input.as_ref().ok().and_then(InputDocument::identifier);

    // ── Extract ──────────────────────────────────────────────────────────
    let result = input.and_then(|doc| process_document(&doc, &config));
    let (record, code) = settle(&config, source, result);
    if let Some(ref bar) = bar {
        bar.clear();
    }

    // ── Emit ─────────────────────────────────────────────────────────────
    let mut out = io::stdout().lock();
    write_record(&mut out, &record, config.truncate_output)
        .context("Failed to write JSON to stdout")?;

    Ok(code)
}

fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .strategy(cli.strategy.into())
        .on_failure(cli.on_ocr_failure.into())
        .shape(cli.shape.into())
        .truncate_output(cli.truncate_output)
        .dpi(cli.dpi)
        .max_rendered_pixels(cli.max_pixels)
        .language(cli.lang.clone());

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(ref dir) = cli.tessdata {
        builder = builder.tessdata_dir(dir.clone());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library(lib.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spinner_is_cleared_when_no_document_completes() {
        let cb = CliProgressCallback::new_dynamic();
        assert!(!cb.bar.is_finished());
        cb.clear();
        assert!(cb.bar.is_finished());
    }

    #[test]
    fn clear_after_document_complete_is_harmless() {
        let cb = CliProgressCallback::new_dynamic();
        cb.on_document_start(1);
        cb.on_page_start(1, 1);
        cb.on_page_complete(1, 1, 3);
        cb.on_document_complete(1, 1);
        assert!(cb.bar.is_finished());
        cb.clear();
        assert!(cb.bar.is_finished());
    }

    #[test]
    fn cli_flags_map_to_config() {
        let cli = Cli::parse_from(["ocr2json", "--strategy", "auto", "--shape", "text", "a.pdf"]);
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.strategy, RenderStrategy::Auto);
        assert_eq!(config.shape, OutputShape::Text);
        assert!(config.progress_callback.is_none());
    }
}
