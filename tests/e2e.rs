//! End-to-end tests against the real engines.
//!
//! These need a PDFium shared library (and, for the OCR tests, a build with
//! `--features tesseract` plus installed `eng` trained data). They are gated
//! behind the `E2E_ENABLED` environment variable so they do not run in CI
//! unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=./libpdfium.so cargo test --test e2e -- --nocapture
//!
//! With OCR:
//!   E2E_ENABLED=1 cargo test --features tesseract --test e2e -- --nocapture

use ocr2json::pipeline::emit::to_json_line;
use ocr2json::{
    process, Backends, ExtractionConfig, InputDocument, OutputShape, PdfBackend, PdfiumBackend,
    RenderStrategy,
};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Mutex;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// PDFium library init/teardown is process-global; tests take turns.
static PDFIUM_LOCK: Mutex<()> = Mutex::new(());

/// Skip this test unless E2E_ENABLED is set and PDFium can be bound.
/// Evaluates to `(guard, backend)`; keep the guard alive for the test.
macro_rules! e2e_pdfium_or_skip {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        init_tracing();
        let guard = PDFIUM_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        match PdfiumBackend::bind(None) {
            Ok(backend) => (guard, backend),
            Err(e) => {
                println!("SKIP: {e}");
                return;
            }
        }
    }};
}

/// Route library logs through the test harness; `RUST_LOG=debug` to see them.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A one-page PDF with `lines` set in Helvetica, one per text line.
fn text_pdf(lines: &[&str]) -> Vec<u8> {
    let mut content = String::from("BT /F1 14 Tf 72 720 Td 18 TL\n");
    for line in lines {
        let escaped = line
            .replace('\\', "\\\\")
            .replace('(', "\\(")
            .replace(')', "\\)");
        content.push_str(&format!("({escaped}) Tj T*\n"));
    }
    content.push_str("ET");

    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R \
         /Resources << /Font << /F1 5 0 R >> >> >>"
            .to_string(),
        format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (idx, obj) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", idx + 1, obj).as_bytes());
    }

    let xref_at = pdf.len();
    pdf.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for off in offsets {
        pdf.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
    }
    pdf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_at
        )
        .as_bytes(),
    );
    pdf
}

fn write_temp_pdf(dir: &tempfile::TempDir, name: &str, lines: &[&str]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, text_pdf(lines)).expect("write test pdf");
    path
}

const RECEIPT: &[&str] = &["Coffee Shop", "Lunch with team $12.50", "food"];

// ── PDFium ───────────────────────────────────────────────────────────────────

#[test]
fn test_direct_text_from_file() {
    let (_guard, pdfium) = e2e_pdfium_or_skip!();
    let dir = tempfile::tempdir().unwrap();
    let path = write_temp_pdf(&dir, "receipt.pdf", RECEIPT);

    let config = ExtractionConfig::builder()
        .strategy(RenderStrategy::DirectText)
        .build()
        .unwrap();
    let backends = Backends::new().with_pdf(pdfium);
    let record = process(&InputDocument::from_path(&path), &config, &backends).unwrap();
    let v: Value = serde_json::from_str(&to_json_line(&record, false).unwrap()).unwrap();

    println!("{v}");
    assert_eq!(v["source"], path.to_str().unwrap());
    assert!(v["ocr_text"].as_str().unwrap().contains("Lunch with team"));
    assert_eq!(v["Source"], "Coffee Shop");
    assert_eq!(v["Amount"], 12.5);
    assert_eq!(v["Category"], "food");
}

#[test]
fn test_direct_text_from_memory() {
    let (_guard, pdfium) = e2e_pdfium_or_skip!();
    let doc = InputDocument::from_bytes(text_pdf(&["Hello from stdin"]));

    let config = ExtractionConfig::builder()
        .strategy(RenderStrategy::DirectText)
        .shape(OutputShape::Text)
        .build()
        .unwrap();
    let backends = Backends::new().with_pdf(pdfium);
    let record = process(&doc, &config, &backends).unwrap();
    let v: Value = serde_json::from_str(&to_json_line(&record, false).unwrap()).unwrap();
    assert_eq!(v["text"].as_str().unwrap().trim(), "Hello from stdin");
}

#[test]
fn test_rasterize_renders_every_page() {
    let (_guard, pdfium) = e2e_pdfium_or_skip!();
    let doc = InputDocument::from_bytes(text_pdf(RECEIPT));
    let opts = ocr2json::RasterOptions {
        dpi: 72,
        max_pixels: 10_000,
        password: None,
    };

    let mut sizes = Vec::new();
    pdfium
        .rasterize(&doc, &opts, &mut |page: ocr2json::PageImage| {
            sizes.push((page.page_num, page.image.width(), page.image.height()));
            std::ops::ControlFlow::Continue(())
        })
        .unwrap();
    assert_eq!(sizes, vec![(1, 612, 792)]);
}

#[test]
fn test_rasterize_corrupt_pdf_fails_to_open() {
    let (_guard, pdfium) = e2e_pdfium_or_skip!();
    let doc = InputDocument::from_bytes(b"%PDF-1.4\nthis is not a pdf".to_vec());
    let backends = Backends::new()
        .with_pdf(pdfium)
        .with_ocr(ocr2json::MockRecognizer::new("unused"));
    let err = process(&doc, &ExtractionConfig::default(), &backends).unwrap_err();
    assert!(matches!(err, ocr2json::OcrJsonError::DocumentOpen { .. }), "got {err:?}");
}

#[cfg(feature = "cli")]
#[test]
fn test_cli_direct_text() {
    let (_guard, _pdfium) = e2e_pdfium_or_skip!();
    let dir = tempfile::tempdir().unwrap();
    let path = write_temp_pdf(&dir, "cli.pdf", RECEIPT);

    let out = std::process::Command::new(env!("CARGO_BIN_EXE_ocr2json"))
        .args(["--strategy", "direct-text"])
        .arg(&path)
        .output()
        .expect("run ocr2json");
    assert_eq!(out.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let v: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["Source"], "Coffee Shop");
}

// ── Tesseract ────────────────────────────────────────────────────────────────

#[cfg(feature = "tesseract")]
#[test]
fn test_rasterize_and_ocr_receipt() {
    let (_guard, pdfium) = e2e_pdfium_or_skip!();
    let config = ExtractionConfig::default();
    let ocr = match ocr2json::pipeline::recognize::load_ocr_backend(&config) {
        Ok(ocr) => ocr,
        Err(e) => {
            println!("SKIP: {e}");
            return;
        }
    };

    let backends = Backends {
        pdf: Some(Box::new(pdfium)),
        ocr: Some(ocr),
    };
    let doc = InputDocument::from_bytes(text_pdf(RECEIPT));
    let record = process(&doc, &config, &backends).unwrap();
    let v: Value = serde_json::from_str(&to_json_line(&record, false).unwrap()).unwrap();

    println!("{v}");
    let text = v["ocr_text"].as_str().unwrap();
    assert!(!text.starts_with("OCR failed"), "got {text}");
    assert!(text.contains("Coffee"), "got {text}");
    assert_eq!(v["Source"], "Coffee Shop");
}
