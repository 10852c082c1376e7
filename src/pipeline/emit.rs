//! Emission: build [`OutputRecord`]s and write them as one JSON line.
//!
//! Normal records come from [`build_record`]; fatal conditions get a record
//! from [`failure_record`] so stdout always carries exactly one JSON object,
//! never a bare error message.

use crate::config::{OutputShape, TRUNCATE_CHARS};
use crate::error::OcrJsonError;
use crate::output::{OutputRecord, TextField};
use crate::pipeline::fields::extract_fields;
use std::io::Write;

/// Text carried by the record printed when no input was given.
pub const MISSING_INPUT_TEXT: &str = "No file path provided";

/// Build the record for a completed run.
///
/// Field extraction (for [`OutputShape::Fields`]) runs over `text` as emitted,
/// so a descriptive failure string is itself mined for fields.
pub fn build_record(shape: OutputShape, source: Option<String>, text: String) -> OutputRecord {
    let fields = match shape {
        OutputShape::Fields => Some(extract_fields(&text)),
        OutputShape::Text | OutputShape::Source => None,
    };
    OutputRecord {
        text: text_field(shape, source, Some(text)),
        fields,
        error: None,
    }
}

/// Build the record describing a fatal failure.
///
/// * dependency missing → the message takes the place of the text
/// * document open failure → null text plus an `error` key
/// * missing input → null source and [`MISSING_INPUT_TEXT`] as the text
/// * anything else → null text plus an `error` key
pub fn failure_record(shape: OutputShape, source: Option<String>, err: &OcrJsonError) -> OutputRecord {
    match err {
        OcrJsonError::DependencyMissing { .. } => OutputRecord {
            text: text_field(shape, source, Some(format!("Missing dependency: {err}"))),
            fields: None,
            error: None,
        },
        OcrJsonError::MissingInput => OutputRecord {
            text: text_field(shape, None, Some(MISSING_INPUT_TEXT.to_string())),
            fields: None,
            error: None,
        },
        other => OutputRecord {
            text: text_field(shape, source, None),
            fields: None,
            error: Some(other.to_string()),
        },
    }
}

fn text_field(shape: OutputShape, source: Option<String>, text: Option<String>) -> TextField {
    match shape {
        OutputShape::Text => TextField::Bare { text },
        OutputShape::Source | OutputShape::Fields => TextField::WithSource {
            source,
            ocr_text: text,
        },
    }
}

/// Serialise `record` as compact JSON, optionally cut to the first
/// [`TRUNCATE_CHARS`] characters (which usually breaks the JSON).
pub fn to_json_line(record: &OutputRecord, truncate: bool) -> Result<String, OcrJsonError> {
    let json = serde_json::to_string(record)?;
    if truncate {
        Ok(json.chars().take(TRUNCATE_CHARS).collect())
    } else {
        Ok(json)
    }
}

/// Write `record` followed by a newline and flush.
pub fn write_record(
    out: &mut dyn Write,
    record: &OutputRecord,
    truncate: bool,
) -> Result<(), OcrJsonError> {
    let line = to_json_line(record, truncate)?;
    out.write_all(line.as_bytes())?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_shape_has_only_text() {
        let r = build_record(OutputShape::Text, Some("a.png".into()), "hello".into());
        assert_eq!(to_json_line(&r, false).unwrap(), r#"{"text":"hello"}"#);
    }

    #[test]
    fn source_shape() {
        let r = build_record(OutputShape::Source, Some("a.png".into()), "hello".into());
        assert_eq!(
            to_json_line(&r, false).unwrap(),
            r#"{"source":"a.png","ocr_text":"hello"}"#
        );
    }

    #[test]
    fn fields_shape_merges_extracted_keys() {
        let r = build_record(OutputShape::Fields, None, "Shop\n$5.00".into());
        let v: serde_json::Value = serde_json::from_str(&to_json_line(&r, false).unwrap()).unwrap();
        assert_eq!(v["source"], serde_json::Value::Null);
        assert_eq!(v["ocr_text"], "Shop\n$5.00");
        assert_eq!(v["Source"], "Shop");
        assert_eq!(v["Amount"], 5.0);
        assert_eq!(v["Type"], "expense");
    }

    #[test]
    fn dependency_failure_carries_message_as_text() {
        let err = OcrJsonError::missing("Tesseract", "not installed");
        let r = failure_record(OutputShape::Fields, Some("r.jpg".into()), &err);
        assert_eq!(
            to_json_line(&r, false).unwrap(),
            r#"{"source":"r.jpg","ocr_text":"Missing dependency: Tesseract: not installed"}"#
        );
    }

    #[test]
    fn open_failure_has_error_key() {
        let err = OcrJsonError::DocumentOpen {
            source_name: "x.pdf".into(),
            detail: "FormatError".into(),
        };
        let r = failure_record(OutputShape::Source, Some("x.pdf".into()), &err);
        let v: serde_json::Value = serde_json::from_str(&to_json_line(&r, false).unwrap()).unwrap();
        assert_eq!(v["source"], "x.pdf");
        assert!(v["ocr_text"].is_null());
        assert!(v["error"].as_str().unwrap().contains("FormatError"));
    }

    #[test]
    fn missing_input_has_null_source_and_message() {
        let r = failure_record(OutputShape::Fields, Some("ignored".into()), &OcrJsonError::MissingInput);
        assert_eq!(
            to_json_line(&r, false).unwrap(),
            r#"{"source":null,"ocr_text":"No file path provided"}"#
        );
        let r = failure_record(OutputShape::Text, None, &OcrJsonError::MissingInput);
        assert_eq!(to_json_line(&r, false).unwrap(), r#"{"text":"No file path provided"}"#);
    }

    #[test]
    fn truncation_counts_characters() {
        let long = "é".repeat(2000);
        let r = build_record(OutputShape::Text, None, long);
        let line = to_json_line(&r, true).unwrap();
        assert_eq!(line.chars().count(), TRUNCATE_CHARS);
        assert!(line.starts_with(r#"{"text":"éé"#));
        assert!(serde_json::from_str::<serde_json::Value>(&line).is_err());
    }

    #[test]
    fn truncation_cuts_compact_json() {
        let r = build_record(OutputShape::Source, None, "x".repeat(2000));
        let line = to_json_line(&r, true).unwrap();
        assert!(line.starts_with(r#"{"source":null,"ocr_text":"xxx"#));
        assert_eq!(line.len(), TRUNCATE_CHARS);
    }

    #[test]
    fn short_output_unaffected_by_truncation() {
        let r = build_record(OutputShape::Text, None, "short".into());
        assert_eq!(to_json_line(&r, true).unwrap(), r#"{"text":"short"}"#);
    }

    #[test]
    fn write_record_appends_newline() {
        let r = build_record(OutputShape::Text, None, "x".into());
        let mut buf = Vec::new();
        write_record(&mut buf, &r, false).unwrap();
        assert_eq!(buf, b"{\"text\":\"x\"}\n");
    }
}
