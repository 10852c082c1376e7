//! Field extraction: derive an [`ExtractedRecord`] from recognised text.
//!
//! Each field is an independent, position-sensitive heuristic over the
//! original (untrimmed) text:
//!
//! 1. **Source**: first non-blank line
//! 2. **Notes**: the remaining non-blank lines, newline-joined
//! 3. **Date**: first `YYYY-MM-DD` or `M/D/YYYY` match, normalised to ISO
//! 4. **Amount**: first number, optional `$` and thousands commas
//! 5. **Category**: first category word (by priority, not position) present
//!
//! The amount pattern is unanchored and picks up the first number anywhere,
//! years and phone numbers included.

use crate::output::{Category, ExtractedRecord, RecordKind};
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

/// Extract all fields. Pure function of `text`.
pub fn extract_fields(text: &str) -> ExtractedRecord {
    let lines = non_blank_lines(text);
    let (source, notes) = match lines.split_first() {
        Some((first, rest)) => (Some(first.to_string()), rest.join("\n")),
        None => (None, String::new()),
    };

    ExtractedRecord {
        date: extract_date(text),
        amount: extract_amount(text),
        source,
        category: extract_category(text),
        notes,
        kind: RecordKind::Expense,
    }
}

// ── Lines ────────────────────────────────────────────────────────────────────

/// Universal-newline boundaries (the set `str::lines` does not cover).
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

fn non_blank_lines(text: &str) -> Vec<&str> {
    text.split(is_line_break)
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect()
}

// ── Date ─────────────────────────────────────────────────────────────────────

static RE_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4}-\d{2}-\d{2})|(\d{1,2}/\d{1,2}/\d{4})").unwrap());

/// Only the leftmost match is considered; an invalid calendar date there
/// means no date, even if a valid one appears later. Years start at 1.
fn extract_date(text: &str) -> Option<NaiveDate> {
    let raw = RE_DATE.find(text)?.as_str();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .ok()
        .filter(|d| d.year() >= 1)
}

// ── Amount ───────────────────────────────────────────────────────────────────

static RE_AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$?\s*([\d,]+(?:\.\d{1,2})?)").unwrap());

fn extract_amount(text: &str) -> Option<f64> {
    let caps = RE_AMOUNT.captures(text)?;
    let digits = caps.get(1)?.as_str().replace(',', "");
    digits.parse::<f64>().ok().filter(|v| v.is_finite())
}

// ── Category ─────────────────────────────────────────────────────────────────

static RE_CATEGORIES: Lazy<Vec<(Category, Regex)>> = Lazy::new(|| {
    Category::ALL
        .iter()
        .map(|&cat| {
            let re = Regex::new(&format!(r"(?i)\b{}\b", cat.as_str())).unwrap();
            (cat, re)
        })
        .collect()
});

fn extract_category(text: &str) -> Option<Category> {
    RE_CATEGORIES
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(cat, _)| *cat)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    // ── Source / Notes ──

    #[test]
    fn source_is_first_non_blank_line() {
        let r = extract_fields("\n\n   Corner Deli  \n\n item one \n");
        assert_eq!(r.source.as_deref(), Some("Corner Deli"));
        assert_eq!(r.notes, "item one");
    }

    #[test]
    fn single_line_has_empty_notes() {
        let r = extract_fields("Just one line");
        assert_eq!(r.source.as_deref(), Some("Just one line"));
        assert_eq!(r.notes, "");
    }

    #[test]
    fn blank_text_has_no_source() {
        let r = extract_fields(" \n\t\n ");
        assert_eq!(r.source, None);
        assert_eq!(r.notes, "");
    }

    #[test]
    fn form_feed_and_crlf_split_lines() {
        let r = extract_fields("Page one\r\nTotal\x0cPage two\n\x0c");
        assert_eq!(r.source.as_deref(), Some("Page one"));
        assert_eq!(r.notes, "Total\nPage two");
    }

    // ── Date ──

    #[test]
    fn iso_date_kept() {
        assert_eq!(extract_date("Paid 2024-05-01 thanks"), ymd(2024, 5, 1));
    }

    #[test]
    fn us_date_normalised() {
        assert_eq!(extract_date("on 3/4/2024"), ymd(2024, 3, 4));
        assert_eq!(extract_date("12/31/1999"), ymd(1999, 12, 31));
    }

    #[test]
    fn leftmost_date_wins() {
        assert_eq!(extract_date("1/2/2023 then 2024-05-01"), ymd(2023, 1, 2));
    }

    #[test]
    fn invalid_first_date_is_absent() {
        assert_eq!(extract_date("2024-13-45 and later 2024-01-01"), None);
        assert_eq!(extract_date("31/12/2024"), None);
    }

    #[test]
    fn year_zero_is_not_a_date() {
        assert_eq!(extract_date("0000-01-01"), None);
        assert_eq!(extract_date("1/1/0000"), None);
        assert_eq!(extract_date("0001-01-01"), ymd(1, 1, 1));
    }

    #[test]
    fn no_date() {
        assert_eq!(extract_date("no dates here 24-5-1"), None);
    }

    // ── Amount ──

    #[test]
    fn dollar_amount_with_commas() {
        assert_eq!(extract_amount("Total: $1,234.56"), Some(1234.56));
    }

    #[test]
    fn bare_number() {
        assert_eq!(extract_amount("qty 3"), Some(3.0));
    }

    #[test]
    fn first_number_even_inside_date() {
        assert_eq!(extract_amount("2024-05-01 $9.99"), Some(2024.0));
    }

    #[test]
    fn lone_comma_is_absent() {
        assert_eq!(extract_amount("Hello, world"), None);
    }

    #[test]
    fn one_fraction_digit() {
        assert_eq!(extract_amount("$7.5"), Some(7.5));
    }

    #[test]
    fn overflowing_amount_is_absent() {
        assert_eq!(extract_amount(&"9".repeat(400)), None);
        assert_eq!(extract_fields(&format!("Shop\n${}", "9".repeat(400))).amount, None);
    }

    #[test]
    fn no_amount() {
        assert_eq!(extract_amount("nothing numeric"), None);
    }

    // ── Category ──

    #[test]
    fn category_priority_beats_position() {
        assert_eq!(
            extract_category("Entertainment and food"),
            Some(Category::Food)
        );
    }

    #[test]
    fn category_case_insensitive() {
        assert_eq!(extract_category("Monthly SALARY deposit"), Some(Category::Salary));
    }

    #[test]
    fn category_needs_whole_word() {
        assert_eq!(extract_category("seafood transportation"), None);
        assert_eq!(extract_category("other stuff"), Some(Category::Other));
    }

    #[test]
    fn type_is_always_expense() {
        assert_eq!(extract_fields("Salary 5000").kind, RecordKind::Expense);
    }
}
