//! Output types: the JSON record written to stdout and the receipt fields
//! merged into it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The single JSON object emitted per run.
///
/// Serialises as one flat object: the text keys first, then (optionally)
/// the [`ExtractedRecord`] keys, then `error` on fatal-failure records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRecord {
    #[serde(flatten)]
    pub text: TextField,

    #[serde(flatten)]
    pub fields: Option<ExtractedRecord>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The text-bearing keys of an [`OutputRecord`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TextField {
    /// `{"text": …}`
    Bare { text: Option<String> },
    /// `{"source": …, "ocr_text": …}`
    WithSource {
        source: Option<String>,
        ocr_text: Option<String>,
    },
}

impl TextField {
    pub fn text(&self) -> Option<&str> {
        match self {
            TextField::Bare { text } => text.as_deref(),
            TextField::WithSource { ocr_text, .. } => ocr_text.as_deref(),
        }
    }
}

/// Heuristic receipt summary derived from recognised text.
///
/// Every field is computed independently; nothing ties them together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExtractedRecord {
    /// First valid ISO or US-style date in the text, as `YYYY-MM-DD`.
    pub date: Option<NaiveDate>,
    /// First number in the text, commas stripped.
    pub amount: Option<f64>,
    /// First non-blank line.
    pub source: Option<String>,
    pub category: Option<Category>,
    /// Non-blank lines after the first, newline-joined.
    pub notes: String,
    #[serde(rename = "Type")]
    pub kind: RecordKind,
}

/// Spending categories, in detection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Food,
    Transport,
    Utilities,
    Salary,
    Entertainment,
    Other,
}

impl Category {
    /// All categories, highest priority first.
    pub const ALL: [Category; 6] = [
        Category::Food,
        Category::Transport,
        Category::Utilities,
        Category::Salary,
        Category::Entertainment,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Food => "food",
            Category::Transport => "transport",
            Category::Utilities => "utilities",
            Category::Salary => "salary",
            Category::Entertainment => "entertainment",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record type. Only expenses are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    #[default]
    Expense,
}
