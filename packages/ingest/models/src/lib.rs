#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Raw tabular record types and normalization diagnostics.
//!
//! A [`RawTable`] is what the upload layer hands to the normalizer; an
//! [`IngestDiagnostics`] is what comes back alongside the cleaned records so
//! every dropped row, imputed value, and unparseable field is accounted for.

use std::collections::BTreeMap;

use crime_analysis_crime_models::InputColumn;
use serde::{Deserialize, Serialize};

/// An untyped cell value as ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum RawValue {
    /// Blank or whitespace-only cell.
    Empty,
    Text(String),
    Number(f64),
}

impl RawValue {
    /// Classifies a cell read from a delimited text source.
    #[must_use]
    pub fn from_cell(cell: &str) -> Self {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            Self::Empty
        } else {
            Self::Text(trimmed.to_string())
        }
    }

    /// Returns the value as text, or `None` if empty.
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Empty => None,
            Self::Text(s) => Some(s.clone()),
            Self::Number(n) => Some(n.to_string()),
        }
    }

    /// Returns `true` for [`RawValue::Empty`].
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// One incident row as ingested: a mapping from column header to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub fields: BTreeMap<String, RawValue>,
}

impl RawRecord {
    /// Builds a record from `(header, value)` pairs.
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, RawValue)>,
        K: Into<String>,
    {
        Self {
            fields: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Returns the raw value stored under `column`.
    #[must_use]
    pub fn get(&self, column: InputColumn) -> Option<&RawValue> {
        self.fields.get(column.as_ref())
    }

    /// Returns the non-empty text of `column`, if any.
    #[must_use]
    pub fn text(&self, column: InputColumn) -> Option<String> {
        self.get(column).and_then(RawValue::as_text)
    }
}

/// A header row plus the records read under it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRecord>,
}

/// Raised when the input header does not satisfy the expected schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaError {
    /// Required columns (or feature source columns) not found.
    pub missing: Vec<String>,
    /// Columns present in the input that the schema does not know about.
    pub unexpected: Vec<String>,
    /// Short description of what was being validated.
    pub context: String,
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::with_capacity(2);
        if !self.missing.is_empty() {
            parts.push(format!("missing columns [{}]", self.missing.join(", ")));
        }
        if !self.unexpected.is_empty() {
            parts.push(format!("unexpected columns [{}]", self.unexpected.join(", ")));
        }
        write!(f, "{}: {}", self.context, parts.join("; "))
    }
}

impl std::error::Error for SchemaError {}

/// Why a single field of a single row could not be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParseFailureKind {
    /// Neither the day-first date formats nor ISO dates matched.
    Date,
    /// Both the timestamp parse and the separator-split fallback failed.
    Time,
    /// Not a finite non-negative integer.
    Integer,
    /// Not a recognised yes/no value.
    Boolean,
    /// Not a recognised category code.
    Category,
}

/// A per-row, per-field parse failure. Recorded, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseFailure {
    /// Zero-based source row index.
    pub row: usize,
    pub column: InputColumn,
    pub kind: ParseFailureKind,
    /// The offending raw text.
    pub raw: String,
}

/// Why a row was excluded from the normalized output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DropReason {
    /// The crime-domain field, required for the violence label, was blank.
    MissingCrimeDomain,
}

/// Per-column counters for one normalization run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDiagnostics {
    /// Cells that were blank in the source.
    pub missing: u64,
    /// Cells whose text could not be parsed.
    pub parse_failures: u64,
    /// Cells filled by the imputation policy.
    pub imputed: u64,
    /// Cells left empty because no imputation applies or none was possible.
    pub left_empty: u64,
}

/// Audit trail returned with every batch of normalized records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestDiagnostics {
    pub rows_in: u64,
    pub rows_out: u64,
    pub dropped: BTreeMap<DropReason, u64>,
    pub fields: BTreeMap<InputColumn, FieldDiagnostics>,
    /// Hours recovered by the separator-split fallback after the timestamp
    /// parse failed.
    pub hour_fallbacks: u64,
    /// Fill values used per imputed column (rendered as text).
    pub imputation_values: BTreeMap<InputColumn, String>,
    /// Input columns not part of the known schema.
    pub unexpected_columns: Vec<String>,
    pub parse_failures: Vec<ParseFailure>,
}

impl IngestDiagnostics {
    /// Total rows excluded for any reason.
    #[must_use]
    pub fn rows_dropped(&self) -> u64 {
        self.dropped.values().sum()
    }

    /// Mutable counters for `column`, created on first use.
    pub fn field_mut(&mut self, column: InputColumn) -> &mut FieldDiagnostics {
        self.fields.entry(column).or_default()
    }

    /// Counters for `column`, zeroed if the column was never touched.
    #[must_use]
    pub fn field(&self, column: InputColumn) -> FieldDiagnostics {
        self.fields.get(&column).copied().unwrap_or_default()
    }

    /// Records a parse failure and bumps the column counter.
    pub fn record_parse_failure(&mut self, failure: ParseFailure) {
        self.field_mut(failure.column).parse_failures += 1;
        self.parse_failures.push(failure);
    }

    /// Records a dropped row.
    pub fn record_drop(&mut self, reason: DropReason) {
        *self.dropped.entry(reason).or_insert(0) += 1;
    }
}
