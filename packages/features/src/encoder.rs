//! Label encoding of categorical features into a numeric matrix.
//!
//! An [`EncoderState`] is fit once per run and then only read. Unseen
//! categories encode as [`UNKNOWN_CODE`] and are reported, never fatal.

use std::collections::BTreeMap;

use crime_analysis_crime_models::{CrimeRecord, NormalizedIncident};
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::column::{FeatureColumn, FeatureKind, FeatureSet};

/// Code reserved for categories not seen when the encoder was fit.
pub const UNKNOWN_CODE: u32 = 0;

/// Label used for absent categorical values.
pub const MISSING_LABEL: &str = "Unknown";

/// Sorted label table for one categorical column. Codes start at 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEncoding {
    labels: Vec<String>,
}

impl CategoryEncoding {
    fn fit<'a>(labels: impl Iterator<Item = &'a str>) -> Self {
        let mut labels: Vec<String> = labels.map(str::to_string).collect();
        labels.sort_unstable();
        labels.dedup();
        Self { labels }
    }

    /// Code for `label`, `None` if unseen.
    #[must_use]
    pub fn code(&self, label: &str) -> Option<u32> {
        self.labels
            .binary_search_by(|l| l.as_str().cmp(label))
            .ok()
            .and_then(|i| u32::try_from(i + 1).ok())
    }

    /// Label for `code`; [`UNKNOWN_CODE`] has none.
    #[must_use]
    pub fn label(&self, code: u32) -> Option<&str> {
        let index = usize::try_from(code).ok()?.checked_sub(1)?;
        self.labels.get(index).map(String::as_str)
    }

    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// One unseen category met while encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnknownCategoryFallback {
    pub column: FeatureColumn,
    pub label: String,
    pub occurrences: u64,
}

/// Non-fatal events recorded during a transform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodingReport {
    /// Unseen labels per column, with occurrence counts.
    pub unknown_categories: BTreeMap<FeatureColumn, BTreeMap<String, u64>>,
    /// Numeric cells filled with the fitted median, per column.
    pub numeric_filled: BTreeMap<FeatureColumn, u64>,
}

impl EncodingReport {
    /// Flattened list of fallbacks, ordered by column then label.
    #[must_use]
    pub fn fallbacks(&self) -> Vec<UnknownCategoryFallback> {
        self.unknown_categories
            .iter()
            .flat_map(|(column, labels)| {
                labels.iter().map(|(label, count)| UnknownCategoryFallback {
                    column: *column,
                    label: label.clone(),
                    occurrences: *count,
                })
            })
            .collect()
    }

    #[must_use]
    pub fn total_fallbacks(&self) -> u64 {
        self.unknown_categories
            .values()
            .flat_map(BTreeMap::values)
            .sum()
    }

    pub fn log_summary(&self) {
        for (column, labels) in &self.unknown_categories {
            let total: u64 = labels.values().sum();
            log::warn!(
                "{total} value(s) in {column} used the unknown-category code ({} distinct)",
                labels.len()
            );
        }
    }
}

/// Rows x features matrix plus the aligned target vector.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFeatureMatrix {
    pub columns: Vec<FeatureColumn>,
    pub data: Array2<f64>,
    pub targets: Vec<bool>,
}

impl EncodedFeatureMatrix {
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.data.nrows()
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.data.ncols()
    }

    #[must_use]
    pub fn row(&self, index: usize) -> ArrayView1<'_, f64> {
        self.data.row(index)
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(ToString::to_string).collect()
    }
}

/// Fitted encoder: category tables and numeric fill values for a fixed
/// feature list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncoderState {
    columns: Vec<FeatureColumn>,
    categories: BTreeMap<FeatureColumn, CategoryEncoding>,
    numeric_fills: BTreeMap<FeatureColumn, f64>,
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some(f64::midpoint(values[mid - 1], values[mid]))
    }
}

impl EncoderState {
    /// Fits label tables and numeric medians on `records`.
    ///
    /// Absent categorical values are fit as the [`MISSING_LABEL`] category.
    /// A numeric column with no observations fills with 0.0.
    #[must_use]
    pub fn fit(features: &FeatureSet, records: &[CrimeRecord]) -> Self {
        let mut categories = BTreeMap::new();
        let mut numeric_fills = BTreeMap::new();

        for &column in features.columns() {
            match column.kind() {
                FeatureKind::Categorical => {
                    let labels: Vec<String> = records
                        .iter()
                        .map(|r| {
                            column
                                .category_label(r.incident())
                                .unwrap_or_else(|| MISSING_LABEL.to_string())
                        })
                        .collect();
                    let encoding = CategoryEncoding::fit(labels.iter().map(String::as_str));
                    log::debug!("Fit {} categories for {column}", encoding.len());
                    categories.insert(column, encoding);
                }
                FeatureKind::Numeric => {
                    let mut observed: Vec<f64> = records
                        .iter()
                        .filter_map(|r| column.numeric_value(r.incident()))
                        .collect();
                    let fill = median(&mut observed).unwrap_or_else(|| {
                        log::warn!("No observed values for {column}; filling with 0");
                        0.0
                    });
                    numeric_fills.insert(column, fill);
                }
            }
        }

        Self {
            columns: features.columns().to_vec(),
            categories,
            numeric_fills,
        }
    }

    #[must_use]
    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    #[must_use]
    pub fn encoding(&self, column: FeatureColumn) -> Option<&CategoryEncoding> {
        self.categories.get(&column)
    }

    #[must_use]
    pub fn numeric_fill(&self, column: FeatureColumn) -> Option<f64> {
        self.numeric_fills.get(&column).copied()
    }

    /// Encodes one incident into a feature row, recording fallbacks.
    pub fn encode_row(&self, incident: &NormalizedIncident, report: &mut EncodingReport) -> Vec<f64> {
        self.columns
            .iter()
            .map(|&column| match column.kind() {
                FeatureKind::Numeric => column.numeric_value(incident).unwrap_or_else(|| {
                    *report.numeric_filled.entry(column).or_insert(0) += 1;
                    self.numeric_fill(column).unwrap_or(0.0)
                }),
                FeatureKind::Categorical => {
                    let label = column
                        .category_label(incident)
                        .unwrap_or_else(|| MISSING_LABEL.to_string());
                    let code = self.encoding(column).and_then(|e| e.code(&label));
                    f64::from(code.unwrap_or_else(|| {
                        *report
                            .unknown_categories
                            .entry(column)
                            .or_default()
                            .entry(label)
                            .or_insert(0) += 1;
                        UNKNOWN_CODE
                    }))
                }
            })
            .collect()
    }

    /// Encodes `records` into a feature matrix aligned with their labels.
    #[must_use]
    pub fn transform(&self, records: &[CrimeRecord]) -> (EncodedFeatureMatrix, EncodingReport) {
        let mut report = EncodingReport::default();
        let mut data = Array2::zeros((records.len(), self.columns.len()));

        for (i, record) in records.iter().enumerate() {
            let row = self.encode_row(record.incident(), &mut report);
            for (j, value) in row.into_iter().enumerate() {
                data[[i, j]] = value;
            }
        }

        report.log_summary();

        let matrix = EncodedFeatureMatrix {
            columns: self.columns.clone(),
            data,
            targets: records.iter().map(CrimeRecord::is_violent).collect(),
        };
        (matrix, report)
    }
}
