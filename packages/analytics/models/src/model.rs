//! Classifier evaluation and importance types.

use serde::{Deserialize, Serialize};

/// Binary confusion counts on the held-out split. Positive = violent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfusionMatrix {
    pub true_positive: u64,
    pub false_positive: u64,
    pub true_negative: u64,
    pub false_negative: u64,
}

impl ConfusionMatrix {
    /// Adds one prediction.
    pub const fn record(&mut self, predicted: bool, actual: bool) {
        match (predicted, actual) {
            (true, true) => self.true_positive += 1,
            (true, false) => self.false_positive += 1,
            (false, false) => self.true_negative += 1,
            (false, true) => self.false_negative += 1,
        }
    }

    #[must_use]
    pub const fn total(&self) -> u64 {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }
}

/// Held-out evaluation of a trained classifier. Ratios whose
/// denominator is zero are reported as 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub confusion: ConfusionMatrix,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Normalized importance of one feature. Importances of a model sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Violence prediction for one scored record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub probability: f64,
    pub is_violent: bool,
}

/// Serializable view of a trained model: what it learned and how it
/// scored on the held-out rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSummary {
    pub n_trees: usize,
    /// Highest first.
    pub feature_importances: Vec<FeatureImportance>,
    pub metrics: EvaluationMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confusion_counts() {
        let mut confusion = ConfusionMatrix::default();
        confusion.record(true, true);
        confusion.record(true, false);
        confusion.record(false, true);
        confusion.record(false, false);
        confusion.record(false, false);
        assert_eq!(confusion.true_negative, 2);
        assert_eq!(confusion.total(), 5);
    }
}
