//! Sparse precision matrix result types.

use serde::{Deserialize, Serialize};

/// Why a candidate feature was left out of the precision matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ExclusionReason {
    /// Fewer non-null observations than the admission threshold.
    #[serde(rename_all = "camelCase")]
    InsufficientNonNull { count: usize, threshold: usize },
    /// Constant across the complete-case rows, so it cannot be
    /// standardized.
    ZeroVariance,
}

impl std::fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientNonNull { count, threshold } => {
                write!(f, "insufficient non-null count: {count} < {threshold}")
            }
            Self::ZeroVariance => write!(f, "zero variance among complete cases"),
        }
    }
}

/// A candidate feature that did not pass admission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExcludedFeature {
    pub name: String,
    pub reason: ExclusionReason,
}

/// A conditional dependency between two admitted features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialCorrelationEdge {
    pub feature_a: String,
    pub feature_b: String,
    /// Precision entry for the pair.
    pub precision: f64,
    /// `-precision / sqrt(theta_aa * theta_bb)`.
    pub partial_correlation: f64,
}

/// Sparse inverse covariance over the admitted numeric features.
///
/// `matrix` and `correlation` are square, indexed by `features`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrecisionMatrixResult {
    /// Admitted feature names, in matrix order.
    pub features: Vec<String>,
    pub matrix: Vec<Vec<f64>>,
    /// Pearson correlation of the standardized complete cases.
    pub correlation: Vec<Vec<f64>>,
    pub excluded: Vec<ExcludedFeature>,
    /// Non-zero off-diagonal entries, strongest partial correlation first.
    pub edges: Vec<PartialCorrelationEdge>,
    pub alpha: f64,
    /// Outer iterations until convergence.
    pub iterations: usize,
    /// Rows with every admitted feature present.
    pub complete_rows: usize,
}

impl PrecisionMatrixResult {
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.features.len()
    }

    /// Entry for a pair of feature names.
    #[must_use]
    pub fn entry(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.features.iter().position(|f| f == a)?;
        let j = self.features.iter().position(|f| f == b)?;
        self.matrix.get(i)?.get(j).copied()
    }

    /// Whether `matrix` equals its transpose within `tolerance`.
    #[must_use]
    pub fn is_symmetric(&self, tolerance: f64) -> bool {
        let n = self.matrix.len();
        self.matrix.iter().all(|row| row.len() == n)
            && (0..n).all(|i| (0..i).all(|j| (self.matrix[i][j] - self.matrix[j][i]).abs() <= tolerance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusion_reason_message() {
        let reason = ExclusionReason::InsufficientNonNull {
            count: 800,
            threshold: 1000,
        };
        assert_eq!(reason.to_string(), "insufficient non-null count: 800 < 1000");
    }

    #[test]
    fn looks_up_entries_by_name() {
        let result = PrecisionMatrixResult {
            features: vec!["hour".to_string(), "victim_age".to_string()],
            matrix: vec![vec![1.5, -0.2], vec![-0.2, 1.1]],
            correlation: vec![vec![1.0, 0.1], vec![0.1, 1.0]],
            excluded: Vec::new(),
            edges: Vec::new(),
            alpha: 0.01,
            iterations: 3,
            complete_rows: 10,
        };
        assert_eq!(result.entry("victim_age", "hour"), Some(-0.2));
        assert_eq!(result.entry("hour", "month"), None);
        assert!(result.is_symmetric(1e-12));
        assert_eq!(result.dimension(), 2);
    }
}
