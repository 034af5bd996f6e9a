//! Sparse precision matrix estimation.
//!
//! Candidate numeric features pass an admission gate (minimum non-null
//! count, then non-zero variance), are standardized over the rows where
//! every admitted feature is present, and go through a graphical lasso:
//! block coordinate descent on the covariance estimate `W`, solving one
//! L1-penalized regression per column until the mean absolute change of
//! the off-diagonal entries falls below the tolerance.

use crime_analysis_analytics_models::{
    AnalysisConfig, ExcludedFeature, ExclusionReason, PartialCorrelationEdge,
    PrecisionMatrixResult,
};
use crime_analysis_features::NumericFeatureTable;
use ndarray::{Array1, Array2};
use thiserror::Error;

/// Fewest admitted features for which a precision matrix is meaningful.
pub const MIN_ADMITTED_FEATURES: usize = 2;

/// Inner coordinate-descent sweeps per column regression.
const MAX_INNER_SWEEPS: usize = 1000;

/// Precision entries with smaller magnitude are treated as zero.
const EDGE_EPSILON: f64 = 1e-8;

const VARIANCE_EPSILON: f64 = 1e-12;

/// Errors that can occur while estimating a precision matrix.
#[derive(Debug, Error)]
pub enum PrecisionError {
    /// Too few features passed admission.
    #[error(
        "Insufficient features: {admitted} admitted, at least {required} required ({} excluded)",
        .excluded.len()
    )]
    InsufficientFeatures {
        /// Features that passed admission.
        admitted: usize,
        /// Minimum needed.
        required: usize,
        /// Every excluded feature and why.
        excluded: Vec<ExcludedFeature>,
    },

    /// The estimator could not produce a valid matrix.
    #[error("Precision estimation failed: {reason}")]
    EstimationFailure {
        /// What went wrong.
        reason: String,
    },
}

/// Parameters of one estimation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrecisionOptions {
    pub min_nonnull: usize,
    pub alpha: f64,
    pub max_iter: usize,
    pub tol: f64,
}

impl From<&AnalysisConfig> for PrecisionOptions {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            min_nonnull: config.min_nonnull_for_precision,
            alpha: config.graphical_lasso_alpha,
            max_iter: config.graphical_lasso_max_iter,
            tol: config.graphical_lasso_tol,
        }
    }
}

impl Default for PrecisionOptions {
    fn default() -> Self {
        Self::from(&AnalysisConfig::default())
    }
}

/// Output of [`graphical_lasso`].
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicalLassoFit {
    pub precision: Array2<f64>,
    pub covariance: Array2<f64>,
    pub iterations: usize,
}

fn failure(reason: impl Into<String>) -> PrecisionError {
    PrecisionError::EstimationFailure {
        reason: reason.into(),
    }
}

const fn soft_threshold(x: f64, lambda: f64) -> f64 {
    if x > lambda {
        x - lambda
    } else if x < -lambda {
        x + lambda
    } else {
        0.0
    }
}

/// Indices `0..p` without `j`.
fn others(p: usize, j: usize) -> Vec<usize> {
    (0..p).filter(|&k| k != j).collect()
}

/// Solves `min_b 1/2 b'W11 b - s12'b + alpha |b|_1` by coordinate descent,
/// warm-starting from `beta`.
fn lasso_column(w: &Array2<f64>, idx: &[usize], s12: &[f64], alpha: f64, tol: f64, beta: &mut [f64]) {
    for _ in 0..MAX_INNER_SWEEPS {
        let mut max_change = 0.0_f64;
        for k in 0..idx.len() {
            let mut residual = s12[k];
            for (l, &b) in beta.iter().enumerate() {
                if l != k {
                    residual -= w[[idx[k], idx[l]]] * b;
                }
            }
            let updated = soft_threshold(residual, alpha) / w[[idx[k], idx[k]]];
            max_change = max_change.max((updated - beta[k]).abs());
            beta[k] = updated;
        }
        if max_change < tol {
            break;
        }
    }
}

/// Runs the graphical lasso on an empirical covariance matrix.
///
/// # Errors
///
/// Returns [`PrecisionError::EstimationFailure`] if `covariance` is not
/// square, the iteration does not converge within `max_iter`, a diagonal
/// pivot is non-positive, or any entry is non-finite.
pub fn graphical_lasso(
    covariance: &Array2<f64>,
    alpha: f64,
    max_iter: usize,
    tol: f64,
) -> Result<GraphicalLassoFit, PrecisionError> {
    let p = covariance.nrows();
    if p != covariance.ncols() {
        return Err(failure(format!(
            "covariance is not square ({p}x{})",
            covariance.ncols()
        )));
    }
    if covariance.iter().any(|v| !v.is_finite()) {
        return Err(failure("covariance has non-finite entries"));
    }

    let mut w = covariance.clone();
    for j in 0..p {
        w[[j, j]] += alpha;
    }
    let mut betas: Vec<Vec<f64>> = vec![vec![0.0; p.saturating_sub(1)]; p];

    let mut iterations = 0;
    let mut converged = p < 2;
    let mut last_change = 0.0;

    while !converged && iterations < max_iter {
        iterations += 1;
        let previous = w.clone();

        for (j, beta) in betas.iter_mut().enumerate() {
            let idx = others(p, j);
            let s12: Vec<f64> = idx.iter().map(|&k| covariance[[k, j]]).collect();
            lasso_column(&w, &idx, &s12, alpha, tol, beta);

            for &row in &idx {
                let w12: f64 = idx.iter().zip(beta.iter()).map(|(&k, b)| w[[row, k]] * b).sum();
                w[[row, j]] = w12;
                w[[j, row]] = w12;
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let off_diagonal = (p * (p - 1)) as f64;
        last_change = (&w - &previous)
            .indexed_iter()
            .filter(|((i, k), _)| i != k)
            .map(|(_, d)| d.abs())
            .sum::<f64>()
            / off_diagonal;
        log::debug!("Graphical lasso iteration {iterations}: mean change {last_change:.3e}");
        converged = last_change < tol;
    }

    if !converged {
        return Err(failure(format!(
            "did not converge after {iterations} iterations (mean change {last_change:.3e} >= tolerance {tol:.1e})"
        )));
    }

    let mut precision = Array2::<f64>::zeros((p, p));
    for (j, beta) in betas.iter().enumerate() {
        let idx = others(p, j);
        let w12_beta: f64 = idx
            .iter()
            .zip(beta.iter())
            .map(|(&k, b)| w[[k, j]] * b)
            .sum();
        let pivot = w[[j, j]] - w12_beta;
        if !(pivot.is_finite() && pivot > 0.0) {
            return Err(failure(format!("non-positive pivot {pivot} for column {j}")));
        }
        let theta_jj = 1.0 / pivot;
        precision[[j, j]] = theta_jj;
        for (&k, b) in idx.iter().zip(beta.iter()) {
            precision[[k, j]] = -b * theta_jj;
        }
    }

    let symmetric = (&precision + &precision.t()) / 2.0;
    if symmetric.iter().any(|v| !v.is_finite()) {
        return Err(failure("precision matrix has non-finite entries"));
    }

    Ok(GraphicalLassoFit {
        precision: symmetric,
        covariance: w,
        iterations,
    })
}

/// Complete-case rows for `admitted` columns.
fn complete_rows(table: &NumericFeatureTable, admitted: &[usize]) -> Vec<usize> {
    (0..table.n_rows())
        .filter(|&row| admitted.iter().all(|&c| table.columns[c][row].is_some()))
        .collect()
}

/// Mean and population standard deviation of column `c` over `rows`.
#[allow(clippy::cast_precision_loss)]
fn moments(table: &NumericFeatureTable, c: usize, rows: &[usize]) -> (f64, f64) {
    let n = rows.len() as f64;
    let values = rows.iter().filter_map(|&r| table.columns[c][r]);
    let mean = values.clone().sum::<f64>() / n;
    let variance = values.map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

fn to_rows(matrix: &Array2<f64>) -> Vec<Vec<f64>> {
    matrix.rows().into_iter().map(|r| r.to_vec()).collect()
}

/// Estimates a sparse precision matrix over the admissible columns of
/// `table`.
///
/// # Errors
///
/// Returns [`PrecisionError::InsufficientFeatures`] if fewer than
/// [`MIN_ADMITTED_FEATURES`] columns pass admission, and
/// [`PrecisionError::EstimationFailure`] if there are too few complete
/// rows or the graphical lasso fails.
#[allow(clippy::too_many_lines, clippy::cast_precision_loss)]
pub fn estimate_precision(
    table: &NumericFeatureTable,
    options: &PrecisionOptions,
) -> Result<PrecisionMatrixResult, PrecisionError> {
    let mut excluded = Vec::new();
    let mut admitted = Vec::new();

    for (c, name) in table.names.iter().enumerate() {
        let count = table.non_null_count(c);
        if count >= options.min_nonnull {
            admitted.push(c);
        } else {
            log::info!(
                "Excluding {name} from precision estimation: {count} non-null < {}",
                options.min_nonnull
            );
            excluded.push(ExcludedFeature {
                name: name.clone(),
                reason: ExclusionReason::InsufficientNonNull {
                    count,
                    threshold: options.min_nonnull,
                },
            });
        }
    }

    // Dropping a constant column can widen the complete-case set, so
    // repeat until every admitted column varies.
    let (rows, scales) = loop {
        if admitted.len() < MIN_ADMITTED_FEATURES {
            return Err(PrecisionError::InsufficientFeatures {
                admitted: admitted.len(),
                required: MIN_ADMITTED_FEATURES,
                excluded,
            });
        }
        let rows = complete_rows(table, &admitted);
        if rows.len() < 2 {
            return Err(failure(format!(
                "only {} complete row(s) across {} admitted features",
                rows.len(),
                admitted.len()
            )));
        }
        let scales: Vec<(f64, f64)> = admitted.iter().map(|&c| moments(table, c, &rows)).collect();
        let constant: Vec<usize> = admitted
            .iter()
            .zip(&scales)
            .filter(|(_, (_, sd))| *sd < VARIANCE_EPSILON)
            .map(|(&c, _)| c)
            .collect();
        if constant.is_empty() {
            break (rows, scales);
        }
        for c in constant {
            log::info!("Excluding {} from precision estimation: zero variance", table.names[c]);
            excluded.push(ExcludedFeature {
                name: table.names[c].clone(),
                reason: ExclusionReason::ZeroVariance,
            });
            admitted.retain(|&a| a != c);
        }
    };

    let features: Vec<String> = admitted.iter().map(|&c| table.names[c].clone()).collect();
    log::info!(
        "Estimating precision over {} features ({} complete rows): {}",
        features.len(),
        rows.len(),
        features.join(", ")
    );

    let n = rows.len();
    let p = admitted.len();
    let mut standardized = Array2::<f64>::zeros((n, p));
    for (j, (&c, (mean, sd))) in admitted.iter().zip(&scales).enumerate() {
        for (i, &r) in rows.iter().enumerate() {
            let value = table.columns[c][r].unwrap_or(*mean);
            standardized[[i, j]] = (value - mean) / sd;
        }
    }

    let covariance = standardized.t().dot(&standardized) / n as f64;
    let fit = graphical_lasso(&covariance, options.alpha, options.max_iter, options.tol)?;

    let diagonal: Array1<f64> = fit.precision.diag().to_owned();
    let mut edges = Vec::new();
    for i in 0..p {
        for j in (i + 1)..p {
            let theta = fit.precision[[i, j]];
            if theta.abs() > EDGE_EPSILON {
                edges.push(PartialCorrelationEdge {
                    feature_a: features[i].clone(),
                    feature_b: features[j].clone(),
                    precision: theta,
                    partial_correlation: -theta / (diagonal[i] * diagonal[j]).sqrt(),
                });
            }
        }
    }
    edges.sort_by(|a, b| {
        b.partial_correlation
            .abs()
            .total_cmp(&a.partial_correlation.abs())
            .then_with(|| a.feature_a.cmp(&b.feature_a))
            .then_with(|| a.feature_b.cmp(&b.feature_b))
    });

    log::debug!(
        "Graphical lasso converged in {} iterations with {} edges",
        fit.iterations,
        edges.len()
    );

    Ok(PrecisionMatrixResult {
        features,
        matrix: to_rows(&fit.precision),
        correlation: to_rows(&covariance),
        excluded,
        edges,
        alpha: options.alpha,
        iterations: fit.iterations,
        complete_rows: n,
    })
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn table(columns: Vec<(&str, Vec<Option<f64>>)>) -> NumericFeatureTable {
        NumericFeatureTable {
            names: columns.iter().map(|(n, _)| (*n).to_string()).collect(),
            columns: columns.into_iter().map(|(_, c)| c).collect(),
        }
    }

    /// Deterministic pseudo-noise in [-0.5, 0.5).
    #[allow(clippy::cast_precision_loss)]
    fn noise(i: usize, salt: usize) -> f64 {
        let x = (i * 7919 + salt * 104_729) % 1000;
        x as f64 / 1000.0 - 0.5
    }

    fn options(min_nonnull: usize) -> PrecisionOptions {
        PrecisionOptions {
            min_nonnull,
            ..PrecisionOptions::default()
        }
    }

    #[test]
    fn soft_threshold_shrinks_towards_zero() {
        assert!((soft_threshold(1.0, 0.25) - 0.75).abs() < 1e-12);
        assert!((soft_threshold(-1.0, 0.25) + 0.75).abs() < 1e-12);
        assert!(soft_threshold(0.1, 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn identity_covariance_gives_diagonal_precision() {
        let fit = graphical_lasso(&Array2::eye(3), 0.1, 100, 1e-6).unwrap();
        for i in 0..3 {
            assert!((fit.precision[[i, i]] - 1.0 / 1.1).abs() < 1e-9);
            for j in 0..3 {
                if i != j {
                    assert!(fit.precision[[i, j]].abs() < 1e-12);
                }
            }
        }
    }

    #[test]
    fn small_penalty_approximates_inverse() {
        let s = array![[1.0, 0.5], [0.5, 1.0]];
        let fit = graphical_lasso(&s, 1e-6, 200, 1e-10).unwrap();
        // inverse of s is [[4/3, -2/3], [-2/3, 4/3]]
        assert!((fit.precision[[0, 0]] - 4.0 / 3.0).abs() < 1e-3);
        assert!((fit.precision[[0, 1]] + 2.0 / 3.0).abs() < 1e-3);
        assert!((fit.precision[[0, 1]] - fit.precision[[1, 0]]).abs() < 1e-12);
    }

    #[test]
    fn large_penalty_zeroes_off_diagonal() {
        let s = array![[1.0, 0.3], [0.3, 1.0]];
        let fit = graphical_lasso(&s, 0.5, 100, 1e-8).unwrap();
        assert!(fit.precision[[0, 1]].abs() < 1e-12);
    }

    #[test]
    fn non_square_covariance_fails() {
        let s = Array2::<f64>::zeros((2, 3));
        assert!(matches!(
            graphical_lasso(&s, 0.1, 10, 1e-4),
            Err(PrecisionError::EstimationFailure { .. })
        ));
    }

    #[test]
    fn excludes_sparse_feature_with_reason() {
        let n = 1200;
        let dense_a: Vec<Option<f64>> = (0..n).map(|i| Some(noise(i, 1))).collect();
        let dense_b: Vec<Option<f64>> = (0..n).map(|i| Some(noise(i, 2) + noise(i, 1))).collect();
        let sparse: Vec<Option<f64>> = (0..n)
            .map(|i| (i < 800).then(|| noise(i, 3)))
            .collect();
        let table = table(vec![("a", dense_a), ("b", dense_b), ("sparse", sparse)]);

        let result = estimate_precision(&table, &options(1000)).unwrap();
        assert_eq!(result.features, vec!["a", "b"]);
        assert_eq!(result.excluded.len(), 1);
        assert_eq!(result.excluded[0].name, "sparse");
        assert_eq!(
            result.excluded[0].reason.to_string(),
            "insufficient non-null count: 800 < 1000"
        );
        assert_eq!(result.dimension() + result.excluded.len(), 3);
        assert!(result.is_symmetric(1e-9));
        assert!(result.matrix[0][0] >= 0.0 && result.matrix[1][1] >= 0.0);
        assert_eq!(result.complete_rows, n);
        assert!(!result.edges.is_empty());
        assert!(result.edges[0].partial_correlation > 0.0);
    }

    #[test]
    fn too_few_admitted_features_fails() {
        let table = table(vec![
            ("a", (0..50).map(|i| Some(noise(i, 1))).collect()),
            ("b", vec![None; 50]),
        ]);
        let err = estimate_precision(&table, &options(10)).unwrap_err();
        let PrecisionError::InsufficientFeatures {
            admitted,
            required,
            excluded,
        } = err
        else {
            panic!("expected insufficient features");
        };
        assert_eq!(admitted, 1);
        assert_eq!(required, 2);
        assert_eq!(excluded[0].name, "b");
    }

    #[test]
    fn constant_feature_is_excluded_for_zero_variance() {
        let table = table(vec![
            ("a", (0..40).map(|i| Some(noise(i, 1))).collect()),
            ("b", (0..40).map(|i| Some(noise(i, 2))).collect()),
            ("flat", vec![Some(3.0); 40]),
        ]);
        let result = estimate_precision(&table, &options(10)).unwrap();
        assert_eq!(result.features, vec!["a", "b"]);
        assert_eq!(result.excluded[0].reason, ExclusionReason::ZeroVariance);
    }

    #[test]
    fn correlation_has_unit_diagonal() {
        let table = table(vec![
            ("a", (0..60).map(|i| Some(noise(i, 4))).collect()),
            ("b", (0..60).map(|i| Some(noise(i, 5))).collect()),
        ]);
        let result = estimate_precision(&table, &options(10)).unwrap();
        assert!((result.correlation[0][0] - 1.0).abs() < 1e-9);
        assert!((result.correlation[1][1] - 1.0).abs() < 1e-9);
    }
}
