//! Bagged decision trees.
//!
//! Each tree is a `linfa_trees` Gini CART fit on a bootstrap sample of the
//! training rows. Sampling uses our own seeded generator so a fixed seed
//! gives an identical forest on every platform.

use linfa::ParamGuard as _;
use linfa::prelude::*;
use linfa_trees::{DecisionTree, SplitQuality};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg64;

const VIOLENT: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForestOptions {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub seed: u64,
}

/// An ensemble of trees voting on the violent class.
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<DecisionTree<f64, usize>>,
    n_features: usize,
}

/// Scales `values` to sum to 1. Non-finite entries count as zero; an
/// all-zero vector stays all zero.
fn normalized(values: impl IntoIterator<Item = f64>) -> Vec<f64> {
    let values: Vec<f64> = values
        .into_iter()
        .map(|v| if v.is_finite() { v.max(0.0) } else { 0.0 })
        .collect();
    let sum: f64 = values.iter().sum();
    if sum > 0.0 {
        values.iter().map(|v| v / sum).collect()
    } else {
        values
    }
}

impl RandomForest {
    /// Fits the forest on `rows` of `data`.
    ///
    /// Bootstrap samples are drawn from one generator seeded with
    /// `options.seed`. No trees are grown when `rows` is empty.
    ///
    /// # Errors
    ///
    /// Returns [`linfa::Error`] if the tree parameters are rejected.
    #[allow(clippy::cast_precision_loss)]
    pub fn fit(
        data: &Array2<f64>,
        targets: &[bool],
        rows: &[usize],
        options: &ForestOptions,
    ) -> Result<Self, linfa::Error> {
        let n_features = data.ncols();
        if rows.is_empty() {
            return Ok(Self {
                trees: Vec::new(),
                n_features,
            });
        }

        let params = DecisionTree::<f64, usize>::params()
            .split_quality(SplitQuality::Gini)
            .max_depth(options.max_depth)
            .min_weight_split(options.min_samples_split.max(2) as f32)
            .min_weight_leaf(1.0)
            .check()?;

        let mut rng = Pcg64::seed_from_u64(options.seed);
        let mut trees = Vec::with_capacity(options.n_trees);
        for _ in 0..options.n_trees {
            let sample: Vec<usize> = (0..rows.len())
                .map(|_| rows[rng.random_range(0..rows.len())])
                .collect();
            let records = data.select(Axis(0), &sample);
            let labels: Array1<usize> = sample
                .iter()
                .map(|&i| usize::from(targets[i]))
                .collect();
            trees.push(params.fit(&Dataset::new(records, labels))?);
        }

        Ok(Self { trees, n_features })
    }

    /// Fraction of trees voting violent for each row of `data`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn predict_proba_rows(&self, data: ArrayView2<'_, f64>) -> Vec<f64> {
        let mut votes = vec![0_usize; data.nrows()];
        if self.trees.is_empty() {
            return vec![0.0; data.nrows()];
        }
        for tree in &self.trees {
            let predicted: Array1<usize> = tree.predict(&data);
            for (vote, label) in votes.iter_mut().zip(predicted.iter()) {
                if *label == VIOLENT {
                    *vote += 1;
                }
            }
        }
        let n_trees = self.trees.len() as f64;
        votes.into_iter().map(|v| v as f64 / n_trees).collect()
    }

    #[must_use]
    pub fn predict_proba(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.predict_proba_rows(row.insert_axis(Axis(0)))
            .first()
            .copied()
            .unwrap_or(0.0)
    }

    #[must_use]
    pub fn predict(&self, row: ArrayView1<'_, f64>) -> bool {
        self.predict_proba(row) > 0.5
    }

    /// Mean of the per-tree normalized impurity importances, renormalized
    /// to sum to 1. Uniform when no tree split at all.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0; self.n_features];
        for tree in &self.trees {
            let per_tree = normalized(tree.feature_importance().iter().copied());
            for (total, value) in totals.iter_mut().zip(per_tree) {
                *total += value;
            }
        }
        let totals = normalized(totals);
        if totals.iter().sum::<f64>() > 0.0 || self.n_features == 0 {
            totals
        } else {
            vec![1.0 / self.n_features as f64; self.n_features]
        }
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    #[must_use]
    pub const fn n_features(&self) -> usize {
        self.n_features
    }
}
