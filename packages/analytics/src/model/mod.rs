//! Violence prediction model.
//!
//! Bagged `linfa_trees` decision trees trained on a stratified split of the encoded feature
//! matrix. Metrics come from the held-out rows only. The fitted
//! [`EncoderState`] travels with the model so new records are encoded
//! exactly as the training rows were.

pub mod forest;
pub mod metrics;
pub mod split;

use crime_analysis_analytics_models::{
    AnalysisConfig, EvaluationMetrics, FeatureImportance, ModelSummary, Prediction,
};
use crime_analysis_crime_models::NormalizedIncident;
use crime_analysis_features::{EncodedFeatureMatrix, EncoderState, EncodingReport};
use ndarray::{ArrayView1, Axis};
use thiserror::Error;

use self::forest::{ForestOptions, RandomForest};
use self::metrics::evaluate;
use self::split::stratified_split;

/// Rows each class needs so that both sides of the split see it.
pub const MIN_ROWS_PER_CLASS: usize = 2;

const fn class_name(class: &bool) -> &'static str {
    if *class { "violent" } else { "non-violent" }
}

/// Errors that can occur while training or applying the model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Not enough rows to split or train.
    #[error("Insufficient data: {reason} ({train_rows} training rows, minimum {minimum})")]
    InsufficientData {
        /// What was short.
        reason: String,
        /// Training rows available (before the split when the split was
        /// impossible).
        train_rows: usize,
        /// Required rows.
        minimum: usize,
    },

    /// Every record has the same label.
    #[error("Single class: every record is {}", class_name(.class))]
    SingleClass {
        /// The only observed label.
        class: bool,
    },

    /// A feature row does not match the model's feature count.
    #[error("Dimension mismatch: expected {expected} features, got {actual}")]
    DimensionMismatch {
        /// Features the model was trained on.
        expected: usize,
        /// Features supplied.
        actual: usize,
    },

    /// The tree learner rejected its parameters or data.
    #[error("Training error: {0}")]
    Training(#[from] linfa::Error),
}

/// Training parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelOptions {
    pub train_ratio: f64,
    pub seed: u64,
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_train_rows: usize,
}

impl From<&AnalysisConfig> for ModelOptions {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            train_ratio: config.train_test_ratio,
            seed: config.random_seed,
            n_trees: config.n_trees,
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            min_train_rows: config.min_train_rows,
        }
    }
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self::from(&AnalysisConfig::default())
    }
}

/// A trained classifier with its importances and held-out metrics.
#[derive(Debug, Clone)]
pub struct PredictionModel {
    encoder: EncoderState,
    forest: RandomForest,
    importances: Vec<FeatureImportance>,
    metrics: EvaluationMetrics,
}

impl PredictionModel {
    /// Trains on `matrix` with its targets.
    ///
    /// # Errors
    ///
    /// * [`ModelError::DimensionMismatch`] if the matrix does not match
    ///   `encoder`'s columns or its target count.
    /// * [`ModelError::SingleClass`] if only one label is present.
    /// * [`ModelError::InsufficientData`] if a class has fewer than
    ///   [`MIN_ROWS_PER_CLASS`] rows or the training split is smaller than
    ///   `options.min_train_rows`.
    pub fn train(
        matrix: &EncodedFeatureMatrix,
        encoder: EncoderState,
        options: &ModelOptions,
    ) -> Result<Self, ModelError> {
        let n = matrix.n_rows();
        if matrix.n_features() != encoder.columns().len() {
            return Err(ModelError::DimensionMismatch {
                expected: encoder.columns().len(),
                actual: matrix.n_features(),
            });
        }
        if matrix.targets.len() != n {
            return Err(ModelError::DimensionMismatch {
                expected: n,
                actual: matrix.targets.len(),
            });
        }
        if n == 0 {
            return Err(ModelError::InsufficientData {
                reason: "no records".to_string(),
                train_rows: 0,
                minimum: options.min_train_rows,
            });
        }

        let positives = matrix.targets.iter().filter(|t| **t).count();
        let negatives = n - positives;
        if positives == 0 || negatives == 0 {
            return Err(ModelError::SingleClass {
                class: positives > 0,
            });
        }
        if positives < MIN_ROWS_PER_CLASS || negatives < MIN_ROWS_PER_CLASS {
            return Err(ModelError::InsufficientData {
                reason: format!(
                    "each class needs at least {MIN_ROWS_PER_CLASS} rows to stratify (violent: {positives}, non-violent: {negatives})"
                ),
                train_rows: n,
                minimum: options.min_train_rows,
            });
        }

        let split = stratified_split(&matrix.targets, options.train_ratio, options.seed);
        if split.train.len() < options.min_train_rows {
            return Err(ModelError::InsufficientData {
                reason: "training split too small".to_string(),
                train_rows: split.train.len(),
                minimum: options.min_train_rows,
            });
        }

        log::info!(
            "Training {} trees on {} rows, holding out {} rows",
            options.n_trees,
            split.train.len(),
            split.test.len()
        );

        let forest = RandomForest::fit(
            &matrix.data,
            &matrix.targets,
            &split.train,
            &ForestOptions {
                n_trees: options.n_trees,
                max_depth: options.max_depth,
                min_samples_split: options.min_samples_split,
                seed: options.seed,
            },
        )?;

        let predicted: Vec<bool> = forest
            .predict_proba_rows(matrix.data.select(Axis(0), &split.test).view())
            .into_iter()
            .map(|p| p > 0.5)
            .collect();
        let actual: Vec<bool> = split.test.iter().map(|&i| matrix.targets[i]).collect();
        let metrics = evaluate(&predicted, &actual, split.train.len());

        log::info!(
            "Held-out accuracy {:.3}, precision {:.3}, recall {:.3}, F1 {:.3}",
            metrics.accuracy,
            metrics.precision,
            metrics.recall,
            metrics.f1
        );

        let mut importances: Vec<FeatureImportance> = matrix
            .column_names()
            .into_iter()
            .zip(forest.feature_importances())
            .map(|(feature, importance)| FeatureImportance {
                feature,
                importance,
            })
            .collect();
        importances.sort_by(|a, b| {
            b.importance
                .total_cmp(&a.importance)
                .then_with(|| a.feature.cmp(&b.feature))
        });

        Ok(Self {
            encoder,
            forest,
            importances,
            metrics,
        })
    }

    /// Importances, highest first. They sum to 1.
    #[must_use]
    pub fn feature_importances(&self) -> &[FeatureImportance] {
        &self.importances
    }

    #[must_use]
    pub const fn metrics(&self) -> &EvaluationMetrics {
        &self.metrics
    }

    #[must_use]
    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            n_trees: self.forest.n_trees(),
            feature_importances: self.importances.clone(),
            metrics: self.metrics.clone(),
        }
    }

    #[must_use]
    pub const fn encoder(&self) -> &EncoderState {
        &self.encoder
    }

    /// Scores one already-encoded feature row.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DimensionMismatch`] if `row` has the wrong
    /// number of features.
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> Result<Prediction, ModelError> {
        if row.len() != self.forest.n_features() {
            return Err(ModelError::DimensionMismatch {
                expected: self.forest.n_features(),
                actual: row.len(),
            });
        }
        let probability = self.forest.predict_proba(row);
        Ok(Prediction {
            probability,
            is_violent: probability > 0.5,
        })
    }

    /// Encodes and scores new incidents with the training encoder.
    /// Categories unseen at training time use the unknown code and are
    /// listed in the returned report.
    #[must_use]
    pub fn predict_records(&self, incidents: &[NormalizedIncident]) -> (Vec<Prediction>, EncodingReport) {
        let mut report = EncodingReport::default();
        let predictions = incidents
            .iter()
            .map(|incident| {
                let row = self.encoder.encode_row(incident, &mut report);
                let probability = self.forest.predict_proba(ArrayView1::from(&row[..]));
                Prediction {
                    probability,
                    is_violent: probability > 0.5,
                }
            })
            .collect();
        report.log_summary();
        (predictions, report)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use crime_analysis_crime_models::{CrimeRecord, DomainViolenceMap, VictimGender};
    use crime_analysis_features::{FeatureColumn, FeatureSet};

    use super::*;

    fn incident(i: usize, violent: bool) -> NormalizedIncident {
        NormalizedIncident {
            source_row: i,
            report_number: None,
            date_reported: None,
            occurred_on: NaiveDate::from_ymd_opt(2023, 1, 1 + u32::try_from(i % 28).unwrap()),
            occurred_hour: Some(if violent { 22 } else { 10 }),
            city: if i % 3 == 0 { "Delhi" } else { "Pune" }.to_string(),
            crime_code: None,
            crime_description: "ASSAULT".to_string(),
            crime_domain: if violent { "Violent Crime" } else { "Other Crime" }.to_string(),
            victim_age: Some(20 + u32::try_from(i % 40).unwrap()),
            victim_gender: VictimGender::Male,
            weapon_used: None,
            police_deployed: Some(3),
            case_closed: false,
            date_case_closed: None,
        }
    }

    fn records(n: usize, violent: impl Fn(usize) -> bool) -> Vec<CrimeRecord> {
        let map = DomainViolenceMap::default();
        (0..n).map(|i| map.label(incident(i, violent(i)))).collect()
    }

    fn features() -> FeatureSet {
        FeatureSet::from_columns(&[
            FeatureColumn::Hour,
            FeatureColumn::VictimAge,
            FeatureColumn::City,
        ])
    }

    fn options() -> ModelOptions {
        ModelOptions {
            n_trees: 20,
            ..ModelOptions::default()
        }
    }

    fn train(records: &[CrimeRecord]) -> Result<PredictionModel, ModelError> {
        let encoder = EncoderState::fit(&features(), records);
        let (matrix, _) = encoder.transform(records);
        PredictionModel::train(&matrix, encoder, &options())
    }

    #[test]
    fn learns_separable_label() {
        let records = records(60, |i| i % 4 == 0);
        let model = train(&records).unwrap();

        assert!((model.metrics().accuracy - 1.0).abs() < 1e-12);
        assert_eq!(model.metrics().test_rows + model.metrics().train_rows, 60);
        let total: f64 = model.feature_importances().iter().map(|f| f.importance).sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert_eq!(model.feature_importances()[0].feature, "hour");
    }

    #[test]
    fn single_class_fails() {
        let records = records(30, |_| false);
        assert!(matches!(
            train(&records),
            Err(ModelError::SingleClass { class: false })
        ));
    }

    #[test]
    fn one_violent_row_is_insufficient() {
        let records = records(30, |i| i == 0);
        assert!(matches!(
            train(&records),
            Err(ModelError::InsufficientData { .. })
        ));
    }

    #[test]
    fn tiny_training_split_is_insufficient() {
        let records = records(6, |i| i % 2 == 0);
        let err = train(&records).unwrap_err();
        let ModelError::InsufficientData {
            train_rows,
            minimum,
            ..
        } = err
        else {
            panic!("expected insufficient data, got {err:?}");
        };
        assert!(train_rows < minimum);
    }

    #[test]
    fn predicts_new_records_with_unknown_city() {
        let records = records(60, |i| i % 4 == 0);
        let model = train(&records).unwrap();

        let mut unseen = incident(1, true);
        unseen.city = "Chennai".to_string();
        let (predictions, report) = model.predict_records(&[unseen, incident(2, false)]);

        assert!(predictions[0].is_violent);
        assert!(!predictions[1].is_violent);
        assert_eq!(report.total_fallbacks(), 1);
    }

    #[test]
    fn rejects_wrong_row_width() {
        let records = records(60, |i| i % 4 == 0);
        let model = train(&records).unwrap();
        let row = [1.0, 2.0];
        assert!(matches!(
            model.predict_row(ArrayView1::from(&row[..])),
            Err(ModelError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }
}
