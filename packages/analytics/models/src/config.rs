//! Analysis configuration.
//!
//! Every key is optional in TOML; absent keys take the defaults below.
//!
//! ```toml
//! feature_columns = ["hour", "victim_age", "city"]
//! min_nonnull_for_precision = 1000
//! graphical_lasso_alpha = 0.01
//! train_test_ratio = 0.7
//! random_seed = 42
//!
//! [domain_violence_map]
//! "Violent Crime" = true
//! "Other Crime" = false
//! ```

use std::path::Path;

use crime_analysis_crime_models::DomainViolenceMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating an [`AnalysisConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Read {
        /// File that was being read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The TOML was malformed or contained unknown keys.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is outside its accepted range.
    #[error("Invalid value for {key}: {message}")]
    Invalid {
        /// Offending configuration key.
        key: &'static str,
        /// What the accepted range is.
        message: String,
    },
}

/// Tunable parameters for one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Feature allow-list for modelling, by feature name.
    pub feature_columns: Vec<String>,
    /// Minimum non-null observations for a feature to enter precision
    /// estimation.
    pub min_nonnull_for_precision: usize,
    /// L1 penalty of the graphical lasso.
    pub graphical_lasso_alpha: f64,
    pub graphical_lasso_max_iter: usize,
    /// Convergence tolerance on the mean absolute covariance update.
    pub graphical_lasso_tol: f64,
    /// Whether the violence label is a precision-matrix candidate.
    pub precision_include_target: bool,
    /// Fraction of rows placed in the training split.
    pub train_test_ratio: f64,
    pub random_seed: u64,
    pub n_trees: usize,
    /// Maximum tree depth; unset grows until leaves are pure.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Minimum rows in the training split.
    pub min_train_rows: usize,
    /// Crime-domain to violence-label table.
    pub domain_violence_map: DomainViolenceMap,
    /// Hotspots named in the patrol-allocation recommendation.
    pub hotspot_top_n: usize,
}

/// Features used when none are configured.
pub const DEFAULT_FEATURE_COLUMNS: &[&str] = &[
    "hour",
    "day_of_week",
    "month",
    "victim_age",
    "police_deployed",
    "city",
    "crime_description",
    "victim_gender",
    "weapon_used",
];

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            feature_columns: DEFAULT_FEATURE_COLUMNS
                .iter()
                .map(ToString::to_string)
                .collect(),
            min_nonnull_for_precision: 1000,
            graphical_lasso_alpha: 0.01,
            graphical_lasso_max_iter: 100,
            graphical_lasso_tol: 1e-4,
            precision_include_target: true,
            train_test_ratio: 0.7,
            random_seed: 42,
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_train_rows: 10,
            domain_violence_map: DomainViolenceMap::default(),
            hotspot_top_n: 3,
        }
    }
}

impl AnalysisConfig {
    /// Parses a configuration from TOML text and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed, or
    /// validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks every numeric range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(key: &'static str, message: &str) -> ConfigError {
            ConfigError::Invalid {
                key,
                message: message.to_string(),
            }
        }

        if self.feature_columns.is_empty() {
            return Err(invalid("feature_columns", "must list at least one feature"));
        }
        if self.min_nonnull_for_precision < 1 {
            return Err(invalid("min_nonnull_for_precision", "must be at least 1"));
        }
        if !(self.graphical_lasso_alpha.is_finite() && self.graphical_lasso_alpha > 0.0) {
            return Err(invalid("graphical_lasso_alpha", "must be a finite value > 0"));
        }
        if self.graphical_lasso_max_iter == 0 {
            return Err(invalid("graphical_lasso_max_iter", "must be at least 1"));
        }
        if !(self.graphical_lasso_tol.is_finite() && self.graphical_lasso_tol > 0.0) {
            return Err(invalid("graphical_lasso_tol", "must be a finite value > 0"));
        }
        if !(self.train_test_ratio > 0.0 && self.train_test_ratio < 1.0) {
            return Err(invalid("train_test_ratio", "must be strictly between 0 and 1"));
        }
        if self.n_trees == 0 {
            return Err(invalid("n_trees", "must be at least 1"));
        }
        if self.max_depth == Some(0) {
            return Err(invalid("max_depth", "must be at least 1 when set"));
        }
        if self.min_samples_split < 2 {
            return Err(invalid("min_samples_split", "must be at least 2"));
        }
        if self.min_train_rows < 2 {
            return Err(invalid(
                "min_train_rows",
                "must be at least 2 so both classes can be stratified",
            ));
        }
        if self.domain_violence_map.is_empty() {
            return Err(invalid("domain_violence_map", "must map at least one domain"));
        }
        Ok(())
    }
}
