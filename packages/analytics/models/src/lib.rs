#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Configuration and result types for crime incident analysis.
//!
//! These are the plain serde types exchanged between the analysis pipeline
//! and its callers: the [`AnalysisConfig`] going in, and the hotspot,
//! precision, model, recommendation, and stats artifacts coming out.

pub mod config;
pub mod hotspot;
pub mod model;
pub mod precision;
pub mod recommendation;
pub mod stats;

use serde::{Deserialize, Serialize};

pub use config::{AnalysisConfig, ConfigError, DEFAULT_FEATURE_COLUMNS};
pub use hotspot::{BucketValue, Hotspot, HotspotGrouping, HotspotReport, RiskLevel, TimeBucket};
pub use model::{
    ConfusionMatrix, EvaluationMetrics, FeatureImportance, ModelSummary, Prediction,
};
pub use precision::{ExcludedFeature, ExclusionReason, PartialCorrelationEdge, PrecisionMatrixResult};
pub use recommendation::{PolicyRecommendation, Priority, RecommendationTopic};
pub use stats::{HourCount, StatsSummary, TrendPoint, TypeCount};

/// Result of one downstream component in a serialized report. A failed
/// component carries its error message instead of aborting the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Outcome<T> {
    Ok { result: T },
    Failed { error: String },
}

impl<T> Outcome<T> {
    /// Converts a component result, rendering the error with `Display`.
    pub fn from_result<E: std::fmt::Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(result) => Self::Ok { result },
            Err(e) => Self::Failed {
                error: e.to_string(),
            },
        }
    }

    #[must_use]
    pub const fn as_ok(&self) -> Option<&T> {
        match self {
            Self::Ok { result } => Some(result),
            Self::Failed { .. } => None,
        }
    }

    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}
