#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Analysis engine for normalized crime incidents.
//!
//! Takes the labelled records and encoded feature matrix produced by the
//! ingest and feature crates and runs three independent analyses over
//! them: hotspot ranking ([`hotspots`]), sparse inverse-covariance
//! estimation ([`precision`]) and a bagged-tree violence classifier
//! ([`model`]). Their outputs feed rule-based policy recommendations
//! ([`recommend`]) and the dashboard summary ([`stats`]). [`pipeline`]
//! chains everything, sequentially or with the analyses on parallel
//! blocking tasks.

pub mod hotspots;
pub mod model;
pub mod pipeline;
pub mod precision;
pub mod progress;
pub mod recommend;
pub mod stats;

use crime_analysis_analytics_models::ConfigError;
use crime_analysis_features::FeatureError;
use crime_analysis_ingest::IngestError;
use thiserror::Error;

pub use hotspots::aggregate_hotspots;
pub use model::{ModelError, ModelOptions, PredictionModel};
pub use pipeline::{AnalysisReport, LoadedRecords, load_records, run_pipeline, run_pipeline_parallel};
pub use precision::{PrecisionError, PrecisionOptions, estimate_precision};
pub use progress::{NullProgress, ProgressCallback, null_progress};
pub use recommend::{RecommendationInputs, synthesize_recommendations};
pub use stats::summarize;

/// Errors that can occur during an analysis run.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// The configuration is invalid.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// The input could not be read or normalized.
    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    /// The feature allow-list does not match the input.
    #[error("Feature error: {0}")]
    Feature(#[from] FeatureError),

    /// An analysis task panicked or was cancelled.
    #[error("Task error: {0}")]
    Task(#[from] tokio::task::JoinError),
}
