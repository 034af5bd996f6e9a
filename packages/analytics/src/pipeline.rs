//! End-to-end analysis run.
//!
//! Normalize, label and encode once, then run the three independent
//! analyses (hotspots, precision matrix, prediction model) over the frozen
//! inputs and derive recommendations and summary stats from their results.
//! A failed precision estimate or model is reported in the
//! [`AnalysisReport`] rather than aborting the run; structural input
//! problems (bad config, missing columns) abort before any analysis starts.

use std::collections::BTreeMap;
use std::sync::Arc;

use crime_analysis_analytics_models::{
    AnalysisConfig, HotspotGrouping, HotspotReport, ModelSummary, Outcome, PolicyRecommendation,
    PrecisionMatrixResult, StatsSummary, TimeBucket,
};
use crime_analysis_crime_models::CrimeRecord;
use crime_analysis_features::{
    EncodedFeatureMatrix, EncoderState, EncodingReport, FeatureSet, NumericFeatureTable,
    label_records,
};
use crime_analysis_ingest::schema::check_headers;
use crime_analysis_ingest::{IngestError, normalize};
use crime_analysis_ingest_models::{IngestDiagnostics, RawTable};
use serde::Serialize;

use crate::AnalyticsError;
use crate::hotspots::aggregate_hotspots;
use crate::model::{ModelError, ModelOptions, PredictionModel};
use crate::precision::{PrecisionError, PrecisionOptions, estimate_precision};
use crate::progress::ProgressCallback;
use crate::recommend::{RecommendationInputs, synthesize_recommendations};
use crate::stats::summarize;

/// Stages reported to the progress callback.
const STAGES: u64 = 6;

/// Everything one run produces, in serializable form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub diagnostics: IngestDiagnostics,
    /// Crime domains with no configured label, with counts.
    pub unmapped_domains: BTreeMap<String, u64>,
    pub encoding: EncodingReport,
    /// Hotspots by city.
    pub hotspots: HotspotReport,
    /// Hotspots by hour of day.
    pub hourly_hotspots: HotspotReport,
    pub precision: Outcome<PrecisionMatrixResult>,
    pub model: Outcome<ModelSummary>,
    pub recommendations: Vec<PolicyRecommendation>,
    pub stats: StatsSummary,
}

/// Normalized and labelled records with their audit trail.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedRecords {
    pub diagnostics: IngestDiagnostics,
    pub unmapped_domains: BTreeMap<String, u64>,
    pub records: Vec<CrimeRecord>,
}

/// Validates `config` and normalizes and labels `table`.
///
/// # Errors
///
/// Returns [`AnalyticsError::Config`] for an invalid configuration and
/// [`AnalyticsError::Ingest`] if required input columns are missing.
pub fn load_records(table: &RawTable, config: &AnalysisConfig) -> Result<LoadedRecords, AnalyticsError> {
    config.validate()?;
    normalize_and_label(table, config)
}

fn normalize_and_label(table: &RawTable, config: &AnalysisConfig) -> Result<LoadedRecords, AnalyticsError> {
    let batch = normalize(table)?;
    let labelled = label_records(batch.records, &config.domain_violence_map);
    Ok(LoadedRecords {
        diagnostics: batch.diagnostics,
        unmapped_domains: labelled.unmapped_domains,
        records: labelled.records,
    })
}

/// Frozen inputs shared by the three analyses.
struct Prepared {
    loaded: LoadedRecords,
    features: FeatureSet,
    encoder: EncoderState,
    matrix: EncodedFeatureMatrix,
    encoding: EncodingReport,
}

fn prepare(
    table: &RawTable,
    config: &AnalysisConfig,
    progress: &dyn ProgressCallback,
) -> Result<Prepared, AnalyticsError> {
    progress.set_total(STAGES);
    progress.set_message("Normalizing records".to_string());

    config.validate()?;
    // Required columns first so one error lists every missing input column,
    // then the allow-list, all before any rows are processed.
    check_headers(&table.headers).map_err(IngestError::from)?;
    let features = FeatureSet::resolve(&config.feature_columns, &table.headers)?;
    let loaded = normalize_and_label(table, config)?;
    progress.inc(1);

    progress.set_message("Encoding features".to_string());
    let encoder = EncoderState::fit(&features, &loaded.records);
    let (matrix, encoding) = encoder.transform(&loaded.records);
    log::info!(
        "Encoded {} rows x {} features",
        matrix.n_rows(),
        matrix.n_features()
    );
    progress.inc(1);

    Ok(Prepared {
        loaded,
        features,
        encoder,
        matrix,
        encoding,
    })
}

fn run_hotspots(records: &[CrimeRecord]) -> (HotspotReport, HotspotReport) {
    (
        aggregate_hotspots(records, HotspotGrouping::Location),
        aggregate_hotspots(records, HotspotGrouping::Time(TimeBucket::Hour)),
    )
}

fn run_precision(
    records: &[CrimeRecord],
    features: &FeatureSet,
    config: &AnalysisConfig,
) -> Result<PrecisionMatrixResult, PrecisionError> {
    let table =
        NumericFeatureTable::from_records(records, &features.numeric(), config.precision_include_target);
    estimate_precision(&table, &PrecisionOptions::from(config))
}

fn run_model(
    matrix: &EncodedFeatureMatrix,
    encoder: EncoderState,
    config: &AnalysisConfig,
) -> Result<PredictionModel, ModelError> {
    PredictionModel::train(matrix, encoder, &ModelOptions::from(config))
}

struct Analyses {
    hotspots: HotspotReport,
    hourly: HotspotReport,
    precision: Result<PrecisionMatrixResult, PrecisionError>,
    model: Result<PredictionModel, ModelError>,
}

fn assemble(
    loaded: LoadedRecords,
    encoding: EncodingReport,
    analyses: Analyses,
    config: &AnalysisConfig,
    progress: &dyn ProgressCallback,
) -> AnalysisReport {
    if let Err(e) = &analyses.precision {
        log::warn!("Precision matrix estimation failed: {e}");
    }
    if let Err(e) = &analyses.model {
        log::warn!("Prediction model training failed: {e}");
    }

    progress.set_message("Synthesizing recommendations".to_string());
    let model = analyses.model.as_ref().ok();
    let recommendations = synthesize_recommendations(&RecommendationInputs {
        hotspots: &analyses.hotspots,
        hourly: Some(&analyses.hourly),
        precision: analyses.precision.as_ref().ok(),
        importances: model.map(PredictionModel::feature_importances),
        diagnostics: Some(&loaded.diagnostics),
        top_n: config.hotspot_top_n,
    });
    let stats = summarize(&loaded.records, model.map(|m| m.metrics().accuracy));
    progress.inc(1);

    let report = AnalysisReport {
        diagnostics: loaded.diagnostics,
        unmapped_domains: loaded.unmapped_domains,
        encoding,
        hotspots: analyses.hotspots,
        hourly_hotspots: analyses.hourly,
        precision: Outcome::from_result(analyses.precision),
        model: Outcome::from_result(analyses.model.map(|m| m.summary())),
        recommendations,
        stats,
    };
    progress.finish(format!(
        "Analyzed {} records: {} recommendations",
        report.stats.total_crimes,
        report.recommendations.len()
    ));
    report
}

/// Runs the whole analysis on one thread.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the configuration is invalid, the input
/// is missing required columns, or a configured feature is unknown or
/// absent from the input.
pub fn run_pipeline(
    table: &RawTable,
    config: &AnalysisConfig,
    progress: &dyn ProgressCallback,
) -> Result<AnalysisReport, AnalyticsError> {
    let Prepared {
        loaded,
        features,
        encoder,
        matrix,
        encoding,
    } = prepare(table, config, progress)?;

    progress.set_message("Aggregating hotspots".to_string());
    let (hotspots, hourly) = run_hotspots(&loaded.records);
    progress.inc(1);

    progress.set_message("Estimating precision matrix".to_string());
    let precision = run_precision(&loaded.records, &features, config);
    progress.inc(1);

    progress.set_message("Training prediction model".to_string());
    let model = run_model(&matrix, encoder, config);
    progress.inc(1);

    Ok(assemble(
        loaded,
        encoding,
        Analyses {
            hotspots,
            hourly,
            precision,
            model,
        },
        config,
        progress,
    ))
}

/// Runs the analysis with hotspots, precision estimation and model
/// training on separate blocking tasks.
///
/// The records and encoded matrix are frozen behind [`Arc`] before any task
/// starts; the tasks only read them. Output is identical to
/// [`run_pipeline`] for the same input and seed.
///
/// # Errors
///
/// Returns the same errors as [`run_pipeline`], plus
/// [`AnalyticsError::Task`] if an analysis task panics.
pub async fn run_pipeline_parallel(
    table: &RawTable,
    config: &AnalysisConfig,
    progress: Arc<dyn ProgressCallback>,
) -> Result<AnalysisReport, AnalyticsError> {
    let Prepared {
        loaded,
        features,
        encoder,
        matrix,
        encoding,
    } = prepare(table, config, progress.as_ref())?;

    let LoadedRecords {
        diagnostics,
        unmapped_domains,
        records,
    } = loaded;
    let records = Arc::new(records);
    let config = Arc::new(config.clone());
    progress.set_message("Running analyses".to_string());

    let hotspot_task = {
        let records = Arc::clone(&records);
        let progress = Arc::clone(&progress);
        tokio::task::spawn_blocking(move || {
            let result = run_hotspots(&records);
            progress.inc(1);
            result
        })
    };
    let precision_task = {
        let records = Arc::clone(&records);
        let config = Arc::clone(&config);
        let progress = Arc::clone(&progress);
        tokio::task::spawn_blocking(move || {
            let result = run_precision(&records, &features, &config);
            progress.inc(1);
            result
        })
    };
    let model_task = {
        let config = Arc::clone(&config);
        let progress = Arc::clone(&progress);
        tokio::task::spawn_blocking(move || {
            let result = run_model(&matrix, encoder, &config);
            progress.inc(1);
            result
        })
    };

    let (hotspots, hourly) = hotspot_task.await?;
    let precision = precision_task.await?;
    let model = model_task.await?;

    // Every task has finished, so this is the last reference.
    let records = Arc::try_unwrap(records).unwrap_or_else(|shared| (*shared).clone());

    Ok(assemble(
        LoadedRecords {
            diagnostics,
            unmapped_domains,
            records,
        },
        encoding,
        Analyses {
            hotspots,
            hourly,
            precision,
            model,
        },
        &config,
        progress.as_ref(),
    ))
}

#[cfg(test)]
mod tests {
    use crime_analysis_crime_models::DomainViolenceMap;
    use crime_analysis_ingest::read_csv;

    use super::*;
    use crate::progress::NullProgress;

    const CSV: &str = "\
Report Number,Date Reported,Date of Occurrence,Time of Occurrence,City,Crime Code,Crime Description,Victim Age,Victim Gender,Weapon Used,Crime Domain,Police Deployed,Case Closed
1,02-03-2023 09:00,01-03-2023,14:30:00,Delhi,101,ASSAULT,30,F,Knife,Violent Crime,5,Yes
2,05-03-2023 11:00,04-03-2023,23:10,Pune,205,BURGLARY,41,M,,Other Crime,3,No
3,06-03-2023 11:00,05-03-2023,08:00,Delhi,301,FIRE,44,X,Other,Fire Accident,2,No
";

    fn table() -> RawTable {
        read_csv(CSV.as_bytes()).unwrap()
    }

    #[test]
    fn small_input_reports_component_failures() {
        let report = run_pipeline(&table(), &AnalysisConfig::default(), &NullProgress).unwrap();

        assert_eq!(report.diagnostics.rows_out, 3);
        assert_eq!(report.hotspots.total_records, 3);
        assert_eq!(report.hotspots.hotspots[0].location.as_deref(), Some("Delhi"));
        assert!(!report.precision.is_ok());
        assert!(!report.model.is_ok());
        assert_eq!(report.stats.total_crimes, 3);
        assert_eq!(report.stats.prediction_accuracy, None);
        assert!(!report.recommendations.is_empty());
    }

    #[test]
    fn unknown_feature_fails_fast() {
        let config = AnalysisConfig {
            feature_columns: vec!["hour".to_string(), "shoe_size".to_string()],
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            run_pipeline(&table(), &config, &NullProgress),
            Err(AnalyticsError::Feature(_))
        ));
    }

    #[test]
    fn missing_columns_are_reported_together() {
        let mut table = table();
        for column in ["Victim Age", "Crime Domain"] {
            let index = table.headers.iter().position(|h| h == column).unwrap();
            table.headers.remove(index);
        }
        let Err(AnalyticsError::Ingest(IngestError::Schema(error))) =
            run_pipeline(&table, &AnalysisConfig::default(), &NullProgress)
        else {
            panic!("expected a schema error");
        };
        assert_eq!(error.missing, vec!["Crime Domain", "Victim Age"]);
    }

    #[test]
    fn invalid_config_fails_fast() {
        let config = AnalysisConfig {
            train_test_ratio: 1.5,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            run_pipeline(&table(), &config, &NullProgress),
            Err(AnalyticsError::Config(_))
        ));
    }

    #[test]
    fn load_records_labels_from_config() {
        let config = AnalysisConfig {
            domain_violence_map: DomainViolenceMap::new([
                ("Violent Crime", true),
                ("Fire Accident", true),
            ]),
            ..AnalysisConfig::default()
        };
        let loaded = load_records(&table(), &config).unwrap();
        let violent: Vec<bool> = loaded.records.iter().map(CrimeRecord::is_violent).collect();
        assert_eq!(violent, vec![true, false, true]);
    }
}
