use std::fmt::Write as _;

use crime_analysis_analytics::{
    AnalysisReport, NullProgress, PredictionModel, null_progress, run_pipeline,
    run_pipeline_parallel, stats::accuracy_percent,
};
use crime_analysis_analytics_models::{AnalysisConfig, ExclusionReason, Outcome, RecommendationTopic};
use crime_analysis_ingest::read_csv;
use crime_analysis_ingest_models::RawTable;

const HEADER: &str = "Report Number,Date Reported,Date of Occurrence,Time of Occurrence,City,Crime Code,Crime Description,Victim Age,Victim Gender,Weapon Used,Crime Domain,Police Deployed,Case Closed";

const CITIES: &[&str] = &["Delhi", "Mumbai", "Pune", "Agra", "Chennai"];

const CRIMES: &[(&str, &str)] = &[
    ("ASSAULT", "Violent Crime"),
    ("HOMICIDE", "Violent Crime"),
    ("BURGLARY", "Other Crime"),
    ("VEHICLE - STOLEN", "Other Crime"),
    ("FIRE", "Fire Accident"),
    ("TRAFFIC VIOLATION", "Traffic Fatality"),
];

/// Deterministic incident export. Every `unparseable_every`-th row has a
/// time that neither parse stage understands.
fn synthetic_csv(rows: usize, unparseable_every: Option<usize>, all_other: bool) -> String {
    let mut csv = String::from(HEADER);
    csv.push('\n');
    for i in 0..rows {
        let day = 1 + i % 28;
        let month = 1 + (i / 28) % 12;
        let (description, domain) = if all_other {
            ("BURGLARY", "Other Crime")
        } else {
            CRIMES[(i * 5 + i / 3) % CRIMES.len()]
        };
        // Violent incidents skew late at night.
        let hour = if domain == "Violent Crime" {
            20 + i % 4
        } else {
            (i * 7) % 20
        };
        let time = match unparseable_every {
            Some(every) if i % every == 0 => "late night".to_string(),
            _ => format!("{day:02}-{month:02}-2023 {hour:02}:{:02}", i % 60),
        };
        writeln!(
            csv,
            "{},{:02}-{:02}-2023 10:00,{day:02}-{month:02}-2023,{time},{},{},{description},{},{},{},{domain},{},{}",
            i + 1,
            day,
            month,
            CITIES[(i * 3 + i / 7) % CITIES.len()],
            100 + i % 50,
            18 + (i * 13) % 60,
            ["M", "F", "X"][i % 3],
            ["Knife", "Firearm", "", "Other"][i % 4],
            1 + i % 9,
            if i % 2 == 0 { "Yes" } else { "No" },
        )
        .unwrap();
    }
    csv
}

fn table(csv: &str) -> RawTable {
    read_csv(csv.as_bytes()).unwrap()
}

fn config() -> AnalysisConfig {
    AnalysisConfig {
        n_trees: 20,
        ..AnalysisConfig::default()
    }
}

fn run(csv: &str) -> AnalysisReport {
    run_pipeline(&table(csv), &config(), &NullProgress).unwrap()
}

#[test]
fn full_run_produces_every_artifact() {
    let report = run(&synthetic_csv(1200, None, false));

    assert_eq!(report.diagnostics.rows_in, 1200);
    assert_eq!(report.diagnostics.rows_out, 1200);
    assert_eq!(report.hotspots.total_records, 1200);
    assert_eq!(report.hotspots.hotspots.len(), CITIES.len());

    let Outcome::Ok { result: precision } = &report.precision else {
        panic!("precision failed: {:?}", report.precision);
    };
    assert!(precision.is_symmetric(1e-9));
    // hour, day_of_week, month, victim_age, police_deployed, is_violent
    assert_eq!(precision.features.len() + precision.excluded.len(), 6);
    assert_eq!(precision.dimension(), precision.features.len());

    let Outcome::Ok { result: model } = &report.model else {
        panic!("model failed: {:?}", report.model);
    };
    let total: f64 = model.feature_importances.iter().map(|f| f.importance).sum();
    assert!((total - 1.0).abs() < 1e-6);
    assert_eq!(model.metrics.train_rows + model.metrics.test_rows, 1200);
    assert!(model.metrics.accuracy > 0.9);

    assert_eq!(
        report.stats.prediction_accuracy,
        Some(accuracy_percent(model.metrics.accuracy))
    );
    assert_eq!(report.stats.cities_covered, 5);
    assert_eq!(report.stats.monthly_trend.len(), 12);

    let topics: Vec<RecommendationTopic> = report.recommendations.iter().map(|r| r.topic).collect();
    assert_eq!(topics[0], RecommendationTopic::ResourceAllocation);
    assert!(topics.contains(&RecommendationTopic::TemporalDeployment));
    assert!(topics.contains(&RecommendationTopic::FeatureMonitoring));
    assert_eq!(topics.last(), Some(&RecommendationTopic::PreventivePatrolling));
}

#[test]
fn identical_input_and_seed_reproduce_report() {
    let csv = synthetic_csv(1100, None, false);
    assert_eq!(run(&csv), run(&csv));
}

#[test]
fn sparse_hour_is_excluded_from_precision() {
    // One row in three has no usable time: 800 of 1200 hours survive.
    let report = run(&synthetic_csv(1200, Some(3), false));

    assert_eq!(report.diagnostics.parse_failures.len(), 400);
    let Outcome::Ok { result: precision } = &report.precision else {
        panic!("precision failed: {:?}", report.precision);
    };
    let hour = precision
        .excluded
        .iter()
        .find(|e| e.name == "hour")
        .unwrap();
    assert_eq!(
        hour.reason,
        ExclusionReason::InsufficientNonNull {
            count: 800,
            threshold: 1000
        }
    );
    assert_eq!(
        hour.reason.to_string(),
        "insufficient non-null count: 800 < 1000"
    );
    assert!(!precision.features.contains(&"hour".to_string()));
}

#[test]
fn single_class_target_fails_model_only() {
    let report = run(&synthetic_csv(1200, None, true));

    let Outcome::Failed { error } = &report.model else {
        panic!("expected model failure");
    };
    assert!(error.contains("Single class"), "{error}");
    assert!(report.hotspots.total_records > 0);
    assert_eq!(report.stats.prediction_accuracy, None);
}

#[test]
fn trained_model_scores_new_records() {
    let csv = synthetic_csv(1200, None, false);
    let table = table(&csv);
    let loaded = crime_analysis_analytics::load_records(&table, &config()).unwrap();
    let features = crime_analysis_features::FeatureSet::resolve(
        &config().feature_columns,
        &table.headers,
    )
    .unwrap();
    let encoder = crime_analysis_features::EncoderState::fit(&features, &loaded.records);
    let (matrix, _) = encoder.transform(&loaded.records);
    let model = PredictionModel::train(
        &matrix,
        encoder,
        &crime_analysis_analytics::ModelOptions::from(&config()),
    )
    .unwrap();

    let incidents: Vec<_> = loaded
        .records
        .iter()
        .take(50)
        .map(|r| r.incident().clone())
        .collect();
    let (predictions, report) = model.predict_records(&incidents);
    assert_eq!(predictions.len(), 50);
    assert_eq!(report.total_fallbacks(), 0);
    assert!(predictions.iter().all(|p| (0.0..=1.0).contains(&p.probability)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn parallel_run_matches_sequential() {
    let csv = synthetic_csv(1100, None, false);
    let table = table(&csv);
    let sequential = run_pipeline(&table, &config(), &NullProgress).unwrap();
    let parallel = run_pipeline_parallel(&table, &config(), null_progress())
        .await
        .unwrap();
    assert_eq!(sequential, parallel);
}
