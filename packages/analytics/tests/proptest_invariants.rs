use chrono::NaiveDate;
use crime_analysis_analytics::aggregate_hotspots;
use crime_analysis_analytics::model::forest::{ForestOptions, RandomForest};
use crime_analysis_analytics::precision::{PrecisionError, PrecisionOptions, estimate_precision};
use crime_analysis_analytics_models::{HotspotGrouping, TimeBucket};
use crime_analysis_crime_models::{CrimeRecord, DomainViolenceMap, NormalizedIncident, VictimGender};
use crime_analysis_features::NumericFeatureTable;
use ndarray::Array2;
use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;

const TOL: f64 = 1e-6;

const CITIES: &[&str] = &["Delhi", "Mumbai", "Pune", "Agra"];

const DOMAINS: &[&str] = &[
    "Violent Crime",
    "Other Crime",
    "Fire Accident",
    "Traffic Fatality",
    "violent crime ",
    "Cyber Crime",
];

fn incident(city: usize, day: u32, hour: Option<u8>, domain: &str, age: Option<u32>) -> NormalizedIncident {
    NormalizedIncident {
        source_row: 0,
        report_number: None,
        date_reported: None,
        occurred_on: NaiveDate::from_ymd_opt(2023, 1 + day % 12, 1 + day % 28),
        occurred_hour: hour,
        city: CITIES[city % CITIES.len()].to_string(),
        crime_code: None,
        crime_description: "THEFT".to_string(),
        crime_domain: domain.to_string(),
        victim_age: age,
        victim_gender: VictimGender::Unknown,
        weapon_used: None,
        police_deployed: None,
        case_closed: false,
        date_case_closed: None,
    }
}

fn record_strategy() -> impl Strategy<Value = CrimeRecord> {
    (
        0..CITIES.len(),
        0_u32..365,
        proptest::option::of(0_u8..24),
        0..DOMAINS.len(),
    )
        .prop_map(|(city, day, hour, domain)| {
            DomainViolenceMap::default().label(incident(city, day, hour, DOMAINS[domain], Some(30)))
        })
}

fn grouping_strategy() -> impl Strategy<Value = HotspotGrouping> {
    prop_oneof![
        Just(HotspotGrouping::Location),
        Just(HotspotGrouping::Time(TimeBucket::Hour)),
        Just(HotspotGrouping::Time(TimeBucket::DayOfWeek)),
        Just(HotspotGrouping::LocationAndTime(TimeBucket::Month)),
    ]
}

/// Columns of equal length, some values missing.
fn table_strategy() -> impl Strategy<Value = NumericFeatureTable> {
    (2_usize..5, 20_usize..40).prop_flat_map(|(p, n)| {
        proptest::collection::vec(
            proptest::collection::vec(proptest::option::weighted(0.95, -50.0_f64..50.0), n),
            p,
        )
        .prop_map(move |columns| NumericFeatureTable {
            names: (0..p).map(|i| format!("x{i}")).collect(),
            columns,
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        ..ProptestConfig::default()
    })]

    #[test]
    fn hotspot_counts_sum_to_input(
        records in proptest::collection::vec(record_strategy(), 0..200),
        grouping in grouping_strategy(),
    ) {
        let report = aggregate_hotspots(&records, grouping);
        let total: u64 = report.hotspots.iter().map(|h| h.incident_count).sum();
        prop_assert_eq!(total, records.len() as u64);
        prop_assert_eq!(report.total_records, records.len() as u64);
        for pair in report.hotspots.windows(2) {
            prop_assert!(pair[0].incident_count >= pair[1].incident_count);
        }
        for hotspot in &report.hotspots {
            prop_assert!(hotspot.violent_count <= hotspot.incident_count);
        }
    }

    #[test]
    fn violence_label_ignores_victim_age(
        domain in 0..DOMAINS.len(),
        first_age in proptest::option::of(0_u32..100),
        second_age in proptest::option::of(0_u32..100),
    ) {
        let map = DomainViolenceMap::default();
        let first = map.label(incident(0, 0, Some(12), DOMAINS[domain], first_age));
        let second = map.label(incident(0, 0, Some(12), DOMAINS[domain], second_age));
        prop_assert_eq!(first.is_violent(), second.is_violent());
        prop_assert_eq!(first.is_violent(), map.is_violent(DOMAINS[domain]));
    }

    #[test]
    fn precision_matrix_is_symmetric_with_nonnegative_diagonal(
        table in table_strategy(),
        min_nonnull in 10_usize..30,
        alpha in 0.01_f64..0.5,
    ) {
        let options = PrecisionOptions {
            min_nonnull,
            alpha,
            ..PrecisionOptions::default()
        };
        match estimate_precision(&table, &options) {
            Ok(result) => {
                prop_assert!(result.is_symmetric(TOL));
                prop_assert_eq!(result.dimension(), result.features.len());
                prop_assert_eq!(result.features.len() + result.excluded.len(), table.names.len());
                for i in 0..result.dimension() {
                    prop_assert!(result.matrix[i][i] >= 0.0);
                }
            }
            // Only a short admitted set may stop estimation on these
            // well-conditioned tables, and it must still account for
            // every column.
            Err(PrecisionError::InsufficientFeatures { admitted, required, excluded }) => {
                prop_assert!(admitted < required);
                prop_assert_eq!(admitted + excluded.len(), table.names.len());
            }
            Err(error) => prop_assert!(false, "unexpected estimation error: {}", error),
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 32,
        ..ProptestConfig::default()
    })]

    #[test]
    fn forest_importances_are_normalized(
        values in proptest::collection::vec(-10.0_f64..10.0, 90),
        labels in proptest::collection::vec(any::<bool>(), 30),
        seed in any::<u64>(),
    ) {
        let data = Array2::from_shape_vec((30, 3), values).unwrap();
        let rows: Vec<usize> = (0..30).collect();
        let forest = RandomForest::fit(&data, &labels, &rows, &ForestOptions {
            n_trees: 5,
            max_depth: Some(6),
            min_samples_split: 2,
            seed,
        }).unwrap();
        let importances = forest.feature_importances();
        prop_assert_eq!(importances.len(), 3);
        prop_assert!((importances.iter().sum::<f64>() - 1.0).abs() < TOL);
        prop_assert!(importances.iter().all(|v| *v >= 0.0));
    }
}
