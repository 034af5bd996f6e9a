//! Dashboard summary statistics.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Datelike as _;
use crime_analysis_analytics_models::{HourCount, StatsSummary, TrendPoint, TypeCount};
use crime_analysis_crime_models::CrimeRecord;

/// Crime descriptions listed in `distribution_by_type`.
pub const TOP_TYPES: usize = 10;

/// Hours listed in `peak_hours`.
pub const TOP_HOURS: usize = 5;

/// Converts a held-out accuracy fraction to the percentage reported in
/// the summary, rounded to one decimal place.
#[must_use]
pub fn accuracy_percent(accuracy: f64) -> f64 {
    (accuracy * 1000.0).round() / 10.0
}

/// Builds the summary payload from labelled records. `prediction_accuracy`
/// is a fraction in `[0, 1]`; the summary carries it as a percentage.
///
/// Records without an occurrence date are left out of the monthly trend
/// and records without an hour out of the peak hours; every record counts
/// toward the totals. Ties in the ranked lists break by name or hour
/// ascending.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn summarize(records: &[CrimeRecord], prediction_accuracy: Option<f64>) -> StatsSummary {
    let total_crimes = records.len() as u64;
    let violent_crimes = records.iter().filter(|r| r.is_violent()).count() as u64;
    let violent_ratio = if total_crimes == 0 {
        0.0
    } else {
        violent_crimes as f64 / total_crimes as f64
    };

    let cities: BTreeSet<&str> = records.iter().map(|r| r.city.as_str()).collect();

    let mut months: BTreeMap<(i32, u32), u64> = BTreeMap::new();
    let mut types: BTreeMap<&str, u64> = BTreeMap::new();
    let mut hours: BTreeMap<u8, u64> = BTreeMap::new();
    for record in records {
        if let Some(date) = record.occurred_on {
            *months.entry((date.year(), date.month())).or_default() += 1;
        }
        *types.entry(record.crime_description.as_str()).or_default() += 1;
        if let Some(hour) = record.occurred_hour {
            *hours.entry(hour).or_default() += 1;
        }
    }

    let monthly_trend = months
        .into_iter()
        .map(|((year, month), value)| TrendPoint {
            name: format!("{year:04}-{month:02}"),
            value,
        })
        .collect();

    // BTreeMap iteration is ascending, and the sort is stable, so ties keep
    // that order.
    let mut types: Vec<(&str, u64)> = types.into_iter().collect();
    types.sort_by(|a, b| b.1.cmp(&a.1));
    let distribution_by_type = types
        .into_iter()
        .take(TOP_TYPES)
        .map(|(crime_type, value)| TypeCount {
            crime_type: crime_type.to_string(),
            value,
        })
        .collect();

    let mut hours: Vec<(u8, u64)> = hours.into_iter().collect();
    hours.sort_by(|a, b| b.1.cmp(&a.1));
    let peak_hours = hours
        .into_iter()
        .take(TOP_HOURS)
        .map(|(hour, value)| HourCount { hour, value })
        .collect();

    StatsSummary {
        total_crimes,
        violent_crimes,
        violent_ratio,
        prediction_accuracy: prediction_accuracy.map(accuracy_percent),
        cities_covered: cities.len() as u64,
        monthly_trend,
        distribution_by_type,
        peak_hours,
    }
}
