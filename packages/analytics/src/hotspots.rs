//! Hotspot aggregation.
//!
//! Groups labelled records by city and/or a time bucket, counts incidents
//! and violent incidents per group, assigns a [`RiskLevel`], and ranks the
//! groups deterministically.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::Datelike as _;
use crime_analysis_analytics_models::{
    BucketValue, Hotspot, HotspotGrouping, HotspotReport, RiskLevel, TimeBucket,
};
use crime_analysis_crime_models::CrimeRecord;

/// Time-bucket value of `record`, [`BucketValue::Unknown`] when the hour or
/// date is missing.
#[must_use]
pub fn bucket_value(record: &CrimeRecord, bucket: TimeBucket) -> BucketValue {
    match bucket {
        TimeBucket::Hour => record
            .occurred_hour
            .map_or(BucketValue::Unknown, BucketValue::Hour),
        TimeBucket::DayOfWeek => record.occurred_on.map_or(BucketValue::Unknown, |d| {
            #[allow(clippy::cast_possible_truncation)]
            let day = d.weekday().num_days_from_monday() as u8;
            BucketValue::DayOfWeek(day)
        }),
        TimeBucket::Month => record
            .occurred_on
            .map_or(BucketValue::Unknown, |d| BucketValue::YearMonth {
                year: d.year(),
                month: d.month(),
            }),
    }
}

/// Linear-interpolated quantile of an ascending slice.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Risk tier from a group's count relative to all group counts and its
/// violent ratio.
///
/// Above the 75th percentile: ratio > 0.4 is critical, > 0.25 high,
/// otherwise medium. Above the median: ratio > 0.3 is high, otherwise
/// medium. Everything else is low.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn classify_risk(count: u64, violent_ratio: Option<f64>, median: f64, p75: f64) -> RiskLevel {
    let count = count as f64;
    let ratio = violent_ratio.unwrap_or(0.0);
    if count > p75 {
        if ratio > 0.4 {
            RiskLevel::Critical
        } else if ratio > 0.25 {
            RiskLevel::High
        } else {
            RiskLevel::Medium
        }
    } else if count > median {
        if ratio > 0.3 {
            RiskLevel::High
        } else {
            RiskLevel::Medium
        }
    } else {
        RiskLevel::Low
    }
}

fn ratio_descending(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn rank(a: &Hotspot, b: &Hotspot) -> Ordering {
    b.incident_count
        .cmp(&a.incident_count)
        .then_with(|| ratio_descending(a.violent_ratio, b.violent_ratio))
        .then_with(|| a.location.cmp(&b.location))
        .then_with(|| a.bucket.cmp(&b.bucket))
}

/// Groups `records` by `grouping` and ranks the groups.
///
/// Every record lands in exactly one group, so group counts sum to
/// `records.len()`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn aggregate_hotspots(records: &[CrimeRecord], grouping: HotspotGrouping) -> HotspotReport {
    let mut groups: BTreeMap<(Option<String>, Option<BucketValue>), (u64, u64)> = BTreeMap::new();

    for record in records {
        let location = grouping.by_location().then(|| record.city.clone());
        let bucket = grouping.time_bucket().map(|b| bucket_value(record, b));
        let entry = groups.entry((location, bucket)).or_insert((0, 0));
        entry.0 += 1;
        if record.is_violent() {
            entry.1 += 1;
        }
    }

    let mut counts: Vec<f64> = groups.values().map(|(total, _)| *total as f64).collect();
    counts.sort_unstable_by(f64::total_cmp);
    let median = quantile(&counts, 0.5);
    let p75 = quantile(&counts, 0.75);

    let mut hotspots: Vec<Hotspot> = groups
        .into_iter()
        .map(|((location, bucket), (incident_count, violent_count))| {
            let violent_ratio =
                (incident_count > 0).then(|| violent_count as f64 / incident_count as f64);
            Hotspot {
                location,
                bucket,
                incident_count,
                violent_count,
                violent_ratio,
                risk_level: classify_risk(incident_count, violent_ratio, median, p75),
            }
        })
        .collect();
    hotspots.sort_by(rank);

    log::debug!(
        "Aggregated {} records into {} hotspot groups ({grouping:?})",
        records.len(),
        hotspots.len()
    );

    HotspotReport {
        grouping,
        total_records: records.len() as u64,
        hotspots,
    }
}
