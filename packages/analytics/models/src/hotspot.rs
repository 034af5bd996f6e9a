//! Hotspot report types.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Time dimension a hotspot can be bucketed by.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TimeBucket {
    /// Hour of occurrence (0-23).
    Hour,
    /// Day of week of occurrence.
    DayOfWeek,
    /// Calendar year and month of occurrence.
    Month,
}

/// How records are grouped into hotspots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "bucket", rename_all = "camelCase")]
pub enum HotspotGrouping {
    /// By city.
    Location,
    /// By time bucket only.
    Time(TimeBucket),
    /// By city and time bucket.
    LocationAndTime(TimeBucket),
}

impl HotspotGrouping {
    #[must_use]
    pub const fn by_location(self) -> bool {
        matches!(self, Self::Location | Self::LocationAndTime(_))
    }

    #[must_use]
    pub const fn time_bucket(self) -> Option<TimeBucket> {
        match self {
            Self::Location => None,
            Self::Time(bucket) | Self::LocationAndTime(bucket) => Some(bucket),
        }
    }
}

/// A concrete time-bucket value. `Unknown` collects records whose date or
/// hour could not be parsed and sorts last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BucketValue {
    Hour(u8),
    /// Days from Monday (0-6).
    DayOfWeek(u8),
    YearMonth { year: i32, month: u32 },
    Unknown,
}

const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

impl std::fmt::Display for BucketValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hour(hour) => write!(f, "{hour:02}:00"),
            Self::DayOfWeek(day) => {
                let name = WEEKDAYS.get(usize::from(*day)).copied().unwrap_or("Unknown");
                write!(f, "{name}")
            }
            Self::YearMonth { year, month } => write!(f, "{year:04}-{month:02}"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Risk tier assigned from a group's count percentile and violent ratio.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Critical,
    High,
    Medium,
    Low,
}

/// One group in a [`HotspotReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotspot {
    /// City, when grouping by location.
    pub location: Option<String>,
    /// Time bucket, when grouping by time.
    pub bucket: Option<BucketValue>,
    pub incident_count: u64,
    pub violent_count: u64,
    /// `violent_count / incident_count`; `None` for an empty group.
    pub violent_ratio: Option<f64>,
    pub risk_level: RiskLevel,
}

impl Hotspot {
    /// Human-readable group label, e.g. `Delhi @ 14:00`.
    #[must_use]
    pub fn label(&self) -> String {
        match (&self.location, &self.bucket) {
            (Some(location), Some(bucket)) => format!("{location} @ {bucket}"),
            (Some(location), None) => location.clone(),
            (None, Some(bucket)) => bucket.to_string(),
            (None, None) => "All".to_string(),
        }
    }
}

/// Ranked hotspots: count descending, then violent ratio descending, then
/// location and bucket ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotReport {
    pub grouping: HotspotGrouping,
    /// Records aggregated; equals the sum of all group counts.
    pub total_records: u64,
    pub hotspots: Vec<Hotspot>,
}

impl HotspotReport {
    /// The `n` highest-ranked hotspots.
    #[must_use]
    pub fn top(&self, n: usize) -> &[Hotspot] {
        &self.hotspots[..n.min(self.hotspots.len())]
    }

    /// Hotspots at the given risk level, in rank order.
    pub fn at_risk(&self, level: RiskLevel) -> impl Iterator<Item = &Hotspot> {
        self.hotspots.iter().filter(move |h| h.risk_level == level)
    }
}
