//! Dashboard summary payload.
//!
//! Key names are part of the external contract and must not change.

use serde::{Deserialize, Serialize};

/// One point of the monthly trend series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// `YYYY-MM`.
    pub name: String,
    pub value: u64,
}

/// Incident count for one crime description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub crime_type: String,
    pub value: u64,
}

/// Incident count for one hour of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourCount {
    pub hour: u8,
    pub value: u64,
}

/// Summary statistics for the stats collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub total_crimes: u64,
    pub violent_crimes: u64,
    pub violent_ratio: f64,
    /// Held-out accuracy as a percentage (`94.5`, not `0.945`), `None`
    /// when the model could not be trained.
    pub prediction_accuracy: Option<f64>,
    pub cities_covered: u64,
    /// Ascending by month.
    pub monthly_trend: Vec<TrendPoint>,
    /// Most frequent crime descriptions, highest first.
    pub distribution_by_type: Vec<TypeCount>,
    /// Busiest hours, highest first.
    pub peak_hours: Vec<HourCount>,
}
