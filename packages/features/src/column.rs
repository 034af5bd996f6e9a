//! Modelling feature columns and the allow-list that selects them.

use std::str::FromStr as _;

use chrono::Datelike as _;
use crime_analysis_crime_models::{CrimeCategory, InputColumn, NormalizedIncident};
use crime_analysis_ingest_models::SchemaError;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::FeatureError;

/// Whether a feature is used as a number or label-encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeatureKind {
    Numeric,
    Categorical,
}

/// A feature that can be derived from a [`NormalizedIncident`].
///
/// The crime domain is deliberately absent: it defines the target label.
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
pub enum FeatureColumn {
    /// Hour of occurrence (0-23).
    Hour,
    /// Day of week of occurrence, Monday = 0.
    DayOfWeek,
    /// Month of occurrence (1-12).
    Month,
    DayOfMonth,
    VictimAge,
    PoliceDeployed,
    /// 1.0 when the case is closed.
    CaseClosed,
    /// Days between occurrence and report.
    ReportingDelayDays,
    City,
    CrimeDescription,
    /// Keyword taxonomy of the description.
    CrimeCategory,
    VictimGender,
    WeaponUsed,
}

impl FeatureColumn {
    pub const NUMERIC: &[Self] = &[
        Self::Hour,
        Self::DayOfWeek,
        Self::Month,
        Self::DayOfMonth,
        Self::VictimAge,
        Self::PoliceDeployed,
        Self::CaseClosed,
        Self::ReportingDelayDays,
    ];

    pub const CATEGORICAL: &[Self] = &[
        Self::City,
        Self::CrimeDescription,
        Self::CrimeCategory,
        Self::VictimGender,
        Self::WeaponUsed,
    ];

    #[must_use]
    pub fn kind(self) -> FeatureKind {
        if Self::CATEGORICAL.contains(&self) {
            FeatureKind::Categorical
        } else {
            FeatureKind::Numeric
        }
    }

    /// Input columns this feature is derived from.
    #[must_use]
    pub const fn source_columns(self) -> &'static [InputColumn] {
        match self {
            Self::Hour => &[InputColumn::TimeOfOccurrence],
            Self::DayOfWeek | Self::Month | Self::DayOfMonth => &[InputColumn::DateOfOccurrence],
            Self::VictimAge => &[InputColumn::VictimAge],
            Self::PoliceDeployed => &[InputColumn::PoliceDeployed],
            Self::CaseClosed => &[InputColumn::CaseClosed],
            Self::ReportingDelayDays => &[InputColumn::DateReported, InputColumn::DateOfOccurrence],
            Self::City => &[InputColumn::City],
            Self::CrimeDescription | Self::CrimeCategory => &[InputColumn::CrimeDescription],
            Self::VictimGender => &[InputColumn::VictimGender],
            Self::WeaponUsed => &[InputColumn::WeaponUsed],
        }
    }

    /// Numeric value of this feature for `incident`, `None` if unknown or
    /// if the feature is categorical.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn numeric_value(self, incident: &NormalizedIncident) -> Option<f64> {
        match self {
            Self::Hour => incident.occurred_hour.map(f64::from),
            Self::DayOfWeek => incident
                .occurred_on
                .map(|d| f64::from(d.weekday().num_days_from_monday())),
            Self::Month => incident.occurred_on.map(|d| f64::from(d.month())),
            Self::DayOfMonth => incident.occurred_on.map(|d| f64::from(d.day())),
            Self::VictimAge => incident.victim_age.map(f64::from),
            Self::PoliceDeployed => incident.police_deployed.map(f64::from),
            Self::CaseClosed => Some(if incident.case_closed { 1.0 } else { 0.0 }),
            Self::ReportingDelayDays => match (incident.date_reported, incident.occurred_on) {
                (Some(reported), Some(occurred)) => {
                    Some((reported - occurred).num_days() as f64)
                }
                _ => None,
            },
            Self::City
            | Self::CrimeDescription
            | Self::CrimeCategory
            | Self::VictimGender
            | Self::WeaponUsed => None,
        }
    }

    /// Category label of this feature for `incident`, `None` if absent or
    /// if the feature is numeric.
    #[must_use]
    pub fn category_label(self, incident: &NormalizedIncident) -> Option<String> {
        match self {
            Self::City => Some(incident.city.clone()),
            Self::CrimeDescription => Some(incident.crime_description.clone()),
            Self::CrimeCategory => {
                Some(CrimeCategory::from_description(&incident.crime_description).to_string())
            }
            Self::VictimGender => Some(incident.victim_gender.to_string()),
            Self::WeaponUsed => incident.weapon_used.clone(),
            _ => None,
        }
    }
}

/// The validated, ordered allow-list of modelling features.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    columns: Vec<FeatureColumn>,
}

impl FeatureSet {
    /// Resolves configured feature names against the input header.
    ///
    /// Duplicate names are collapsed (first occurrence wins).
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::Schema`] if a name is not a known feature or
    /// a feature's source column is absent from `headers`, and
    /// [`FeatureError::Empty`] if no features are listed.
    pub fn resolve<S: AsRef<str>>(names: &[S], headers: &[String]) -> Result<Self, FeatureError> {
        let mut columns = Vec::with_capacity(names.len());
        let mut unknown = Vec::new();

        for name in names {
            let name = name.as_ref().trim();
            match FeatureColumn::from_str(name) {
                Ok(column) if columns.contains(&column) => {
                    log::warn!("Feature {column} listed more than once");
                }
                Ok(column) => columns.push(column),
                Err(_) => unknown.push(name.to_string()),
            }
        }

        let mut missing: Vec<String> = Vec::new();
        for column in &columns {
            for source in column.source_columns() {
                let header = source.as_ref();
                if !headers.iter().any(|h| h == header) && !missing.iter().any(|m| m == header) {
                    missing.push(header.to_string());
                }
            }
        }

        if !unknown.is_empty() || !missing.is_empty() {
            return Err(FeatureError::Schema(SchemaError {
                missing,
                unexpected: unknown,
                context: "feature columns".to_string(),
            }));
        }
        if columns.is_empty() {
            return Err(FeatureError::Empty);
        }

        Ok(Self { columns })
    }

    /// Builds a set from already-typed columns without header validation.
    #[must_use]
    pub fn from_columns(columns: &[FeatureColumn]) -> Self {
        let mut deduped = Vec::with_capacity(columns.len());
        for column in columns {
            if !deduped.contains(column) {
                deduped.push(*column);
            }
        }
        Self { columns: deduped }
    }

    #[must_use]
    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    /// Selected numeric features, in allow-list order.
    #[must_use]
    pub fn numeric(&self) -> Vec<FeatureColumn> {
        self.columns
            .iter()
            .copied()
            .filter(|c| c.kind() == FeatureKind::Numeric)
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
