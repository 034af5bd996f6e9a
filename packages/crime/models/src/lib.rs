#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Crime incident schema, normalized record types, and domain taxonomy.
//!
//! This crate defines the tabular input schema ([`InputColumn`]), the typed
//! [`NormalizedIncident`] produced by the record normalizer, and the
//! labelled [`CrimeRecord`] whose `is_violent` flag can only be derived
//! through a [`DomainViolenceMap`].

pub mod taxonomy;
pub mod violence;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use taxonomy::CrimeCategory;
pub use violence::{CrimeRecord, DomainViolenceMap};

/// A column of the tabular crime-incident input.
///
/// The string form of each variant is the exact header text expected in
/// the CSV source.
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
pub enum InputColumn {
    #[strum(serialize = "Report Number")]
    #[serde(rename = "Report Number")]
    ReportNumber,
    #[strum(serialize = "Date Reported")]
    #[serde(rename = "Date Reported")]
    DateReported,
    #[strum(serialize = "Date of Occurrence")]
    #[serde(rename = "Date of Occurrence")]
    DateOfOccurrence,
    #[strum(serialize = "Time of Occurrence")]
    #[serde(rename = "Time of Occurrence")]
    TimeOfOccurrence,
    #[strum(serialize = "City")]
    #[serde(rename = "City")]
    City,
    #[strum(serialize = "Crime Code")]
    #[serde(rename = "Crime Code")]
    CrimeCode,
    #[strum(serialize = "Crime Description")]
    #[serde(rename = "Crime Description")]
    CrimeDescription,
    #[strum(serialize = "Victim Age")]
    #[serde(rename = "Victim Age")]
    VictimAge,
    #[strum(serialize = "Victim Gender")]
    #[serde(rename = "Victim Gender")]
    VictimGender,
    #[strum(serialize = "Weapon Used")]
    #[serde(rename = "Weapon Used")]
    WeaponUsed,
    #[strum(serialize = "Crime Domain")]
    #[serde(rename = "Crime Domain")]
    CrimeDomain,
    #[strum(serialize = "Police Deployed")]
    #[serde(rename = "Police Deployed")]
    PoliceDeployed,
    #[strum(serialize = "Case Closed")]
    #[serde(rename = "Case Closed")]
    CaseClosed,
    #[strum(serialize = "Date Case Closed")]
    #[serde(rename = "Date Case Closed")]
    DateCaseClosed,
}

impl InputColumn {
    /// Columns that must be present in every input table.
    pub const REQUIRED: &[Self] = &[
        Self::DateReported,
        Self::DateOfOccurrence,
        Self::TimeOfOccurrence,
        Self::City,
        Self::CrimeDomain,
        Self::CrimeDescription,
        Self::VictimAge,
        Self::VictimGender,
        Self::WeaponUsed,
        Self::PoliceDeployed,
        Self::CaseClosed,
    ];

    /// Columns that are understood when present but not required.
    pub const OPTIONAL: &[Self] = &[Self::ReportNumber, Self::CrimeCode, Self::DateCaseClosed];

    /// Returns whether this column must be present in the input.
    #[must_use]
    pub fn is_required(self) -> bool {
        Self::REQUIRED.contains(&self)
    }

    /// Returns all known columns, required first.
    #[must_use]
    pub fn all() -> Vec<Self> {
        Self::REQUIRED
            .iter()
            .chain(Self::OPTIONAL.iter())
            .copied()
            .collect()
    }
}

/// Victim gender as recorded in the source data.
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
pub enum VictimGender {
    Male,
    Female,
    /// Recorded as `X` or an explicit non-binary/other value.
    Other,
    /// Missing or unrecognised in the source.
    Unknown,
}

impl VictimGender {
    /// Parses the gender codes used by incident exports (`M`, `F`, `X`)
    /// as well as spelled-out values. Returns `None` for anything else.
    #[must_use]
    pub fn parse_label(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "m" | "male" => Some(Self::Male),
            "f" | "female" => Some(Self::Female),
            "x" | "other" | "non-binary" | "nonbinary" => Some(Self::Other),
            "u" | "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

/// A crime incident after field-level parsing and imputation.
///
/// Optional fields are `None` when the source value was missing or could
/// not be parsed and no imputation applies (see the ingest diagnostics for
/// which one it was).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedIncident {
    /// Zero-based index of the source row, kept for audit trails.
    pub source_row: usize,
    /// Report identifier, when the export carries one.
    pub report_number: Option<String>,
    /// Calendar date the incident was reported.
    pub date_reported: Option<NaiveDate>,
    /// Calendar date the incident occurred. `None` means unparseable.
    pub occurred_on: Option<NaiveDate>,
    /// Hour of day (0-23). `None` means unknown, never zero.
    pub occurred_hour: Option<u8>,
    pub city: String,
    pub crime_code: Option<String>,
    pub crime_description: String,
    /// Raw crime-domain text; drives the violence label.
    pub crime_domain: String,
    pub victim_age: Option<u32>,
    pub victim_gender: VictimGender,
    pub weapon_used: Option<String>,
    pub police_deployed: Option<u32>,
    pub case_closed: bool,
    pub date_case_closed: Option<NaiveDate>,
}
