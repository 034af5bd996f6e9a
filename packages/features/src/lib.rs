#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Feature engine: violence labelling, feature selection, and encoding.
//!
//! Labelling goes through a [`DomainViolenceMap`] only. Modelling features
//! come from an explicit allow-list ([`FeatureSet`]) and are encoded by an
//! immutable [`EncoderState`] that is fit once and reused for inference.

pub mod column;
pub mod encoder;
pub mod numeric;

use std::collections::BTreeMap;

use crime_analysis_crime_models::{CrimeRecord, DomainViolenceMap, NormalizedIncident};
use crime_analysis_ingest_models::SchemaError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use column::{FeatureColumn, FeatureKind, FeatureSet};
pub use encoder::{
    CategoryEncoding, EncodedFeatureMatrix, EncoderState, EncodingReport, UNKNOWN_CODE,
    UnknownCategoryFallback,
};
pub use numeric::{NumericFeatureTable, TARGET_COLUMN};

/// Errors that can occur while building features.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// A listed feature is unknown or its source column is absent.
    #[error("Feature schema error: {0}")]
    Schema(SchemaError),

    /// The feature allow-list is empty.
    #[error("No feature columns configured")]
    Empty,
}

/// Labelled records plus crime domains that had no configured label.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelledRecords {
    pub records: Vec<CrimeRecord>,
    /// Unmapped domain text with occurrence counts. These label as
    /// non-violent.
    pub unmapped_domains: BTreeMap<String, u64>,
}

impl LabelledRecords {
    #[must_use]
    pub fn violent_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_violent()).count()
    }
}

/// Derives `is_violent` for each incident from its crime domain.
#[must_use]
pub fn label_records(incidents: Vec<NormalizedIncident>, map: &DomainViolenceMap) -> LabelledRecords {
    let mut unmapped_domains = BTreeMap::new();

    let records: Vec<CrimeRecord> = incidents
        .into_iter()
        .map(|incident| {
            if !map.is_mapped(&incident.crime_domain) {
                *unmapped_domains
                    .entry(incident.crime_domain.clone())
                    .or_insert(0) += 1;
            }
            map.label(incident)
        })
        .collect();

    for (domain, count) in &unmapped_domains {
        log::warn!("Crime domain {domain:?} is not in the violence map ({count} rows labelled non-violent)");
    }

    let labelled = LabelledRecords {
        records,
        unmapped_domains,
    };
    log::info!(
        "Labelled {} records ({} violent)",
        labelled.records.len(),
        labelled.violent_count()
    );
    labelled
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use crime_analysis_crime_models::VictimGender;

    use super::*;

    fn incident(domain: &str, age: Option<u32>) -> NormalizedIncident {
        NormalizedIncident {
            source_row: 0,
            report_number: None,
            date_reported: None,
            occurred_on: NaiveDate::from_ymd_opt(2023, 3, 1),
            occurred_hour: Some(14),
            city: "Delhi".to_string(),
            crime_code: None,
            crime_description: "ASSAULT".to_string(),
            crime_domain: domain.to_string(),
            victim_age: age,
            victim_gender: VictimGender::Female,
            weapon_used: None,
            police_deployed: None,
            case_closed: false,
            date_case_closed: None,
        }
    }

    #[test]
    fn labels_from_domain_map() {
        let labelled = label_records(
            vec![
                incident("Violent Crime", Some(30)),
                incident("other crime", Some(30)),
            ],
            &DomainViolenceMap::default(),
        );
        assert!(labelled.records[0].is_violent());
        assert!(!labelled.records[1].is_violent());
        assert!(labelled.unmapped_domains.is_empty());
        assert_eq!(labelled.violent_count(), 1);
    }

    #[test]
    fn counts_unmapped_domains() {
        let labelled = label_records(
            vec![incident("Cyber Crime", None), incident("Cyber Crime", None)],
            &DomainViolenceMap::default(),
        );
        assert_eq!(labelled.unmapped_domains["Cyber Crime"], 2);
        assert_eq!(labelled.violent_count(), 0);
    }

    #[test]
    fn custom_map_changes_label() {
        let map = DomainViolenceMap::new([("Fire Accident", true)]);
        let labelled = label_records(vec![incident("Fire Accident", None)], &map);
        assert!(labelled.records[0].is_violent());
    }
}
