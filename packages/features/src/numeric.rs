//! Column-oriented view of numeric features with nulls preserved.

use crime_analysis_crime_models::CrimeRecord;
use serde::{Deserialize, Serialize};

use crate::column::{FeatureColumn, FeatureKind};

/// Name of the target column when it is included as a candidate.
pub const TARGET_COLUMN: &str = "is_violent";

/// Numeric candidate columns for covariance estimation. Unlike the encoded
/// matrix, missing values stay `None` so non-null counts are honest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericFeatureTable {
    pub names: Vec<String>,
    pub columns: Vec<Vec<Option<f64>>>,
}

impl NumericFeatureTable {
    /// Extracts the numeric `features` from `records`. Categorical
    /// columns are skipped. When `include_target` is set the violence
    /// label is appended as a 0/1 column.
    #[must_use]
    pub fn from_records(
        records: &[CrimeRecord],
        features: &[FeatureColumn],
        include_target: bool,
    ) -> Self {
        let mut names = Vec::new();
        let mut columns = Vec::new();

        for &feature in features {
            if feature.kind() != FeatureKind::Numeric {
                continue;
            }
            names.push(feature.to_string());
            columns.push(
                records
                    .iter()
                    .map(|r| feature.numeric_value(r.incident()))
                    .collect(),
            );
        }

        if include_target {
            names.push(TARGET_COLUMN.to_string());
            columns.push(
                records
                    .iter()
                    .map(|r| Some(if r.is_violent() { 1.0 } else { 0.0 }))
                    .collect(),
            );
        }

        Self { names, columns }
    }

    /// Number of rows (0 for a table without columns).
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    #[must_use]
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Non-null count of column `index`.
    #[must_use]
    pub fn non_null_count(&self, index: usize) -> usize {
        self.columns
            .get(index)
            .map_or(0, |c| c.iter().filter(|v| v.is_some()).count())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use crime_analysis_crime_models::{DomainViolenceMap, NormalizedIncident, VictimGender};

    use super::*;

    fn record(hour: Option<u8>, domain: &str) -> CrimeRecord {
        DomainViolenceMap::default().label(NormalizedIncident {
            source_row: 0,
            report_number: None,
            date_reported: None,
            occurred_on: NaiveDate::from_ymd_opt(2023, 5, 6),
            occurred_hour: hour,
            city: "Delhi".to_string(),
            crime_code: None,
            crime_description: "ARSON".to_string(),
            crime_domain: domain.to_string(),
            victim_age: Some(41),
            victim_gender: VictimGender::Other,
            weapon_used: None,
            police_deployed: None,
            case_closed: false,
            date_case_closed: None,
        })
    }

    #[test]
    fn keeps_nulls_and_skips_categoricals() {
        let records = [record(Some(3), "Violent Crime"), record(None, "Fire Accident")];
        let table = NumericFeatureTable::from_records(
            &records,
            &[FeatureColumn::Hour, FeatureColumn::City, FeatureColumn::PoliceDeployed],
            true,
        );
        assert_eq!(table.names, vec!["hour", "police_deployed", "is_violent"]);
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.non_null_count(0), 1);
        assert_eq!(table.non_null_count(1), 0);
        assert_eq!(table.columns[2], vec![Some(1.0), Some(0.0)]);
    }
}
