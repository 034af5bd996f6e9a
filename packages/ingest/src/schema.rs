//! Input header validation.

use std::str::FromStr as _;

use crime_analysis_crime_models::InputColumn;
use crime_analysis_ingest_models::SchemaError;

/// Checks an input header against the known schema.
///
/// Returns the list of unexpected (unknown) column names when every
/// required column is present; they are reported, not rejected.
///
/// # Errors
///
/// Returns a [`SchemaError`] naming each missing required column.
pub fn check_headers(headers: &[String]) -> Result<Vec<String>, SchemaError> {
    let unexpected: Vec<String> = headers
        .iter()
        .filter(|h| !h.is_empty() && InputColumn::from_str(h).is_err())
        .cloned()
        .collect();

    let missing: Vec<String> = InputColumn::REQUIRED
        .iter()
        .filter(|column| !headers.iter().any(|h| h == column.as_ref()))
        .map(ToString::to_string)
        .collect();

    if missing.is_empty() {
        Ok(unexpected)
    } else {
        Err(SchemaError {
            missing,
            unexpected,
            context: "input header".to_string(),
        })
    }
}
