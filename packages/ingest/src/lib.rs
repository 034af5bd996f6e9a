#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Record normalizer for tabular crime-incident exports.
//!
//! Turns a CSV export (or an already-loaded [`RawTable`]) into typed
//! [`NormalizedIncident`](crime_analysis_crime_models::NormalizedIncident)
//! records plus an [`IngestDiagnostics`](crime_analysis_ingest_models::IngestDiagnostics)
//! audit of every dropped row, parse failure, and imputed value.

pub mod normalize;
pub mod parsing;
pub mod reader;
pub mod schema;

use std::path::Path;

use crime_analysis_ingest_models::{RawTable, SchemaError};
use thiserror::Error;

pub use normalize::{NormalizedBatch, UNKNOWN_LABEL, normalize};
pub use reader::read_csv;

/// Errors that can occur while reading or normalizing input.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The source is not valid delimited text.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The source file could not be opened.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A required column is missing.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// The source has no header row.
    #[error("Input has no header row")]
    EmptyHeader,
}

/// Reads and normalizes an in-memory CSV upload.
///
/// # Errors
///
/// Returns [`IngestError`] if the bytes are not valid CSV or the header is
/// missing required columns.
pub fn normalize_csv_bytes(bytes: &[u8]) -> Result<NormalizedBatch, IngestError> {
    let table = read_csv(bytes)?;
    normalize(&table)
}

/// Reads and normalizes a CSV file from disk.
///
/// # Errors
///
/// Returns [`IngestError`] if the file cannot be opened, is not valid CSV,
/// or is missing required columns.
pub fn normalize_csv_path(path: &Path) -> Result<NormalizedBatch, IngestError> {
    log::info!("Reading incidents from {}", path.display());
    let file = std::fs::File::open(path)?;
    let table: RawTable = read_csv(std::io::BufReader::new(file))?;
    normalize(&table)
}
