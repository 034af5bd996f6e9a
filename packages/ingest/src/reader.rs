//! Delimited-text reader producing [`RawTable`]s.

use std::io::Read;

use crime_analysis_ingest_models::{RawRecord, RawTable, RawValue};

use crate::IngestError;

/// Reads a CSV source into untyped records.
///
/// Short rows are padded with [`RawValue::Empty`]; cells beyond the header
/// width are ignored.
///
/// # Errors
///
/// Returns [`IngestError::Csv`] if the source is not valid CSV, or
/// [`IngestError::EmptyHeader`] if there is no header row.
pub fn read_csv<R: Read>(reader: R) -> Result<RawTable, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_owned())
        .collect();

    if headers.iter().all(String::is_empty) {
        return Err(IngestError::EmptyHeader);
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let fields = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let value = record.get(i).map_or(RawValue::Empty, RawValue::from_cell);
                (header.clone(), value)
            })
            .collect();
        rows.push(RawRecord { fields });
    }

    log::debug!("Read {} rows with {} columns", rows.len(), headers.len());

    Ok(RawTable { headers, rows })
}
