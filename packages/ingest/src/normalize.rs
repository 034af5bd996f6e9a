//! Raw-row to [`NormalizedIncident`] conversion with imputation.
//!
//! Runs in two passes: the first parses every field and collects observed
//! numeric values, the second fills numeric gaps with the median of those
//! observations. Every blank cell, parse failure, imputation, and dropped
//! row is counted in the returned [`IngestDiagnostics`].

use crime_analysis_crime_models::{InputColumn, NormalizedIncident, VictimGender};
use crime_analysis_ingest_models::{
    DropReason, IngestDiagnostics, ParseFailure, ParseFailureKind, RawRecord, RawTable,
};

use crate::IngestError;
use crate::parsing::{
    HourParse, HourStage, median_count, parse_count, parse_day_first_date, parse_flag, parse_hour,
};
use crate::schema::check_headers;

/// Placeholder for blank categorical text fields.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Normalized records plus the audit trail of how they were produced.
#[derive(Debug, Clone)]
pub struct NormalizedBatch {
    pub records: Vec<NormalizedIncident>,
    pub diagnostics: IngestDiagnostics,
}

/// First-pass parse of one row, before numeric imputation.
struct ParsedRow {
    source_row: usize,
    report_number: Option<String>,
    date_reported: Option<chrono::NaiveDate>,
    occurred_on: Option<chrono::NaiveDate>,
    occurred_hour: Option<u8>,
    city: Option<String>,
    crime_code: Option<String>,
    crime_description: Option<String>,
    crime_domain: String,
    victim_age: Option<u32>,
    victim_gender: Option<VictimGender>,
    weapon_used: Option<String>,
    police_deployed: Option<u32>,
    case_closed: Option<bool>,
    date_case_closed: Option<chrono::NaiveDate>,
}

/// Field accessor for one raw row that keeps the diagnostics current.
struct RowReader<'a> {
    row: usize,
    raw: &'a RawRecord,
    diagnostics: &'a mut IngestDiagnostics,
}

impl RowReader<'_> {
    /// Non-empty text of `column`. Blank cells of present columns count as
    /// missing; columns absent from the header are not counted.
    fn text(&mut self, column: InputColumn) -> Option<String> {
        let value = self.raw.get(column)?;
        let text = value.as_text();
        if text.is_none() {
            self.diagnostics.field_mut(column).missing += 1;
        }
        text
    }

    /// Parses `column` with `parse`, recording a failure when the text is
    /// present but rejected.
    fn parsed<T>(
        &mut self,
        column: InputColumn,
        kind: ParseFailureKind,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Option<T> {
        let text = self.text(column)?;
        let value = parse(&text);
        if value.is_none() {
            self.fail(column, kind, text);
        }
        value
    }

    fn fail(&mut self, column: InputColumn, kind: ParseFailureKind, raw: String) {
        log::debug!(
            "Row {}: could not parse {column} value {raw:?} as {kind:?}",
            self.row
        );
        self.diagnostics.record_parse_failure(ParseFailure {
            row: self.row,
            column,
            kind,
            raw,
        });
    }

    fn hour(&mut self) -> Option<u8> {
        let text = self.text(InputColumn::TimeOfOccurrence)?;
        match parse_hour(&text) {
            HourParse::Parsed { hour, stage } => {
                if stage == HourStage::SplitFallback {
                    self.diagnostics.hour_fallbacks += 1;
                }
                Some(hour)
            }
            HourParse::Unparseable => {
                self.fail(InputColumn::TimeOfOccurrence, ParseFailureKind::Time, text);
                None
            }
        }
    }

    fn gender(&mut self) -> Option<VictimGender> {
        self.parsed(
            InputColumn::VictimGender,
            ParseFailureKind::Category,
            VictimGender::parse_label,
        )
    }

    fn parse(mut self, crime_domain: String) -> ParsedRow {
        ParsedRow {
            source_row: self.row,
            report_number: self.text(InputColumn::ReportNumber),
            date_reported: self.parsed(
                InputColumn::DateReported,
                ParseFailureKind::Date,
                parse_day_first_date,
            ),
            occurred_on: self.parsed(
                InputColumn::DateOfOccurrence,
                ParseFailureKind::Date,
                parse_day_first_date,
            ),
            occurred_hour: self.hour(),
            city: self.text(InputColumn::City),
            crime_code: self.text(InputColumn::CrimeCode),
            crime_description: self.text(InputColumn::CrimeDescription),
            crime_domain,
            victim_age: self.parsed(
                InputColumn::VictimAge,
                ParseFailureKind::Integer,
                parse_count,
            ),
            victim_gender: self.gender(),
            weapon_used: self.text(InputColumn::WeaponUsed),
            police_deployed: self.parsed(
                InputColumn::PoliceDeployed,
                ParseFailureKind::Integer,
                parse_count,
            ),
            case_closed: self.parsed(InputColumn::CaseClosed, ParseFailureKind::Boolean, parse_flag),
            date_case_closed: self.parsed(
                InputColumn::DateCaseClosed,
                ParseFailureKind::Date,
                parse_day_first_date,
            ),
        }
    }
}

/// Fills `value` from `fill` when empty, counting the outcome.
fn impute<T: Clone>(
    diagnostics: &mut IngestDiagnostics,
    column: InputColumn,
    value: Option<T>,
    fill: Option<&T>,
) -> Option<T> {
    match (value, fill) {
        (Some(v), _) => Some(v),
        (None, Some(f)) => {
            diagnostics.field_mut(column).imputed += 1;
            Some(f.clone())
        }
        (None, None) => {
            diagnostics.field_mut(column).left_empty += 1;
            None
        }
    }
}

/// Counts an unfilled optional value.
fn keep_empty<T>(
    diagnostics: &mut IngestDiagnostics,
    column: InputColumn,
    present: bool,
    value: Option<T>,
) -> Option<T> {
    if present && value.is_none() {
        diagnostics.field_mut(column).left_empty += 1;
    }
    value
}

/// Normalizes a raw table into typed incidents.
///
/// Rows without a crime domain are excluded (the violence label cannot be
/// derived) and counted under [`DropReason::MissingCrimeDomain`]. Victim
/// age and police deployment gaps are filled with the median of observed
/// values; blank city, description, and gender become `Unknown`; a blank
/// case-closed flag becomes `false`. Dates and hours that cannot be parsed
/// stay `None`.
///
/// # Errors
///
/// Returns [`IngestError::Schema`] if a required column is missing from
/// the header.
#[allow(clippy::too_many_lines)]
pub fn normalize(table: &RawTable) -> Result<NormalizedBatch, IngestError> {
    let unexpected_columns = check_headers(&table.headers)?;
    if !unexpected_columns.is_empty() {
        log::warn!(
            "Ignoring {} unexpected column(s): {}",
            unexpected_columns.len(),
            unexpected_columns.join(", ")
        );
    }

    let mut diagnostics = IngestDiagnostics {
        rows_in: table.rows.len() as u64,
        unexpected_columns,
        ..IngestDiagnostics::default()
    };

    let has_column = |column: InputColumn| table.headers.iter().any(|h| h == column.as_ref());
    let has_case_closed_date = has_column(InputColumn::DateCaseClosed);

    let mut parsed = Vec::with_capacity(table.rows.len());
    for (row, raw) in table.rows.iter().enumerate() {
        let mut reader = RowReader {
            row,
            raw,
            diagnostics: &mut diagnostics,
        };
        let Some(crime_domain) = reader.text(InputColumn::CrimeDomain) else {
            log::debug!("Row {row}: dropping row with blank crime domain");
            diagnostics.record_drop(DropReason::MissingCrimeDomain);
            continue;
        };
        parsed.push(reader.parse(crime_domain));
    }

    let ages: Vec<u32> = parsed.iter().filter_map(|p| p.victim_age).collect();
    let deployments: Vec<u32> = parsed.iter().filter_map(|p| p.police_deployed).collect();
    let age_fill = median_count(&ages);
    let police_fill = median_count(&deployments);
    let unknown = UNKNOWN_LABEL.to_string();

    let mut records = Vec::with_capacity(parsed.len());
    for p in parsed {
        let d = &mut diagnostics;

        let victim_gender = impute(
            d,
            InputColumn::VictimGender,
            p.victim_gender,
            Some(&VictimGender::Unknown),
        )
        .unwrap_or(VictimGender::Unknown);

        records.push(NormalizedIncident {
            source_row: p.source_row,
            report_number: p.report_number,
            date_reported: keep_empty(d, InputColumn::DateReported, true, p.date_reported),
            occurred_on: keep_empty(d, InputColumn::DateOfOccurrence, true, p.occurred_on),
            occurred_hour: keep_empty(d, InputColumn::TimeOfOccurrence, true, p.occurred_hour),
            city: impute(d, InputColumn::City, p.city, Some(&unknown)).unwrap_or_default(),
            crime_code: p.crime_code,
            crime_description: impute(
                d,
                InputColumn::CrimeDescription,
                p.crime_description,
                Some(&unknown),
            )
            .unwrap_or_default(),
            crime_domain: p.crime_domain,
            victim_age: impute(d, InputColumn::VictimAge, p.victim_age, age_fill.as_ref()),
            victim_gender,
            weapon_used: keep_empty(d, InputColumn::WeaponUsed, true, p.weapon_used),
            police_deployed: impute(
                d,
                InputColumn::PoliceDeployed,
                p.police_deployed,
                police_fill.as_ref(),
            ),
            case_closed: impute(d, InputColumn::CaseClosed, p.case_closed, Some(&false))
                .unwrap_or(false),
            date_case_closed: keep_empty(
                d,
                InputColumn::DateCaseClosed,
                has_case_closed_date,
                p.date_case_closed,
            ),
        });
    }

    let fills = [
        (InputColumn::VictimAge, age_fill.map(|v| v.to_string())),
        (InputColumn::PoliceDeployed, police_fill.map(|v| v.to_string())),
        (InputColumn::City, Some(unknown.clone())),
        (InputColumn::CrimeDescription, Some(unknown.clone())),
        (InputColumn::VictimGender, Some(VictimGender::Unknown.to_string())),
        (InputColumn::CaseClosed, Some(false.to_string())),
    ];
    for (column, fill) in fills {
        if let Some(fill) = fill
            && diagnostics.field(column).imputed > 0
        {
            diagnostics.imputation_values.insert(column, fill);
        }
    }

    diagnostics.rows_out = records.len() as u64;

    log::info!(
        "Normalized {}/{} rows ({} dropped, {} parse failures, {} hours via fallback)",
        diagnostics.rows_out,
        diagnostics.rows_in,
        diagnostics.rows_dropped(),
        diagnostics.parse_failures.len(),
        diagnostics.hour_fallbacks,
    );

    Ok(NormalizedBatch {
        records,
        diagnostics,
    })
}
