//! CSV parser for the aggregated meal-order spreadsheet.

use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::debug;

use crate::codes::Hotel;
use crate::error::DataError;
use crate::records::AggregatedRecord;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y"];

/// Raw spreadsheet row. Trailing columns beyond these are ignored.
#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "Hotel")]
    hotel: String,
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Experimental_Condition")]
    condition: i64,
    #[serde(rename = "N_Vegetarian")]
    n_vegetarian: i64,
    #[serde(rename = "N_Non-Vegetarian")]
    n_non_vegetarian: i64,
    #[serde(rename = "Day")]
    day: i64,
    #[serde(rename = "Weekend")]
    weekend: Option<i64>,
}

/// Reads aggregated rows from a CSV file on disk.
pub fn read_aggregates(path: impl AsRef<Path>) -> Result<Vec<AggregatedRecord>, DataError> {
    let file = std::fs::File::open(path.as_ref())?;
    parse_aggregates(file)
}

/// Parses aggregated rows from any CSV source.
///
/// # Errors
///
/// Fails on the first row whose numeric fields are missing or non-integer,
/// whose hotel is unknown, or whose date cannot be parsed.
pub fn parse_aggregates<R: Read>(source: R) -> Result<Vec<AggregatedRecord>, DataError> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(source);

    let headers = rdr
        .headers()
        .map_err(|source| DataError::Csv { line: 1, source })?
        .clone();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|source| DataError::Csv {
            line: source.position().map_or(0, |p| p.line()),
            source,
        })?;
        let line = record.position().map_or(0, |p| p.line());

        // Fully blank lines are common at the end of spreadsheet exports.
        if record.iter().all(str::is_empty) {
            continue;
        }

        let raw: RawRow = record
            .deserialize(Some(&headers))
            .map_err(|source| DataError::Csv { line, source })?;

        let hotel = Hotel::parse(&raw.hotel).ok_or_else(|| DataError::UnexpectedCode {
            line,
            field: "Hotel",
            value: raw.hotel.clone(),
        })?;

        rows.push(AggregatedRecord {
            hotel,
            date: parse_date(&raw.date, line)?,
            intervention_code: raw.condition,
            n_vegetarian: raw.n_vegetarian,
            n_non_vegetarian: raw.n_non_vegetarian,
            day_code: raw.day,
            weekend_code: raw.weekend,
            line,
        });
    }

    debug!(rows = rows.len(), "Parsed aggregated rows");
    Ok(rows)
}

fn parse_date(raw: &str, line: u64) -> Result<NaiveDate, DataError> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| DataError::InvalidDate {
            line,
            value: raw.to_string(),
        })
}
