// 🏗️ Import Parser - phase 1 of a batch: read and validate every row
//
// Format: `;`-separated, double-quote quoting, exact 7-column header.
// Nothing here touches the store; a single bad row rejects the whole text.

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;

use crate::constants::{
    IMPORT_DELIMITER, IMPORT_HEADER, MAX_CATEGORY_NAME_LENGTH, MAX_DESCRIPTION_LENGTH,
    MAX_RECIPIENT_ADDRESS_LENGTH, MAX_RECIPIENT_NAME_LENGTH,
};
use crate::error::{Result, ValidationError};
use crate::names::normalize;

lazy_static! {
    static ref AMOUNT_PATTERN: Regex = Regex::new(r"^[+-]?\d+(\.\d+)?$").unwrap();
    static ref DATE_PATTERN: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
}

const BOM: char = '\u{feff}';

// ============================================================================
// CORE TYPES
// ============================================================================

/// One validated data row, names already normalized
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportRow {
    /// 1-based line in the input text
    pub line: usize,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub description: Option<String>,
    pub recipient_name: Option<String>,
    pub recipient_address: Option<String>,
    pub tag_name: Option<String>,
    pub periodic: bool,
}

// ============================================================================
// PARSING
// ============================================================================

/// Parse and validate the whole batch; returns rows in file order
pub fn parse_batch(text: &str) -> Result<Vec<ImportRow>> {
    let text = text.strip_prefix(BOM).unwrap_or(text);

    let mut reader = ReaderBuilder::new()
        .delimiter(IMPORT_DELIMITER)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let lines = LineIndex::new(text);
    let mut records = reader.records();

    let header = match records.next() {
        Some(result) => result.map_err(|e| csv_error(e, &lines))?,
        None => return Err(ValidationError::at_row(1, "header", "missing header line").into()),
    };
    if lines.record_line(&header) != 1 {
        return Err(ValidationError::at_row(1, "header", "header must be the first line").into());
    }
    check_header(&header)?;

    let mut rows = Vec::new();
    for result in records {
        let record = result.map_err(|e| csv_error(e, &lines))?;
        let line = lines.record_line(&record);

        if record.iter().all(|field| field.trim().is_empty()) {
            log::debug!("skipping blank import line {}", line);
            continue;
        }

        rows.push(parse_row(&record, line)?);
    }

    log::debug!("parsed {} import row(s)", rows.len());
    Ok(rows)
}

fn check_header(header: &StringRecord) -> Result<()> {
    let fields: Vec<&str> = header.iter().collect();
    if fields != IMPORT_HEADER {
        return Err(ValidationError::at_row(
            1,
            "header",
            format!("expected \"{}\", got \"{}\"", IMPORT_HEADER.join(";"), fields.join(";")),
        )
        .into());
    }
    Ok(())
}

fn parse_row(record: &StringRecord, line: usize) -> Result<ImportRow> {
    if record.len() != IMPORT_HEADER.len() {
        return Err(ValidationError::at_row(
            line,
            "row",
            format!("expected {} fields, got {}", IMPORT_HEADER.len(), record.len()),
        )
        .into());
    }

    let field = |idx: usize| record.get(idx).map(str::trim).unwrap_or("");

    let amount = parse_amount(field(0), line)?;
    let date = parse_date(field(1), line)?;
    let description = optional_text(field(2), "description", MAX_DESCRIPTION_LENGTH, line)?;
    let recipient_name = optional_name(field(3), "recipient_name", MAX_RECIPIENT_NAME_LENGTH, line)?;
    let recipient_address =
        optional_text(field(4), "recipient_address", MAX_RECIPIENT_ADDRESS_LENGTH, line)?;
    let tag_name = optional_name(field(5), "tag_name", MAX_CATEGORY_NAME_LENGTH, line)?;
    let periodic = parse_periodic(field(6), line)?;

    Ok(ImportRow {
        line,
        amount,
        date,
        description,
        recipient_name,
        recipient_address,
        tag_name,
        periodic,
    })
}

fn parse_amount(raw: &str, line: usize) -> Result<Decimal> {
    if !AMOUNT_PATTERN.is_match(raw) {
        return Err(ValidationError::at_row(line, "amount", format!("\"{}\" is not a signed decimal", raw)).into());
    }

    let unsigned = raw.strip_prefix('+').unwrap_or(raw);
    Decimal::from_str(unsigned)
        .map_err(|e| ValidationError::at_row(line, "amount", format!("\"{}\" out of range: {}", raw, e)).into())
}

fn parse_date(raw: &str, line: usize) -> Result<NaiveDate> {
    if !DATE_PATTERN.is_match(raw) {
        return Err(ValidationError::at_row(line, "date", format!("\"{}\" is not YYYY-MM-DD", raw)).into());
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ValidationError::at_row(line, "date", format!("\"{}\" is not a calendar date", raw)).into())
}

fn parse_periodic(raw: &str, line: usize) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "false" => Ok(false),
        "true" => Ok(true),
        _ => Err(ValidationError::at_row(line, "periodic", format!("\"{}\" is not true or false", raw)).into()),
    }
}

fn optional_text(raw: &str, field: &str, max_len: usize, line: usize) -> Result<Option<String>> {
    if raw.is_empty() {
        return Ok(None);
    }
    let len = raw.chars().count();
    if len > max_len {
        return Err(ValidationError::at_row(
            line,
            field,
            format!("exceeds {} characters (got {})", max_len, len),
        )
        .into());
    }
    Ok(Some(raw.to_string()))
}

/// Like `optional_text` but whitespace-collapsed, so names dedupe on it directly
fn optional_name(raw: &str, field: &str, max_len: usize, line: usize) -> Result<Option<String>> {
    optional_text(&normalize(raw), field, max_len, line)
}

// ============================================================================
// LINE NUMBERS
// ============================================================================

/// Maps csv byte offsets back to physical 1-based lines.
///
/// The csv reader drops empty lines without counting them, and a record's
/// position is taken before those skipped terminators, so `Position::line()`
/// runs low after a blank line. Offsets are resolved against the raw text.
struct LineIndex<'a> {
    text: &'a [u8],
    newlines: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(text: &'a str) -> Self {
        LineIndex {
            text: text.as_bytes(),
            newlines: text.match_indices('\n').map(|(idx, _)| idx).collect(),
        }
    }

    fn line_at(&self, byte: u64) -> usize {
        let mut start = (byte as usize).min(self.text.len());
        while start < self.text.len() && matches!(self.text[start], b'\n' | b'\r') {
            start += 1;
        }
        self.newlines.partition_point(|&nl| nl < start) + 1
    }

    fn record_line(&self, record: &StringRecord) -> usize {
        record.position().map(|p| self.line_at(p.byte())).unwrap_or(0)
    }
}

fn csv_error(err: csv::Error, lines: &LineIndex<'_>) -> crate::error::Error {
    let line = err.position().map(|p| lines.line_at(p.byte())).unwrap_or(0);
    ValidationError::at_row(line, "row", err.to_string()).into()
}

// ============================================================================
// TESTS
// ============================================================================
