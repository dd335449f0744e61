use crate::error::{EnergyForecastError, Result};
use csv::{ReaderBuilder, Writer};
use log::debug;
use std::io::{Read, Write};

/// An uploaded table before any validation: exact header names and raw cell text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Convenience constructor for tables built in code.
    pub fn from_str_rows(headers: &[&str], rows: &[&[&str]]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell text, or an empty string when the row is shorter than the header.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Reads a headed CSV into a [`RawTable`]. Ragged rows are accepted and fully
/// blank lines are skipped; type coercion happens later, during cleaning.
pub fn read_csv_table<R: Read>(reader: R) -> Result<RawTable> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    debug!(
        "Read CSV table with {} columns and {} rows",
        headers.len(),
        rows.len()
    );

    Ok(RawTable { headers, rows })
}

/// Writes a [`RawTable`] as a headed CSV.
pub fn write_csv_table<W: Write>(table: &RawTable, writer: W) -> Result<W> {
    let mut csv_writer = Writer::from_writer(writer);
    csv_writer.write_record(&table.headers)?;
    for row in &table.rows {
        csv_writer.write_record(row)?;
    }
    csv_writer
        .into_inner()
        .map_err(|e| EnergyForecastError::from(e.into_error()))
}
