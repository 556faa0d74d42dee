//! CSV import and export for tables.
//!
//! Every cell is parsed with [`Value::parse`], so numeric columns come back
//! as numbers, empty cells and `NA`-style markers as missing values, and
//! anything else as text. Headers are required.
//!
//! ## Example
//!
//! ```rust,ignore
//! use synth_eval::table::{read_csv, write_csv};
//!
//! let table = read_csv("X_train.csv")?;
//! write_csv(&table, "X_copy.csv")?;
//! ```

use std::io::{Read, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::table::{Column, Table, Value};

/// Read a table from a CSV file with a header row.
pub fn read_csv(path: impl AsRef<Path>) -> Result<Table> {
    let reader = csv::Reader::from_path(path.as_ref())?;
    read_records(reader)
}

/// Read a table from any CSV source with a header row.
pub fn read_csv_from<R: Read>(source: R) -> Result<Table> {
    read_records(csv::Reader::from_reader(source))
}

fn read_records<R: Read>(mut reader: csv::Reader<R>) -> Result<Table> {
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
    if headers.is_empty() {
        return Err(Error::CsvImport {
            line: 1,
            reason: "missing header row".to_string(),
        });
    }

    let mut values: Vec<Vec<Value>> = vec![Vec::new(); headers.len()];
    for (line_num, record) in reader.records().enumerate() {
        let record = record.map_err(|e| Error::CsvImport {
            line: line_num + 2, // +2 for 1-based and header
            reason: e.to_string(),
        })?;
        if record.len() != headers.len() {
            return Err(Error::CsvImport {
                line: line_num + 2,
                reason: format!("expected {} fields, found {}", headers.len(), record.len()),
            });
        }
        for (column, cell) in values.iter_mut().zip(record.iter()) {
            column.push(Value::parse(cell));
        }
    }

    Table::new(
        headers
            .into_iter()
            .zip(values)
            .map(|(name, values)| Column { name, values })
            .collect(),
    )
}

/// Write a table to a CSV file with a header row. Missing cells are written
/// as empty fields.
pub fn write_csv(table: &Table, path: impl AsRef<Path>) -> Result<()> {
    let writer = csv::Writer::from_path(path.as_ref())?;
    write_records(table, writer)
}

/// Write a table as CSV to any sink.
pub fn write_csv_to<W: Write>(table: &Table, sink: W) -> Result<()> {
    write_records(table, csv::Writer::from_writer(sink))
}

fn write_records<W: Write>(table: &Table, mut wtr: csv::Writer<W>) -> Result<()> {
    wtr.write_record(table.columns().iter().map(|c| c.name.as_str()))?;
    for row in 0..table.n_rows() {
        wtr.write_record(table.columns().iter().map(|c| c.values[row].to_string()))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Find a header index by name (case-insensitive).
pub(crate) fn find_header_index(headers: &[String], name: &str) -> Option<usize> {
    let name_lower = name.to_lowercase();
    headers.iter().position(|h| h.to_lowercase() == name_lower)
}
