//! Read the first worksheet of an xlsx document into a [`Table`]
//!
//! The first row is the header row, like a report export opened in a
//! spreadsheet. Completely empty trailing rows are dropped.

use anyhow::{Context, Result};
use calamine::{Data, Reader, Xlsx, open_workbook};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde_json::{Value, json};
use std::io::Cursor;
use std::path::Path;

use crate::transform::Table;

/// Convert an Excel serial date (days since 1899-12-30) to text
fn excel_serial_to_string(serial: f64) -> String {
    let Some(epoch) = NaiveDate::from_ymd_opt(1899, 12, 30).and_then(|d| d.and_hms_opt(0, 0, 0))
    else {
        return serial.to_string();
    };
    let millis = (serial * 86_400_000.0).round() as i64;
    let moment: NaiveDateTime = epoch + Duration::milliseconds(millis);
    if serial.fract() == 0.0 {
        moment.format("%Y-%m-%d").to_string()
    } else {
        moment.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Convert Excel cell to serde_json::Value
fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::String(String::new()),
        Data::String(s) => Value::String(s.clone()),
        Data::Int(i) => json!(*i),
        Data::Float(f) => {
            // Whole numbers come back from Excel as floats
            if f.fract() == 0.0 && f.abs() < 1e15 {
                json!(*f as i64)
            } else {
                json!(*f)
            }
        }
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => Value::String(excel_serial_to_string(dt.as_f64())),
        Data::DateTimeIso(s) => Value::String(s.clone()),
        Data::DurationIso(s) => Value::String(s.clone()),
        Data::Error(_) => Value::String(String::new()),
    }
}

fn header_text(cell: &Data) -> String {
    match cell_to_value(cell) {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn is_blank(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.is_empty())
}

fn table_from_workbook<R>(workbook: &mut Xlsx<R>) -> Result<Table>
where
    R: std::io::Read + std::io::Seek,
{
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range.context("Failed to read first worksheet")?,
        None => return Ok(Table::default()),
    };

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(Table::default());
    };

    let mut table = Table::new(header_row.iter().map(header_text).collect());
    for row in rows {
        table.rows.push(row.iter().map(cell_to_value).collect());
    }
    while table
        .rows
        .last()
        .is_some_and(|row| row.iter().all(is_blank))
    {
        table.rows.pop();
    }

    Ok(table)
}

/// Read a downloaded report held in memory
pub fn read_first_sheet(bytes: &[u8]) -> Result<Table> {
    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes.to_vec())).context("Failed to open xlsx document")?;
    table_from_workbook(&mut workbook)
}

/// Read an xlsx file from disk
pub fn read_first_sheet_from_path<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    let mut workbook: Xlsx<_> = open_workbook(path)
        .with_context(|| format!("Failed to open Excel file: {}", path.display()))?;
    table_from_workbook(&mut workbook)
}
