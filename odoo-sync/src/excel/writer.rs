//! Write a [`Table`] to an xlsx file

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};
use serde_json::Value;
use std::path::Path;

use crate::transform::Table;

/// Write `table` to `path` as a single worksheet, header row first
pub fn write_table_xlsx<P: AsRef<Path>>(table: &Table, sheet_name: &str, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for (col, header) in table.headers.iter().enumerate() {
        worksheet.write_string(0, col as u16, header)?;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        let row_num = (row_idx + 1) as u32;
        for (col, value) in row.iter().enumerate() {
            write_value(worksheet, row_num, col as u16, value)?;
        }
    }

    workbook
        .save(path)
        .with_context(|| format!("Failed to save Excel file: {}", path.display()))?;

    Ok(())
}

fn write_value(ws: &mut Worksheet, row: u32, col: u16, value: &Value) -> Result<()> {
    match value {
        Value::Null => { /* Leave cell empty */ }
        Value::String(s) if s.is_empty() => {}
        Value::String(s) => { ws.write_string(row, col, s)?; }
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                ws.write_number(row, col, f)?;
            }
        }
        Value::Bool(b) => { ws.write_boolean(row, col, *b)?; }
        other => { ws.write_string(row, col, other.to_string())?; }
    }
    Ok(())
}
