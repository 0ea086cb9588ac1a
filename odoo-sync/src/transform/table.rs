//! Tabular form of a dataset: what gets written to sheets and xlsx files

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::aggregate::{AggregateRow, AggregateSpec};
use crate::api::models::Record;

/// A fetched field and the column header it is published under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldColumn {
    pub field: String,
    pub header: String,
}

impl FieldColumn {
    pub fn new(field: impl Into<String>, header: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            header: header.into(),
        }
    }
}

/// Header name for `field`, falling back to the field name itself
pub fn header_for<'a>(columns: &'a [FieldColumn], field: &'a str) -> &'a str {
    columns
        .iter()
        .find(|c| c.field == field)
        .map(|c| c.header.as_str())
        .unwrap_or(field)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// One row per record, columns in `columns` order. Fields a record
    /// lacks are written as empty strings.
    pub fn from_records(records: &[Record], columns: &[FieldColumn]) -> Self {
        let headers = columns.iter().map(|c| c.header.clone()).collect();
        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|c| record.get(&c.field).cloned().unwrap_or_else(|| json!("")))
                    .collect()
            })
            .collect();
        Self { headers, rows }
    }

    /// Date, dimensions, then measures, headed through `columns`
    pub fn from_aggregates(
        rows: &[AggregateRow],
        spec: &AggregateSpec,
        columns: &[FieldColumn],
    ) -> Self {
        let headers = std::iter::once(&spec.date_field)
            .chain(&spec.dimensions)
            .chain(&spec.measures)
            .map(|field| header_for(columns, field).to_string())
            .collect();
        let rows = rows
            .iter()
            .map(|row| {
                let mut cells = Vec::with_capacity(1 + row.dimensions.len() + row.measures.len());
                cells.push(Value::String(row.period.clone()));
                cells.extend(row.dimensions.iter().cloned());
                cells.extend(row.measures.iter().map(|m| json!(m)));
                cells
            })
            .collect();
        Self { headers, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0)
    }

    /// Header row followed by data rows
    pub fn to_grid(&self) -> Vec<Vec<Value>> {
        std::iter::once(self.headers.iter().map(|h| json!(h)).collect())
            .chain(self.rows.iter().cloned())
            .collect()
    }
}
