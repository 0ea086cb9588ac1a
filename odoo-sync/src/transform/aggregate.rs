//! Monthly group-and-sum over normalized records

use chrono::{Datelike, NaiveDate};
use log::warn;
use serde_json::Value;
use std::collections::HashMap;

use crate::api::models::Record;

/// Which fields to group on and which to sum
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSpec {
    /// Truncated to the first day of its month before grouping
    pub date_field: String,
    pub dimensions: Vec<String>,
    pub measures: Vec<String>,
}

/// One group: month, dimension values (in `AggregateSpec::dimensions` order)
/// and measure sums (in `AggregateSpec::measures` order)
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    /// `YYYY-MM-01`, or the raw value when it was not a date
    pub period: String,
    pub dimensions: Vec<Value>,
    pub measures: Vec<f64>,
}

/// First day of the month of a `YYYY-MM-DD[ HH:MM:SS]` value
pub fn month_start(value: &Value) -> Option<NaiveDate> {
    let text = value.as_str()?;
    let date = NaiveDate::parse_from_str(text.get(..10)?, "%Y-%m-%d").ok()?;
    date.with_day(1)
}

fn period_of(value: Option<&Value>) -> String {
    let value = value.unwrap_or(&Value::Null);
    match month_start(value) {
        Some(month) => month.format("%Y-%m-%d").to_string(),
        None => {
            let raw = match value {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            warn!("Unparseable date {:?}, grouping it as-is", raw);
            raw
        }
    }
}

/// Numeric value of a measure; empty, missing or non-numeric counts as zero
fn measure_of(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Group `records` by (month, dimensions) and sum the measures.
///
/// Every record lands in exactly one group. Groups come out in the order
/// they were first seen.
pub fn aggregate(records: &[Record], spec: &AggregateSpec) -> Vec<AggregateRow> {
    let mut index: HashMap<Vec<String>, usize> = HashMap::new();
    let mut rows: Vec<AggregateRow> = Vec::new();

    for record in records {
        let period = period_of(record.get(&spec.date_field));
        let dimensions: Vec<Value> = spec
            .dimensions
            .iter()
            .map(|field| record.get(field).cloned().unwrap_or_else(|| Value::String(String::new())))
            .collect();

        let mut key = Vec::with_capacity(dimensions.len() + 1);
        key.push(period.clone());
        key.extend(dimensions.iter().map(Value::to_string));

        let slot = *index.entry(key).or_insert_with(|| {
            rows.push(AggregateRow {
                period,
                dimensions,
                measures: vec![0.0; spec.measures.len()],
            });
            rows.len() - 1
        });

        for (sum, field) in rows[slot].measures.iter_mut().zip(&spec.measures) {
            *sum += measure_of(record.get(field));
        }
    }

    rows
}
