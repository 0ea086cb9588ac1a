//! Flatten relational references and blank out unset values

use serde_json::Value;

use crate::api::models::{Record, RelationalRef};

/// `[id, label]` becomes `label`, `false`/`null` becomes `""`, anything else
/// is returned unchanged
pub fn normalize_value(value: &Value) -> Value {
    match RelationalRef::from_value(value) {
        Some(reference) => Value::String(reference.label().to_string()),
        None => value.clone(),
    }
}

/// Normalize every field of `record` in place except the `protected` ones.
///
/// Protected fields hold enrichment values (e.g. an active flag) whose
/// `false` must survive. Applying this twice is the same as applying it once.
pub fn normalize_record(record: &mut Record, protected: &[&str]) {
    for (key, value) in record.iter_mut() {
        if protected.contains(&key.as_str()) {
            continue;
        }
        *value = normalize_value(value);
    }
}

pub fn normalize_records(records: &mut [Record], protected: &[&str]) {
    for record in records {
        normalize_record(record, protected);
    }
}
