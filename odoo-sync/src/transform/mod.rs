//! Reshaping fetched records before they leave the process

pub mod aggregate;
pub mod normalize;
pub mod table;

pub use aggregate::{AggregateRow, AggregateSpec, aggregate, month_start};
pub use normalize::{normalize_record, normalize_records, normalize_value};
pub use table::{FieldColumn, Table, header_for};
