//! Google Sheets publishing
//!
//! A dataset lands in a worksheet as clear-then-write: the configured range
//! is cleared, the table is written header row first at the start cell and
//! the run timestamp goes into its own cell. The whole sequence is retried
//! as one unit.

pub mod client;
pub mod token;

use async_trait::async_trait;
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::api::resilience::{Attempt, RetryPolicy};
use crate::transform::Table;

pub use client::{GoogleSheetsClient, SheetsError};
pub use token::{GoogleCredentials, resolve_access_token};

fn default_start_cell() -> String {
    "A1".to_string()
}

/// Where one dataset is published
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    /// Empty means "use the job's spreadsheet"
    #[serde(default)]
    pub spreadsheet_id: String,
    pub worksheet: String,
    /// A1 range cleared before writing; the whole worksheet when unset
    #[serde(default)]
    pub clear_range: Option<String>,
    #[serde(default = "default_start_cell")]
    pub start_cell: String,
    pub timestamp_cell: String,
}

impl Destination {
    pub fn clear_target(&self) -> String {
        sheet_range(&self.worksheet, self.clear_range.as_deref())
    }

    pub fn data_target(&self) -> String {
        sheet_range(&self.worksheet, Some(&self.start_cell))
    }

    pub fn timestamp_target(&self) -> String {
        sheet_range(&self.worksheet, Some(&self.timestamp_cell))
    }
}

/// Qualify an A1 range with its worksheet: `'Z_raw_df'!A:G`
pub fn sheet_range(worksheet: &str, range: Option<&str>) -> String {
    let quoted = format!("'{}'", worksheet.replace('\'', "''"));
    match range {
        Some(range) if !range.is_empty() => format!("{}!{}", quoted, range),
        _ => quoted,
    }
}

/// A spreadsheet that accepts range clears and range writes
#[async_trait]
pub trait SpreadsheetSink: Send + Sync {
    async fn clear_range(&self, spreadsheet_id: &str, range: &str) -> Result<(), SheetsError>;

    async fn write_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: &[Vec<Value>],
    ) -> Result<(), SheetsError>;
}

fn classify(error: SheetsError) -> Attempt<()> {
    if error.is_retryable() {
        Attempt::transient(error.to_string())
    } else {
        Attempt::Permanent(error.to_string())
    }
}

async fn publish_once(
    sink: &dyn SpreadsheetSink,
    destination: &Destination,
    grid: &[Vec<Value>],
    timestamp: &str,
) -> Result<(), SheetsError> {
    sink.clear_range(&destination.spreadsheet_id, &destination.clear_target())
        .await?;
    sink.write_range(&destination.spreadsheet_id, &destination.data_target(), grid)
        .await?;
    info!(
        "Pasted {} rows to {}",
        grid.len().saturating_sub(1),
        destination.worksheet
    );
    sink.write_range(
        &destination.spreadsheet_id,
        &destination.timestamp_target(),
        &[vec![json!(timestamp)]],
    )
    .await?;
    info!("Timestamp updated for {}: {}", destination.worksheet, timestamp);
    Ok(())
}

/// Publish `table` to `destination`, retrying the whole clear-write sequence.
///
/// An empty table is not written and counts as success. Returns `false` when
/// the retry budget is spent or the API refuses the request outright.
pub async fn publish(
    sink: &dyn SpreadsheetSink,
    destination: &Destination,
    table: &Table,
    timestamp: &str,
    policy: &RetryPolicy,
) -> bool {
    if table.is_empty() {
        info!(
            "Skip: table for {} is empty, not pasting to sheet",
            destination.worksheet
        );
        return true;
    }

    let grid = table.to_grid();
    let label = format!("publish {}", destination.worksheet);
    let outcome = policy
        .run(&label, |attempt| {
            let grid = &grid;
            async move {
                info!(
                    "Attempt {}/{}: pasting data to {}",
                    attempt,
                    policy.config().max_attempts,
                    destination.worksheet
                );
                match publish_once(sink, destination, grid, timestamp).await {
                    Ok(()) => Attempt::Success(()),
                    Err(e) => classify(e),
                }
            }
        })
        .await;

    match outcome.success() {
        Some(()) => true,
        None => {
            error!("Failed to publish {}", destination.worksheet);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::resilience::RetryConfig;
    use crate::test_support::{RecordingSink, RecordingSleeper, SinkCall as Call};
    use std::sync::Arc;
    use std::time::Duration;

    fn destination() -> Destination {
        Destination {
            spreadsheet_id: "sheet-id".into(),
            worksheet: "Z_raw_df".into(),
            clear_range: Some("A:G".into()),
            start_cell: "A1".into(),
            timestamp_cell: "AC1".into(),
        }
    }

    fn table() -> Table {
        let mut table = Table::new(vec!["Date".into(), "OT Hours ".into()]);
        table.rows.push(vec![json!("2024-04-01"), json!(3.5)]);
        table
    }

    fn policy(attempts: u32, sleeper: Arc<RecordingSleeper>) -> RetryPolicy {
        RetryPolicy::new(RetryConfig::with_attempts(attempts), sleeper)
    }

    fn unavailable() -> SheetsError {
        SheetsError::Api {
            status: 503,
            message: "backend unavailable".into(),
        }
    }

    #[test]
    fn test_sheet_range() {
        assert_eq!(sheet_range("Z_raw_df", Some("A:G")), "'Z_raw_df'!A:G");
        assert_eq!(sheet_range("PO_Status_Data", None), "'PO_Status_Data'");
        assert_eq!(sheet_range("Bob's", Some("E1")), "'Bob''s'!E1");
    }

    #[test]
    fn test_destination_defaults_start_cell() {
        let dest: Destination = toml::from_str(
            r#"
            spreadsheet_id = "abc"
            worksheet = "PO_Status_Data"
            timestamp_cell = "AC1"
            "#,
        )
        .unwrap();
        assert_eq!(dest.start_cell, "A1");
        assert_eq!(dest.clear_range, None);
        assert_eq!(dest.clear_target(), "'PO_Status_Data'");
    }

    #[tokio::test]
    async fn test_publish_clears_then_writes_table_and_timestamp() {
        let sink = RecordingSink::default();
        let sleeper = Arc::new(RecordingSleeper::default());

        let ok = publish(
            &sink,
            &destination(),
            &table(),
            "2025-09-01 08:00:00",
            &policy(3, sleeper.clone()),
        )
        .await;

        assert!(ok);
        assert_eq!(
            sink.calls(),
            vec![
                Call::Clear("'Z_raw_df'!A:G".into()),
                Call::Write(
                    "'Z_raw_df'!A1".into(),
                    vec![
                        vec![json!("Date"), json!("OT Hours ")],
                        vec![json!("2024-04-01"), json!(3.5)],
                    ]
                ),
                Call::Write(
                    "'Z_raw_df'!AC1".into(),
                    vec![vec![json!("2025-09-01 08:00:00")]]
                ),
            ]
        );
        assert!(sleeper.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_publish_skips_empty_table() {
        let sink = RecordingSink::default();
        let sleeper = Arc::new(RecordingSleeper::default());
        let empty = Table::new(vec!["Date".into()]);

        let ok = publish(&sink, &destination(), &empty, "now", &policy(3, sleeper)).await;

        assert!(ok);
        assert!(sink.calls().is_empty());
    }

    #[tokio::test]
    async fn test_publish_retries_transient_failures() {
        let sink = RecordingSink::failing_with(vec![unavailable(), unavailable()]);
        let sleeper = Arc::new(RecordingSleeper::default());

        let ok = publish(&sink, &destination(), &table(), "now", &policy(10, sleeper.clone())).await;

        assert!(ok);
        assert_eq!(
            sleeper.recorded(),
            vec![Duration::from_secs(2), Duration::from_secs(4)]
        );
        let clears = sink
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::Clear(_)))
            .count();
        assert_eq!(clears, 3);
    }

    #[tokio::test]
    async fn test_publish_gives_up_after_budget() {
        let sink = RecordingSink::failing_with(vec![unavailable(), unavailable(), unavailable()]);
        let sleeper = Arc::new(RecordingSleeper::default());

        let ok = publish(&sink, &destination(), &table(), "now", &policy(3, sleeper.clone())).await;

        assert!(!ok);
        assert_eq!(sleeper.recorded().len(), 2);
    }

    #[tokio::test]
    async fn test_publish_does_not_retry_permission_errors() {
        let sink = RecordingSink::failing_with(vec![SheetsError::Api {
            status: 403,
            message: "The caller does not have permission".into(),
        }]);
        let sleeper = Arc::new(RecordingSleeper::default());

        let ok = publish(&sink, &destination(), &table(), "now", &policy(10, sleeper.clone())).await;

        assert!(!ok);
        assert!(sleeper.recorded().is_empty());
        assert_eq!(sink.calls().len(), 1);
    }
}
