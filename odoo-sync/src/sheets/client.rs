//! Google Sheets v4 values API over reqwest

use async_trait::async_trait;
use log::debug;
use serde_json::{Value, json};
use std::time::Duration;
use thiserror::Error;

use super::SpreadsheetSink;

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Sheets API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Google credentials: {0}")]
    Credentials(String),
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl SheetsError {
    /// Timeouts, dropped connections, throttling and server errors
    pub fn is_retryable(&self) -> bool {
        match self {
            SheetsError::Http(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            SheetsError::Api { status, .. } => {
                *status == 408 || *status == 429 || *status >= 500
            }
            _ => false,
        }
    }
}

/// `error.message` of a Google API error body, or the raw body
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.chars().take(500).collect())
}

/// Request body for a values update
fn update_body(range: &str, rows: &[Vec<Value>]) -> Value {
    let values: Vec<Vec<Value>> = rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Value::Null => json!(""),
                    other => other.clone(),
                })
                .collect()
        })
        .collect();
    json!({
        "range": range,
        "majorDimension": "ROWS",
        "values": values,
    })
}

#[derive(Debug, Clone)]
pub struct GoogleSheetsClient {
    http: reqwest::Client,
    access_token: String,
    base_url: String,
}

impl GoogleSheetsClient {
    pub fn new(access_token: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            access_token: access_token.into(),
            base_url: SHEETS_API_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn clear_url(&self, spreadsheet_id: &str) -> String {
        format!("{}/{}/values:batchClear", self.base_url, spreadsheet_id)
    }

    fn update_url(&self, spreadsheet_id: &str, range: &str) -> String {
        format!(
            "{}/{}/values/{}?valueInputOption=USER_ENTERED",
            self.base_url,
            spreadsheet_id,
            urlencoding::encode(range)
        )
    }

    async fn check(response: reqwest::Response) -> Result<(), SheetsError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(SheetsError::Api {
            status: status.as_u16(),
            message: api_error_message(&body),
        })
    }
}

#[async_trait]
impl SpreadsheetSink for GoogleSheetsClient {
    async fn clear_range(&self, spreadsheet_id: &str, range: &str) -> Result<(), SheetsError> {
        debug!("Clearing {} in {}", range, spreadsheet_id);
        let response = self
            .http
            .post(self.clear_url(spreadsheet_id))
            .bearer_auth(&self.access_token)
            .json(&json!({ "ranges": [range] }))
            .send()
            .await?;
        Self::check(response).await
    }

    async fn write_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: &[Vec<Value>],
    ) -> Result<(), SheetsError> {
        debug!("Writing {} rows to {} in {}", rows.len(), range, spreadsheet_id);
        let response = self
            .http
            .put(self.update_url(spreadsheet_id, range))
            .bearer_auth(&self.access_token)
            .json(&update_body(range, rows))
            .send()
            .await?;
        Self::check(response).await
    }
}
