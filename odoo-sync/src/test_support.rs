//! Test doubles shared by the unit tests

use crate::api::resilience::Sleeper;
use crate::api::transport::{HttpResponse, HttpTransport, TransportError};
use crate::sheets::{SheetsError, SpreadsheetSink};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Records requested sleeps instead of waiting
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn recorded(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub url: String,
    pub json: Option<Value>,
    pub form: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn form_value(&self, name: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Replays queued responses in order, whatever the method
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, response: HttpResponse) -> Self {
        self.responses.lock().unwrap().push_back(Ok(response));
        self
    }

    pub fn respond_json(self, status: u16, body: Value) -> Self {
        self.respond(HttpResponse::json(status, &body))
    }

    pub fn fail(self, error: TransportError) -> Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }

    fn next(&self, request: RecordedRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Connect("no scripted response left".into())))
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<HttpResponse, TransportError> {
        self.next(RecordedRequest {
            method: "POST",
            url: url.to_string(),
            json: Some(body.clone()),
            form: Vec::new(),
            headers: Vec::new(),
        })
    }

    async fn post_form(
        &self,
        url: &str,
        form: &[(String, String)],
        headers: &[(String, String)],
    ) -> Result<HttpResponse, TransportError> {
        self.next(RecordedRequest {
            method: "POST",
            url: url.to_string(),
            json: None,
            form: form.to_vec(),
            headers: headers.to_vec(),
        })
    }

    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        self.next(RecordedRequest {
            method: "GET",
            url: url.to_string(),
            json: None,
            form: Vec::new(),
            headers: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Clear(String),
    Write(String, Vec<Vec<Value>>),
}

/// Spreadsheet double: records calls, fails range clears with queued errors
#[derive(Debug, Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<SinkCall>>,
    failures: Mutex<VecDeque<SheetsError>>,
}

impl RecordingSink {
    pub fn failing_with(errors: Vec<SheetsError>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(errors.into()),
        }
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Rows of the last write to `range`
    pub fn written(&self, range: &str) -> Option<Vec<Vec<Value>>> {
        self.calls().into_iter().rev().find_map(|call| match call {
            SinkCall::Write(r, rows) if r == range => Some(rows),
            _ => None,
        })
    }
}

#[async_trait]
impl SpreadsheetSink for RecordingSink {
    async fn clear_range(&self, _spreadsheet_id: &str, range: &str) -> Result<(), SheetsError> {
        self.calls
            .lock()
            .unwrap()
            .push(SinkCall::Clear(range.to_string()));
        match self.failures.lock().unwrap().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn write_range(
        &self,
        _spreadsheet_id: &str,
        range: &str,
        rows: &[Vec<Value>],
    ) -> Result<(), SheetsError> {
        self.calls
            .lock()
            .unwrap()
            .push(SinkCall::Write(range.to_string(), rows.to_vec()));
        Ok(())
    }
}
