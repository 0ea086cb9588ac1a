//! Odoo web client: resilient JSON-RPC and binary downloads over one session

use log::{debug, info};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::constants::{
    AUTHENTICATE_PATH, CALL_BUTTON_PATH, WEB_PATH, XLSX_MIME, ZIP_SIGNATURE, call_kw_path,
};
use super::context::RequestContext;
use super::models::RpcReply;
use super::resilience::{Attempt, PaginationConfig, ResilienceConfig, RetryPolicy, Sleeper};
use super::session::{Credentials, Session, SessionError, parse_csrf_token, session_from_reply};
use super::transport::{HttpResponse, HttpTransport, TransportError};

/// Client bound to one Odoo instance and one cookie jar
pub struct OdooClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    rpc_retry: RetryPolicy,
    query_retry: RetryPolicy,
    download_retry: RetryPolicy,
    pagination: PaginationConfig,
    sleeper: Arc<dyn Sleeper>,
    next_request_id: AtomicU64,
}

impl OdooClient {
    pub fn new(
        base_url: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
        resilience: &ResilienceConfig,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            transport,
            base_url,
            rpc_retry: RetryPolicy::new(resilience.rpc.clone(), sleeper.clone()),
            query_retry: RetryPolicy::new(resilience.query.clone(), sleeper.clone()),
            download_retry: RetryPolicy::new(resilience.download.clone(), sleeper.clone()),
            pagination: resilience.pagination.clone(),
            sleeper,
            next_request_id: AtomicU64::new(1),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn pagination(&self) -> &PaginationConfig {
        &self.pagination
    }

    pub(crate) fn sleeper(&self) -> &Arc<dyn Sleeper> {
        &self.sleeper
    }

    /// POST a JSON payload and return the parsed reply body.
    ///
    /// Network errors, 5xx and unparseable bodies are retried with backoff.
    /// Anything below 500 that parses as JSON is returned as-is, including
    /// replies carrying an application `error`. `None` means the call could
    /// not complete within the budget.
    pub async fn call_rpc(&self, path: &str, payload: &Value) -> Option<Value> {
        let url = self.url(path);
        let transport = &self.transport;
        self.rpc_retry
            .run(path, |_| {
                let url = url.clone();
                async move { classify_rpc(transport.post_json(&url, payload).await) }
            })
            .await
            .success()
    }

    /// POST a form expected to answer with an xlsx document.
    ///
    /// Returns the first valid response. After the budget is spent the last
    /// response received is returned even though it is invalid, so callers
    /// can log what the server actually said. Check it with
    /// [`is_spreadsheet_response`].
    pub async fn download(
        &self,
        path: &str,
        form: &[(String, String)],
        headers: &[(String, String)],
    ) -> Option<HttpResponse> {
        let url = self.url(path);
        let transport = &self.transport;
        self.download_retry
            .run(path, |_| {
                let url = url.clone();
                async move { classify_download(transport.post_form(&url, form, headers).await) }
            })
            .await
            .success_or_last()
    }

    /// Log in. Any failure here is fatal for the run.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<Session, SessionError> {
        info!(
            "Logging in to {} as {} (db {})",
            self.base_url, credentials.login, credentials.database
        );
        let body = self
            .call_rpc(AUTHENTICATE_PATH, &credentials.authenticate_payload())
            .await
            .ok_or(SessionError::Unreachable)?;
        let session = session_from_reply(&body)?;
        info!("Logged in, uid = {}", session.uid);
        Ok(session)
    }

    /// Load `/web` and scrape the CSRF token the download controller wants
    pub async fn fetch_csrf_token(&self) -> Result<String, SessionError> {
        let response = self
            .transport
            .get(&self.url(WEB_PATH))
            .await
            .map_err(|e| SessionError::CsrfPageUnavailable(e.to_string()))?;
        if response.status != 200 {
            return Err(SessionError::CsrfPageUnavailable(format!(
                "HTTP {}",
                response.status
            )));
        }
        let token = parse_csrf_token(&response.text())?;
        debug!("CSRF token acquired");
        Ok(token)
    }

    fn envelope(&self, model: &str, method: &str, args: Value, kwargs: Value) -> Value {
        let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        json!({
            "jsonrpc": "2.0",
            "method": "call",
            "id": id,
            "params": {
                "model": model,
                "method": method,
                "args": args,
                "kwargs": kwargs,
            }
        })
    }

    /// `call_kw` on `model.method`
    pub async fn call_kw(
        &self,
        model: &str,
        method: &str,
        args: Value,
        kwargs: Value,
    ) -> Option<RpcReply> {
        let payload = self.envelope(model, method, args, kwargs);
        self.call_rpc(&call_kw_path(model, method), &payload)
            .await
            .map(RpcReply::from_body)
    }

    /// `call_kw` that only accepts a reply carrying `result`.
    ///
    /// An application `error` or a reply without `result` is retried like a
    /// transport failure, under the query budget. `None` once that budget is
    /// spent.
    pub async fn call_kw_result(
        &self,
        model: &str,
        method: &str,
        args: Value,
        kwargs: Value,
    ) -> Option<Value> {
        let path = call_kw_path(model, method);
        let url = self.url(&path);
        let payload = self.envelope(model, method, args, kwargs);
        let transport = &self.transport;
        self.query_retry
            .run(&path, |_| {
                let url = url.clone();
                let payload = &payload;
                async move { require_result(classify_rpc(transport.post_json(&url, payload).await)) }
            })
            .await
            .success()
    }

    /// Invoke a button method on existing records
    pub async fn call_button(
        &self,
        model: &str,
        method: &str,
        record_ids: &[i64],
        context: &RequestContext,
    ) -> Option<RpcReply> {
        let payload = self.envelope(
            model,
            method,
            json!([record_ids]),
            json!({ "context": context.to_value() }),
        );
        self.call_rpc(CALL_BUTTON_PATH, &payload)
            .await
            .map(RpcReply::from_body)
    }
}

/// Valid xlsx payload: HTTP 200 and either the right MIME type or a ZIP header
pub fn is_spreadsheet_response(response: &HttpResponse) -> bool {
    if response.status != 200 {
        return false;
    }
    let declared = response
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.contains(XLSX_MIME));
    declared || response.body.starts_with(ZIP_SIGNATURE)
}

fn classify_rpc(result: Result<HttpResponse, TransportError>) -> Attempt<Value> {
    let response = match result {
        Ok(response) => response,
        Err(err) => return Attempt::transient(err.to_string()),
    };
    if response.is_server_error() {
        return Attempt::transient(format!("HTTP {}", response.status));
    }
    match serde_json::from_slice::<Value>(&response.body) {
        Ok(body) => Attempt::Success(body),
        Err(err) if response.is_client_error() => {
            Attempt::Permanent(format!("HTTP {} with non-JSON body: {}", response.status, err))
        }
        Err(err) => Attempt::transient(format!("malformed JSON (HTTP {}): {}", response.status, err)),
    }
}

fn require_result(attempt: Attempt<Value>) -> Attempt<Value> {
    match attempt {
        Attempt::Success(body) => match RpcReply::from_body(body) {
            RpcReply::Result(value) => Attempt::Success(value),
            RpcReply::Error(err) => Attempt::transient(format!("server error: {}", err)),
            RpcReply::Malformed(body) => Attempt::transient(format!("reply has no result: {}", body)),
        },
        Attempt::Transient { reason, .. } => Attempt::transient(reason),
        Attempt::Permanent(reason) => Attempt::Permanent(reason),
    }
}

fn classify_download(result: Result<HttpResponse, TransportError>) -> Attempt<HttpResponse> {
    match result {
        Ok(response) if is_spreadsheet_response(&response) => Attempt::Success(response),
        Ok(response) => {
            let reason = format!(
                "HTTP {} with content-type {}",
                response.status,
                response.content_type.as_deref().unwrap_or("<none>")
            );
            Attempt::rejected(reason, response)
        }
        Err(err) => Attempt::transient(err.to_string()),
    }
}
