//! HTTP transport seam
//!
//! Every call to the ERP goes through [`HttpTransport`], so the retry
//! wrappers can be exercised against scripted responses. The production
//! implementation is a cookie-bearing `reqwest::Client`: the session cookie
//! set by `/web/session/authenticate` rides along on every later call.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// A fully-read HTTP response
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, content_type: Option<&str>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: content_type.map(str::to_string),
            body: body.into(),
        }
    }

    /// Convenience for JSON bodies
    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, Some("application/json"), body.to_string())
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Body decoded lossily, for logging and HTML scraping
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// First `max_chars` characters of the body, for diagnostics
    pub fn text_preview(&self, max_chars: usize) -> String {
        self.text().chars().take(max_chars).collect()
    }
}

/// Network-level failure: no usable response was received
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// Minimal HTTP surface the ERP client needs
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post_json(&self, url: &str, body: &Value) -> Result<HttpResponse, TransportError>;

    async fn post_form(
        &self,
        url: &str,
        form: &[(String, String)],
        headers: &[(String, String)],
    ) -> Result<HttpResponse, TransportError>;

    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError>;
}

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

/// reqwest-backed transport with a shared cookie jar
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    async fn read(response: reqwest::Response) -> Result<HttpResponse, TransportError> {
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();
        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<HttpResponse, TransportError> {
        let response = self.client.post(url).json(body).send().await?;
        Self::read(response).await
    }

    async fn post_form(
        &self,
        url: &str,
        form: &[(String, String)],
        headers: &[(String, String)],
    ) -> Result<HttpResponse, TransportError> {
        let mut request = self.client.post(url).form(form);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let response = request.send().await?;
        Self::read(response).await
    }

    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let response = self.client.get(url).send().await?;
        Self::read(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_classes() {
        assert!(HttpResponse::new(503, None, "").is_server_error());
        assert!(!HttpResponse::new(499, None, "").is_server_error());
        assert!(HttpResponse::new(404, None, "").is_client_error());
        assert!(!HttpResponse::new(200, None, "").is_client_error());
    }

    #[test]
    fn test_text_preview_truncates_on_chars() {
        let response = HttpResponse::new(500, Some("text/html"), "ééééé");
        assert_eq!(response.text_preview(3), "ééé");
    }

    #[test]
    fn test_json_constructor() {
        let response = HttpResponse::json(200, &json!({"result": 1}));
        assert_eq!(response.content_type.as_deref(), Some("application/json"));
        assert_eq!(response.text(), r#"{"result":1}"#);
    }
}
