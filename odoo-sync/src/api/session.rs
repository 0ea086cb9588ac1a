//! Login credentials, the authenticated session and CSRF scraping

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Value, json};
use thiserror::Error;

/// Odoo login credentials
#[derive(Clone)]
pub struct Credentials {
    pub database: String,
    pub login: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("database", &self.database)
            .field("login", &self.login)
            .field("password", &"***")
            .finish()
    }
}

impl Credentials {
    pub(crate) fn authenticate_payload(&self) -> Value {
        json!({
            "jsonrpc": "2.0",
            "params": {
                "db": self.database,
                "login": self.login,
                "password": self.password,
            }
        })
    }
}

/// An authenticated session. The cookie itself lives in the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub uid: i64,
    /// Only needed for report downloads
    pub csrf_token: Option<String>,
}

impl Session {
    pub fn with_csrf_token(mut self, token: impl Into<String>) -> Self {
        self.csrf_token = Some(token.into());
        self
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("login rejected: {0}")]
    LoginRejected(String),
    #[error("login endpoint unreachable after retries")]
    Unreachable,
    #[error("CSRF token not found in /web page")]
    CsrfTokenNotFound,
    #[error("failed to load /web page: {0}")]
    CsrfPageUnavailable(String),
}

static CSRF_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"var odoo = \{\s*csrf_token: "([A-Za-z0-9]+)""#).expect("valid CSRF regex")
});

/// Pull the CSRF token out of the inline bootstrap script of `/web`
pub fn parse_csrf_token(html: &str) -> Result<String, SessionError> {
    CSRF_TOKEN
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or(SessionError::CsrfTokenNotFound)
}

/// Interpret the `/web/session/authenticate` reply
pub(crate) fn session_from_reply(body: &Value) -> Result<Session, SessionError> {
    if let Some(error) = body.get("error") {
        let message = error
            .get("data")
            .and_then(|d| d.get("message"))
            .or_else(|| error.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(SessionError::LoginRejected(message));
    }

    body.get("result")
        .and_then(|r| r.get("uid"))
        .and_then(Value::as_i64)
        .map(|uid| Session {
            uid,
            csrf_token: None,
        })
        .ok_or_else(|| SessionError::LoginRejected("no uid in reply".to_string()))
}
