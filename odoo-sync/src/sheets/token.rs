//! Access token resolution for the Sheets API
//!
//! An explicit `GOOGLE_ACCESS_TOKEN` wins. Otherwise the credentials file is
//! read: `service_account` keys are exchanged with a signed RS256 JWT
//! assertion, and `authorized_user` files (as written by `gcloud auth
//! application-default login`) with the refresh-token grant.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use super::client::SheetsError;

const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// A Google credentials JSON file, discriminated by its `type` field
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GoogleCredentials {
    AuthorizedUser {
        client_id: String,
        #[serde(default)]
        client_secret: Option<String>,
        refresh_token: String,
        #[serde(default = "default_token_uri")]
        token_uri: String,
    },
    ServiceAccount {
        client_email: String,
        private_key: String,
        #[serde(default)]
        private_key_id: Option<String>,
        #[serde(default = "default_token_uri")]
        token_uri: String,
    },
}

impl GoogleCredentials {
    pub fn parse(content: &str) -> Result<Self, SheetsError> {
        serde_json::from_str(content).map_err(|e| SheetsError::Credentials(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, SheetsError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SheetsError::Credentials(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }
}

/// Claims of the service account assertion
#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

/// Sign the JWT a service account trades for an access token
fn service_account_assertion(
    client_email: &str,
    private_key: &str,
    private_key_id: Option<&str>,
    token_uri: &str,
    issued_at: DateTime<Utc>,
) -> Result<String, SheetsError> {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = private_key_id.map(str::to_string);

    let claims = AssertionClaims {
        iss: client_email,
        scope: SHEETS_SCOPE,
        aud: token_uri,
        iat: issued_at.timestamp(),
        exp: (issued_at + Duration::seconds(ASSERTION_LIFETIME_SECS)).timestamp(),
    };

    let key = EncodingKey::from_rsa_pem(private_key.as_bytes())
        .map_err(|e| SheetsError::Credentials(format!("invalid private key for {}: {}", client_email, e)))?;
    jsonwebtoken::encode(&header, &claims, &key)
        .map_err(|e| SheetsError::Credentials(format!("cannot sign assertion for {}: {}", client_email, e)))
}

fn jwt_bearer_form(assertion: &str) -> Vec<(&'static str, &str)> {
    vec![("grant_type", JWT_BEARER_GRANT), ("assertion", assertion)]
}

fn refresh_token_form<'a>(
    client_id: &'a str,
    client_secret: Option<&'a str>,
    refresh_token: &'a str,
) -> Vec<(&'static str, &'a str)> {
    let mut form = vec![
        ("client_id", client_id),
        ("refresh_token", refresh_token),
        ("grant_type", "refresh_token"),
    ];
    if let Some(secret) = client_secret {
        form.push(("client_secret", secret));
    }
    form
}

/// POST a grant to the token endpoint and pull out `access_token`
async fn exchange_token(
    http: &reqwest::Client,
    token_uri: &str,
    form: &[(&str, &str)],
) -> Result<String, SheetsError> {
    let response = http.post(token_uri).form(form).send().await?;
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if !status.is_success() {
        return Err(SheetsError::RefreshFailed(format!(
            "HTTP {}: {}",
            status.as_u16(),
            body
        )));
    }

    let body: Value = serde_json::from_str(&body)?;
    body["access_token"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| SheetsError::RefreshFailed("No access_token in response".into()))
}

/// Produce a bearer token for the Sheets API
pub async fn resolve_access_token(
    explicit_token: Option<&str>,
    credentials_path: &Path,
    http: &reqwest::Client,
) -> Result<String, SheetsError> {
    if let Some(token) = explicit_token.map(str::trim).filter(|t| !t.is_empty()) {
        info!("Using Google access token from environment");
        return Ok(token.to_string());
    }

    match GoogleCredentials::load(credentials_path)? {
        GoogleCredentials::ServiceAccount {
            client_email,
            private_key,
            private_key_id,
            token_uri,
        } => {
            let assertion = service_account_assertion(
                &client_email,
                &private_key,
                private_key_id.as_deref(),
                &token_uri,
                Utc::now(),
            )?;
            let token = exchange_token(http, &token_uri, &jwt_bearer_form(&assertion)).await?;
            info!("Obtained Google access token for {}", client_email);
            Ok(token)
        }
        GoogleCredentials::AuthorizedUser {
            client_id,
            client_secret,
            refresh_token,
            token_uri,
        } => {
            let form = refresh_token_form(&client_id, client_secret.as_deref(), &refresh_token);
            let token = exchange_token(http, &token_uri, &form).await?;
            info!("Obtained Google access token for {}", client_id);
            Ok(token)
        }
    }
}
