//! Request context sent with every call_kw

use serde::Serialize;
use serde_json::{Map, Value};

/// The `context` dictionary Odoo expects in kwargs.
///
/// Carries language, timezone, user and the companies the call may touch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestContext {
    pub lang: String,
    pub tz: String,
    pub uid: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_company_ids: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_company_id: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RequestContext {
    pub fn new(lang: impl Into<String>, tz: impl Into<String>, uid: i64) -> Self {
        Self {
            lang: lang.into(),
            tz: tz.into(),
            uid,
            allowed_company_ids: Vec::new(),
            current_company_id: None,
            extra: Map::new(),
        }
    }

    pub fn with_companies(mut self, company_ids: impl IntoIterator<Item = i64>) -> Self {
        self.allowed_company_ids = company_ids.into_iter().collect();
        self
    }

    pub fn with_current_company(mut self, company_id: i64) -> Self {
        self.current_company_id = Some(company_id);
        self
    }

    /// Add an arbitrary key (e.g. `active_model`, `default_is_company`)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
