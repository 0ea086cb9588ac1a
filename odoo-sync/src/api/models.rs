//! Shapes of Odoo JSON-RPC payloads, decoded once at the boundary

use serde::Deserialize;
use serde_json::{Map, Value};

/// One remote entity instance as returned by search_read
pub type Record = Map<String, Value>;

/// Error object carried by a JSON-RPC reply
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RpcError {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let detail = self
            .data
            .as_ref()
            .and_then(|d| d.get("message"))
            .and_then(Value::as_str);
        match detail {
            Some(detail) => write!(f, "{}: {}", self.message, detail),
            None => write!(f, "{}", self.message),
        }
    }
}

/// A parsed JSON-RPC reply body
#[derive(Debug, Clone, PartialEq)]
pub enum RpcReply {
    Result(Value),
    Error(RpcError),
    /// Valid JSON with neither `result` nor `error`
    Malformed(Value),
}

impl RpcReply {
    pub fn from_body(body: Value) -> Self {
        if let Some(error) = body.get("error") {
            let error = serde_json::from_value::<RpcError>(error.clone()).unwrap_or_else(|_| {
                RpcError {
                    code: None,
                    message: error.to_string(),
                    data: None,
                }
            });
            return RpcReply::Error(error);
        }
        match body {
            Value::Object(mut obj) if obj.contains_key("result") => {
                RpcReply::Result(obj.remove("result").unwrap_or(Value::Null))
            }
            other => RpcReply::Malformed(other),
        }
    }

    pub fn into_result(self) -> Result<Value, String> {
        match self {
            RpcReply::Result(value) => Ok(value),
            RpcReply::Error(error) => Err(error.to_string()),
            RpcReply::Malformed(body) => Err(format!("reply has no result: {}", body)),
        }
    }
}

/// A many2one value: `false` when unset, `[id, label]` otherwise
#[derive(Debug, Clone, PartialEq)]
pub enum RelationalRef {
    Absent,
    Ref { id: i64, label: String },
}

impl RelationalRef {
    /// Decode a raw field value. Returns `None` when the value is not
    /// relational at all (a plain string, number, list of ids, ...).
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null | Value::Bool(false) => Some(RelationalRef::Absent),
            Value::Array(items) if items.len() == 2 => {
                let id = items[0].as_i64()?;
                let label = items[1].as_str()?.to_string();
                Some(RelationalRef::Ref { id, label })
            }
            _ => None,
        }
    }

    pub fn id(&self) -> Option<i64> {
        match self {
            RelationalRef::Ref { id, .. } => Some(*id),
            RelationalRef::Absent => None,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            RelationalRef::Ref { label, .. } => label,
            RelationalRef::Absent => "",
        }
    }
}

/// Identifier of a record created by `web_save`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SavedRecord {
    #[serde(default)]
    pub id: Option<i64>,
}

/// `web_save` answers with a list of records, a single record or a bare id
/// depending on server version
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum WebSaveResult {
    Records(Vec<SavedRecord>),
    Record(SavedRecord),
    Id(i64),
}

impl WebSaveResult {
    pub fn record_id(&self) -> Option<i64> {
        match self {
            WebSaveResult::Records(records) => records.first().and_then(|r| r.id),
            WebSaveResult::Record(record) => record.id,
            WebSaveResult::Id(id) => Some(*id),
        }
    }
}

/// The action dictionary returned by a report button
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReportAction {
    #[serde(default)]
    pub report_name: Option<String>,
    #[serde(default)]
    pub report_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reply_with_result() {
        let reply = RpcReply::from_body(json!({"jsonrpc": "2.0", "result": {"uid": 7}}));
        assert_eq!(reply, RpcReply::Result(json!({"uid": 7})));
    }

    #[test]
    fn test_reply_with_error() {
        let reply = RpcReply::from_body(json!({
            "error": {"code": 200, "message": "Odoo Server Error", "data": {"message": "Access Denied"}}
        }));
        match reply {
            RpcReply::Error(err) => {
                assert_eq!(err.code, Some(200));
                assert_eq!(err.to_string(), "Odoo Server Error: Access Denied");
            }
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[test]
    fn test_reply_with_odd_error_shape() {
        let reply = RpcReply::from_body(json!({"error": "nope"}));
        assert!(matches!(reply, RpcReply::Error(_)));
    }

    #[test]
    fn test_reply_without_result_is_malformed() {
        let reply = RpcReply::from_body(json!({"jsonrpc": "2.0"}));
        assert!(reply.into_result().is_err());
    }

    #[test]
    fn test_relational_ref_decoding() {
        assert_eq!(
            RelationalRef::from_value(&json!([5, "Jane Doe"])),
            Some(RelationalRef::Ref {
                id: 5,
                label: "Jane Doe".into()
            })
        );
        assert_eq!(
            RelationalRef::from_value(&json!(false)),
            Some(RelationalRef::Absent)
        );
        assert_eq!(RelationalRef::from_value(&json!([4, 9])), None);
        assert_eq!(RelationalRef::from_value(&json!("Jane")), None);
        assert_eq!(RelationalRef::from_value(&json!(true)), None);
    }

    #[test]
    fn test_web_save_shapes() {
        let list: WebSaveResult = serde_json::from_value(json!([{"id": 42}])).unwrap();
        assert_eq!(list.record_id(), Some(42));

        let object: WebSaveResult = serde_json::from_value(json!({"id": 43})).unwrap();
        assert_eq!(object.record_id(), Some(43));

        let bare: WebSaveResult = serde_json::from_value(json!(44)).unwrap();
        assert_eq!(bare.record_id(), Some(44));

        let empty: WebSaveResult = serde_json::from_value(json!([])).unwrap();
        assert_eq!(empty.record_id(), None);
    }
}
