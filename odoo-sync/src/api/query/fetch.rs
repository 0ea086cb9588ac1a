//! Paginated search_read with inline side-lookup enrichment

use log::{error, info, warn};
use serde_json::{Value, json};
use std::collections::HashMap;

use super::domain::Domain;
use crate::api::client::OdooClient;
use crate::api::context::RequestContext;
use crate::api::models::{Record, RelationalRef};

/// A search_read over one model
#[derive(Debug, Clone)]
pub struct SearchRead {
    pub model: String,
    pub domain: Domain,
    pub fields: Vec<String>,
    pub context: RequestContext,
}

impl SearchRead {
    pub fn new(model: impl Into<String>, context: RequestContext) -> Self {
        Self {
            model: model.into(),
            domain: Domain::all(),
            fields: Vec::new(),
            context,
        }
    }

    pub fn domain(mut self, domain: Domain) -> Self {
        self.domain = domain;
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    fn kwargs(&self, limit: Option<usize>, offset: usize) -> Value {
        let mut kwargs = json!({
            "fields": self.fields,
            "context": self.context.to_value(),
        });
        if let Some(limit) = limit {
            kwargs["limit"] = json!(limit);
            kwargs["offset"] = json!(offset);
        }
        kwargs
    }
}

/// Attach a looked-up value to every fetched record.
///
/// The key is the id inside `source_field` (a many2one `[id, label]` or a bare
/// integer). Records whose id is missing from `lookup` get `default`.
#[derive(Debug, Clone)]
pub struct Enrichment<'a> {
    pub source_field: &'a str,
    pub target_field: &'a str,
    pub lookup: &'a HashMap<i64, Value>,
    pub default: Value,
}

impl Enrichment<'_> {
    fn apply(&self, record: &mut Record) {
        let value = record
            .get(self.source_field)
            .and_then(reference_id)
            .and_then(|id| self.lookup.get(&id))
            .cloned()
            .unwrap_or_else(|| self.default.clone());
        record.insert(self.target_field.to_string(), value);
    }
}

/// Id carried by a relational value: `[id, label]` or a bare integer
pub fn reference_id(value: &Value) -> Option<i64> {
    match RelationalRef::from_value(value) {
        Some(reference) => reference.id(),
        None => value.as_i64(),
    }
}

enum Page {
    Records(Vec<Record>),
    Failed(String),
}

async fn fetch_page(client: &OdooClient, query: &SearchRead, limit: usize, offset: usize) -> Page {
    let reply = client
        .call_kw_result(
            &query.model,
            "search_read",
            json!([query.domain.to_value()]),
            query.kwargs(Some(limit), offset),
        )
        .await;

    match reply {
        None => Page::Failed("retry budget exhausted".to_string()),
        Some(Value::Array(items)) => Page::Records(into_records(items)),
        Some(other) => {
            warn!(
                "{}: unexpected search_read result shape at offset {}, treating as empty: {}",
                query.model, offset, other
            );
            Page::Records(Vec::new())
        }
    }
}

fn into_records(items: Vec<Value>) -> Vec<Record> {
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(record) => Some(record),
            other => {
                warn!("Skipping non-object row in search_read result: {}", other);
                None
            }
        })
        .collect()
}

/// Fetch every record matching `query`, page by page.
///
/// Offsets advance by the configured page size until a page comes back
/// empty. Each page gets the query retry budget, server errors included;
/// when a page still cannot be fetched the records gathered so far are
/// returned. Remote order is preserved; nothing is sorted here.
pub async fn fetch_all(
    client: &OdooClient,
    query: &SearchRead,
    enrichment: Option<&Enrichment<'_>>,
) -> Vec<Record> {
    let limit = client.pagination().page_size.max(1);
    let page_delay = client.pagination().page_delay;
    let mut offset = 0;
    let mut all_records: Vec<Record> = Vec::new();

    loop {
        let mut records = match fetch_page(client, query, limit, offset).await {
            Page::Records(records) => records,
            Page::Failed(reason) => {
                error!(
                    "{}: failed to fetch page at offset {}: {}",
                    query.model, offset, reason
                );
                info!(
                    "{}: returning {} records fetched before the failure",
                    query.model,
                    all_records.len()
                );
                return all_records;
            }
        };

        if records.is_empty() {
            info!(
                "{}: no more records. Total fetched: {}",
                query.model,
                all_records.len()
            );
            break;
        }

        if let Some(enrichment) = enrichment {
            for record in &mut records {
                enrichment.apply(record);
            }
        }

        all_records.extend(records);
        offset += limit;
        info!(
            "{}: fetched {} records so far (next offset {})",
            query.model,
            all_records.len(),
            offset
        );

        client.sleeper().sleep(page_delay).await;
    }

    all_records
}

/// Build an `id -> value_field` map over every record of `model`, archived
/// ones included. Failures produce an empty map so callers fall back to
/// their enrichment default.
pub async fn fetch_status_map(
    client: &OdooClient,
    model: &str,
    value_field: &str,
    context: &RequestContext,
) -> HashMap<i64, Value> {
    let context = context.clone().with("active_test", false);
    let query = SearchRead::new(model, context).fields(["id", "name", value_field]);

    let reply = client
        .call_kw_result(
            model,
            "search_read",
            json!([query.domain.to_value()]),
            query.kwargs(None, 0),
        )
        .await;

    let rows = match reply {
        Some(Value::Array(rows)) => rows,
        Some(other) => {
            warn!("{}: unexpected lookup result shape: {}", model, other);
            return HashMap::new();
        }
        None => {
            error!("{}: lookup failed after all retries", model);
            return HashMap::new();
        }
    };

    let map: HashMap<i64, Value> = rows
        .iter()
        .filter_map(|row| {
            let id = row.get("id")?.as_i64()?;
            let value = row.get(value_field).cloned().unwrap_or(Value::Null);
            Some((id, value))
        })
        .collect();

    info!("{}: fetched {} {} values", model, map.len(), value_field);
    map
}
