//! Odoo web API module
//!
//! A thin client over Odoo's session-based JSON-RPC endpoints: login, CSRF
//! scraping, call_kw, report wizards, binary downloads and paginated
//! search_read, all behind retry budgets.

pub mod client;
pub mod constants;
pub mod context;
pub mod models;
pub mod query;
pub mod resilience;
pub mod session;
pub mod transport;
pub mod wizard;

pub use client::{OdooClient, is_spreadsheet_response};
pub use context::RequestContext;
pub use models::{Record, RelationalRef, RpcError, RpcReply, WebSaveResult};
pub use query::{Domain, Enrichment, SearchRead, fetch_all, fetch_status_map};
pub use resilience::{ResilienceConfig, RetryConfig, RetryPolicy, Sleeper, TokioSleeper};
pub use session::{Credentials, Session, SessionError};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport, TransportError};
pub use wizard::{ReportError, ReportRequest, ReportWizard};
