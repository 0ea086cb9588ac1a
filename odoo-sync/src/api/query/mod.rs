//! search_read queries: domains, paging and side lookups
//!
//! Follows the same split as the rest of the api module: `Domain` and
//! `SearchRead` describe a query, the fetch functions execute it.

pub mod domain;
pub mod fetch;

pub use domain::Domain;
pub use fetch::{Enrichment, SearchRead, fetch_all, fetch_status_map, reference_id};
