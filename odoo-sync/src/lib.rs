//! odoo-sync: scheduled Odoo exports pushed into Google Sheets
//!
//! Logs into an Odoo instance's web session API, drives report wizards or
//! paginates model queries, reshapes the result and publishes it to a
//! spreadsheet. Every remote call runs under a bounded retry budget.

pub mod api;
pub mod cli;
pub mod config;
pub mod excel;
pub mod sheets;
pub mod transform;

#[cfg(test)]
mod test_support;
