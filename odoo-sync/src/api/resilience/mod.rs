//! Retry policies and pacing for calls against the ERP and the spreadsheet
//!
//! Provides the backoff schedule, the classification-driven retry loop and
//! the per-call budgets.

pub mod config;
pub mod retry;

pub use config::{PaginationConfig, ResilienceConfig, ResilienceConfigBuilder, ResilienceSettings};
pub use retry::{Attempt, RetryConfig, RetryOutcome, RetryPolicy, Sleeper, TokioSleeper};
