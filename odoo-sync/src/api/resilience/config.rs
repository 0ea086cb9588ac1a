//! Resilience configuration with builder pattern
//!
//! One retry budget per kind of remote call plus pagination pacing, with
//! defaults tuned for a slow report server.

use super::retry::RetryConfig;
use serde::Deserialize;
use std::time::Duration;

/// Global resilience configuration for Odoo and spreadsheet calls
#[derive(Debug, Clone, PartialEq)]
pub struct ResilienceConfig {
    /// JSON-RPC calls (login, wizard steps)
    pub rpc: RetryConfig,
    /// search_read pages and side lookups; a reply without `result` is
    /// retried as well
    pub query: RetryConfig,
    /// Binary report downloads; report generation is slower and flakier
    pub download: RetryConfig,
    /// Clear-and-write cycles against the spreadsheet
    pub publish: RetryConfig,
    pub pagination: PaginationConfig,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
}

/// Paging behaviour for search_read
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationConfig {
    pub page_size: usize,
    /// Pause after every non-empty page
    pub page_delay: Duration,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: 1000,
            page_delay: Duration::from_millis(500),
        }
    }
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            rpc: RetryConfig::with_attempts(3),
            query: RetryConfig::with_attempts(10),
            download: RetryConfig::with_attempts(5),
            publish: RetryConfig::with_attempts(10),
            pagination: PaginationConfig::default(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl ResilienceConfig {
    /// Create a new builder for ResilienceConfig
    pub fn builder() -> ResilienceConfigBuilder {
        ResilienceConfigBuilder::new()
    }

    /// Disable all retries and pacing (for testing)
    pub fn disabled() -> Self {
        Self {
            rpc: RetryConfig::no_retry(),
            query: RetryConfig::no_retry(),
            download: RetryConfig::no_retry(),
            publish: RetryConfig::no_retry(),
            pagination: PaginationConfig {
                page_size: 1000,
                page_delay: Duration::ZERO,
            },
            request_timeout: Duration::from_secs(60),
        }
    }

    /// Overlay values read from the `[resilience]` config section
    pub fn apply(mut self, settings: &ResilienceSettings) -> Self {
        if let Some(attempts) = settings.rpc_max_attempts {
            self.rpc.max_attempts = attempts;
        }
        if let Some(attempts) = settings.query_max_attempts {
            self.query.max_attempts = attempts;
        }
        if let Some(attempts) = settings.download_max_attempts {
            self.download.max_attempts = attempts;
        }
        if let Some(attempts) = settings.publish_max_attempts {
            self.publish.max_attempts = attempts;
        }
        for retry in [
            &mut self.rpc,
            &mut self.query,
            &mut self.download,
            &mut self.publish,
        ] {
            if let Some(secs) = settings.base_delay_secs {
                retry.base_delay = Duration::from_secs_f64(secs);
            }
            if let Some(secs) = settings.max_delay_secs {
                retry.max_delay = Duration::from_secs_f64(secs);
            }
            if let Some(multiplier) = settings.backoff_multiplier {
                retry.backoff_multiplier = multiplier;
            }
        }
        if let Some(size) = settings.page_size {
            self.pagination.page_size = size;
        }
        if let Some(ms) = settings.page_delay_ms {
            self.pagination.page_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = settings.request_timeout_secs {
            self.request_timeout = Duration::from_secs(secs);
        }
        self
    }
}

/// Raw `[resilience]` section; every key is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResilienceSettings {
    pub rpc_max_attempts: Option<u32>,
    pub query_max_attempts: Option<u32>,
    pub download_max_attempts: Option<u32>,
    pub publish_max_attempts: Option<u32>,
    pub base_delay_secs: Option<f64>,
    pub max_delay_secs: Option<f64>,
    pub backoff_multiplier: Option<f64>,
    pub page_size: Option<usize>,
    pub page_delay_ms: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

/// Builder for ResilienceConfig
#[derive(Debug)]
pub struct ResilienceConfigBuilder {
    config: ResilienceConfig,
}

impl ResilienceConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ResilienceConfig::default(),
        }
    }

    /// Set max attempts for JSON-RPC calls
    pub fn rpc_attempts(mut self, attempts: u32) -> Self {
        self.config.rpc.max_attempts = attempts;
        self
    }

    /// Set max attempts per search_read page
    pub fn query_attempts(mut self, attempts: u32) -> Self {
        self.config.query.max_attempts = attempts;
        self
    }

    /// Set max attempts for report downloads
    pub fn download_attempts(mut self, attempts: u32) -> Self {
        self.config.download.max_attempts = attempts;
        self
    }

    /// Set max attempts for spreadsheet publishing
    pub fn publish_attempts(mut self, attempts: u32) -> Self {
        self.config.publish.max_attempts = attempts;
        self
    }

    pub fn page_size(mut self, size: usize) -> Self {
        self.config.pagination.page_size = size;
        self
    }

    pub fn page_delay(mut self, delay: Duration) -> Self {
        self.config.pagination.page_delay = delay;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> ResilienceConfig {
        self.config
    }
}

impl Default for ResilienceConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
