//! Configuration
//!
//! Two sources: the environment (credentials and run inputs, `.env` loaded
//! by `main`) and an optional TOML file describing the jobs.

pub mod jobs;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use log::info;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::api::resilience::{ResilienceConfig, ResilienceSettings};
use crate::api::session::Credentials;

pub use jobs::{
    AttendanceJob, AttendanceScope, CompanyReport, OvertimeReportJob, PurchaseOrdersJob,
    StatusLookup, resolve_destination,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Values read from environment variables
#[derive(Debug, Clone)]
pub struct Environment {
    pub odoo_url: String,
    pub credentials: Credentials,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    pub google_credentials: PathBuf,
    pub google_access_token: Option<String>,
}

impl Environment {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |keys: &[&str]| {
            keys.iter()
                .find_map(|key| get(key))
                .ok_or_else(|| anyhow::anyhow!("Missing environment variable {}", keys.join(" or ")))
        };

        Ok(Self {
            odoo_url: require(&["ODOO_URL"])?,
            credentials: Credentials {
                database: require(&["ODOO_DB"])?,
                login: require(&["ODOO_USERNAME", "USERNAME"])?,
                password: require(&["ODOO_PASSWORD", "PASSWORD"])?,
            },
            from_date: get("FROM_DATE"),
            to_date: get("TO_DATE"),
            google_credentials: get("GOOGLE_CREDENTIALS")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("gcreds.json")),
            google_access_token: get("GOOGLE_ACCESS_TOKEN"),
        })
    }
}

/// `[odoo]` section
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OdooOptions {
    pub lang: String,
    /// IANA name; used for the request context, default dates and timestamps
    pub timezone: String,
}

impl Default for OdooOptions {
    fn default() -> Self {
        Self {
            lang: "en_US".to_string(),
            timezone: "Asia/Dhaka".to_string(),
        }
    }
}

impl OdooOptions {
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| anyhow::anyhow!("Unknown timezone: {}", self.timezone))
    }
}

/// The whole config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub odoo: OdooOptions,
    pub resilience: ResilienceSettings,
    pub overtime_report: OvertimeReportJob,
    pub attendance: AttendanceJob,
    pub purchase_orders: PurchaseOrdersJob,
}

/// `$XDG_CONFIG_HOME/odoo-sync/config.toml` or the platform equivalent
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("odoo-sync").join("config.toml"))
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config")
    }

    /// Load `explicit` (which must exist) or the default path (which may not)
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => path,
                None => {
                    info!("No config file found, using built-in defaults");
                    return Ok(Self::default());
                }
            },
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn resilience_config(&self) -> ResilienceConfig {
        ResilienceConfig::default().apply(&self.resilience)
    }
}

/// Inclusive date range of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

fn parse_date(value: &str, what: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .with_context(|| format!("Invalid {} '{}', expected YYYY-MM-DD", what, value))
}

impl DateRange {
    /// `from` falls back to `default_from`, `to` to `today`
    pub fn resolve(
        from: Option<&str>,
        default_from: &str,
        to: Option<&str>,
        today: NaiveDate,
    ) -> Result<Self> {
        let from = parse_date(from.unwrap_or(default_from), "from date")?;
        let to = match to {
            Some(to) => parse_date(to, "to date")?,
            None => today,
        };
        if from > to {
            anyhow::bail!("Date range is empty: {} is after {}", from, to);
        }
        Ok(Self { from, to })
    }

    pub fn from_text(&self) -> String {
        self.from.format(DATE_FORMAT).to_string()
    }

    pub fn to_text(&self) -> String {
        self.to.format(DATE_FORMAT).to_string()
    }
}

pub fn today_in(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// Run timestamp written next to published data
pub fn local_timestamp(tz: Tz) -> String {
    Utc::now()
        .with_timezone(&tz)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_environment_prefers_odoo_prefixed_names() {
        let env = Environment::from_lookup(lookup(&[
            ("ODOO_URL", "https://erp.example.com"),
            ("ODOO_DB", "prod"),
            ("ODOO_USERNAME", "bot@example.com"),
            ("USERNAME", "shell-user"),
            ("PASSWORD", "secret"),
        ]))
        .unwrap();

        assert_eq!(env.credentials.login, "bot@example.com");
        assert_eq!(env.credentials.password, "secret");
        assert_eq!(env.google_credentials, PathBuf::from("gcreds.json"));
        assert_eq!(env.from_date, None);
    }

    #[test]
    fn test_environment_missing_variable() {
        let err = Environment::from_lookup(lookup(&[
            ("ODOO_URL", "https://erp.example.com"),
            ("ODOO_DB", "prod"),
            ("ODOO_USERNAME", "bot"),
            ("ODOO_PASSWORD", "  "),
        ]))
        .unwrap_err();

        assert!(err.to_string().contains("ODOO_PASSWORD or PASSWORD"));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.odoo.timezone, "Asia/Dhaka");
        assert_eq!(config.overtime_report.companies.len(), 2);
        assert_eq!(config.attendance.scopes[1].allowed_company_ids, vec![3, 4]);
        assert_eq!(config.resilience_config(), ResilienceConfig::default());
    }

    #[test]
    fn test_config_overrides() {
        let config = Config::from_toml_str(
            r#"
            [odoo]
            timezone = "UTC"

            [resilience]
            rpc_max_attempts = 6
            page_size = 200

            [overtime_report]
            spreadsheet_id = "ot-sheet"
            companies = [
                { id = 1, label = "Zipper", destination = { worksheet = "ZIP_OT_DATA", clear_range = "B1:IA1000", start_cell = "B1", timestamp_cell = "E1" } },
            ]

            [attendance]
            from_date = "2025-01-01"
            "#,
        )
        .unwrap();

        assert_eq!(config.odoo.tz().unwrap(), chrono_tz::UTC);
        assert_eq!(config.overtime_report.spreadsheet_id.as_deref(), Some("ot-sheet"));
        assert_eq!(config.overtime_report.companies.len(), 1);
        assert_eq!(config.overtime_report.model, "attendance.pdf.report");
        assert_eq!(config.attendance.from_date, "2025-01-01");
        assert_eq!(config.attendance.model, "hr.attendance");

        let resilience = config.resilience_config();
        assert_eq!(resilience.rpc.max_attempts, 6);
        assert_eq!(resilience.download.max_attempts, 5);
        assert_eq!(resilience.pagination.page_size, 200);
        assert_eq!(resilience.pagination.page_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(Config::from_toml_str("[attendance]\nfrom = \"2024-01-01\"").is_err());
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[purchase_orders]\nspreadsheet_id = \"po\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.purchase_orders.spreadsheet_id.as_deref(), Some("po"));
    }

    #[test]
    fn test_date_range_resolution() {
        let today = NaiveDate::from_ymd_opt(2025, 9, 10).unwrap();

        let range = DateRange::resolve(None, "2025-08-26", None, today).unwrap();
        assert_eq!(range.from_text(), "2025-08-26");
        assert_eq!(range.to_text(), "2025-09-10");

        let range = DateRange::resolve(Some("2025-09-01"), "2025-08-26", Some("2025-09-05"), today)
            .unwrap();
        assert_eq!(range.from_text(), "2025-09-01");
        assert_eq!(range.to_text(), "2025-09-05");

        assert!(DateRange::resolve(Some("01/09/2025"), "2025-08-26", None, today).is_err());
        assert!(DateRange::resolve(Some("2025-09-11"), "2025-08-26", None, today).is_err());
    }

    #[test]
    fn test_bad_timezone() {
        let options = OdooOptions {
            timezone: "Mars/Olympus".into(),
            ..OdooOptions::default()
        };
        assert!(options.tz().is_err());
    }
}
