//! Job handlers and the shared run state they work against

pub mod attendance;
pub mod overtime_report;
pub mod purchase_orders;

use anyhow::{Context, Result};
use chrono_tz::Tz;
use log::info;
use std::sync::Arc;

use super::{Cli, Commands, RangeArgs, RunArgs};
use crate::api::resilience::{RetryPolicy, Sleeper, TokioSleeper};
use crate::api::{OdooClient, ReqwestTransport, RequestContext, Session};
use crate::config::{Config, DateRange, Environment, local_timestamp, resolve_destination, today_in};
use crate::sheets::{self, Destination, GoogleSheetsClient, SpreadsheetSink, resolve_access_token};
use crate::transform::Table;

/// Everything a job needs once logged in
pub struct Runner {
    pub config: Config,
    pub client: OdooClient,
    pub session: Session,
    pub tz: Tz,
    /// `None` in dry runs
    sink: Option<Arc<dyn SpreadsheetSink>>,
    publish_policy: RetryPolicy,
}

impl Runner {
    pub fn new(
        config: Config,
        client: OdooClient,
        session: Session,
        tz: Tz,
        sink: Option<Arc<dyn SpreadsheetSink>>,
        publish_policy: RetryPolicy,
    ) -> Self {
        Self {
            config,
            client,
            session,
            tz,
            sink,
            publish_policy,
        }
    }

    /// Obtain spreadsheet access, log in and optionally scrape the CSRF token.
    /// Any failure here aborts the run.
    pub async fn connect(
        config: Config,
        env: &Environment,
        dry_run: bool,
        with_csrf: bool,
    ) -> Result<Self> {
        let tz = config.odoo.tz()?;
        let resilience = config.resilience_config();
        let sleeper: Arc<dyn Sleeper> = Arc::new(TokioSleeper);

        let sink: Option<Arc<dyn SpreadsheetSink>> = if dry_run {
            info!("Dry run: nothing will be written to Google Sheets");
            None
        } else {
            let http = reqwest::Client::builder()
                .timeout(resilience.request_timeout)
                .build()?;
            let token = resolve_access_token(
                env.google_access_token.as_deref(),
                &env.google_credentials,
                &http,
            )
            .await
            .context("Failed to obtain a Google access token")?;
            let sheets: Arc<dyn SpreadsheetSink> =
                Arc::new(GoogleSheetsClient::new(token, resilience.request_timeout)?);
            Some(sheets)
        };

        let transport = Arc::new(ReqwestTransport::new(resilience.request_timeout)?);
        let client = OdooClient::new(&env.odoo_url, transport, &resilience, sleeper.clone());

        let mut session = client
            .authenticate(&env.credentials)
            .await
            .context("Login failed. Check credentials or access rights")?;

        if with_csrf {
            let token = client
                .fetch_csrf_token()
                .await
                .context("Failed to obtain CSRF token")?;
            info!("CSRF token acquired");
            session = session.with_csrf_token(token);
        }

        let publish_policy = RetryPolicy::new(resilience.publish.clone(), sleeper);
        Ok(Self::new(config, client, session, tz, sink, publish_policy))
    }

    /// Base request context: language, timezone and user
    pub fn context(&self) -> RequestContext {
        RequestContext::new(
            self.config.odoo.lang.clone(),
            self.config.odoo.timezone.clone(),
            self.session.uid,
        )
    }

    pub fn timestamp(&self) -> String {
        local_timestamp(self.tz)
    }

    /// Publish one table. Dry runs only log what would be written.
    pub async fn publish(
        &self,
        job: &str,
        spreadsheet_id: Option<&str>,
        target: &Destination,
        table: &Table,
    ) -> Result<bool> {
        let Some(sink) = &self.sink else {
            info!(
                "Dry run: would paste {} rows x {} columns to {}",
                table.len(),
                table.width(),
                target.worksheet
            );
            return Ok(true);
        };

        let destination = resolve_destination(job, spreadsheet_id, target)?;
        Ok(sheets::publish(
            &**sink,
            &destination,
            table,
            &self.timestamp(),
            &self.publish_policy,
        )
        .await)
    }
}

/// Resolve a job's date range. CLI flags win over `env_dates`, which win
/// over the job default.
fn date_range(
    args: &RangeArgs,
    env_dates: Option<&Environment>,
    default_from: &str,
    tz: Tz,
) -> Result<DateRange> {
    let env_from = env_dates.and_then(|env| env.from_date.as_deref());
    let env_to = env_dates.and_then(|env| env.to_date.as_deref());
    DateRange::resolve(
        args.from.as_deref().or(env_from),
        default_from,
        args.to.as_deref().or(env_to),
        today_in(tz),
    )
}

/// Dispatch a parsed command line
pub async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let env = Environment::from_env()?;
    let tz = config.odoo.tz()?;

    match cli.command {
        Commands::OvertimeReport(args) => {
            let range = date_range(&args, Some(&env), &config.overtime_report.from_date, tz)?;
            let runner = Runner::connect(config, &env, args.run.dry_run, true).await?;
            overtime_report::handle(&runner, &range).await
        }
        Commands::Attendance(args) => {
            // FROM_DATE/TO_DATE only drive the overtime report
            let range = date_range(&args, None, &config.attendance.from_date, tz)?;
            let runner = Runner::connect(config, &env, args.run.dry_run, false).await?;
            attendance::handle(&runner, &range).await
        }
        Commands::PurchaseOrders(RunArgs { dry_run }) => {
            let runner = Runner::connect(config, &env, dry_run, false).await?;
            purchase_orders::handle(&runner).await
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingSink, ScriptedTransport};
    use serde_json::json;

    fn env() -> Environment {
        Environment::from_lookup(|key| match key {
            "ODOO_URL" => Some("https://erp.example.com".into()),
            "ODOO_DB" => Some("prod".into()),
            "ODOO_USERNAME" => Some("bot".into()),
            "ODOO_PASSWORD" => Some("pw".into()),
            "FROM_DATE" => Some("2025-08-01".into()),
            _ => None,
        })
        .unwrap()
    }

    fn open_range() -> RangeArgs {
        RangeArgs {
            from: None,
            to: None,
            run: RunArgs { dry_run: false },
        }
    }

    #[test]
    fn test_date_range_prefers_cli_over_env() {
        let args = RangeArgs {
            from: Some("2025-09-01".into()),
            to: Some("2025-09-30".into()),
            run: RunArgs { dry_run: false },
        };
        let range = date_range(&args, Some(&env()), "2024-04-01", chrono_tz::UTC).unwrap();
        assert_eq!(range.from_text(), "2025-09-01");

        let args = RangeArgs {
            to: Some("2025-09-30".into()),
            ..open_range()
        };
        let range = date_range(&args, Some(&env()), "2024-04-01", chrono_tz::UTC).unwrap();
        assert_eq!(range.from_text(), "2025-08-01");
    }

    #[test]
    fn test_date_range_without_env_dates_uses_job_default() {
        let args = RangeArgs {
            to: Some("2025-09-30".into()),
            ..open_range()
        };
        let range = date_range(&args, None, "2024-04-01", chrono_tz::UTC).unwrap();
        assert_eq!(range.from_text(), "2024-04-01");
        assert_eq!(range.to_text(), "2025-09-30");
    }

    #[tokio::test]
    async fn test_context_carries_session_user() {
        let runner = testing::runner(Config::default(), Arc::new(ScriptedTransport::new()), None);
        assert_eq!(
            runner.context().to_value(),
            json!({"lang": "en_US", "tz": "Asia/Dhaka", "uid": 7})
        );
    }

    #[tokio::test]
    async fn test_publish_requires_spreadsheet_id() {
        let sink = Arc::new(RecordingSink::default());
        let runner = testing::runner(
            Config::default(),
            Arc::new(ScriptedTransport::new()),
            Some(sink.clone()),
        );
        let mut table = Table::new(vec!["A".into()]);
        table.rows.push(vec![json!(1)]);
        let target = runner.config.purchase_orders.destination.clone();

        assert!(runner.publish("purchase_orders", None, &target, &table).await.is_err());
        assert!(sink.calls().is_empty());

        assert!(runner.publish("purchase_orders", Some("po-sheet"), &target, &table).await.unwrap());
        assert_eq!(sink.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_dry_run_publish_writes_nothing() {
        let runner = testing::runner(Config::default(), Arc::new(ScriptedTransport::new()), None);
        let table = Table::new(vec!["A".into()]);
        let target = runner.config.purchase_orders.destination.clone();
        assert!(runner.publish("purchase_orders", None, &target, &table).await.unwrap());
    }
}
