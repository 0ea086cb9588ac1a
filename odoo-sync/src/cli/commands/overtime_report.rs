//! Per-company overtime xlsx report, archived locally and published

use anyhow::{Context, Result};
use log::{error, info, warn};
use serde_json::{Value, json};
use std::path::PathBuf;

use super::Runner;
use crate::api::{ReportRequest, ReportWizard};
use crate::config::{CompanyReport, DateRange, OvertimeReportJob};
use crate::excel::read_first_sheet;

/// Wizard record written by `web_save`
fn wizard_values(job: &OvertimeReportJob, company_id: i64, range: &DateRange) -> Value {
    json!({
        "report_type": job.report_type,
        "date_from": range.from_text(),
        "date_to": range.to_text(),
        "is_company": false,
        "atten_type": false,
        "types": false,
        "mode_type": "company",
        "employee_id": false,
        "mode_company_id": company_id,
        "category_id": false,
        "department_id": false,
        "company_all": "allcompany"
    })
}

/// `options` handed to the xlsx report controller
fn report_options(job: &OvertimeReportJob, company_id: i64, range: &DateRange) -> Value {
    json!({
        "date_from": range.from_text(),
        "date_to": range.to_text(),
        "mode_company_id": company_id,
        "department_id": false,
        "category_id": false,
        "employee_id": false,
        "report_type": job.report_type,
        "atten_type": false,
        "types": false,
        "is_company": false
    })
}

fn report_path(job: &OvertimeReportJob, company: &CompanyReport, range: &DateRange) -> PathBuf {
    job.download_dir.join(format!(
        "{}_{}_{}_to_{}.xlsx",
        job.report_type,
        company.label,
        range.from_text(),
        range.to_text()
    ))
}

async fn process_company(
    runner: &Runner,
    job: &OvertimeReportJob,
    wizard: &ReportWizard,
    company: &CompanyReport,
    range: &DateRange,
) -> Result<bool> {
    let request = ReportRequest {
        values: wizard_values(job, company.id, range),
        options: report_options(job, company.id, range),
        context: runner
            .context()
            .with_companies([company.id])
            .with("default_is_company", false),
    };
    let bytes = wizard
        .generate(&runner.client, &runner.session, &request)
        .await?;

    let path = report_path(job, company, range);
    std::fs::create_dir_all(&job.download_dir).with_context(|| {
        format!("Failed to create directory: {}", job.download_dir.display())
    })?;
    std::fs::write(&path, &bytes)
        .with_context(|| format!("Failed to save report: {}", path.display()))?;
    info!("Report downloaded as {}", path.display());

    let table = read_first_sheet(&bytes)
        .with_context(|| format!("Failed to read report: {}", path.display()))?;
    if table.is_empty() {
        warn!("Skip: report for {} is empty", company.label);
        return Ok(true);
    }

    runner
        .publish(
            "overtime_report",
            job.spreadsheet_id.as_deref(),
            &company.destination,
            &table,
        )
        .await
}

/// Generate and publish every configured company's report.
///
/// A company whose report cannot be produced is logged and skipped.
pub async fn handle(runner: &Runner, range: &DateRange) -> Result<()> {
    let job = &runner.config.overtime_report;
    let wizard = ReportWizard::new(job.model.as_str(), job.button_method.as_str());
    info!(
        "{} report from {} to {}",
        job.report_type,
        range.from_text(),
        range.to_text()
    );

    let mut succeeded = 0;
    for company in &job.companies {
        info!("--- Processing {} ---", company.label);
        match process_company(runner, job, &wizard, company, range).await {
            Ok(true) => {
                succeeded += 1;
                info!("Finished {}", company.label);
            }
            Ok(false) => error!("Failed to paste data for {}", company.label),
            Err(e) => error!("Skipping {}: {:#}", company.label, e),
        }
    }

    if succeeded == 0 && !job.companies.is_empty() {
        anyhow::bail!("No overtime report could be published");
    }
    if succeeded < job.companies.len() {
        warn!(
            "Partial success: {}/{} companies published",
            succeeded,
            job.companies.len()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::HttpResponse;
    use crate::api::constants::XLSX_MIME;
    use crate::cli::commands::testing;
    use crate::config::Config;
    use crate::excel::write_table_xlsx;
    use crate::test_support::{RecordingSink, ScriptedTransport, SinkCall};
    use crate::transform::Table;
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn range() -> DateRange {
        DateRange {
            from: NaiveDate::from_ymd_opt(2025, 8, 26).unwrap(),
            to: NaiveDate::from_ymd_opt(2025, 9, 10).unwrap(),
        }
    }

    fn config(download_dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.overtime_report.spreadsheet_id = Some("ot-sheet".into());
        config.overtime_report.download_dir = download_dir.to_path_buf();
        config
    }

    fn report_bytes(dir: &std::path::Path) -> Vec<u8> {
        let mut table = Table::new(vec!["Employee".into(), "OT Hours".into()]);
        table.rows.push(vec![json!("Alice"), json!(12.5)]);
        let path = dir.join("fixture.xlsx");
        write_table_xlsx(&table, "OT", &path).unwrap();
        std::fs::read(path).unwrap()
    }

    fn wizard_script(transport: ScriptedTransport, download: HttpResponse) -> ScriptedTransport {
        transport
            .respond_json(200, json!({"result": {"value": {}}}))
            .respond_json(200, json!({"result": [{"id": 42}]}))
            .respond_json(200, json!({"result": {"report_name": "hr_attendance.ot_xlsx"}}))
            .respond(download)
    }

    #[test]
    fn test_report_path() {
        let job = OvertimeReportJob::default();
        assert_eq!(
            report_path(&job, &job.companies[1], &range()),
            PathBuf::from("downloads/ot_analysis_Metal_Trims_2025-08-26_to_2025-09-10.xlsx")
        );
    }

    #[test]
    fn test_wizard_values_target_one_company() {
        let job = OvertimeReportJob::default();
        let values = wizard_values(&job, 3, &range());
        assert_eq!(values["mode_company_id"], json!(3));
        assert_eq!(values["date_from"], json!("2025-08-26"));
        assert_eq!(values["company_all"], json!("allcompany"));
        assert_eq!(report_options(&job, 3, &range())["report_type"], json!("ot_analysis"));
    }

    #[tokio::test]
    async fn test_failed_company_is_skipped_and_next_one_published() {
        let dir = tempfile::tempdir().unwrap();
        let xlsx = report_bytes(dir.path());

        // Zipper: web_save yields no id. Metal_Trims: full run.
        let transport = ScriptedTransport::new()
            .respond_json(200, json!({"result": {"value": {}}}))
            .respond_json(200, json!({"result": []}));
        let transport = Arc::new(wizard_script(
            transport,
            HttpResponse::new(200, Some(XLSX_MIME), xlsx),
        ));
        let sink = Arc::new(RecordingSink::default());
        let runner = testing::runner(config(dir.path()), transport.clone(), Some(sink.clone()));

        handle(&runner, &range()).await.unwrap();

        assert_eq!(transport.remaining(), 0);
        assert!(
            dir.path()
                .join("ot_analysis_Metal_Trims_2025-08-26_to_2025-09-10.xlsx")
                .exists()
        );
        assert_eq!(
            sink.calls()[0],
            SinkCall::Clear("'MT_OT_DATA'!B1:HI1000".into())
        );
        assert_eq!(
            sink.written("'MT_OT_DATA'!B1").unwrap(),
            vec![
                vec![json!("Employee"), json!("OT Hours")],
                vec![json!("Alice"), json!(12.5)],
            ]
        );
        assert!(sink.written("'MT_OT_DATA'!E1").is_some());
    }

    #[tokio::test]
    async fn test_invalid_download_fails_run_when_no_company_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.overtime_report.companies.truncate(1);

        let transport = Arc::new(wizard_script(
            ScriptedTransport::new(),
            HttpResponse::new(200, Some("text/html"), "<html>Session expired</html>"),
        ));
        let sink = Arc::new(RecordingSink::default());
        let runner = testing::runner(config, transport, Some(sink.clone()));

        assert!(handle(&runner, &range()).await.is_err());
        assert!(sink.calls().is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
