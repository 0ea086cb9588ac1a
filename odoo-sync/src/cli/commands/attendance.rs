//! Monthly attendance totals per company scope

use anyhow::Result;
use log::{error, info, warn};
use serde_json::Value;

use super::Runner;
use crate::api::{Domain, Enrichment, SearchRead, fetch_all, fetch_status_map};
use crate::config::{AttendanceJob, AttendanceScope, DateRange};
use crate::transform::{AggregateSpec, Table, aggregate, normalize_records};

fn aggregate_spec(job: &AttendanceJob) -> AggregateSpec {
    AggregateSpec {
        date_field: job.date_field.clone(),
        dimensions: job.dimensions.clone(),
        measures: job.measures.clone(),
    }
}

/// Fetch, enrich, normalize and group one scope
async fn build_table(runner: &Runner, job: &AttendanceJob, scope: &AttendanceScope, range: &DateRange) -> Table {
    let context = runner
        .context()
        .with_companies(scope.allowed_company_ids.iter().copied())
        .with_current_company(scope.current_company_id);

    let status = fetch_status_map(
        &runner.client,
        &job.status.model,
        &job.status.value_field,
        &context,
    )
    .await;

    let query = SearchRead::new(job.model.as_str(), context)
        .domain(Domain::between(
            &job.date_field,
            range.from_text(),
            range.to_text(),
        ))
        .fields(job.fields.iter().map(|c| c.field.as_str()));
    let enrichment = Enrichment {
        source_field: &job.status.source_field,
        target_field: &job.status.target_field,
        lookup: &status,
        default: Value::Bool(true),
    };

    let mut records = fetch_all(&runner.client, &query, Some(&enrichment)).await;
    info!("Total records fetched for {}: {}", scope.label, records.len());

    let spec = aggregate_spec(job);
    let columns = job.columns();
    if records.is_empty() {
        warn!("No records fetched for {}", scope.label);
    }

    normalize_records(&mut records, &[job.status.target_field.as_str()]);
    let rows = aggregate(&records, &spec);
    info!("Grouped data for {}: {} rows", scope.label, rows.len());
    Table::from_aggregates(&rows, &spec, &columns)
}

async fn process_scope(
    runner: &Runner,
    job: &AttendanceJob,
    scope: &AttendanceScope,
    range: &DateRange,
) -> Result<bool> {
    let table = build_table(runner, job, scope, range).await;
    runner
        .publish(
            "attendance",
            job.spreadsheet_id.as_deref(),
            &scope.destination,
            &table,
        )
        .await
}

/// Run every scope; fails only when none of them could be published
pub async fn handle(runner: &Runner, range: &DateRange) -> Result<()> {
    let job = &runner.config.attendance;
    info!(
        "Attendance from {} to {} for {} scopes",
        range.from_text(),
        range.to_text(),
        job.scopes.len()
    );

    let mut succeeded = 0;
    for scope in &job.scopes {
        info!("--- Processing {} ---", scope.label);
        match process_scope(runner, job, scope, range).await {
            Ok(true) => succeeded += 1,
            Ok(false) => error!("Failed to paste data for {} after all retries", scope.label),
            Err(e) => error!("{}: {:#}", scope.label, e),
        }
    }

    if succeeded == job.scopes.len() {
        info!("All attendance data published");
    } else if succeeded > 0 {
        warn!(
            "Partial success: {}/{} scopes published",
            succeeded,
            job.scopes.len()
        );
    } else {
        anyhow::bail!("All Google Sheets paste operations failed");
    }
    Ok(())
}
