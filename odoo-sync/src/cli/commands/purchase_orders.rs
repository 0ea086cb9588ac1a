//! Full purchase order export

use anyhow::Result;
use chrono::Utc;
use log::info;
use std::path::PathBuf;

use super::Runner;
use crate::api::{SearchRead, fetch_all};
use crate::excel::write_table_xlsx;
use crate::transform::{Table, normalize_records};

const SHEET_NAME: &str = "Purchase Orders";

fn archive_path(runner: &Runner) -> PathBuf {
    let stamp = Utc::now()
        .with_timezone(&runner.tz)
        .format("%Y%m%d_%H%M%S");
    runner
        .config
        .purchase_orders
        .download_dir
        .join(format!("purchase_orders_{}.xlsx", stamp))
}

/// Fetch every order, archive it as xlsx and publish it
pub async fn handle(runner: &Runner) -> Result<()> {
    let job = &runner.config.purchase_orders;
    let query = SearchRead::new(job.model.as_str(), runner.context())
        .fields(job.fields.iter().map(|c| c.field.as_str()));

    let mut records = fetch_all(&runner.client, &query, None).await;
    info!("Total records fetched: {}", records.len());

    normalize_records(&mut records, &[]);
    let table = Table::from_records(&records, &job.fields);

    let path = archive_path(runner);
    write_table_xlsx(&table, SHEET_NAME, &path)?;
    info!("Cleaned file saved: {}", path.display());

    let published = runner
        .publish(
            "purchase_orders",
            job.spreadsheet_id.as_deref(),
            &job.destination,
            &table,
        )
        .await?;
    if !published {
        anyhow::bail!("Failed to publish purchase orders to {}", job.destination.worksheet);
    }
    Ok(())
}
