//! Command-line interface

pub mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "odoo-sync",
    version,
    about = "Pull Odoo reports and datasets into Google Sheets"
)]
pub struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/odoo-sync/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate each company's overtime xlsx report and publish it
    OvertimeReport(RangeArgs),
    /// Fetch attendance, group it by month and publish it
    Attendance(RangeArgs),
    /// Fetch all purchase orders, archive them as xlsx and publish them
    PurchaseOrders(RunArgs),
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Fetch and reshape but do not write to the spreadsheet
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Args)]
pub struct RangeArgs {
    /// First day, YYYY-MM-DD (overrides FROM_DATE)
    #[arg(long, value_name = "DATE")]
    pub from: Option<String>,

    /// Last day, YYYY-MM-DD (overrides TO_DATE; default today)
    #[arg(long, value_name = "DATE")]
    pub to: Option<String>,

    #[command(flatten)]
    pub run: RunArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_attendance_with_range() {
        let cli = Cli::try_parse_from([
            "odoo-sync",
            "attendance",
            "--from",
            "2025-01-01",
            "--dry-run",
            "--config",
            "/tmp/odoo.toml",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/tmp/odoo.toml")));
        match cli.command {
            Commands::Attendance(args) => {
                assert_eq!(args.from.as_deref(), Some("2025-01-01"));
                assert_eq!(args.to, None);
                assert!(args.run.dry_run);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_purchase_orders_takes_no_range() {
        assert!(Cli::try_parse_from(["odoo-sync", "purchase-orders", "--from", "2025-01-01"]).is_err());
        assert!(Cli::try_parse_from(["odoo-sync", "purchase-orders"]).is_ok());
    }
}
