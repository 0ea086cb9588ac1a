//! Per-job configuration sections
//!
//! Defaults reproduce the production schedule. Spreadsheet ids have no
//! default and must come from the config file.

use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;

use crate::sheets::Destination;
use crate::transform::FieldColumn;

fn destination(worksheet: &str, clear_range: Option<&str>, start_cell: &str, timestamp_cell: &str) -> Destination {
    Destination {
        spreadsheet_id: String::new(),
        worksheet: worksheet.to_string(),
        clear_range: clear_range.map(str::to_string),
        start_cell: start_cell.to_string(),
        timestamp_cell: timestamp_cell.to_string(),
    }
}

fn columns(pairs: &[(&str, &str)]) -> Vec<FieldColumn> {
    pairs
        .iter()
        .map(|(field, header)| FieldColumn::new(*field, *header))
        .collect()
}

/// Fill in the job-level spreadsheet id unless the unit names its own
pub fn resolve_destination(
    job: &str,
    spreadsheet_id: Option<&str>,
    target: &Destination,
) -> Result<Destination> {
    let mut resolved = target.clone();
    if resolved.spreadsheet_id.is_empty() {
        match spreadsheet_id.filter(|id| !id.is_empty()) {
            Some(id) => resolved.spreadsheet_id = id.to_string(),
            None => anyhow::bail!(
                "No spreadsheet_id configured for [{}] (worksheet {})",
                job,
                target.worksheet
            ),
        }
    }
    Ok(resolved)
}

/// One company's overtime report
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompanyReport {
    pub id: i64,
    pub label: String,
    pub destination: Destination,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OvertimeReportJob {
    pub model: String,
    pub button_method: String,
    pub report_type: String,
    pub from_date: String,
    pub download_dir: PathBuf,
    pub spreadsheet_id: Option<String>,
    pub companies: Vec<CompanyReport>,
}

impl Default for OvertimeReportJob {
    fn default() -> Self {
        Self {
            model: "attendance.pdf.report".to_string(),
            button_method: "action_generate_xlsx_report".to_string(),
            report_type: "ot_analysis".to_string(),
            from_date: "2025-08-26".to_string(),
            download_dir: PathBuf::from("downloads"),
            spreadsheet_id: None,
            companies: vec![
                CompanyReport {
                    id: 1,
                    label: "Zipper".to_string(),
                    destination: destination("ZIP_OT_DATA", Some("B1:IA1000"), "B1", "E1"),
                },
                CompanyReport {
                    id: 3,
                    label: "Metal_Trims".to_string(),
                    destination: destination("MT_OT_DATA", Some("B1:HI1000"), "B1", "E1"),
                },
            ],
        }
    }
}

/// Side lookup attached to every attendance record
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StatusLookup {
    pub model: String,
    pub value_field: String,
    /// Relational field on the fetched record holding the lookup key
    pub source_field: String,
    /// Field the looked-up value is stored under
    pub target_field: String,
    pub header: String,
}

impl Default for StatusLookup {
    fn default() -> Self {
        Self {
            model: "hr.employee".to_string(),
            value_field: "active".to_string(),
            source_field: "employee_id".to_string(),
            target_field: "employee_active".to_string(),
            header: "Employee/Active".to_string(),
        }
    }
}

/// A set of companies fetched under one context and published together
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttendanceScope {
    pub label: String,
    pub allowed_company_ids: Vec<i64>,
    pub current_company_id: i64,
    pub destination: Destination,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AttendanceJob {
    pub model: String,
    pub date_field: String,
    pub from_date: String,
    pub fields: Vec<FieldColumn>,
    pub dimensions: Vec<String>,
    pub measures: Vec<String>,
    pub status: StatusLookup,
    pub spreadsheet_id: Option<String>,
    pub scopes: Vec<AttendanceScope>,
}

impl AttendanceJob {
    /// Fetched columns plus the enrichment column
    pub fn columns(&self) -> Vec<FieldColumn> {
        let mut columns = self.fields.clone();
        columns.push(FieldColumn::new(
            self.status.target_field.clone(),
            self.status.header.clone(),
        ));
        columns
    }
}

impl Default for AttendanceJob {
    fn default() -> Self {
        Self {
            model: "hr.attendance".to_string(),
            date_field: "attDate".to_string(),
            from_date: "2024-04-01".to_string(),
            fields: columns(&[
                ("attDate", "Date"),
                ("employee_id", "Employee"),
                ("department_id", "Department"),
                ("com_otHours", "OT Hours "),
                ("worked_hours", "Worked Hours"),
                ("x_studio_category", "Category"),
            ]),
            dimensions: vec![
                "employee_id".to_string(),
                "department_id".to_string(),
                "x_studio_category".to_string(),
                "employee_active".to_string(),
            ],
            measures: vec!["com_otHours".to_string(), "worked_hours".to_string()],
            status: StatusLookup::default(),
            spreadsheet_id: None,
            scopes: vec![
                AttendanceScope {
                    label: "Companies 1 & 4".to_string(),
                    allowed_company_ids: vec![1, 4],
                    current_company_id: 1,
                    destination: destination("Z_raw_df", Some("A:G"), "A1", "AC1"),
                },
                AttendanceScope {
                    label: "Companies 3 & 4".to_string(),
                    allowed_company_ids: vec![3, 4],
                    current_company_id: 3,
                    destination: destination("M_raw_df", Some("A:G"), "A1", "AC1"),
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PurchaseOrdersJob {
    pub model: String,
    pub fields: Vec<FieldColumn>,
    pub download_dir: PathBuf,
    pub spreadsheet_id: Option<String>,
    pub destination: Destination,
}

impl Default for PurchaseOrdersJob {
    fn default() -> Self {
        Self {
            model: "purchase.order".to_string(),
            fields: columns(&[
                ("company_id", "Company"),
                ("create_uid", "Created by"),
                ("create_date", "Created on"),
                ("x_studio_currency", "Currency."),
                ("x_studio_gate_entry", "Gate Entry"),
                ("incoterm_id", "Incoterm"),
                ("next_approver", "Next Approver"),
                ("name", "Order Reference"),
                ("x_studio_order_status", "Order Status"),
                ("x_studio_pi_no", "PI No."),
                ("priority", "Priority"),
                ("origin", "Source Document"),
                ("state", "Status"),
                ("amount_total", "Total"),
                ("partner_id", "Vendor"),
                ("shipment_mode", "Shipment Mode"),
                ("payment_term_id", "Payment Terms"),
            ]),
            download_dir: PathBuf::from("downloads"),
            spreadsheet_id: None,
            destination: destination("PO_Status_Data", None, "A1", "AC1"),
        }
    }
}
