//! Report wizard driver
//!
//! An xlsx report is produced in four round trips: default the wizard
//! (`onchange`), persist it (`web_save`), press the report button
//! (`call_button`) and finally fetch the file from `/report/download`.

use log::{info, warn};
use serde_json::{Value, json};
use thiserror::Error;

use super::client::{OdooClient, is_spreadsheet_response};
use super::constants::{DOWNLOAD_TOKEN, REPORT_DOWNLOAD_PATH, WEB_PATH};
use super::context::RequestContext;
use super::models::{ReportAction, WebSaveResult};
use super::session::Session;

/// A transient wizard model and the button that renders its report
#[derive(Debug, Clone)]
pub struct ReportWizard {
    pub model: String,
    pub button_method: String,
}

/// Everything one report run needs
#[derive(Debug, Clone)]
pub struct ReportRequest {
    /// Field values written by `web_save`
    pub values: Value,
    /// `options` passed to the xlsx report controller
    pub options: Value,
    pub context: RequestContext,
}

#[derive(Debug, Error, PartialEq)]
pub enum ReportError {
    #[error("session has no CSRF token")]
    MissingCsrfToken,
    #[error("web_save returned no wizard id: {0}")]
    MissingWizardId(String),
    #[error("report button returned no report name: {0}")]
    MissingReportName(String),
    #[error("no response from report download")]
    NoDownloadResponse,
    #[error("download failed with HTTP {status} ({content_type}): {preview}")]
    InvalidDownload {
        status: u16,
        content_type: String,
        preview: String,
    },
}

impl ReportWizard {
    pub fn new(model: impl Into<String>, button_method: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            button_method: button_method.into(),
        }
    }

    /// Run the wizard and return the xlsx bytes
    pub async fn generate(
        &self,
        client: &OdooClient,
        session: &Session,
        request: &ReportRequest,
    ) -> Result<Vec<u8>, ReportError> {
        let csrf_token = session
            .csrf_token
            .as_deref()
            .ok_or(ReportError::MissingCsrfToken)?;
        let kwargs = json!({ "context": request.context.to_value() });

        if client
            .call_kw(&self.model, "onchange", json!([[], {}, [], {}]), kwargs.clone())
            .await
            .is_none()
        {
            warn!("{}: onchange got no reply, continuing", self.model);
        }

        let wizard_id = self.save(client, request, kwargs).await?;
        info!("{}: wizard saved, id = {}", self.model, wizard_id);

        let report_name = self.press_button(client, wizard_id, &request.context).await?;
        info!("{}: report generated: {}", self.model, report_name);

        let download_context = request
            .context
            .clone()
            .with("active_model", self.model.as_str())
            .with("active_id", wizard_id)
            .with("active_ids", json!([wizard_id]));
        let form = download_form(&report_name, &request.options, &download_context, csrf_token);
        let headers = vec![
            ("X-CSRF-Token".to_string(), csrf_token.to_string()),
            ("Referer".to_string(), client.url(WEB_PATH)),
        ];

        let response = client
            .download(REPORT_DOWNLOAD_PATH, &form, &headers)
            .await
            .ok_or(ReportError::NoDownloadResponse)?;
        if !is_spreadsheet_response(&response) {
            return Err(ReportError::InvalidDownload {
                status: response.status,
                content_type: response.content_type.clone().unwrap_or_default(),
                preview: response.text_preview(500),
            });
        }
        Ok(response.body)
    }

    async fn save(
        &self,
        client: &OdooClient,
        request: &ReportRequest,
        kwargs: Value,
    ) -> Result<i64, ReportError> {
        let reply = client
            .call_kw(&self.model, "web_save", json!([[], request.values]), kwargs)
            .await
            .ok_or_else(|| ReportError::MissingWizardId("no reply".to_string()))?;
        let result = reply.into_result().map_err(ReportError::MissingWizardId)?;
        serde_json::from_value::<WebSaveResult>(result.clone())
            .ok()
            .and_then(|saved| saved.record_id())
            .ok_or_else(|| ReportError::MissingWizardId(result.to_string()))
    }

    async fn press_button(
        &self,
        client: &OdooClient,
        wizard_id: i64,
        context: &RequestContext,
    ) -> Result<String, ReportError> {
        let reply = client
            .call_button(&self.model, &self.button_method, &[wizard_id], context)
            .await
            .ok_or_else(|| ReportError::MissingReportName("no reply".to_string()))?;
        let result = reply.into_result().map_err(ReportError::MissingReportName)?;
        serde_json::from_value::<ReportAction>(result.clone())
            .ok()
            .and_then(|action| action.report_name)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ReportError::MissingReportName(result.to_string()))
    }
}

/// Form fields for `/report/download`
pub fn download_form(
    report_name: &str,
    options: &Value,
    context: &RequestContext,
    csrf_token: &str,
) -> Vec<(String, String)> {
    let context = context.to_value().to_string();
    let report_path = format!(
        "/report/xlsx/{}?options={}&context={}",
        report_name, options, context
    );
    vec![
        ("data".to_string(), json!([report_path, "xlsx"]).to_string()),
        ("context".to_string(), context),
        ("token".to_string(), DOWNLOAD_TOKEN.to_string()),
        ("csrf_token".to_string(), csrf_token.to_string()),
    ]
}
