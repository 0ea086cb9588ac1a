//! Odoo endpoint paths and content markers

pub const AUTHENTICATE_PATH: &str = "/web/session/authenticate";
pub const WEB_PATH: &str = "/web";
pub const CALL_BUTTON_PATH: &str = "/web/dataset/call_button";
pub const REPORT_DOWNLOAD_PATH: &str = "/report/download";

/// `/web/dataset/call_kw/{model}/{method}`
pub fn call_kw_path(model: &str, method: &str) -> String {
    format!("/web/dataset/call_kw/{}/{}", model, method)
}

pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// ZIP local file header; every xlsx starts with it
pub const ZIP_SIGNATURE: &[u8] = b"PK";

/// The download controller insists on a token field but ignores its value
pub const DOWNLOAD_TOKEN: &str = "dummy-because-api-expects-one";
