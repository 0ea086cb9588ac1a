//! xlsx import/export for downloaded reports and local archives

pub mod reader;
pub mod writer;

pub use reader::{read_first_sheet, read_first_sheet_from_path};
pub use writer::write_table_xlsx;
