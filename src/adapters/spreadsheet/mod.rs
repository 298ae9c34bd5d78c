// Spreadsheet codecs: workbook files through calamine / rust_xlsxwriter, CSV through the csv crate.

pub mod csv;
pub mod xlsx;

use crate::domain::table::Document;
use crate::utils::error::{EtlError, Result};
use std::path::Path;

pub const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "xlsb", "ods"];
pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "xlsb", "ods", "csv"];
/// 可寫出的格式：rust_xlsxwriter 只產生 xlsx
pub const OUTPUT_EXTENSIONS: &[&str] = &["xlsx", "csv"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Workbook,
    Csv,
}

impl TableFormat {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        if extension == "csv" {
            Ok(Self::Csv)
        } else if WORKBOOK_EXTENSIONS.contains(&extension.as_str()) {
            Ok(Self::Workbook)
        } else {
            Err(EtlError::InvalidConfigValueError {
                field: "spreadsheet".to_string(),
                value: path.display().to_string(),
                reason: format!(
                    "Unsupported spreadsheet format. Allowed extensions: {}",
                    SPREADSHEET_EXTENSIONS.join(", ")
                ),
            })
        }
    }

    /// Like [`TableFormat::from_path`], restricted to formats that can be written.
    pub fn for_output(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = Self::from_path(path)?;
        let writable = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| OUTPUT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));

        if writable {
            Ok(format)
        } else {
            Err(EtlError::InvalidConfigValueError {
                field: "output".to_string(),
                value: path.display().to_string(),
                reason: format!(
                    "Cannot write this format. Allowed output extensions: {}",
                    OUTPUT_EXTENSIONS.join(", ")
                ),
            })
        }
    }
}

pub fn is_spreadsheet(path: impl AsRef<Path>) -> bool {
    TableFormat::from_path(path).is_ok()
}

/// Decodes every sheet of `bytes`; the format is picked from `path`.
pub fn read_table(path: impl AsRef<Path>, bytes: Vec<u8>) -> Result<Document> {
    match TableFormat::from_path(path)? {
        TableFormat::Workbook => xlsx::read_workbook(bytes),
        TableFormat::Csv => Ok(csv::read_sheet(&bytes)?.into()),
    }
}

/// Encodes `document`. CSV holds a single table, so only the active sheet is written.
pub fn write_table(format: TableFormat, document: &Document) -> Result<Vec<u8>> {
    match format {
        TableFormat::Workbook => xlsx::write_workbook(document),
        TableFormat::Csv => csv::write_sheet(&document.active_sheet().table),
    }
}
