use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Spreadsheet read error: {0}")]
    SpreadsheetReadError(#[from] calamine::Error),

    #[error("Spreadsheet write error: {0}")]
    SpreadsheetWriteError(#[from] rust_xlsxwriter::XlsxError),

    #[error("File: \"{path}\" not found")]
    SourceNotFound { path: String },

    #[error("Expected two warehouse source files, got {found}")]
    MissingSources { found: usize },

    #[error("Malformed {field} in {source_name} row {row}: {value:?}")]
    MalformedValue {
        source_name: String,
        row: usize,
        field: String,
        value: String,
    },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value for {field}: {value:?} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Input,
    Config,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn processing(message: impl Into<String>) -> Self {
        Self::ProcessingError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::IoError(_) | Self::ZipError(_) => ErrorCategory::Io,
            Self::SourceNotFound { .. }
            | Self::MissingSources { .. }
            | Self::MalformedValue { .. }
            | Self::CsvError(_)
            | Self::SpreadsheetReadError(_) => ErrorCategory::Input,
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorCategory::Config,
            Self::SerializationError(_)
            | Self::SpreadsheetWriteError(_)
            | Self::ProcessingError { .. } => ErrorCategory::Processing,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        // 上游尚未送達檔案，下一輪可能就會成功
        if let Self::MissingSources { .. } = self {
            return ErrorSeverity::Medium;
        }

        match self.category() {
            ErrorCategory::Config | ErrorCategory::Input | ErrorCategory::Processing => {
                ErrorSeverity::High
            }
            ErrorCategory::Io => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::SourceNotFound { path } => format!("Warehouse file not found: {}", path),
            Self::MissingSources { found } => format!(
                "Two warehouse files are required, but only {} were delivered",
                found
            ),
            Self::MalformedValue {
                source_name,
                row,
                field,
                value,
            } => format!(
                "Row {} of {} has an unreadable {} value: {:?}",
                row, source_name, field, value
            ),
            Self::SpreadsheetReadError(e) => format!("Could not read spreadsheet: {}", e),
            Self::SpreadsheetWriteError(e) => format!("Could not write spreadsheet: {}", e),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::SourceNotFound { .. } => "Check the source paths or the inbox directory",
            Self::MissingSources { .. } => {
                "Make sure both warehouse exports were delivered before re-running"
            }
            Self::MalformedValue { .. } => {
                "Fix the stock/price column in the export (integers or '>N' only)"
            }
            Self::CsvError(_) | Self::SpreadsheetReadError(_) => {
                "Verify the file is a valid xlsx/xls/ods/csv document"
            }
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. } => "Review the TOML configuration and CLI flags",
            Self::ZipError(_) => "The attachment archive is damaged; request a new export",
            Self::IoError(_) => "Check file permissions and free disk space",
            _ => "Re-run with --verbose for details",
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
