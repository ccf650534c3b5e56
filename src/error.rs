use std::io;

use thiserror::Error;

/// Fatal failures while loading feedback records.
///
/// Any of these aborts the whole render pass; there is no partial or stale
/// fallback. Per-row problems (an unparseable date, an empty comment) are
/// never reported here.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("access to the spreadsheet was denied: {0}")]
    Unauthorized(String),
    #[error("spreadsheet '{0}' was not found")]
    SpreadsheetNotFound(String),
    #[error("worksheet '{0}' was not found in the spreadsheet")]
    WorksheetNotFound(String),
    #[error("required column '{0}' is missing from the header row")]
    MissingColumn(String),
    #[error("upstream returned HTTP {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("request to the data source failed: {0}")]
    Http(String),
    #[error("malformed response from the data source: {0}")]
    Decode(String),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl LoadError {
    /// True when the failure is caused by the shape of the data rather than
    /// by reaching the source.
    pub fn is_schema_error(&self) -> bool {
        matches!(self, LoadError::MissingColumn(_))
    }
}

#[cfg(feature = "web")]
impl From<reqwest::Error> for LoadError {
    fn from(err: reqwest::Error) -> Self {
        LoadError::Http(err.to_string())
    }
}

/// Failures while serialising the filtered rows for download.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("xlsx writer failed: {0}")]
    Xlsx(String),
}

#[cfg(feature = "web")]
impl From<rust_xlsxwriter::XlsxError> for ExportError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        ExportError::Xlsx(err.to_string())
    }
}

/// Invalid configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
    #[error("failed to read secrets file: {0}")]
    Secrets(#[from] io::Error),
    #[error("failed to parse secrets file: {0}")]
    SecretsFormat(#[from] serde_json::Error),
}
