//! Google Sheets values API client.

use async_trait::async_trait;
use log::{debug, error};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::config::{DashboardConfig, SheetsCredentials};
use crate::error::LoadError;
use crate::loader::{FeedbackSource, SheetRows};

/// Sheets API base URL
const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Values response body
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Error response body
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

/// Reads one worksheet of a spreadsheet through the values API.
pub struct GoogleSheetsSource {
    client: Client,
    base_url: String,
    spreadsheet_key: String,
    worksheet: String,
    credentials: Option<SheetsCredentials>,
}

impl GoogleSheetsSource {
    pub fn new(
        spreadsheet_key: impl Into<String>,
        worksheet: impl Into<String>,
        credentials: Option<SheetsCredentials>,
        timeout: Duration,
    ) -> Result<Self, LoadError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: SHEETS_API_BASE.to_string(),
            spreadsheet_key: spreadsheet_key.into(),
            worksheet: worksheet.into(),
            credentials,
        })
    }

    pub fn from_config(config: &DashboardConfig) -> Result<Self, LoadError> {
        Self::new(
            config.spreadsheet_key.clone(),
            config.worksheet.clone(),
            config.credentials.clone(),
            config.request_timeout,
        )
    }

    /// Points the client at a different API host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// URL of the values endpoint for the configured worksheet.
    pub fn values_url(&self) -> String {
        format!(
            "{}/{}/values/{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(&self.spreadsheet_key),
            urlencoding::encode(&self.worksheet)
        )
    }
}

#[async_trait]
impl FeedbackSource for GoogleSheetsSource {
    async fn fetch_rows(&self) -> Result<SheetRows, LoadError> {
        let url = self.values_url();
        debug!("fetching {}", url);

        let mut request = self
            .client
            .get(&url)
            .query(&[("valueRenderOption", "FORMATTED_VALUE")]);
        request = match &self.credentials {
            Some(SheetsCredentials::AccessToken(token)) => request.bearer_auth(token),
            Some(SheetsCredentials::ApiKey(key)) => request.query(&[("key", key.as_str())]),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let err = classify_failure(status, &body, &self.spreadsheet_key, &self.worksheet);
            error!("loading {} failed: {}", self.describe(), err);
            return Err(err);
        }

        decode_values(&body)
    }

    fn describe(&self) -> String {
        format!(
            "spreadsheet {} / worksheet {}",
            self.spreadsheet_key, self.worksheet
        )
    }
}

/// Maps a non-success response onto the fatal load error it stands for.
///
/// The API answers a bad worksheet name with HTTP 400 and an
/// "Unable to parse range" message rather than 404.
pub fn classify_failure(status: StatusCode, body: &str, spreadsheet_key: &str, worksheet: &str) -> LoadError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|parsed| parsed.error.message)
        .unwrap_or_else(|_| body.trim().to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LoadError::Unauthorized(message),
        StatusCode::NOT_FOUND => LoadError::SpreadsheetNotFound(spreadsheet_key.to_string()),
        StatusCode::BAD_REQUEST if message.contains("Unable to parse range") => {
            LoadError::WorksheetNotFound(worksheet.to_string())
        }
        _ => LoadError::Upstream {
            status: status.as_u16(),
            message,
        },
    }
}

/// Turns a values response into a header row plus data rows.
///
/// Non-string cells (numbers, booleans) are rendered as text.
pub fn decode_values(body: &str) -> Result<SheetRows, LoadError> {
    let range: ValueRange =
        serde_json::from_str(body).map_err(|e| LoadError::Decode(e.to_string()))?;

    let grid = range
        .values
        .into_iter()
        .map(|row| row.into_iter().map(cell_text).collect())
        .collect();

    Ok(SheetRows::from_grid(grid))
}

fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_header_and_rows() {
        let body = r#"{
            "range": "Sheet1!A1:D3",
            "majorDimension": "ROWS",
            "values": [
                ["date", "source", "dish", "comment"],
                ["01.01.2024", "R1", "Soup", "плохо"],
                ["02.01.2024", "R2", 7]
            ]
        }"#;
        let table = decode_values(body).unwrap();
        assert_eq!(table.header, vec!["date", "source", "dish", "comment"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1], vec!["02.01.2024", "R2", "7"]);
    }

    #[test]
    fn empty_sheet_has_no_header() {
        let table = decode_values(r#"{"range": "Sheet1!A1:Z1000"}"#).unwrap();
        assert!(table.header.is_empty());
        assert!(table.rows.is_empty());
    }

    #[test]
    fn garbage_body_is_a_decode_error() {
        assert!(matches!(decode_values("<html>"), Err(LoadError::Decode(_))));
    }

    #[test]
    fn classifies_auth_and_missing_resources() {
        let denied = r#"{"error": {"code": 403, "message": "The caller does not have permission"}}"#;
        match classify_failure(StatusCode::FORBIDDEN, denied, "key", "Sheet1") {
            LoadError::Unauthorized(message) => assert!(message.contains("permission")),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            classify_failure(StatusCode::NOT_FOUND, "", "key", "Sheet1"),
            LoadError::SpreadsheetNotFound(key) if key == "key"
        ));
        let bad_range = r#"{"error": {"code": 400, "message": "Unable to parse range: Sheet9"}}"#;
        assert!(matches!(
            classify_failure(StatusCode::BAD_REQUEST, bad_range, "key", "Sheet9"),
            LoadError::WorksheetNotFound(sheet) if sheet == "Sheet9"
        ));
        assert!(matches!(
            classify_failure(StatusCode::BAD_GATEWAY, "oops", "key", "Sheet1"),
            LoadError::Upstream { status: 502, .. }
        ));
    }

    #[test]
    fn worksheet_name_is_encoded() {
        let source = GoogleSheetsSource::new("abc", "Лист 1", None, Duration::from_secs(5))
            .unwrap()
            .with_base_url("http://localhost:9/");
        assert_eq!(
            source.values_url(),
            "http://localhost:9/abc/values/%D0%9B%D0%B8%D1%81%D1%82%201"
        );
    }
}
