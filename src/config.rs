use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Spreadsheet holding the feedback table.
pub const DEFAULT_SPREADSHEET_KEY: &str = "1ymTQHXs7rCH6giN8lyefioQeyXR2nToYLosTRcj5--s";
pub const DEFAULT_WORKSHEET: &str = "Sheet1";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 60 * 60;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Credentials for the spreadsheet API, injected from outside.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetsCredentials {
    /// OAuth access token sent as `Authorization: Bearer`.
    ///
    /// The token is used as given and is never renewed here. Whoever injects
    /// it must refresh it before it expires, or loads start failing with
    /// `LoadError::Unauthorized`.
    AccessToken(String),
    /// API key sent as the `key` query parameter.
    ApiKey(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub bind_addr: String,
    pub spreadsheet_key: String,
    pub worksheet: String,
    #[serde(rename = "cache_ttl_secs", with = "secs")]
    pub cache_ttl: Duration,
    #[serde(rename = "request_timeout_secs", with = "secs")]
    pub request_timeout: Duration,
    pub credentials: Option<SheetsCredentials>,
    /// Read this CSV export instead of the remote sheet.
    pub csv_path: Option<PathBuf>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            spreadsheet_key: DEFAULT_SPREADSHEET_KEY.to_string(),
            worksheet: DEFAULT_WORKSHEET.to_string(),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            credentials: None,
            csv_path: None,
        }
    }
}

impl DashboardConfig {
    /// Reads `FEEDBACK_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// `FEEDBACK_SECRETS_FILE` names a JSON file with the same fields as this
    /// struct; individual variables override it.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup("FEEDBACK_SECRETS_FILE") {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                serde_json::from_str(&text)?
            }
            None => DashboardConfig::default(),
        };

        if let Some(addr) = lookup("FEEDBACK_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(key) = lookup("FEEDBACK_SPREADSHEET_KEY") {
            config.spreadsheet_key = key;
        }
        if let Some(sheet) = lookup("FEEDBACK_WORKSHEET") {
            config.worksheet = sheet;
        }
        if let Some(ttl) = lookup("FEEDBACK_CACHE_TTL_SECS") {
            config.cache_ttl = parse_secs("FEEDBACK_CACHE_TTL_SECS", &ttl)?;
        }
        if let Some(timeout) = lookup("FEEDBACK_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = parse_secs("FEEDBACK_REQUEST_TIMEOUT_SECS", &timeout)?;
        }
        if let Some(token) = lookup("FEEDBACK_SHEETS_TOKEN") {
            config.credentials = Some(SheetsCredentials::AccessToken(token));
        } else if let Some(key) = lookup("FEEDBACK_SHEETS_API_KEY") {
            config.credentials = Some(SheetsCredentials::ApiKey(key));
        }
        if let Some(path) = lookup("FEEDBACK_CSV_PATH") {
            config.csv_path = Some(PathBuf::from(path));
        }

        Ok(config)
    }
}

fn parse_secs(key: &str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| ConfigError::Invalid {
            key: key.to_string(),
            reason: e.to_string(),
        })
}

mod secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_variables() {
        let config = DashboardConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.cache_ttl, Duration::from_secs(3600));
        assert_eq!(config.worksheet, "Sheet1");
    }

    #[test]
    fn variables_override_defaults() {
        let config = DashboardConfig::from_lookup(lookup_from(&[
            ("FEEDBACK_CACHE_TTL_SECS", "60"),
            ("FEEDBACK_SHEETS_API_KEY", "abc"),
            ("FEEDBACK_CSV_PATH", "/tmp/feedback.csv"),
        ]))
        .unwrap();
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.credentials, Some(SheetsCredentials::ApiKey("abc".into())));
        assert_eq!(config.csv_path, Some(PathBuf::from("/tmp/feedback.csv")));
    }

    #[test]
    fn rejects_non_numeric_ttl() {
        let err = DashboardConfig::from_lookup(lookup_from(&[("FEEDBACK_CACHE_TTL_SECS", "hour")]))
            .unwrap_err();
        assert!(err.to_string().contains("FEEDBACK_CACHE_TTL_SECS"));
    }

    #[test]
    fn reads_secrets_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"worksheet": "Отзывы", "credentials": {{"access_token": "t0k"}}}}"#
        )
        .unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let config = DashboardConfig::from_lookup(lookup_from(&[("FEEDBACK_SECRETS_FILE", path.as_str())]))
            .unwrap();
        assert_eq!(config.worksheet, "Отзывы");
        assert_eq!(config.credentials, Some(SheetsCredentials::AccessToken("t0k".into())));
        assert_eq!(config.spreadsheet_key, DEFAULT_SPREADSHEET_KEY);
    }
}
