//! Google Calendar client configuration.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use evently_core::defaults;
use evently_core::{Error, Result};

/// OAuth client and API endpoints for Google Calendar.
#[derive(Debug, Clone)]
pub struct GoogleCalendarConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
    pub api_base_url: String,
    pub scopes: Vec<String>,
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize)]
struct CredentialsFile {
    web: Option<ClientSection>,
    installed: Option<ClientSection>,
}

#[derive(Debug, Deserialize)]
struct ClientSection {
    client_id: String,
    client_secret: String,
    auth_uri: Option<String>,
    token_uri: Option<String>,
}

impl GoogleCalendarConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            auth_url: defaults::GOOGLE_AUTH_URL.to_string(),
            token_url: defaults::GOOGLE_TOKEN_URL.to_string(),
            api_base_url: defaults::GOOGLE_CALENDAR_API_URL.to_string(),
            scopes: vec![defaults::CALENDAR_SCOPE.to_string()],
            timeout_seconds: defaults::CALENDAR_HTTP_TIMEOUT_SECS,
        }
    }

    /// Load from environment variables. Returns `Ok(None)` when the
    /// integration is not configured at all.
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `GOOGLE_CLIENT_ID` | - | OAuth client id (takes precedence over the file) |
    /// | `GOOGLE_CLIENT_SECRET` | - | OAuth client secret |
    /// | `GOOGLE_CREDENTIALS_FILE` | `google_client_credentials.json` | Client JSON downloaded from Google |
    /// | `CALENDAR_REDIRECT_URL` | `http://localhost:9000/api/calendar/callback` | OAuth callback |
    /// | `CALENDAR_TIMEOUT_SECS` | `30` | HTTP timeout for provider calls |
    pub fn from_env() -> Result<Option<Self>> {
        let redirect_uri = std::env::var("CALENDAR_REDIRECT_URL")
            .unwrap_or_else(|_| defaults::CALENDAR_REDIRECT_URL.to_string());

        let client_id = std::env::var("GOOGLE_CLIENT_ID").ok().filter(|v| !v.is_empty());
        let client_secret = std::env::var("GOOGLE_CLIENT_SECRET")
            .ok()
            .filter(|v| !v.is_empty());

        let mut config = match (client_id, client_secret) {
            (Some(id), Some(secret)) => Self::new(id, secret, redirect_uri),
            _ => match std::env::var("GOOGLE_CREDENTIALS_FILE") {
                Ok(path) => Self::from_credentials_file(&path, redirect_uri)?,
                Err(_) => {
                    let path = Path::new(defaults::GOOGLE_CREDENTIALS_FILE);
                    if !path.exists() {
                        return Ok(None);
                    }
                    Self::from_credentials_file(path, redirect_uri)?
                }
            },
        };

        if let Some(secs) = std::env::var("CALENDAR_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.timeout_seconds = secs;
        }

        Ok(Some(config))
    }

    /// Parse a Google client credentials file (`web` or `installed` section).
    pub fn from_credentials_file(
        path: impl AsRef<Path>,
        redirect_uri: impl Into<String>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Unable to read client credentials file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_credentials_json(&data, redirect_uri)
    }

    pub fn from_credentials_json(json: &str, redirect_uri: impl Into<String>) -> Result<Self> {
        let file: CredentialsFile = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Unable to parse client credentials: {}", e)))?;
        let section = file.web.or(file.installed).ok_or_else(|| {
            Error::Config("Client credentials must contain a web or installed section".into())
        })?;

        let mut config = Self::new(section.client_id, section.client_secret, redirect_uri);
        if let Some(auth_uri) = section.auth_uri {
            config.auth_url = auth_uri;
        }
        if let Some(token_uri) = section.token_uri {
            config.token_url = token_uri;
        }
        Ok(config)
    }

    /// Point every endpoint at `base` (used with mock servers).
    pub fn with_endpoints(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.auth_url = format!("{}/o/oauth2/auth", base);
        self.token_url = format!("{}/token", base);
        self.api_base_url = format!("{}/calendar/v3", base);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_web_credentials() {
        let json = r#"{"web":{"client_id":"id.apps","client_secret":"shh",
            "auth_uri":"https://accounts.google.com/o/oauth2/auth",
            "token_uri":"https://oauth2.googleapis.com/token"}}"#;
        let config = GoogleCalendarConfig::from_credentials_json(json, "http://cb").unwrap();
        assert_eq!(config.client_id, "id.apps");
        assert_eq!(config.client_secret, "shh");
        assert_eq!(config.redirect_uri, "http://cb");
        assert_eq!(config.token_url, "https://oauth2.googleapis.com/token");
        assert_eq!(
            config.scopes,
            vec!["https://www.googleapis.com/auth/calendar.events".to_string()]
        );
    }

    #[test]
    fn test_parse_installed_credentials_uses_default_endpoints() {
        let json = r#"{"installed":{"client_id":"desk","client_secret":"s"}}"#;
        let config = GoogleCalendarConfig::from_credentials_json(json, "http://cb").unwrap();
        assert_eq!(config.client_id, "desk");
        assert_eq!(config.auth_url, defaults::GOOGLE_AUTH_URL);
    }

    #[test]
    fn test_missing_section_is_config_error() {
        let err = GoogleCalendarConfig::from_credentials_json("{}", "http://cb").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_unreadable_file_is_config_error() {
        let err = GoogleCalendarConfig::from_credentials_file("/nonexistent/creds.json", "cb")
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_with_endpoints() {
        let config = GoogleCalendarConfig::new("id", "secret", "cb").with_endpoints("http://127.0.0.1:9/");
        assert_eq!(config.token_url, "http://127.0.0.1:9/token");
        assert_eq!(config.api_base_url, "http://127.0.0.1:9/calendar/v3");
    }
}
