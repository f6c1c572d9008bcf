//! Google OAuth2 and Calendar API provider.

use async_trait::async_trait;
use chrono::{Duration, SecondsFormat, Utc};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use evently_core::{
    CalendarEventInput, CalendarProvider, CalendarToken, Error, RemoteEventRef, Result,
};

use crate::config::GoogleCalendarConfig;

/// Google Calendar provider backed by a shared HTTP client.
pub struct GoogleCalendarProvider {
    config: GoogleCalendarConfig,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventDateTime {
    date_time: String,
    time_zone: &'static str,
}

#[derive(Debug, Serialize)]
struct InsertEventRequest<'a> {
    summary: &'a str,
    description: &'a str,
    location: &'a str,
    start: EventDateTime,
    end: EventDateTime,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertEventResponse {
    id: String,
    #[serde(default)]
    html_link: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl GoogleTokenResponse {
    fn into_token(
        self,
        previous_refresh: Option<&str>,
    ) -> std::result::Result<CalendarToken, String> {
        let expiry = match self.expires_in {
            Some(secs) => Some(
                Duration::try_seconds(secs)
                    .and_then(|ttl| Utc::now().checked_add_signed(ttl))
                    .ok_or_else(|| format!("expires_in out of range: {}", secs))?,
            ),
            None => None,
        };
        Ok(CalendarToken {
            access_token: self.access_token,
            // Google omits refresh_token on refresh; keep the one we had.
            refresh_token: self
                .refresh_token
                .or_else(|| previous_refresh.map(str::to_string)),
            token_type: self.token_type.unwrap_or_else(|| "Bearer".to_string()),
            expiry,
        })
    }
}

fn utc_instant(value: chrono::DateTime<Utc>) -> EventDateTime {
    EventDateTime {
        date_time: value.to_rfc3339_opts(SecondsFormat::Secs, true),
        time_zone: "UTC",
    }
}

impl GoogleCalendarProvider {
    pub fn new(config: GoogleCalendarConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> std::result::Result<GoogleTokenResponse, String> {
        let response = self
            .client
            .post(&self.config.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| format!("token endpoint unreachable: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("token endpoint returned {}: {}", status, body));
        }

        response
            .json::<GoogleTokenResponse>()
            .await
            .map_err(|e| format!("invalid token response: {}", e))
    }
}

#[async_trait]
impl CalendarProvider for GoogleCalendarProvider {
    fn authorization_url(&self, state: &str) -> Result<String> {
        let scope = self.config.scopes.join(" ");
        let url = Url::parse_with_params(
            &self.config.auth_url,
            &[
                ("response_type", "code"),
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("scope", scope.as_str()),
                ("state", state),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| Error::Config(format!("Invalid auth URL: {}", e)))?;
        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str) -> Result<CalendarToken> {
        let params = [
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self.token_request(&params).await.map_err(|e| {
            warn!(
                subsystem = "calendar",
                component = "google",
                op = "exchange_code",
                error = %e,
                "Google token exchange failed"
            );
            Error::Exchange(e)
        })?;

        debug!(
            subsystem = "calendar",
            component = "google",
            op = "exchange_code",
            has_refresh_token = response.refresh_token.is_some(),
            "Exchanged authorization code"
        );
        response.into_token(None).map_err(Error::Exchange)
    }

    async fn refresh(&self, token: &CalendarToken) -> Result<CalendarToken> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Refresh("no refresh token stored".to_string()))?;

        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self.token_request(&params).await.map_err(|e| {
            warn!(
                subsystem = "calendar",
                component = "google",
                op = "refresh",
                error = %e,
                "Google token refresh failed"
            );
            Error::Refresh(e)
        })?;

        response.into_token(Some(refresh_token)).map_err(Error::Refresh)
    }

    async fn insert_event(
        &self,
        token: &CalendarToken,
        event: &CalendarEventInput,
    ) -> Result<RemoteEventRef> {
        let url = format!(
            "{}/calendars/primary/events",
            self.config.api_base_url.trim_end_matches('/')
        );
        let body = InsertEventRequest {
            summary: &event.title,
            description: &event.description,
            location: &event.location,
            start: utc_instant(event.start),
            end: utc_instant(event.resolved_end()),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&token.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::RemoteSync(format!("Google API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::RemoteSync(format!(
                "Google API error ({}): {}",
                status, error_text
            )));
        }

        let created: InsertEventResponse = response
            .json()
            .await
            .map_err(|e| Error::RemoteSync(format!("Failed to parse Google response: {}", e)))?;

        Ok(RemoteEventRef {
            id: created.id,
            html_link: created.html_link,
            status: created.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn provider() -> GoogleCalendarProvider {
        GoogleCalendarProvider::new(GoogleCalendarConfig::new(
            "client-123",
            "secret",
            "http://localhost:9000/api/calendar/callback",
        ))
        .unwrap()
    }

    #[test]
    fn test_authorization_url_requests_offline_consent() {
        let url = provider().authorization_url("nonce-abc").unwrap();
        let parsed = Url::parse(&url).unwrap();
        let params: std::collections::HashMap<_, _> = parsed.query_pairs().into_owned().collect();

        assert_eq!(parsed.host_str(), Some("accounts.google.com"));
        assert_eq!(params["state"], "nonce-abc");
        assert_eq!(params["client_id"], "client-123");
        assert_eq!(params["access_type"], "offline");
        assert_eq!(params["prompt"], "consent");
        assert_eq!(params["response_type"], "code");
        assert_eq!(
            params["redirect_uri"],
            "http://localhost:9000/api/calendar/callback"
        );
    }

    #[test]
    fn test_event_times_are_rfc3339_utc() {
        let start = Utc.with_ymd_and_hms(2026, 3, 4, 9, 0, 0).unwrap();
        let value = utc_instant(start);
        assert_eq!(value.date_time, "2026-03-04T09:00:00Z");
        assert_eq!(value.time_zone, "UTC");
    }

    #[test]
    fn test_refresh_keeps_previous_refresh_token() {
        let response = GoogleTokenResponse {
            access_token: "new".to_string(),
            expires_in: Some(3600),
            refresh_token: None,
            token_type: None,
        };
        let token = response.into_token(Some("old-refresh")).unwrap();
        assert_eq!(token.refresh_token.as_deref(), Some("old-refresh"));
        assert_eq!(token.token_type, "Bearer");
        assert!(!token.is_expired());
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token_fails_fast() {
        let token = CalendarToken {
            access_token: "at".to_string(),
            refresh_token: None,
            token_type: "Bearer".to_string(),
            expiry: None,
        };
        let err = provider().refresh(&token).await.unwrap_err();
        assert!(matches!(err, Error::Refresh(_)));
    }
}
