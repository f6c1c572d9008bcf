//! Server configuration, read once at startup.
//!
//! | Variable | Default |
//! |---|---|
//! | `DATABASE_URL` | `postgres://localhost/evently` |
//! | `HOST` | `0.0.0.0` |
//! | `PORT` | `9000` |
//! | `JWT_SECRET_KEY` | required |
//! | `FRONTEND_URL` | `http://localhost:5173` |
//! | `APP_BASE_URL` | `FRONTEND_URL` |
//! | `ALLOWED_ORIGINS` | `FRONTEND_URL` (comma-separated list) |
//!
//! SMTP, dispatcher, pool and calendar settings are read by their own crates'
//! `from_env` constructors and carried here.

use evently_calendar::GoogleCalendarConfig;
use evently_core::{defaults, Error, Result};
use evently_db::PoolConfig;
use evently_notify::{DispatcherConfig, SmtpConfig};

/// Everything `main` needs to build the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub frontend_url: String,
    pub app_base_url: String,
    pub allowed_origins: Vec<String>,
    pub pool: PoolConfig,
    pub dispatcher: DispatcherConfig,
    pub smtp: Option<SmtpConfig>,
    pub calendar: Option<GoogleCalendarConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let jwt_secret = std::env::var("JWT_SECRET_KEY")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Config("JWT_SECRET_KEY must be set".to_string()))?;

        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| Error::Config(format!("Invalid PORT: {}", raw)))?,
            Err(_) => defaults::SERVER_PORT,
        };

        let frontend_url = std::env::var("FRONTEND_URL")
            .unwrap_or_else(|_| defaults::FRONTEND_URL.to_string());
        let app_base_url = std::env::var("APP_BASE_URL").unwrap_or_else(|_| frontend_url.clone());
        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .map(|raw| parse_origins(&raw))
            .unwrap_or_else(|_| vec![frontend_url.clone()]);

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/evently".to_string()),
            host: std::env::var("HOST").unwrap_or_else(|_| defaults::SERVER_HOST.to_string()),
            port,
            jwt_secret,
            frontend_url,
            app_base_url,
            allowed_origins,
            pool: PoolConfig::from_env(),
            dispatcher: DispatcherConfig::from_env(),
            smtp: SmtpConfig::from_env(),
            calendar: GoogleCalendarConfig::from_env()?,
        })
    }

    /// Where the OAuth callback sends the browser once the token is stored.
    pub fn calendar_connected_url(&self) -> String {
        format!("{}/calendar-connected", self.frontend_url.trim_end_matches('/'))
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins_trims_and_skips_empty() {
        let origins = parse_origins(" http://a.test/ ,, https://b.test");
        assert_eq!(origins, vec!["http://a.test", "https://b.test"]);
    }

    #[test]
    fn test_calendar_connected_url() {
        let config = AppConfig {
            database_url: String::new(),
            host: "127.0.0.1".to_string(),
            port: 9000,
            jwt_secret: "s".to_string(),
            frontend_url: "https://evently.test/".to_string(),
            app_base_url: "https://evently.test".to_string(),
            allowed_origins: vec![],
            pool: PoolConfig::default(),
            dispatcher: DispatcherConfig::default(),
            smtp: None,
            calendar: None,
        };
        assert_eq!(
            config.calendar_connected_url(),
            "https://evently.test/calendar-connected"
        );
    }
}
