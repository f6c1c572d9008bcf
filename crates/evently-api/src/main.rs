//! evently API server.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use evently_api::{router, services::RsvpCoordinator, AppConfig, AppState, JwtAuthenticator};
use evently_calendar::{CalendarTokenCoordinator, GoogleCalendarProvider};
use evently_db::{log_pool_metrics, Database};
use evently_notify::{transport_from_config, MessageTemplates, NotificationDispatcher};

const OAUTH_STATE_PURGE_INTERVAL: Duration = Duration::from_secs(3600);

const DEFAULT_LOG_FILTER: &str =
    "evently_api=debug,evently_notify=debug,evently_calendar=debug,evently_db=info,tower_http=debug";

/// Install the global subscriber.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_FILE    - path to a daily-rolled log file (default: stdout)
///   LOG_ANSI    - "true"/"false" to force ANSI colors
///   RUST_LOG    - env filter (default: [`DEFAULT_LOG_FILTER`])
///
/// The returned guard flushes the file writer and must live until shutdown.
fn init_tracing() -> Option<WorkerGuard> {
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v == "json");
    let log_file = std::env::var("LOG_FILE").ok();
    let ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(env_filter);

    let (writer, guard) = match log_file.as_deref().map(Path::new) {
        Some(path) => {
            let dir = path.parent().unwrap_or(Path::new("."));
            let name = path
                .file_name()
                .and_then(|f| f.to_str())
                .unwrap_or("evently-api.log");
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, name));
            (BoxMakeWriter::new(writer), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stdout), None),
    };

    // Files get plain text unless colors are forced.
    let ansi = ansi.unwrap_or(log_file.is_none());
    if json {
        registry
            .with(fmt::layer().json().with_writer(writer))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(writer).with_ansi(ansi))
            .init();
    }

    info!(
        subsystem = "api",
        json,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );
    guard
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = init_tracing();

    let config = AppConfig::from_env()?;

    // Database
    let db = Database::connect_with_config(&config.database_url, config.pool.clone()).await?;
    db.migrate().await?;
    info!(subsystem = "db", "Migrations applied");

    // Notifications
    let transport = transport_from_config(config.smtp.as_ref())?;
    let dispatcher = Arc::new(NotificationDispatcher::spawn(
        transport,
        MessageTemplates::new(config.app_base_url.clone()),
        config.dispatcher.clone(),
    ));

    let rsvps = Arc::new(RsvpCoordinator::new(
        db.events.clone(),
        db.users.clone(),
        db.rsvps.clone(),
        dispatcher,
    ));

    // Calendar (optional)
    let calendar = match config.calendar.clone() {
        Some(calendar_config) => {
            info!(
                subsystem = "calendar",
                redirect_uri = %calendar_config.redirect_uri,
                "Google Calendar integration enabled"
            );
            let provider = GoogleCalendarProvider::new(calendar_config)?;
            Some(Arc::new(CalendarTokenCoordinator::new(
                Arc::new(provider),
                db.calendar_tokens.clone(),
                db.oauth_states.clone(),
            )))
        }
        None => {
            warn!(
                subsystem = "calendar",
                "Google credentials not found, calendar routes disabled"
            );
            None
        }
    };

    // Expired OAuth nonces never match; clear them out periodically.
    {
        let db = db.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(OAUTH_STATE_PURGE_INTERVAL);
            loop {
                interval.tick().await;
                match db.oauth_states.purge_expired().await {
                    Ok(n) if n > 0 => info!(subsystem = "db", purged = n, "Purged expired OAuth states"),
                    Ok(_) => {}
                    Err(e) => warn!(subsystem = "db", error = %e, "Failed to purge OAuth states"),
                }
                log_pool_metrics(db.pool());
            }
        });
    }

    let state = AppState {
        db: Some(db),
        rsvps,
        authenticator: Arc::new(JwtAuthenticator::new(&config.jwt_secret)),
        calendar,
        calendar_connected_url: config.calendar_connected_url(),
    };

    let app = router(state, &config.allowed_origins);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
