use millwright_core::notification::DEFAULT_RETENTION_DAYS;
use millwright_notify::queue::DEFAULT_QUEUE_CAPACITY;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Read notifications older than this are purged (default: `30`).
    pub notification_retention_days: i64,
    /// Bound of the outgoing email queue (default: `256`).
    pub email_queue_capacity: usize,
    /// JWT verification settings.
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                    |
    /// |-------------------------------|----------------------------|
    /// | `HOST`                        | `0.0.0.0`                  |
    /// | `PORT`                        | `3000`                     |
    /// | `CORS_ORIGINS`                | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`        | `30`                       |
    /// | `NOTIFICATION_RETENTION_DAYS` | `30`                       |
    /// | `EMAIL_QUEUE_CAPACITY`        | `256`                      |
    ///
    /// SMTP settings are read separately by
    /// [`EmailConfig::from_env`](millwright_notify::EmailConfig::from_env).
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let notification_retention_days: i64 = std::env::var("NOTIFICATION_RETENTION_DAYS")
            .unwrap_or_else(|_| DEFAULT_RETENTION_DAYS.to_string())
            .parse()
            .expect("NOTIFICATION_RETENTION_DAYS must be a valid i64");

        let email_queue_capacity: usize = std::env::var("EMAIL_QUEUE_CAPACITY")
            .unwrap_or_else(|_| DEFAULT_QUEUE_CAPACITY.to_string())
            .parse()
            .expect("EMAIL_QUEUE_CAPACITY must be a valid usize");
        assert!(email_queue_capacity > 0, "EMAIL_QUEUE_CAPACITY must be positive");

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            notification_retention_days,
            email_queue_capacity,
            jwt,
        }
    }
}
