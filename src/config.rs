// ABOUTME: Process configuration loaded from environment variables (§10.1)
// ABOUTME: Distinct from the persisted ServerConfig row in the data model

use std::io::IsTerminal;
use std::time::Duration;

use crate::errors::AppError;
use crate::notifier::smtp::SmtpConfig;
use crate::ratelimit::{DEFAULT_LOCKOUT, DEFAULT_MAX_ATTEMPTS, DEFAULT_WINDOW};

/// Output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, colorized when stdout is a TTY.
    Pretty,
    /// Newline-delimited JSON, suited to log aggregation.
    Json,
}

/// Process configuration, loaded once at startup.
pub struct ServerConfig {
    /// Directory holding the SQLite database file.
    pub data_dir: std::path::PathBuf,
    /// Address the HTTP server binds.
    pub http_addr: String,
    /// Certificate validity window, fixed at `init` time.
    pub cert_validity: chrono::Duration,
    /// Session token TTL.
    pub session_ttl: chrono::Duration,
    /// Invite token TTL.
    pub invite_ttl: chrono::Duration,
    /// SMTP settings, if mail is configured.
    pub smtp: Option<SmtpConfig>,
    /// Rate-limiter failure threshold.
    pub rate_limit_max_attempts: u32,
    /// Rate-limiter sliding window.
    pub rate_limit_window: Duration,
    /// Rate-limiter lockout duration.
    pub rate_limit_lockout: Duration,
    /// Tracing subscriber output format.
    pub log_format: LogFormat,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_duration_str(value: &str, field: &str) -> Result<chrono::Duration, AppError> {
    let (number_part, unit) = value.split_at(
        value
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| AppError::invalid_input(format!("{field} must end in a unit (s/m/h/d)")))?,
    );
    let number: i64 = number_part
        .parse()
        .map_err(|_| AppError::invalid_input(format!("{field} has a non-numeric value")))?;
    match unit {
        "s" => Ok(chrono::Duration::seconds(number)),
        "m" => Ok(chrono::Duration::minutes(number)),
        "h" => Ok(chrono::Duration::hours(number)),
        "d" => Ok(chrono::Duration::days(number)),
        other => Err(AppError::invalid_input(format!(
            "{field} has unknown unit '{other}', expected s/m/h/d"
        ))),
    }
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    /// Returns `AppError::InvalidInput` if a duration or numeric variable is
    /// malformed; this is treated as a configuration error (exit code `2`,
    /// §6) by the binary entry point.
    pub fn from_env() -> Result<Self, AppError> {
        let data_dir = std::path::PathBuf::from(env_or("KEYFORGE_DATA_DIR", "./data"));
        let http_addr = env_or("KEYFORGE_HTTP_ADDR", "0.0.0.0:8080");
        let cert_validity = parse_duration_str(&env_or("KEYFORGE_CERT_VALIDITY", "24h"), "KEYFORGE_CERT_VALIDITY")?;
        let session_ttl = parse_duration_str(&env_or("KEYFORGE_SESSION_TTL", "30d"), "KEYFORGE_SESSION_TTL")?;
        let invite_ttl = parse_duration_str(&env_or("KEYFORGE_INVITE_TTL", "7d"), "KEYFORGE_INVITE_TTL")?;

        let smtp_host = std::env::var("KEYFORGE_SMTP_HOST").ok();
        let smtp = smtp_host.map(|host| SmtpConfig {
            host,
            port: env_or("KEYFORGE_SMTP_PORT", "587")
                .parse()
                .unwrap_or(587),
            username: env_or("KEYFORGE_SMTP_USER", ""),
            password: env_or("KEYFORGE_SMTP_PASS", ""),
            from: env_or("KEYFORGE_SMTP_FROM", "keyforge@localhost"),
        });

        let rate_limit_max_attempts = env_or("KEYFORGE_RATE_LIMIT_MAX", &DEFAULT_MAX_ATTEMPTS.to_string())
            .parse()
            .map_err(|_| AppError::invalid_input("KEYFORGE_RATE_LIMIT_MAX must be a positive integer"))?;
        let rate_limit_window = Duration::from_secs(
            env_or(
                "KEYFORGE_RATE_LIMIT_WINDOW_SECS",
                &DEFAULT_WINDOW.as_secs().to_string(),
            )
            .parse()
            .map_err(|_| AppError::invalid_input("KEYFORGE_RATE_LIMIT_WINDOW_SECS must be a positive integer"))?,
        );
        let rate_limit_lockout = Duration::from_secs(
            env_or(
                "KEYFORGE_RATE_LIMIT_LOCKOUT_SECS",
                &DEFAULT_LOCKOUT.as_secs().to_string(),
            )
            .parse()
            .map_err(|_| AppError::invalid_input("KEYFORGE_RATE_LIMIT_LOCKOUT_SECS must be a positive integer"))?,
        );

        let log_format = match std::env::var("KEYFORGE_LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("pretty") => LogFormat::Pretty,
            _ if std::io::stdout().is_terminal() => LogFormat::Pretty,
            _ => LogFormat::Json,
        };

        Ok(Self {
            data_dir,
            http_addr,
            cert_validity,
            session_ttl,
            invite_ttl,
            smtp,
            rate_limit_max_attempts,
            rate_limit_window,
            rate_limit_lockout,
            log_format,
        })
    }

    /// Path to the SQLite database file inside `data_dir`.
    #[must_use]
    pub fn database_path(&self) -> std::path::PathBuf {
        self.data_dir.join("keyforge.sqlite3")
    }

    /// Read and parse the 32-byte master key from `KEYFORGE_MASTER_KEY`.
    ///
    /// # Errors
    /// Returns `AppError::InvalidInput` if the variable is missing or not a
    /// 64-character hex string.
    pub fn master_key(&self) -> Result<crate::crypto::MasterKey, AppError> {
        let hex_str = std::env::var("KEYFORGE_MASTER_KEY")
            .map_err(|_| AppError::invalid_input("KEYFORGE_MASTER_KEY is not set"))?;
        crate::crypto::MasterKey::from_hex(&hex_str)
    }

    /// Read the one-time admin token from `KEYFORGE_ADMIN_TOKEN`, consumed
    /// only during `init`.
    ///
    /// # Errors
    /// Returns `AppError::InvalidInput` if the variable is missing or empty.
    pub fn admin_token(&self) -> Result<String, AppError> {
        let token = std::env::var("KEYFORGE_ADMIN_TOKEN")
            .map_err(|_| AppError::invalid_input("KEYFORGE_ADMIN_TOKEN is not set"))?;
        if token.is_empty() {
            return Err(AppError::invalid_input("KEYFORGE_ADMIN_TOKEN must not be empty"));
        }
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration_units() {
        assert_eq!(parse_duration_str("24h", "x").unwrap(), chrono::Duration::hours(24));
        assert_eq!(parse_duration_str("7d", "x").unwrap(), chrono::Duration::days(7));
        assert_eq!(parse_duration_str("30d", "x").unwrap(), chrono::Duration::days(30));
    }

    #[test]
    fn rejects_unknown_unit() {
        assert!(parse_duration_str("24x", "x").is_err());
    }
}
