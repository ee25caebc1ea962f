use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration build error: {0}")]
    Build(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

#[derive(Debug, Deserialize)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    /// Upper bound for a single send attempt. A timed-out send is retried on
    /// the next monitor pass like any other transport failure.
    #[serde(default = "default_smtp_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between scheduled monitor passes. `0` disables the in-process
    /// scheduler; passes can still be triggered via `POST /api/monitor/run`.
    #[serde(default = "default_monitor_interval_secs")]
    pub interval_secs: u64,
    /// Match exception rules case-insensitively. The carrier feed is upper
    /// case in practice, so the default keeps the stricter behaviour.
    #[serde(default)]
    pub case_insensitive_rules: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_monitor_interval_secs(),
            case_insensitive_rules: false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub smtp: SmtpConfig,
    pub frontend_url: String,
    /// Shared secret for the `/admin` endpoints, sent as `x-admin-key`.
    pub admin_key: String,
    /// Recipient for support_request events.
    pub support_email: String,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Origins allowed by CORS. Empty list means same-origin only.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

fn default_smtp_timeout_secs() -> u64 {
    30
}

fn default_monitor_interval_secs() -> u64 {
    300
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

/// Load application configuration from `config.yaml` + environment overrides.
///
/// Environment variable override convention (current): any var matching the key path
/// separated by double underscores (e.g. `SMTP__PORT`) *without* a prefix will override
/// the file value. A future iteration may introduce a prefix (e.g. `APP__`).
///
/// Returns a `ConfigError` instead of panicking so the caller can decide how to fail.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    use config::{Config, Environment, File};
    let cfg = Config::builder()
        .add_source(File::with_name("config.yaml"))
        .add_source(Environment::default().separator("__"))
        .build()?;

    let app: AppConfig = cfg.try_deserialize()?;

    if app.admin_key.len() < 16 {
        return Err(ConfigError::Validation(
            "admin_key must be at least 16 characters".into(),
        ));
    }
    if app.smtp.port == 0 {
        return Err(ConfigError::Validation("smtp.port must be > 0".into()));
    }
    if app.smtp.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "smtp.timeout_secs must be > 0".into(),
        ));
    }
    if app.support_email.is_empty() || !app.support_email.contains('@') {
        return Err(ConfigError::Validation(
            "support_email must be a valid address".into(),
        ));
    }

    Ok(app)
}

/// Convenience helper for binaries wanting the old panic-on-error behaviour.
pub fn load_config_or_panic() -> AppConfig {
    match load_config() {
        Ok(c) => c,
        Err(e) => panic!("Failed to load configuration: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monitor_defaults() {
        let monitor = MonitorConfig::default();
        assert_eq!(monitor.interval_secs, 300);
        assert!(!monitor.case_insensitive_rules);
    }

    #[test]
    fn default_bind_addr_is_all_interfaces() {
        assert_eq!(default_bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn smtp_timeout_default_is_bounded() {
        assert_eq!(default_smtp_timeout_secs(), 30);
    }
}
