use config::Config;
use parcel_guardian::config::{AppConfig, SmtpConfig};
use std::env;

fn full_yaml() -> &'static str {
    r#"
database_url: "postgres://localhost/test"
frontend_url: "https://example.com"
admin_key: "super_secret_admin_key_123"
support_email: "support@example.com"
smtp:
  server: "smtp.example.com"
  port: 587
  username: "user@example.com"
  password: "secret123"
  from: "noreply@example.com"
"#
}

#[test]
fn test_smtp_config_deserialization() {
    let yaml_content = r#"
server: "smtp.example.com"
port: 587
username: "user@example.com"
password: "secret123"
from: "noreply@example.com"
"#;

    let config = Config::builder()
        .add_source(config::File::from_str(
            yaml_content,
            config::FileFormat::Yaml,
        ))
        .build()
        .expect("Failed to build config");

    let smtp_config: SmtpConfig = config
        .try_deserialize()
        .expect("Failed to deserialize SMTP config");
    assert_eq!(smtp_config.server, "smtp.example.com");
    assert_eq!(smtp_config.port, 587);
    assert_eq!(smtp_config.username, "user@example.com");
    assert_eq!(smtp_config.password, "secret123");
    assert_eq!(smtp_config.from, "noreply@example.com");
    // Not set in the file, falls back to the built-in default.
    assert_eq!(smtp_config.timeout_secs, 30);
}

#[test]
fn test_app_config_deserialization() {
    let config = Config::builder()
        .add_source(config::File::from_str(
            full_yaml(),
            config::FileFormat::Yaml,
        ))
        .build()
        .expect("Failed to build config");

    let app_config: AppConfig = config
        .try_deserialize()
        .expect("Failed to deserialize app config");
    assert_eq!(app_config.database_url, "postgres://localhost/test");
    assert_eq!(app_config.frontend_url, "https://example.com");
    assert_eq!(app_config.admin_key, "super_secret_admin_key_123");
    assert_eq!(app_config.support_email, "support@example.com");
    assert_eq!(app_config.smtp.server, "smtp.example.com");
    assert_eq!(app_config.smtp.port, 587);
}

#[test]
fn test_app_config_defaults() {
    let config = Config::builder()
        .add_source(config::File::from_str(
            full_yaml(),
            config::FileFormat::Yaml,
        ))
        .build()
        .expect("Failed to build config");

    let app_config: AppConfig = config
        .try_deserialize()
        .expect("Failed to deserialize app config");
    assert_eq!(app_config.bind_addr, "0.0.0.0:8080");
    assert!(app_config.allowed_origins.is_empty());
    assert_eq!(app_config.monitor.interval_secs, 300);
    assert!(!app_config.monitor.case_insensitive_rules);
}

#[test]
fn test_monitor_section_overrides() {
    let yaml_content = format!(
        "{}\nmonitor:\n  interval_secs: 0\n  case_insensitive_rules: true\n",
        full_yaml()
    );

    let config = Config::builder()
        .add_source(config::File::from_str(
            &yaml_content,
            config::FileFormat::Yaml,
        ))
        .build()
        .expect("Failed to build config");

    let app_config: AppConfig = config
        .try_deserialize()
        .expect("Failed to deserialize app config");
    assert_eq!(app_config.monitor.interval_secs, 0);
    assert!(app_config.monitor.case_insensitive_rules);
}

#[test]
fn test_config_with_environment_variables() {
    // Test environment variable override
    unsafe {
        env::set_var("DATABASE_URL", "postgres://env/test");
        env::set_var("FRONTEND_URL", "https://env.example.com");

        let config = Config::builder()
            .add_source(config::File::from_str(
                full_yaml(),
                config::FileFormat::Yaml,
            ))
            .add_source(config::Environment::default().separator("__"))
            .build()
            .expect("Failed to build config");

        let app_config: AppConfig = config.try_deserialize().expect("Failed to deserialize");

        // Environment variables should override file values
        assert_eq!(app_config.database_url, "postgres://env/test");
        assert_eq!(app_config.frontend_url, "https://env.example.com");
        // Non-overridden values should come from file
        assert_eq!(app_config.admin_key, "super_secret_admin_key_123");

        // Clean up
        env::remove_var("DATABASE_URL");
        env::remove_var("FRONTEND_URL");
    }
}

#[test]
fn test_smtp_config_field_types() {
    // Test that port is correctly parsed as u16
    let yaml_content = r#"
server: "test.com"
port: 65535
username: "test"
password: "test"
from: "test@test.com"
"#;

    let config = Config::builder()
        .add_source(config::File::from_str(
            yaml_content,
            config::FileFormat::Yaml,
        ))
        .build()
        .expect("Failed to build config");

    let smtp_config: SmtpConfig = config.try_deserialize().expect("Failed to deserialize");
    assert_eq!(smtp_config.port, 65535u16);
}

#[test]
fn test_config_partial_structure() {
    // Test error handling when required fields are missing
    let invalid_yaml = r#"
database_url: "postgres://localhost/test"
# Missing smtp section, frontend_url, admin_key and support_email
"#;

    let config = Config::builder()
        .add_source(config::File::from_str(
            invalid_yaml,
            config::FileFormat::Yaml,
        ))
        .build()
        .expect("Failed to build config");

    let result: Result<AppConfig, _> = config.try_deserialize();
    assert!(
        result.is_err(),
        "Should fail when required fields are missing"
    );
}
