//! Integration tests for logging system

use core_runtime::logging::{init_logging, redact_if_sensitive, LogFormat, LogLevel, LoggingConfig};

#[test]
fn test_logging_initializes_once() {
    // Only one global subscriber may be installed per process
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug);

    assert!(init_logging(config.clone()).is_ok());
    tracing::info!(target: "core_auth", "logging initialized");

    let second = init_logging(config);
    assert!(second.is_err());
}

#[test]
fn test_login_fields_are_redacted() {
    assert_eq!(redact_if_sensitive("password", "hunter2"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("access_token", "eyJhbGciOi"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("set-cookie", "refresh_token=x"), "[REDACTED]");

    let email = redact_if_sensitive("email", "grace@example.org");
    assert!(email.starts_with('g'));
    assert!(!email.contains("example.org"));
}

#[test]
fn test_profile_fields_pass_through() {
    assert_eq!(redact_if_sensitive("username", "grace"), "grace");
    assert_eq!(redact_if_sensitive("first_name", "Grace"), "Grace");
    assert_eq!(redact_if_sensitive("path", "/jobs/12/"), "/jobs/12/");
}
