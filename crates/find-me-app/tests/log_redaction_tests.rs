//! Integration tests for log redaction.

use find_me_app::redact_sensitive;

#[test]
fn log_redaction_tests_removes_obvious_secret_markers() {
    let raw = "request failed: authorization=Bearer abc123";
    let redacted = redact_sensitive(raw);

    assert!(redacted.starts_with("request failed: "));
    assert!(redacted.contains("<redacted>"));
    assert!(!redacted.contains("abc123"));
}

#[test]
fn log_redaction_tests_leaves_plain_text_alone() {
    assert_eq!(
        redact_sensitive("connection refused"),
        "connection refused"
    );
}
