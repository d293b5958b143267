//! Integration tests for non-auth backend failures.

mod common;

use common::{FakeApi, SCENARIO_REPLY, logged_in, select};
use find_me_app::AppError;
use find_me_client::SubmitError;
use find_me_contract::HttpReply;
use find_me_ui::{Route, SubmitStatus};

#[test]
fn backend_error_tests_detail_shown_inline_and_retry_is_manual() {
    let api = FakeApi::new(vec![
        HttpReply::new(500, r#"{"detail":"Model unavailable"}"#),
        HttpReply::new(200, SCENARIO_REPLY),
    ]);
    let mut harness = logged_in(api.clone());
    select(&mut harness.app, &["a.jpg", "b.jpg", "c.jpg"]);

    let error = harness.app.submit().expect_err("first submit should fail");

    assert!(matches!(
        error,
        AppError::Submit(SubmitError::Backend { status: 500, .. })
    ));
    assert_eq!(api.calls().len(), 1);
    assert_eq!(harness.app.route(), Route::Home);
    assert_eq!(harness.app.ui().submit, SubmitStatus::Failed);
    assert_eq!(
        harness.app.ui().inline_error.as_deref(),
        Some("Model unavailable")
    );
    assert!(harness.app.can_submit());
    assert!(harness.app.gate().is_authenticated());

    let route = harness.app.submit().expect("retry should succeed");

    assert_eq!(route, Route::Results);
    assert_eq!(api.calls().len(), 2);
    assert_eq!(harness.app.ui().submit, SubmitStatus::Idle);
}

#[test]
fn backend_error_tests_unparseable_body_is_inline_error() {
    let api = FakeApi::replying(200, "<html>gateway</html>");
    let mut harness = logged_in(api);
    select(&mut harness.app, &["a.jpg"]);

    let error = harness.app.submit().expect_err("submit should fail");

    assert!(matches!(error, AppError::Submit(SubmitError::Contract(_))));
    assert_eq!(
        harness.app.ui().inline_error.as_deref(),
        Some("The server returned an unexpected response.")
    );
    assert_eq!(harness.app.home().gallery().len(), 1);
}

#[test]
fn backend_error_tests_legacy_schema_is_rejected() {
    let api = FakeApi::replying(200, r#"{"with_people":["a.jpg"],"without_people":[]}"#);
    let mut harness = logged_in(api);
    select(&mut harness.app, &["a.jpg"]);

    let error = harness.app.submit().expect_err("submit should fail");

    assert!(matches!(error, AppError::Submit(SubmitError::Contract(_))));
    assert_eq!(harness.app.route(), Route::Home);
}

#[test]
fn backend_error_tests_plain_text_error_uses_fallback() {
    let api = FakeApi::replying(502, "Bad Gateway");
    let mut harness = logged_in(api);
    select(&mut harness.app, &["a.jpg"]);

    harness.app.submit().expect_err("submit should fail");

    assert_eq!(
        harness.app.ui().inline_error.as_deref(),
        Some("Classification failed. Please try again.")
    );
}
