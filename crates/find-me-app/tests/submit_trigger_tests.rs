//! Integration tests for the submit trigger while a classification runs.

mod common;

use common::{FakeApi, SCENARIO_REPLY, logged_in, select};
use find_me_contract::HttpReply;
use find_me_ui::{Route, SubmitStatus};

#[test]
fn submit_trigger_tests_disabled_while_request_runs() {
    let api = FakeApi::replying(200, SCENARIO_REPLY);
    let mut harness = logged_in(api.clone());
    select(&mut harness.app, &["a.jpg", "b.jpg", "c.jpg"]);
    api.watch(harness.app.submit_trigger());
    assert!(harness.app.can_submit());

    harness.app.submit().expect("submit");

    assert_eq!(api.trigger_seen(), vec![false]);
    assert!(harness.app.submit_trigger().is_enabled());
    assert_eq!(harness.app.ui().submit, SubmitStatus::Idle);
    assert_eq!(harness.app.route(), Route::Results);
}

#[test]
fn submit_trigger_tests_reenabled_after_failure_for_manual_retry() {
    let api = FakeApi::new(vec![
        HttpReply::new(500, r#"{"detail":"Model unavailable"}"#),
        HttpReply::new(200, SCENARIO_REPLY),
    ]);
    let mut harness = logged_in(api.clone());
    select(&mut harness.app, &["a.jpg"]);
    api.watch(harness.app.submit_trigger());

    harness.app.submit().expect_err("first submit fails");

    assert_eq!(api.trigger_seen(), vec![false]);
    assert_eq!(harness.app.ui().submit, SubmitStatus::Failed);
    assert!(harness.app.can_submit());
    assert_eq!(api.calls().len(), 1);

    harness.app.submit().expect("retry succeeds");

    assert_eq!(api.trigger_seen(), vec![false, false]);
    assert_eq!(api.calls().len(), 2);
    assert_eq!(harness.app.route(), Route::Results);
}
