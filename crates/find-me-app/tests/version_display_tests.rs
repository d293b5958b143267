//! Integration tests for version plumbing.

use find_me_app::{APP_VERSION, app_version};

#[test]
fn version_display_tests_matches_workspace_version_file() {
    let raw = include_str!("../../../VERSION");
    assert_eq!(app_version(), raw.trim());
    assert!(!APP_VERSION.is_empty());
}
