//! Integration tests for submission error taxonomy.

use find_me_client::SubmitError;
use find_me_contract::ContractError;

#[test]
fn submit_error_classification_tests_groups_errors() {
    assert!(SubmitError::MissingTarget.is_local_validation());
    assert!(SubmitError::EmptyGallery.is_local_validation());
    assert!(SubmitError::SessionExpired.requires_reauth());
    assert!(SubmitError::NotAuthenticated.requires_reauth());

    let backend = SubmitError::Backend {
        status: 500,
        detail: "Model unavailable".to_string(),
    };
    assert!(!backend.is_local_validation());
    assert!(!backend.requires_reauth());
    assert_eq!(backend.user_message(), "Model unavailable");

    let contract = SubmitError::Contract(ContractError::InvalidContract("x".to_string()));
    assert_eq!(
        contract.user_message(),
        "The server returned an unexpected response."
    );
}
