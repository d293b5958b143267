#![warn(missing_docs)]
//! # find-me-contract
//!
//! ## Purpose
//! Defines the backend HTTP contract: endpoint paths, response schemas, and
//! parsing helpers shared by the auth and client crates.
//!
//! ## Responsibilities
//! - Parse classification responses (schema v2) and reject legacy payloads.
//! - Parse login, signup, profile and history responses.
//! - Extract user-facing messages from backend `detail` error bodies.
//!
//! ## Data flow
//! Transport returns an [`HttpReply`] -> status decides success or failure ->
//! success bodies go through the `parse_*` helpers, failures through
//! [`error_detail`].
//!
//! ## Ownership and lifetimes
//! Parsed values are owned so they can outlive the transient response buffer
//! and travel with navigation state.
//!
//! ## Error model
//! Invalid JSON, missing mandatory fields and legacy schemas return
//! [`ContractError`]. Individual malformed identifiers are dropped instead.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Classification schema version the client speaks.
pub const CLASSIFY_SCHEMA_VERSION: u32 = 2;

/// Classification endpoint path (schema v2).
pub const CLASSIFY_PATH: &str = "/classify-and-match/";
/// Form-encoded login endpoint path.
pub const LOGIN_PATH: &str = "/login";
/// JSON signup endpoint path.
pub const SIGNUP_PATH: &str = "/signup";
/// Current-user profile endpoint path.
pub const PROFILE_PATH: &str = "/users/me";
/// Saved results history endpoint path.
pub const HISTORY_PATH: &str = "/results";

/// Multipart field carrying the target image.
pub const TARGET_FIELD: &str = "target_image";
/// Repeated multipart field carrying gallery images.
pub const GALLERY_FIELD: &str = "gallery_images";

const V2_KEYS: [&str; 3] = [
    "matched_images",
    "unmatched_images_with_people",
    "images_without_people",
];
const LEGACY_KEYS: [&str; 2] = ["with_people", "without_people"];

/// Raw HTTP reply handed back by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

impl HttpReply {
    /// Creates a reply.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns `true` for 401 Unauthorized.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

/// Classification of gallery images returned by the backend.
///
/// Each entry is a gallery filename or an absolute image URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Images in which the target person was found.
    #[serde(default, deserialize_with = "lenient_identifiers")]
    pub matched_images: Vec<String>,
    /// Images containing people, none of whom is the target.
    #[serde(default, deserialize_with = "lenient_identifiers")]
    pub unmatched_images_with_people: Vec<String>,
    /// Images with no people at all.
    #[serde(default, deserialize_with = "lenient_identifiers")]
    pub images_without_people: Vec<String>,
}

impl ClassificationResult {
    /// Total identifiers across all three lists.
    pub fn total(&self) -> usize {
        self.matched_images.len()
            + self.unmatched_images_with_people.len()
            + self.images_without_people.len()
    }
}

/// Login success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Bearer token; absent when the backend did not issue one.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Token type, normally `bearer`.
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Signup success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupResponse {
    /// Human-readable confirmation.
    #[serde(default)]
    pub message: Option<String>,
}

/// Current-user profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Account username.
    pub username: String,
    /// URLs of galleries saved by previous runs.
    #[serde(default, deserialize_with = "lenient_identifiers")]
    pub saved_galleries: Vec<String>,
}

/// One saved classification run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Server-side identifier.
    pub id: Value,
    /// Creation timestamp as sent by the backend.
    pub created_at: String,
    /// URL of the stored target image.
    pub target_image_url: String,
    /// URLs of the matched gallery images.
    #[serde(default, deserialize_with = "lenient_identifiers")]
    pub matched_images: Vec<String>,
}

/// Parses a classification response body.
///
/// # Errors
/// Returns [`ContractError::Decode`] for invalid JSON,
/// [`ContractError::InvalidContract`] when the body is not an object or
/// carries none of the v2 keys, and [`ContractError::UnsupportedSchema`] for a
/// legacy `with_people`/`without_people` payload.
pub fn parse_classification_response(raw: &str) -> Result<ClassificationResult, ContractError> {
    let value: Value = serde_json::from_str(raw)?;
    let object = value.as_object().ok_or_else(|| {
        ContractError::InvalidContract("classification body is not an object".to_string())
    })?;

    let has_v2 = V2_KEYS.iter().any(|key| object.contains_key(*key));
    if !has_v2 {
        if LEGACY_KEYS.iter().any(|key| object.contains_key(*key)) {
            return Err(ContractError::UnsupportedSchema(format!(
                "legacy with_people/without_people payload; client speaks v{CLASSIFY_SCHEMA_VERSION}"
            )));
        }
        return Err(ContractError::InvalidContract(
            "classification body has no result lists".to_string(),
        ));
    }

    Ok(serde_json::from_value(value)?)
}

/// Parses a login success body.
///
/// # Errors
/// Returns [`ContractError::Decode`] for invalid JSON.
pub fn parse_login_response(raw: &str) -> Result<LoginResponse, ContractError> {
    Ok(serde_json::from_str(raw)?)
}

/// Parses a signup success body.
///
/// # Errors
/// Returns [`ContractError::Decode`] for invalid JSON.
pub fn parse_signup_response(raw: &str) -> Result<SignupResponse, ContractError> {
    Ok(serde_json::from_str(raw)?)
}

/// Parses a profile body.
///
/// # Errors
/// Returns [`ContractError::Decode`] for invalid JSON or a missing username.
pub fn parse_profile(raw: &str) -> Result<UserProfile, ContractError> {
    Ok(serde_json::from_str(raw)?)
}

/// Parses the results history. A `null` body is an empty history.
///
/// # Errors
/// Returns [`ContractError::Decode`] for invalid JSON or malformed records.
pub fn parse_history(raw: &str) -> Result<Vec<ResultRecord>, ContractError> {
    let records: Option<Vec<ResultRecord>> = serde_json::from_str(raw)?;
    Ok(records.unwrap_or_default())
}

/// Extracts a message from a backend error body.
///
/// `detail` may be a string or a list of validation objects with `msg`
/// fields; list messages are joined with `; `.
pub fn error_detail(raw: &str) -> Option<String> {
    let value: Value = serde_json::from_str(raw).ok()?;
    match value.get("detail")? {
        Value::String(detail) if !detail.trim().is_empty() => Some(detail.clone()),
        Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    }
}

fn lenient_identifiers<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|value| match value {
            Value::String(id) => Some(id),
            _ => None,
        })
        .collect())
}

/// Contract parsing errors.
#[derive(Debug, Error)]
pub enum ContractError {
    /// JSON decode failure.
    #[error("response decode failure: {0}")]
    Decode(#[from] serde_json::Error),
    /// Parsed payload violates contract invariants.
    #[error("response contract violation: {0}")]
    InvalidContract(String),
    /// Payload uses a schema version the client does not speak.
    #[error("unsupported response schema: {0}")]
    UnsupportedSchema(String),
}

#[cfg(test)]
mod tests {
    //! Unit tests for response parsing.

    use super::*;

    #[test]
    fn drops_non_string_identifiers() {
        let parsed = parse_classification_response(
            r#"{"matched_images":["a.jpg",3,null],"unmatched_images_with_people":null,"images_without_people":["c.jpg"]}"#,
        )
        .expect("payload should parse");

        assert_eq!(parsed.matched_images, vec!["a.jpg"]);
        assert!(parsed.unmatched_images_with_people.is_empty());
        assert_eq!(parsed.images_without_people, vec!["c.jpg"]);
    }

    #[test]
    fn rejects_legacy_schema() {
        let error = parse_classification_response(r#"{"with_people":["a.jpg"],"without_people":[]}"#)
            .expect_err("legacy payload must not parse");
        assert!(matches!(error, ContractError::UnsupportedSchema(_)));
    }

    #[test]
    fn error_detail_handles_string_and_list() {
        assert_eq!(
            error_detail(r#"{"detail":"Incorrect email or password"}"#).as_deref(),
            Some("Incorrect email or password")
        );
        assert_eq!(
            error_detail(r#"{"detail":[{"msg":"field required"},{"msg":"bad email"}]}"#).as_deref(),
            Some("field required; bad email")
        );
        assert_eq!(error_detail("Internal Server Error"), None);
    }

    #[test]
    fn null_history_is_empty() {
        assert!(parse_history("null").expect("null should parse").is_empty());
    }
}
