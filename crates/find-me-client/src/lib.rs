#![warn(missing_docs)]
//! # find-me-client
//!
//! ## Purpose
//! Sends authenticated requests to the matching backend: the classification
//! submission plus profile and history reads.
//!
//! ## Responsibilities
//! - Validate submission preconditions before any network call.
//! - Assemble the multipart body in gallery order.
//! - Attach the bearer token and map 401 to session expiry.
//! - Allow one classification in flight per client.
//!
//! ## Data flow
//! Target + gallery files -> [`build_classify_request`] -> [`ApiTransport`]
//! -> [`HttpReply`] -> [`parse_classification_response`].
//!
//! ## Ownership and lifetimes
//! Requests share file bytes with the caller (`Arc<[u8]>`), so the gallery
//! stays usable for result reconciliation after the call.
//!
//! ## Error model
//! [`SubmitError`] separates local validation, re-authentication, backend
//! rejection and contract failures. Nothing is retried automatically.
//!
//! ## Security and privacy notes
//! Tokens are only logged as fingerprints.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use find_me_auth::{AuthError, SessionGate, join_endpoint, token_fingerprint, validate_base_url};
use find_me_contract::{
    CLASSIFY_PATH, ClassificationResult, ContractError, GALLERY_FIELD, HISTORY_PATH, HttpReply,
    PROFILE_PATH, ResultRecord, TARGET_FIELD, UserProfile, error_detail,
    parse_classification_response, parse_history, parse_profile,
};
use find_me_core::ImageFile;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

const HISTORY_FALLBACK: &str = "Failed to load results";
const PROFILE_FALLBACK: &str = "Failed to load your gallery. Please try logging in again.";
const CLASSIFY_FALLBACK: &str = "Classification failed. Please try again.";

/// One file part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPart {
    /// Multipart field name.
    pub field: &'static str,
    /// File carried by the part.
    pub file: ImageFile,
}

/// Multipart classification request, parts in send order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifyRequest {
    parts: Vec<FormPart>,
}

impl ClassifyRequest {
    /// Returns parts in send order: target first, then gallery in order.
    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    /// Returns gallery file names in send order.
    pub fn gallery_names(&self) -> Vec<&str> {
        self.parts
            .iter()
            .filter(|part| part.field == GALLERY_FIELD)
            .map(|part| part.file.name.as_str())
            .collect()
    }
}

/// Builds the multipart request.
///
/// # Errors
/// Returns [`SubmitError::MissingTarget`] or [`SubmitError::EmptyGallery`].
pub fn build_classify_request(
    target: Option<&ImageFile>,
    gallery: &[ImageFile],
) -> Result<ClassifyRequest, SubmitError> {
    let target = target.ok_or(SubmitError::MissingTarget)?;
    if gallery.is_empty() {
        return Err(SubmitError::EmptyGallery);
    }

    let mut parts = Vec::with_capacity(gallery.len() + 1);
    parts.push(FormPart {
        field: TARGET_FIELD,
        file: target.clone(),
    });
    parts.extend(gallery.iter().map(|file| FormPart {
        field: GALLERY_FIELD,
        file: file.clone(),
    }));
    Ok(ClassifyRequest { parts })
}

/// HTTP transport for authenticated backend calls.
pub trait ApiTransport: Send + Sync {
    /// Posts a multipart body with a bearer token.
    ///
    /// # Errors
    /// Returns [`SubmitError::Transport`] when no HTTP reply was received.
    fn post_multipart(
        &self,
        endpoint: &Url,
        token: &str,
        request: &ClassifyRequest,
    ) -> Result<HttpReply, SubmitError>;

    /// Issues a GET with a bearer token.
    ///
    /// # Errors
    /// Returns [`SubmitError::Transport`] when no HTTP reply was received.
    fn get(&self, endpoint: &Url, token: &str) -> Result<HttpReply, SubmitError>;
}

struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Read-only view of the submit trigger, shareable with a renderer while a
/// submission blocks the controller.
#[derive(Debug, Clone)]
pub struct SubmitTrigger(Arc<AtomicBool>);

impl SubmitTrigger {
    /// Returns `true` while a classification is in flight.
    pub fn is_in_flight(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Returns `true` when a new submission may start.
    pub fn is_enabled(&self) -> bool {
        !self.is_in_flight()
    }
}

/// Authenticated backend client.
pub struct ApiClient {
    base_url: Url,
    gate: SessionGate,
    transport: Arc<dyn ApiTransport>,
    in_flight: Arc<AtomicBool>,
}

impl ApiClient {
    /// Creates a client for `base_url`.
    ///
    /// # Errors
    /// Returns [`SubmitError::Auth`] when the URL fails validation.
    pub fn new(
        base_url: &str,
        gate: SessionGate,
        transport: Arc<dyn ApiTransport>,
    ) -> Result<Self, SubmitError> {
        Ok(Self {
            base_url: validate_base_url(base_url)?,
            gate,
            transport,
            in_flight: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Submits target and gallery for classification.
    ///
    /// # Errors
    /// - [`SubmitError::MissingTarget`] / [`SubmitError::EmptyGallery`] before
    ///   any network call.
    /// - [`SubmitError::AlreadyInFlight`] while another submission runs.
    /// - [`SubmitError::NotAuthenticated`] when no token is stored.
    /// - [`SubmitError::SessionExpired`] on 401; the token has been cleared.
    /// - [`SubmitError::Backend`] for other non-2xx replies.
    /// - [`SubmitError::Contract`] when the body does not parse.
    pub fn submit(
        &self,
        target: Option<&ImageFile>,
        gallery: &[ImageFile],
    ) -> Result<ClassificationResult, SubmitError> {
        let request = build_classify_request(target, gallery)?;
        let _guard = InFlight::acquire(&self.in_flight).ok_or(SubmitError::AlreadyInFlight)?;
        let token = self.gate.token().ok_or(SubmitError::NotAuthenticated)?;
        let endpoint = join_endpoint(&self.base_url, CLASSIFY_PATH)?;

        info!(
            session = %token_fingerprint(&token),
            gallery = gallery.len(),
            "classification submitted"
        );
        let reply = self.transport.post_multipart(&endpoint, &token, &request)?;
        let body = self.check_reply(reply, CLASSIFY_FALLBACK)?;
        let result = parse_classification_response(&body)?;
        info!(
            matched = result.matched_images.len(),
            unmatched = result.unmatched_images_with_people.len(),
            without_people = result.images_without_people.len(),
            "classification received"
        );
        Ok(result)
    }

    /// Returns `true` while a submission is running.
    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Returns a handle observing this client's in-flight flag.
    pub fn trigger(&self) -> SubmitTrigger {
        SubmitTrigger(Arc::clone(&self.in_flight))
    }

    /// Fetches the current user's profile.
    ///
    /// # Errors
    /// Same authorization mapping as [`ApiClient::submit`].
    pub fn fetch_profile(&self) -> Result<UserProfile, SubmitError> {
        let body = self.authorized_get(PROFILE_PATH, PROFILE_FALLBACK)?;
        Ok(parse_profile(&body)?)
    }

    /// Fetches saved results, newest order as sent by the backend.
    ///
    /// # Errors
    /// Same authorization mapping as [`ApiClient::submit`].
    pub fn fetch_history(&self) -> Result<Vec<ResultRecord>, SubmitError> {
        let body = self.authorized_get(HISTORY_PATH, HISTORY_FALLBACK)?;
        Ok(parse_history(&body)?)
    }

    /// Returns the session gate this client reads tokens from.
    pub fn gate(&self) -> &SessionGate {
        &self.gate
    }

    fn authorized_get(&self, path: &str, fallback: &str) -> Result<String, SubmitError> {
        let token = self.gate.token().ok_or(SubmitError::NotAuthenticated)?;
        let endpoint = join_endpoint(&self.base_url, path)?;
        let reply = self.transport.get(&endpoint, &token)?;
        self.check_reply(reply, fallback)
    }

    fn check_reply(&self, reply: HttpReply, fallback: &str) -> Result<String, SubmitError> {
        if reply.is_unauthorized() {
            if let Err(error) = self.gate.expire_session() {
                warn!(%error, "failed to clear expired session");
            }
            return Err(SubmitError::SessionExpired);
        }
        if !reply.is_success() {
            let detail = error_detail(&reply.body).unwrap_or_else(|| fallback.to_string());
            warn!(status = reply.status, %detail, "backend rejected request");
            return Err(SubmitError::Backend {
                status: reply.status,
                detail,
            });
        }
        Ok(reply.body)
    }
}

/// Submission and authenticated-call errors.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// No target image selected.
    #[error("a target image is required")]
    MissingTarget,
    /// Gallery is empty.
    #[error("at least one gallery image is required")]
    EmptyGallery,
    /// A submission is already running.
    #[error("a submission is already in progress")]
    AlreadyInFlight,
    /// No token stored; log in before retrying.
    #[error("not logged in")]
    NotAuthenticated,
    /// Backend returned 401; the token was cleared.
    #[error("session expired")]
    SessionExpired,
    /// Backend returned another non-2xx status.
    #[error("backend error ({status}): {detail}")]
    Backend {
        /// HTTP status.
        status: u16,
        /// User-facing detail.
        detail: String,
    },
    /// No HTTP reply was received.
    #[error("transport failure: {0}")]
    Transport(String),
    /// Reply body violated the contract.
    #[error("contract error: {0}")]
    Contract(#[from] ContractError),
    /// Endpoint configuration error.
    #[error("endpoint error: {0}")]
    Auth(#[from] AuthError),
}

impl SubmitError {
    /// Returns `true` for failures caught before any network call.
    pub fn is_local_validation(&self) -> bool {
        matches!(
            self,
            SubmitError::MissingTarget | SubmitError::EmptyGallery | SubmitError::AlreadyInFlight
        )
    }

    /// Returns `true` when the user must log in again.
    pub fn requires_reauth(&self) -> bool {
        matches!(
            self,
            SubmitError::NotAuthenticated | SubmitError::SessionExpired
        )
    }

    /// Inline banner text.
    pub fn user_message(&self) -> String {
        match self {
            SubmitError::Backend { detail, .. } => detail.clone(),
            SubmitError::Transport(_) => {
                "Could not reach the server. Please try again.".to_string()
            }
            SubmitError::Contract(_) => {
                "The server returned an unexpected response.".to_string()
            }
            other => other.to_string(),
        }
    }
}
