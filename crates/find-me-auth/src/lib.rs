#![warn(missing_docs)]
//! # find-me-auth
//!
//! ## Purpose
//! Implements session storage, route gating and the login/signup flows for
//! `find-me`.
//!
//! ## Responsibilities
//! - Abstract durable token storage behind [`SessionStore`].
//! - Gate protected routes on token presence ([`SessionGate`]).
//! - Execute login and signup through an injectable [`AuthTransport`].
//! - Validate backend base URLs.
//!
//! ## Data flow
//! Login form -> [`AuthClient::login`] -> token -> [`SessionGate::login`]
//! persists it -> protected calls read it back through [`SessionGate::token`].
//! A 401 anywhere ends in [`SessionGate::expire_session`].
//!
//! ## Ownership and lifetimes
//! Tokens are owned `String` values read lazily from the store on each access;
//! no copy is cached in the gate.
//!
//! ## Error model
//! Local validation, storage and backend failures are separate
//! [`AuthError`] variants so the UI can tell "fix your input" from "try again".
//!
//! ## Security and privacy notes
//! This crate never logs credentials or token values. Logs carry
//! [`token_fingerprint`] instead.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use find_me_auth::{MemorySessionStore, SessionGate};
//!
//! let gate = SessionGate::new(Arc::new(MemorySessionStore::new()));
//! assert!(!gate.is_authenticated());
//! gate.login("token").unwrap();
//! assert!(gate.is_authenticated());
//! ```

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use find_me_contract::{
    HttpReply, LOGIN_PATH, SIGNUP_PATH, error_detail, parse_login_response, parse_signup_response,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

/// Fixed storage key holding the bearer token.
pub const SESSION_TOKEN_KEY: &str = "userToken";

/// Message shown on the login page after a 401.
pub const SESSION_EXPIRED_NOTICE: &str = "Your session has expired. Please log in again.";

const LOGIN_FALLBACK: &str = "Login failed. Please check your credentials.";
const SIGNUP_FALLBACK: &str = "Signup failed. Please try again.";
const MISSING_TOKEN: &str = "Login failed: No authentication token was received.";

/// Durable token storage.
pub trait SessionStore: Send + Sync {
    /// Reads the stored token.
    ///
    /// # Errors
    /// Returns [`AuthError::Storage`] when the backing store is unreadable.
    fn get(&self) -> Result<Option<String>, AuthError>;

    /// Stores `token`, replacing any previous one.
    ///
    /// # Errors
    /// Returns [`AuthError::Storage`] when the write fails.
    fn set(&self, token: &str) -> Result<(), AuthError>;

    /// Removes the stored token.
    ///
    /// # Errors
    /// Returns [`AuthError::Storage`] when the write fails.
    fn clear(&self) -> Result<(), AuthError>;
}

/// Process-local store, used by tests and short-lived sessions.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    token: Mutex<Option<String>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store already holding `token`.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self) -> Result<Option<String>, AuthError> {
        self.token
            .lock()
            .map(|token| token.clone())
            .map_err(|_| AuthError::Storage("session lock poisoned".to_string()))
    }

    fn set(&self, token: &str) -> Result<(), AuthError> {
        let mut slot = self
            .token
            .lock()
            .map_err(|_| AuthError::Storage("session lock poisoned".to_string()))?;
        *slot = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        let mut slot = self
            .token
            .lock()
            .map_err(|_| AuthError::Storage("session lock poisoned".to_string()))?;
        *slot = None;
        Ok(())
    }
}

/// File-backed store: a JSON object whose [`SESSION_TOKEN_KEY`] entry holds
/// the token. Other keys in the file are preserved.
///
/// A file that does not parse reads as empty and is replaced on the next
/// write.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Creates a store at `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, AuthError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(entries) => Ok(entries),
                Err(error) => {
                    // A corrupt file must not block the next login or logout.
                    warn!(path = %self.path.display(), %error, "session file is corrupt; starting empty");
                    Ok(BTreeMap::new())
                }
            },
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(error) => Err(AuthError::Storage(format!(
                "unable to read '{}': {error}",
                self.path.display()
            ))),
        }
    }

    /// Replaces the file atomically with an owner-only temp file.
    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<(), AuthError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent).map_err(|error| {
            AuthError::Storage(format!("unable to create '{}': {error}", parent.display()))
        })?;

        let raw = serde_json::to_vec_pretty(entries)
            .map_err(|error| AuthError::Storage(format!("session encode failed: {error}")))?;
        let write_error = |error: std::io::Error| {
            AuthError::Storage(format!("unable to write '{}': {error}", self.path.display()))
        };

        let mut file = NamedTempFile::new_in(parent).map_err(write_error)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o600))
                .map_err(write_error)?;
        }
        file.write_all(&raw).map_err(write_error)?;
        file.as_file().sync_all().map_err(write_error)?;
        file.persist(&self.path)
            .map_err(|error| write_error(error.error))?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self) -> Result<Option<String>, AuthError> {
        Ok(self.read_entries()?.remove(SESSION_TOKEN_KEY))
    }

    fn set(&self, token: &str) -> Result<(), AuthError> {
        let mut entries = self.read_entries()?;
        entries.insert(SESSION_TOKEN_KEY.to_string(), token.to_string());
        self.write_entries(&entries)
    }

    fn clear(&self) -> Result<(), AuthError> {
        let mut entries = self.read_entries()?;
        if entries.remove(SESSION_TOKEN_KEY).is_some() {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}

/// Outcome of a protected-route check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteAccess {
    /// A token is present; the protected content may render.
    Granted,
    /// No token; the caller must redirect to login without rendering.
    RedirectToLogin,
}

/// Holds the session store and answers authentication questions.
#[derive(Clone)]
pub struct SessionGate {
    store: Arc<dyn SessionStore>,
}

impl SessionGate {
    /// Creates a gate over `store`.
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Returns `true` when a non-blank token is stored.
    ///
    /// Expiry is not checked locally; the backend decides.
    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Returns the stored token, if any. Unreadable storage counts as absent.
    pub fn token(&self) -> Option<String> {
        match self.store.get() {
            Ok(token) => token.filter(|token| !token.trim().is_empty()),
            Err(error) => {
                warn!(%error, "session store unreadable; treating as logged out");
                None
            }
        }
    }

    /// Persists `token` as the active session.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidResponse`] for a blank token and propagates
    /// storage failures.
    pub fn login(&self, token: &str) -> Result<(), AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::InvalidResponse(MISSING_TOKEN.to_string()));
        }
        self.store.set(token)?;
        info!(session = %token_fingerprint(token), "session stored");
        Ok(())
    }

    /// Clears the active session.
    ///
    /// # Errors
    /// Propagates storage failures.
    pub fn logout(&self) -> Result<(), AuthError> {
        self.store.clear()?;
        info!("session cleared by logout");
        Ok(())
    }

    /// Clears the session after the backend rejected the token.
    ///
    /// # Errors
    /// Propagates storage failures.
    pub fn expire_session(&self) -> Result<(), AuthError> {
        self.store.clear()?;
        warn!("session expired; backend returned 401");
        Ok(())
    }

    /// Decides whether a protected route may render.
    pub fn guard(&self) -> RouteAccess {
        if self.is_authenticated() {
            RouteAccess::Granted
        } else {
            RouteAccess::RedirectToLogin
        }
    }
}

/// Login form values. `email` is sent as the OAuth2 `username` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

/// Signup form values as entered, including the confirmation field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupForm {
    /// Display username.
    pub username: String,
    /// Account email.
    pub email: String,
    /// Postal address.
    pub address: String,
    /// Chosen password.
    pub password: String,
    /// Password confirmation; never sent.
    pub confirm_password: String,
}

/// JSON body sent to the signup endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupRequest {
    /// Display username.
    pub username: String,
    /// Account email.
    pub email: String,
    /// Postal address.
    pub address: String,
    /// Chosen password.
    pub password: String,
}

/// Transport used by [`AuthClient`].
pub trait AuthTransport: Send + Sync {
    /// Posts form-encoded `fields` to `endpoint`.
    ///
    /// # Errors
    /// Returns [`AuthError::Transport`] when no HTTP reply was received.
    fn post_form(&self, endpoint: &Url, fields: &[(&str, &str)]) -> Result<HttpReply, AuthError>;

    /// Posts a JSON body to `endpoint`.
    ///
    /// # Errors
    /// Returns [`AuthError::Transport`] when no HTTP reply was received.
    fn post_json(&self, endpoint: &Url, body: &serde_json::Value) -> Result<HttpReply, AuthError>;
}

/// Executes login and signup against the backend.
#[derive(Clone)]
pub struct AuthClient {
    base_url: Url,
    transport: Arc<dyn AuthTransport>,
}

impl AuthClient {
    /// Creates a client for `base_url`.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidEndpoint`] when the URL fails
    /// [`validate_base_url`].
    pub fn new(base_url: &str, transport: Arc<dyn AuthTransport>) -> Result<Self, AuthError> {
        let base_url = validate_base_url(base_url)?;
        Ok(Self {
            base_url,
            transport,
        })
    }

    /// Logs in and returns the issued bearer token.
    ///
    /// The caller persists the token through [`SessionGate::login`].
    ///
    /// # Errors
    /// - [`AuthError::EmptyCredential`] for blank email or password.
    /// - [`AuthError::Rejected`] with the backend detail on non-2xx replies.
    /// - [`AuthError::InvalidResponse`] when no token was issued.
    pub fn login(&self, credentials: &Credentials) -> Result<String, AuthError> {
        if credentials.email.trim().is_empty() || credentials.password.is_empty() {
            return Err(AuthError::EmptyCredential);
        }

        let endpoint = join_endpoint(&self.base_url, LOGIN_PATH)?;
        let reply = self.transport.post_form(
            &endpoint,
            &[
                ("username", credentials.email.trim()),
                ("password", credentials.password.as_str()),
            ],
        )?;

        if !reply.is_success() {
            return Err(AuthError::Rejected(
                error_detail(&reply.body).unwrap_or_else(|| LOGIN_FALLBACK.to_string()),
            ));
        }

        parse_login_response(&reply.body)
            .ok()
            .and_then(|response| response.access_token)
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| AuthError::InvalidResponse(MISSING_TOKEN.to_string()))
    }

    /// Registers an account and returns the backend confirmation message.
    ///
    /// # Errors
    /// - [`AuthError::EmptyCredential`] when any field is blank.
    /// - [`AuthError::PasswordMismatch`] when confirmation differs.
    /// - [`AuthError::Rejected`] with the backend detail on non-2xx replies.
    pub fn signup(&self, form: &SignupForm) -> Result<String, AuthError> {
        if [&form.username, &form.email, &form.address]
            .iter()
            .any(|field| field.trim().is_empty())
            || form.password.is_empty()
        {
            return Err(AuthError::EmptyCredential);
        }
        if form.password != form.confirm_password {
            return Err(AuthError::PasswordMismatch);
        }

        let request = SignupRequest {
            username: form.username.trim().to_string(),
            email: form.email.trim().to_string(),
            address: form.address.trim().to_string(),
            password: form.password.clone(),
        };
        let body = serde_json::to_value(&request)
            .map_err(|error| AuthError::InvalidResponse(format!("signup encode failed: {error}")))?;

        let endpoint = join_endpoint(&self.base_url, SIGNUP_PATH)?;
        let reply = self.transport.post_json(&endpoint, &body)?;
        if !reply.is_success() {
            return Err(AuthError::Rejected(
                error_detail(&reply.body).unwrap_or_else(|| SIGNUP_FALLBACK.to_string()),
            ));
        }

        let message = parse_signup_response(&reply.body)
            .ok()
            .and_then(|response| response.message)
            .unwrap_or_else(|| "Signup successful".to_string());
        Ok(message)
    }

    /// Returns the configured backend base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

/// Validates a backend base URL.
///
/// `https` is always accepted; plain `http` only for loopback hosts.
///
/// # Errors
/// Returns [`AuthError::InvalidEndpoint`] otherwise.
pub fn validate_base_url(raw: &str) -> Result<Url, AuthError> {
    let parsed = Url::parse(raw)
        .map_err(|error| AuthError::InvalidEndpoint(format!("invalid backend url: {error}")))?;

    match parsed.scheme() {
        "https" => Ok(parsed),
        "http" if is_loopback(&parsed) => Ok(parsed),
        "http" => Err(AuthError::InvalidEndpoint(
            "plain http is only allowed for localhost".to_string(),
        )),
        other => Err(AuthError::InvalidEndpoint(format!(
            "unsupported scheme '{other}'"
        ))),
    }
}

/// Resolves an endpoint path against the base URL, keeping any base path
/// prefix.
///
/// # Errors
/// Returns [`AuthError::InvalidEndpoint`] when the join fails.
pub fn join_endpoint(base: &Url, path: &str) -> Result<Url, AuthError> {
    let mut prefix = base.path().trim_end_matches('/').to_string();
    prefix.push_str(path);
    let mut joined = base.clone();
    joined.set_path(&prefix);
    joined.set_query(None);
    if joined.cannot_be_a_base() {
        return Err(AuthError::InvalidEndpoint(format!(
            "cannot join '{path}' onto '{base}'"
        )));
    }
    Ok(joined)
}

/// Returns a short, log-safe fingerprint of a token.
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..6])
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(url::Host::Ipv4(addr)) => addr.is_loopback(),
        Some(url::Host::Ipv6(addr)) => addr.is_loopback(),
        None => false,
    }
}

/// Errors produced by session and auth logic.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Backend URL violates policy.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// A required form field is blank.
    #[error("all fields are required")]
    EmptyCredential,
    /// Password and confirmation differ.
    #[error("Passwords do not match.")]
    PasswordMismatch,
    /// Backend refused the request; carries the user-facing detail.
    #[error("{0}")]
    Rejected(String),
    /// No HTTP reply was received.
    #[error("auth transport failure: {0}")]
    Transport(String),
    /// Reply violated the auth contract.
    #[error("{0}")]
    InvalidResponse(String),
    /// Session storage failure.
    #[error("session storage failure: {0}")]
    Storage(String),
}
