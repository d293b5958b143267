#![warn(missing_docs)]
//! # find-me-app
//!
//! ## Purpose
//! Orchestrates session, preview, capture, submission and results state for
//! the `find-me` client.
//!
//! ## Responsibilities
//! - Gate protected pages on the stored session.
//! - Own the home page [`PreviewStore`] and tear it down on navigation.
//! - Route camera captures to the target slot or the gallery.
//! - Submit, map failures to UI state, and build the results view.
//!
//! ## Data flow
//! User action -> [`App`] method -> subsystem crate -> [`UiState`] update.
//! A successful submission carries a [`NavigationState`] to the results page,
//! where [`reconcile`] resolves it into a [`ReconciledView`].
//!
//! ## Ownership and lifetimes
//! Page-scoped resources (home previews, results previews, camera stream) are
//! owned by the app and dropped when their page is left.
//!
//! ## Error model
//! Subsystem failures are wrapped in [`AppError`]; every failure leaves the
//! app interactive and nothing is retried automatically.
//!
//! ## Security and privacy notes
//! - Tokens never reach `UiState` or logs.
//! - [`redact_sensitive`] strips secret markers from free-form log text.

pub mod config;
pub mod http;

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

use find_me_auth::{
    AuthClient, AuthError, AuthTransport, Credentials, FileSessionStore, RouteAccess,
    SESSION_EXPIRED_NOTICE, SessionGate, SessionStore, SignupForm,
};
use find_me_capture::{
    CameraDevice, CaptureBridge, CaptureError, CaptureMode, CapturedPhoto, StillFrame,
    UnavailableCamera,
};
use find_me_client::{ApiClient, ApiTransport, SubmitError, SubmitTrigger};
use find_me_contract::{ClassificationResult, ResultRecord, UserProfile};
use find_me_core::{CoreError, ImageFile, PreviewRegistry, PreviewStore};
use find_me_reconcile::{ReconciledView, reconcile};
use find_me_ui::{ResultsPage, Route, UiState, project_results};
use thiserror::Error;
use tracing::{info, warn};

pub use config::AppConfig;
pub use http::ReqwestTransport;

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("FIND_ME_VERSION");

/// Login notice when a protected action finds no session.
pub const LOGIN_REQUIRED_NOTICE: &str = "Please log in to continue.";

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// State carried from a successful submission to the results page.
///
/// Lives only in memory; it is never persisted.
#[derive(Debug, Clone)]
pub struct NavigationState {
    /// Backend classification.
    pub api_response: ClassificationResult,
    /// Gallery files in submission order.
    pub original_images: Vec<ImageFile>,
}

struct ResultsPageState {
    navigation: NavigationState,
    view: ReconciledView,
}

/// External collaborators injected into [`App`].
#[derive(Clone)]
pub struct AppDeps {
    /// Durable token storage.
    pub session_store: Arc<dyn SessionStore>,
    /// Login/signup transport.
    pub auth_transport: Arc<dyn AuthTransport>,
    /// Authenticated API transport.
    pub api_transport: Arc<dyn ApiTransport>,
    /// Camera provider.
    pub camera: Arc<dyn CameraDevice>,
}

impl AppDeps {
    /// Production wiring: file session store, reqwest transport, no camera.
    ///
    /// # Errors
    /// Returns [`AppError::Transport`] when the HTTP client cannot be built.
    pub fn production(config: &AppConfig) -> Result<Self, AppError> {
        let transport = Arc::new(ReqwestTransport::new()?);
        Ok(Self {
            session_store: Arc::new(FileSessionStore::new(&config.session_file)),
            auth_transport: transport.clone(),
            api_transport: transport,
            camera: Arc::new(UnavailableCamera),
        })
    }
}

/// Application controller.
pub struct App {
    ui: UiState,
    gate: SessionGate,
    auth: AuthClient,
    api: ApiClient,
    registry: PreviewRegistry,
    home: PreviewStore,
    results: Option<ResultsPageState>,
    camera: CaptureBridge,
    camera_enabled: bool,
    captures_tx: Sender<CapturedPhoto>,
    captures_rx: Receiver<CapturedPhoto>,
    profile: Option<UserProfile>,
    history: Vec<ResultRecord>,
}

impl App {
    /// Builds the app and lands on Home or Login depending on the session.
    ///
    /// # Errors
    /// Returns [`AppError::Auth`] / [`AppError::Submit`] when the backend URL is
    /// rejected.
    pub fn new(config: &AppConfig, deps: AppDeps) -> Result<Self, AppError> {
        let gate = SessionGate::new(deps.session_store);
        let auth = AuthClient::new(&config.api_url, deps.auth_transport)?;
        let api = ApiClient::new(&config.api_url, gate.clone(), deps.api_transport)?;
        let registry = PreviewRegistry::new();
        let (captures_tx, captures_rx) = mpsc::channel();

        let mut app = Self {
            ui: UiState::new(APP_VERSION),
            gate,
            auth,
            api,
            home: PreviewStore::new(registry.clone()),
            registry,
            results: None,
            camera: CaptureBridge::new(deps.camera),
            camera_enabled: config.camera_enabled,
            captures_tx,
            captures_rx,
            profile: None,
            history: Vec::new(),
        };
        app.navigate(Route::Home);
        info!(version = APP_VERSION, route = ?app.ui.route, "app started");
        Ok(app)
    }

    /// Current UI state.
    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    /// Current page.
    pub fn route(&self) -> Route {
        self.ui.route
    }

    /// Session gate.
    pub fn gate(&self) -> &SessionGate {
        &self.gate
    }

    /// Preview registry shared by home and results pages.
    pub fn registry(&self) -> &PreviewRegistry {
        &self.registry
    }

    /// Home page selections.
    pub fn home(&self) -> &PreviewStore {
        &self.home
    }

    /// Results view, when the results page holds navigation state.
    pub fn results_view(&self) -> Option<&ReconciledView> {
        self.results.as_ref().map(|results| &results.view)
    }

    /// Navigation state backing the results page.
    pub fn navigation_state(&self) -> Option<&NavigationState> {
        self.results.as_ref().map(|results| &results.navigation)
    }

    /// Results page projection.
    pub fn results_page(&self) -> ResultsPage {
        project_results(self.results_view())
    }

    /// Last loaded profile.
    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    /// Last loaded history.
    pub fn history(&self) -> &[ResultRecord] {
        &self.history
    }

    /// Returns `true` when the submit trigger is enabled.
    pub fn can_submit(&self) -> bool {
        !self.api.is_submitting()
            && self.ui.can_submit(self.home.target().is_some(), self.home.gallery().len())
    }

    /// Handle a renderer can poll to disable the trigger during a submission.
    pub fn submit_trigger(&self) -> SubmitTrigger {
        self.api.trigger()
    }

    /// Navigates to `requested`, applying the session guard.
    ///
    /// Page-scoped resources of the page being left are released.
    pub fn navigate(&mut self, requested: Route) -> Route {
        let access = if requested.is_protected() {
            self.gate.guard()
        } else {
            RouteAccess::Granted
        };
        let target = match access {
            RouteAccess::Granted => requested,
            RouteAccess::RedirectToLogin => Route::Login,
        };
        self.leave_page(target);
        self.ui.navigate(target, access == RouteAccess::Granted)
    }

    /// Logs in and moves to Home.
    ///
    /// # Errors
    /// Returns [`AppError::Auth`]; the message is also shown inline.
    pub fn login(&mut self, credentials: &Credentials) -> Result<(), AppError> {
        self.ui.inline_error = None;
        let result = self
            .auth
            .login(credentials)
            .and_then(|token| self.gate.login(&token));
        match result {
            Ok(()) => {
                info!("login succeeded");
                self.navigate(Route::Home);
                Ok(())
            }
            Err(error) => {
                warn!(%error, "login failed");
                self.ui.inline_error = Some(error.to_string());
                Err(error.into())
            }
        }
    }

    /// Registers an account; on success moves to Login with the message.
    ///
    /// # Errors
    /// Returns [`AppError::Auth`]; the message is also shown inline.
    pub fn signup(&mut self, form: &SignupForm) -> Result<String, AppError> {
        self.ui.inline_error = None;
        self.ui.inline_success = None;
        match self.auth.signup(form) {
            Ok(message) => {
                info!("signup succeeded");
                self.navigate(Route::Login);
                self.ui.inline_success = Some(format!("{message}. Please log in."));
                Ok(message)
            }
            Err(error) => {
                warn!(%error, "signup failed");
                self.ui.inline_error = Some(error.to_string());
                Err(error.into())
            }
        }
    }

    /// Clears the session and returns to Login.
    ///
    /// # Errors
    /// Propagates session storage failures.
    pub fn logout(&mut self) -> Result<(), AppError> {
        self.gate.logout()?;
        self.profile = None;
        self.history.clear();
        self.navigate(Route::Login);
        Ok(())
    }

    /// Sets the target image. Returns `false` for non-image files.
    pub fn select_target(&mut self, file: ImageFile) -> bool {
        self.home.set_target(file)
    }

    /// Removes the target image.
    pub fn remove_target(&mut self) -> Option<ImageFile> {
        self.home.remove_target()
    }

    /// Appends gallery files. Returns the accepted count.
    pub fn add_gallery_files(&mut self, files: Vec<ImageFile>) -> usize {
        self.home.add_gallery_files(files)
    }

    /// Removes the gallery file at `index`.
    ///
    /// # Errors
    /// Returns [`AppError::Core`] for an out-of-range index.
    pub fn remove_gallery_file(&mut self, index: usize) -> Result<ImageFile, AppError> {
        Ok(self.home.remove_gallery_file(index)?)
    }

    /// Opens the camera modal feeding `mode`.
    ///
    /// # Errors
    /// Returns [`AppError::CameraDisabled`] or [`AppError::Capture`]; an alert
    /// is shown and the modal stays closed.
    pub fn open_camera(&mut self, mode: CaptureMode) -> Result<(), AppError> {
        if !self.camera_enabled {
            let error = AppError::CameraDisabled;
            self.ui.show_alert(error.to_string());
            return Err(error);
        }

        let sender = self.captures_tx.clone();
        self.camera
            .open(mode, move |photo| {
                if sender.send(photo).is_err() {
                    warn!("capture receiver dropped");
                }
            })
            .map_err(|error| {
                self.ui.show_alert(error.user_notice());
                AppError::Capture(error)
            })
    }

    /// Returns `true` while the camera modal is open.
    pub fn camera_open(&self) -> bool {
        self.camera.is_open()
    }

    /// Reads the live camera frame.
    ///
    /// # Errors
    /// Returns [`AppError::Capture`] when the camera is closed or failed.
    pub fn camera_frame(&mut self) -> Result<StillFrame, AppError> {
        Ok(self.camera.live_frame()?)
    }

    /// Takes a photo and routes it to the slot the camera was opened for.
    ///
    /// # Errors
    /// Returns [`AppError::Capture`]; the camera is closed either way.
    pub fn capture_photo(&mut self) -> Result<(), AppError> {
        let captured = self.camera.capture();
        self.drain_captures();
        captured.map_err(|error| {
            self.ui.show_alert(error.user_notice());
            AppError::Capture(error)
        })
    }

    /// Cancels the camera modal.
    pub fn close_camera(&mut self) {
        self.camera.close();
    }

    /// Submits the home selections for classification.
    ///
    /// # Returns
    /// The route shown afterwards.
    ///
    /// # Errors
    /// - Local validation failures return without a banner or network call.
    /// - Missing or expired sessions redirect to Login with a notice.
    /// - Other failures show an inline message and re-enable the trigger.
    pub fn submit(&mut self) -> Result<Route, AppError> {
        let target = self.home.target().map(|selected| selected.file.clone());
        let gallery = self.home.gallery_files();
        if target.is_none() {
            return Err(SubmitError::MissingTarget.into());
        }
        if gallery.is_empty() {
            return Err(SubmitError::EmptyGallery.into());
        }

        self.ui.begin_submit();
        match self.api.submit(target.as_ref(), &gallery) {
            Ok(api_response) => {
                self.ui.finish_submit();
                self.show_results(NavigationState {
                    api_response,
                    original_images: gallery,
                });
                Ok(self.ui.route)
            }
            Err(error) => Err(self.handle_api_error(error)),
        }
    }

    /// Opens the results page with `navigation`.
    pub fn show_results(&mut self, navigation: NavigationState) {
        self.navigate(Route::Results);
        if self.ui.route != Route::Results {
            return;
        }
        let view = reconcile(
            &navigation.api_response,
            &navigation.original_images,
            &self.registry,
        );
        info!(
            resolved = view.total(),
            returned = navigation.api_response.total(),
            "results reconciled"
        );
        self.results = Some(ResultsPageState { navigation, view });
    }

    /// Leaves the results page for a fresh Home page.
    pub fn start_over(&mut self) -> Route {
        self.navigate(Route::Home)
    }

    /// Loads the current user's profile for the My Gallery page.
    ///
    /// # Errors
    /// Returns [`AppError::Submit`]; 401 clears the session and redirects to
    /// Login, other failures show inline and keep the session.
    pub fn load_profile(&mut self) -> Result<&UserProfile, AppError> {
        if self.navigate(Route::MyGallery) != Route::MyGallery {
            return Err(SubmitError::NotAuthenticated.into());
        }
        match self.api.fetch_profile() {
            Ok(profile) => Ok(self.profile.insert(profile)),
            Err(error) => {
                warn!(%error, "profile load failed");
                Err(self.handle_api_error(error))
            }
        }
    }

    /// Loads previous classification runs for the History page.
    ///
    /// # Errors
    /// Returns [`AppError::Submit`]; 401 redirects to Login, other failures
    /// show inline.
    pub fn load_history(&mut self) -> Result<&[ResultRecord], AppError> {
        if self.navigate(Route::History) != Route::History {
            return Err(SubmitError::NotAuthenticated.into());
        }
        match self.api.fetch_history() {
            Ok(history) => {
                self.history = history;
                Ok(&self.history)
            }
            Err(error) => Err(self.handle_api_error(error)),
        }
    }

    fn handle_api_error(&mut self, error: SubmitError) -> AppError {
        if error.requires_reauth() {
            let notice = match error {
                SubmitError::SessionExpired => SESSION_EXPIRED_NOTICE,
                _ => LOGIN_REQUIRED_NOTICE,
            };
            self.leave_page(Route::Login);
            self.ui.redirect_to_login(notice);
        } else if error.is_local_validation() {
            self.ui.finish_submit();
        } else {
            warn!(%error, "request failed");
            self.ui.fail_submit(error.user_message());
        }
        error.into()
    }

    fn drain_captures(&mut self) {
        while let Ok(photo) = self.captures_rx.try_recv() {
            match photo.mode {
                CaptureMode::Target => {
                    self.home.set_target(photo.file);
                }
                CaptureMode::Gallery => {
                    self.home.add_gallery_files([photo.file]);
                }
            }
        }
    }

    fn leave_page(&mut self, next: Route) {
        let current = self.ui.route;
        if current == next {
            return;
        }
        match current {
            Route::Home => {
                self.camera.close();
                self.home.clear();
            }
            Route::Results => {
                self.results = None;
            }
            _ => {}
        }
    }
}

/// Redacts common secret markers in log-safe output.
///
/// Everything after the first marker is replaced.
pub fn redact_sensitive(input: &str) -> String {
    let lower = input.to_ascii_lowercase();
    let first = ["password", "token", "authorization", "bearer"]
        .iter()
        .filter_map(|key| lower.find(key).map(|position| (position, *key)))
        .min_by_key(|(position, _)| *position);

    match first {
        Some((position, key)) => format!("{}{key}=<redacted>", &input[..position]),
        None => input.to_string(),
    }
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Session or login/signup failure.
    #[error("{0}")]
    Auth(#[from] AuthError),
    /// Submission or authenticated call failure.
    #[error("{0}")]
    Submit(#[from] SubmitError),
    /// Camera failure.
    #[error("{0}")]
    Capture(#[from] CaptureError),
    /// Local file handling failure.
    #[error("{0}")]
    Core(#[from] CoreError),
    /// Camera turned off by configuration.
    #[error("camera is disabled by configuration")]
    CameraDisabled,
    /// HTTP client construction failure.
    #[error("transport setup failed: {0}")]
    Transport(String),
    /// Interactive input could not be read.
    #[error("unable to read {0}")]
    Input(String),
}

impl AppError {
    /// Returns `true` when the failure was caught before any network call.
    pub fn is_local_validation(&self) -> bool {
        matches!(self, AppError::Submit(error) if error.is_local_validation())
    }
}
