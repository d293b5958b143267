#![warn(missing_docs)]
//! # find-me-ui
//!
//! ## Purpose
//! Defines the page-level state model for `find-me`: current route, notices,
//! the submit trigger and the results page projection.
//!
//! ## Responsibilities
//! - Resolve navigation against authentication (protected routes redirect to
//!   login before rendering).
//! - Track inline errors, alerts and login-page notices.
//! - Enable the submit trigger only when inputs are ready and nothing is in
//!   flight.
//! - Project a [`ReconciledView`] into titled result sections.
//!
//! ## Ownership and lifetimes
//! `UiState` owns plain strings only; it never holds files, previews or
//! tokens.
//!
//! ## Error model
//! This crate favors explicit state over recoverable errors.

use find_me_reconcile::{ReconciledView, ResolvedImage};

/// Application pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Login form.
    Login,
    /// Signup form.
    Signup,
    /// Target + gallery upload page.
    Home,
    /// Classification results.
    Results,
    /// Saved galleries of the current user.
    MyGallery,
    /// Previous classification runs.
    History,
}

impl Route {
    /// Returns `true` for routes that require a session.
    pub fn is_protected(self) -> bool {
        !matches!(self, Route::Login | Route::Signup)
    }
}

/// Submit trigger state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStatus {
    /// Nothing submitted yet or last submission settled.
    Idle,
    /// A submission is in flight; the trigger is disabled.
    InFlight,
    /// Last submission failed; the trigger is enabled for a manual retry.
    Failed,
}

/// Aggregate UI state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiState {
    /// App version string.
    pub version: String,
    /// Current page.
    pub route: Route,
    /// Submit trigger state.
    pub submit: SubmitStatus,
    /// Error shown inline on the current page.
    pub inline_error: Option<String>,
    /// Success message shown inline on the current page.
    pub inline_success: Option<String>,
    /// Modal alert (camera failures).
    pub alert: Option<String>,
    /// Message shown on the login page after a forced redirect.
    pub login_notice: Option<String>,
}

impl UiState {
    /// Creates state on the login page.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            route: Route::Login,
            submit: SubmitStatus::Idle,
            inline_error: None,
            inline_success: None,
            alert: None,
            login_notice: None,
        }
    }

    /// Moves to `requested`, redirecting protected routes to login when
    /// `authenticated` is false. Returns the route actually shown.
    pub fn navigate(&mut self, requested: Route, authenticated: bool) -> Route {
        let route = if requested.is_protected() && !authenticated {
            Route::Login
        } else {
            requested
        };
        if route != self.route {
            self.inline_error = None;
            self.inline_success = None;
        }
        if route != Route::Login {
            self.login_notice = None;
        }
        self.route = route;
        route
    }

    /// Forces the login page with an explanatory notice.
    pub fn redirect_to_login(&mut self, notice: impl Into<String>) {
        self.navigate(Route::Login, false);
        self.submit = SubmitStatus::Idle;
        self.login_notice = Some(notice.into());
    }

    /// Returns `true` when the submit trigger is enabled.
    pub fn can_submit(&self, has_target: bool, gallery_len: usize) -> bool {
        self.submit != SubmitStatus::InFlight && has_target && gallery_len > 0
    }

    /// Marks a submission as started.
    pub fn begin_submit(&mut self) {
        self.submit = SubmitStatus::InFlight;
        self.inline_error = None;
    }

    /// Marks a submission as settled successfully.
    pub fn finish_submit(&mut self) {
        self.submit = SubmitStatus::Idle;
    }

    /// Marks a submission as failed with an inline message.
    pub fn fail_submit(&mut self, message: impl Into<String>) {
        self.submit = SubmitStatus::Failed;
        self.inline_error = Some(message.into());
    }

    /// Shows a modal alert.
    pub fn show_alert(&mut self, message: impl Into<String>) {
        self.alert = Some(message.into());
    }

    /// Dismisses the modal alert.
    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }
}

/// One titled section of the results page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSection {
    /// Heading including the entry count.
    pub title: String,
    /// Entries in backend order.
    pub images: Vec<ResolvedImage>,
    /// Text shown when `images` is empty.
    pub empty_message: &'static str,
}

/// Results page content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultsPage {
    /// Reached without navigation state.
    NoResults {
        /// Heading.
        title: &'static str,
        /// Guidance text.
        message: &'static str,
    },
    /// Three sections in display order.
    Sections(Vec<ResultSection>),
}

/// Projects an optional view into results page content.
pub fn project_results(view: Option<&ReconciledView>) -> ResultsPage {
    let Some(view) = view else {
        return ResultsPage::NoResults {
            title: "No Results",
            message: "Please go back and upload images to process.",
        };
    };

    ResultsPage::Sections(vec![
        section(
            "Images Containing Target",
            &view.matched,
            "No images containing the target were found in your selection.",
        ),
        section(
            "Images With Other People",
            &view.unmatched_with_people,
            "No other people were found in your selection.",
        ),
        section(
            "Images Without People",
            &view.without_people,
            "All images contained people.",
        ),
    ])
}

fn section(label: &str, images: &[ResolvedImage], empty_message: &'static str) -> ResultSection {
    ResultSection {
        title: format!("{label} ({})", images.len()),
        images: images.to_vec(),
        empty_message,
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for navigation and submit gates.

    use super::*;

    #[test]
    fn protected_routes_redirect_without_session() {
        let mut state = UiState::new("0.1.0");
        assert_eq!(state.navigate(Route::Home, false), Route::Login);
        assert_eq!(state.navigate(Route::Signup, false), Route::Signup);
        assert_eq!(state.navigate(Route::Home, true), Route::Home);
    }

    #[test]
    fn submit_gate_requires_inputs_and_idle_trigger() {
        let mut state = UiState::new("0.1.0");
        assert!(!state.can_submit(false, 3));
        assert!(!state.can_submit(true, 0));
        assert!(state.can_submit(true, 1));

        state.begin_submit();
        assert!(!state.can_submit(true, 1));

        state.fail_submit("boom");
        assert!(state.can_submit(true, 1));
        assert_eq!(state.inline_error.as_deref(), Some("boom"));
    }

    #[test]
    fn missing_view_projects_no_results_page() {
        assert!(matches!(project_results(None), ResultsPage::NoResults { .. }));
        let ResultsPage::Sections(sections) = project_results(Some(&ReconciledView::default()))
        else {
            panic!("expected sections");
        };
        assert_eq!(sections[0].title, "Images Containing Target (0)");
        assert_eq!(sections.len(), 3);
    }
}
