//! Routes, user-facing notices and the navigation sink.

use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Application screens the session layer knows about.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    ForgotPassword,
    ResetPassword,
    /// Default authenticated screen.
    Dashboard,
    /// Any other authenticated screen, by path.
    Page(String),
}

impl Route {
    pub fn path(&self) -> &str {
        match self {
            Route::Login => "/login",
            Route::ForgotPassword => "/forgot-password",
            Route::ResetPassword => "/reset-password",
            Route::Dashboard => "/dashboard",
            Route::Page(path) => path,
        }
    }

    /// Parses a route from a path or bare name (`login`, `/dashboard`, ...).
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim().trim_matches('/');
        match trimmed {
            "login" => Route::Login,
            "forgot-password" => Route::ForgotPassword,
            "reset-password" => Route::ResetPassword,
            "" | "dashboard" => Route::Dashboard,
            other => Route::Page(format!("/{other}")),
        }
    }

    /// Routes only reachable without a session.
    pub fn is_guest_only(&self) -> bool {
        matches!(
            self,
            Route::Login | Route::ForgotPassword | Route::ResetPassword
        )
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Message shown to the user when the session ends without their asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// The token expired and could not be refreshed.
    SessionExpired,
    /// The server reported the token as invalid or revoked.
    SessionInvalid,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::SessionExpired => f.write_str("Your session has expired. Please log in again."),
            Notice::SessionInvalid => {
                f.write_str("Your session is no longer valid. Please log in again.")
            }
        }
    }
}

/// Sink for navigation and notices, implemented by the host application.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &Route);
    fn notify(&self, notice: Notice);
}

/// Navigator that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNavigator;

impl Navigator for NullNavigator {
    fn navigate(&self, _route: &Route) {}
    fn notify(&self, _notice: Notice) {}
}

/// Navigator that keeps a history, for headless hosts and tests.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn routes(&self) -> Vec<Route> {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of times `route` was navigated to.
    pub fn count(&self, route: &Route) -> usize {
        self.routes().iter().filter(|r| *r == route).count()
    }

    pub fn last(&self) -> Option<Route> {
        self.routes().last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &Route) {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(route.clone());
    }

    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }
}
