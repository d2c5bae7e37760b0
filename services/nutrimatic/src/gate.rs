//! Authentication gate for dashboard pages
//!
//! [`decide`] is a pure function of the session, the profile and whether the
//! page needs an active profile. [`Viewer::resolve`] gathers those inputs from a
//! request and is re-run on every request, so the decision always reflects the
//! current backend state.

use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};

use crate::backend::{BackendClient, Query};
use crate::model::{Profile, Session, PROFILES_TABLE};

/// Cookie carrying the backend access token
pub const SESSION_COOKIE: &str = "nutrimatic-access-token";

/// Pages the gate can redirect to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Setup,
    Dashboard,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Setup => "/setup",
            Route::Dashboard => "/dashboard",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Render,
    Redirect(Route),
}

impl GateDecision {
    /// Redirect response with an empty body, or `None` when the page may render
    pub fn redirect(&self) -> Option<Response> {
        match self {
            GateDecision::Redirect(route) => Some(Redirect::to(route.path()).into_response()),
            GateDecision::Render => None,
        }
    }
}

/// Decide whether a gated page renders or redirects
pub fn decide(
    session: Option<&Session>,
    profile: Option<&Profile>,
    require_active: bool,
) -> GateDecision {
    let Some(_session) = session else {
        return GateDecision::Redirect(Route::Login);
    };
    // A missing profile row is not fatal; the page renders and offers setup.
    let Some(profile) = profile else {
        return GateDecision::Render;
    };

    match (require_active, profile.active) {
        (true, false) => GateDecision::Redirect(Route::Setup),
        (false, true) => GateDecision::Redirect(Route::Dashboard),
        _ => GateDecision::Render,
    }
}

/// Access token from the session cookie, falling back to a bearer header
pub fn access_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty());

    from_cookie.or_else(|| {
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    })
}

/// Session and profile of the caller, as far as the backend knows them
#[derive(Debug, Clone, Default)]
pub struct Viewer {
    pub session: Option<Session>,
    pub profile: Option<Profile>,
}

impl Viewer {
    pub async fn resolve(backend: &BackendClient, headers: &HeaderMap) -> Self {
        let Some(token) = access_token(headers) else {
            return Self::default();
        };

        let session = match backend.get_session(&token).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("Session lookup failed: {}", e);
                None
            }
        };
        let Some(session) = session else {
            return Self::default();
        };

        let query = Query::table(PROFILES_TABLE).eq("id", session.user_id);
        let as_user = backend.as_user(&session);
        let profile = match as_user.select_one::<Profile>(&query).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!("Profile lookup for {} failed: {}", session.user_id, e);
                None
            }
        };

        tracing::debug!(
            "Resolved viewer {} (profile: {})",
            session.user_id,
            profile.is_some()
        );
        Self {
            session: Some(session),
            profile,
        }
    }

    pub fn decide(&self, require_active: bool) -> GateDecision {
        decide(self.session.as_ref(), self.profile.as_ref(), require_active)
    }
}
