//! HTTP routes: public pages, gated dashboard pages, JSON API and the file proxy

use axum::extract::{Form, Path, Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::backend::BackendClient;
use crate::gate::{Viewer, SESSION_COOKIE};
use crate::hooks::{
    CalendarDeps, CalendarFetcher, ClientSource, ClientsFetcher, DataHook, PrescriptionsFetcher,
    YearMonth,
};
use crate::model::{PrescriptionStatus, Session};
use crate::state::AppState;
use crate::{pages, prescriptions, proxy, NutrimaticError};

/// Session cookie lifetime when the backend does not report one
const DEFAULT_SESSION_SECONDS: u64 = 3600;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home_handler))
        .route("/pricing", get(pricing_handler))
        .route("/blog", get(blog_index_handler))
        .route("/blog/{slug}", get(blog_post_handler))
        .route("/login", get(login_page_handler).post(login_handler))
        .route("/logout", post(logout_handler))
        .route("/setup", get(setup_page_handler).post(setup_handler))
        .route("/dashboard", get(dashboard_handler))
        .route("/dashboard/calendar", get(calendar_page_handler))
        .route("/dashboard/clients", get(clients_page_handler))
        .route("/api/calendar", get(calendar_api_handler))
        .route("/api/clients", get(clients_api_handler))
        .route(
            "/api/prescriptions",
            get(prescriptions_api_handler).post(create_prescription_handler),
        )
        .route("/api/prescriptions/{id}/approve", post(approve_handler))
        .route("/api/prescriptions/{id}/redo", post(redo_handler))
        .route("/api/webhooks/deliveries", get(deliveries_handler))
        .route(
            "/api/proxy",
            get(proxy::proxy_handler).options(proxy::preflight_handler),
        )
        .route("/health", get(health_handler))
        .fallback(not_found_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn home_handler() -> impl IntoResponse {
    Html(pages::home())
}

async fn pricing_handler() -> impl IntoResponse {
    Html(pages::pricing())
}

async fn blog_index_handler() -> impl IntoResponse {
    Html(pages::blog_index())
}

async fn blog_post_handler(Path(slug): Path<String>) -> Response {
    match pages::find_post(&slug) {
        Some(post) => Html(pages::blog_post(post)).into_response(),
        None => not_found_handler().await.into_response(),
    }
}

async fn not_found_handler() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Html(pages::not_found()))
}

async fn health_handler() -> impl IntoResponse {
    "OK"
}

async fn login_page_handler() -> impl IntoResponse {
    Html(pages::login(None))
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    email: String,
    password: String,
}

async fn login_handler(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, NutrimaticError> {
    let backend = state.backend()?;
    match backend.sign_in(form.email.trim(), &form.password).await {
        Ok(tokens) => {
            let max_age = tokens.expires_in.unwrap_or(DEFAULT_SESSION_SECONDS);
            let cookie = session_cookie(&tokens.access_token, max_age, state.secure_cookies);
            tracing::info!("Signed in {}", form.email.trim());
            Ok(([(SET_COOKIE, cookie)], Redirect::to("/dashboard")).into_response())
        }
        Err(NutrimaticError::Auth(message)) => Ok((
            StatusCode::UNAUTHORIZED,
            Html(pages::login(Some(message.as_str()))),
        )
            .into_response()),
        Err(e) => Err(e),
    }
}

async fn logout_handler(State(state): State<AppState>) -> impl IntoResponse {
    let cookie = session_cookie("", 0, state.secure_cookies);
    ([(SET_COOKIE, cookie)], Redirect::to("/login"))
}

/// `Set-Cookie` value for the session token
fn session_cookie(token: &str, max_age: u64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Signed-in caller with a backend client carrying their token
struct Caller {
    backend: BackendClient,
    viewer: Viewer,
    session: Session,
}

impl Caller {
    fn new(backend: &BackendClient, viewer: Viewer) -> crate::Result<Self> {
        let session = viewer
            .session
            .clone()
            .ok_or_else(|| NutrimaticError::Auth("sign in first".to_string()))?;
        Ok(Self {
            backend: backend.as_user(&session),
            viewer,
            session,
        })
    }
}

/// Resolve the caller and apply the gate; `Err` carries the redirect to send
async fn gated(
    state: &AppState,
    headers: &HeaderMap,
    require_active: bool,
) -> crate::Result<std::result::Result<Caller, Response>> {
    let backend = state.backend()?;
    let viewer = Viewer::resolve(backend, headers).await;
    if let Some(redirect) = viewer.decide(require_active).redirect() {
        return Ok(Err(redirect));
    }
    Caller::new(backend, viewer).map(Ok)
}

/// Session-only check for JSON endpoints: 401 instead of redirects
async fn authenticated(state: &AppState, headers: &HeaderMap) -> crate::Result<Caller> {
    let backend = state.backend()?;
    let viewer = Viewer::resolve(backend, headers).await;
    Caller::new(backend, viewer)
}

fn client_source(state: &AppState, backend: BackendClient) -> ClientSource {
    if state.client_fixtures {
        ClientSource::Fixtures
    } else {
        ClientSource::Backend(backend)
    }
}

#[derive(Debug, Deserialize)]
struct MonthParams {
    month: Option<String>,
}

impl MonthParams {
    fn month(&self) -> crate::Result<YearMonth> {
        match self.month.as_deref() {
            Some(raw) if !raw.trim().is_empty() => raw.parse(),
            _ => Ok(YearMonth::current()),
        }
    }
}

async fn setup_page_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, NutrimaticError> {
    let caller = match gated(&state, &headers, false).await? {
        Ok(caller) => caller,
        Err(redirect) => return Ok(redirect),
    };
    Ok(Html(pages::setup(caller.viewer.profile.as_ref())).into_response())
}

#[derive(Debug, Deserialize)]
struct SetupForm {
    #[serde(default)]
    name: String,
}

async fn setup_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<SetupForm>,
) -> Result<Response, NutrimaticError> {
    let caller = match gated(&state, &headers, false).await? {
        Ok(caller) => caller,
        Err(redirect) => return Ok(redirect),
    };
    prescriptions::activate_profile(&caller.backend, &caller.session, &form.name).await?;
    Ok(Redirect::to("/dashboard").into_response())
}

async fn dashboard_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, NutrimaticError> {
    let caller = match gated(&state, &headers, true).await? {
        Ok(caller) => caller,
        Err(redirect) => return Ok(redirect),
    };
    let owner = caller.session.user_id;
    let hook = DataHook::mount(
        PrescriptionsFetcher {
            backend: caller.backend,
        },
        owner,
    )
    .await;
    let prescriptions = hook.snapshot().await;
    let html = pages::dashboard(caller.viewer.profile.as_ref(), &prescriptions);
    Ok(Html(html).into_response())
}

async fn calendar_page_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<MonthParams>,
) -> Result<Response, NutrimaticError> {
    let caller = match gated(&state, &headers, true).await? {
        Ok(caller) => caller,
        Err(redirect) => return Ok(redirect),
    };
    let month = params.month()?;
    let hook = DataHook::mount(
        CalendarFetcher {
            backend: caller.backend,
        },
        CalendarDeps {
            owner: caller.session.user_id,
            month,
        },
    )
    .await;
    let events = hook.snapshot().await;
    Ok(Html(pages::calendar(month, &events)).into_response())
}

async fn clients_page_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, NutrimaticError> {
    let caller = match gated(&state, &headers, true).await? {
        Ok(caller) => caller,
        Err(redirect) => return Ok(redirect),
    };
    let fetcher = ClientsFetcher {
        source: client_source(&state, caller.backend),
    };
    let hook = DataHook::mount(fetcher, caller.session.user_id).await;
    let clients = hook.snapshot().await;
    Ok(Html(pages::clients(&clients)).into_response())
}

async fn calendar_api_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<MonthParams>,
) -> Result<Response, NutrimaticError> {
    let caller = authenticated(&state, &headers).await?;
    let month = params.month()?;
    let hook = DataHook::mount(
        CalendarFetcher {
            backend: caller.backend,
        },
        CalendarDeps {
            owner: caller.session.user_id,
            month,
        },
    )
    .await;
    Ok(Json(hook.snapshot().await).into_response())
}

async fn clients_api_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, NutrimaticError> {
    let caller = authenticated(&state, &headers).await?;
    let fetcher = ClientsFetcher {
        source: client_source(&state, caller.backend),
    };
    let hook = DataHook::mount(fetcher, caller.session.user_id).await;
    Ok(Json(hook.snapshot().await).into_response())
}

async fn prescriptions_api_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, NutrimaticError> {
    let caller = authenticated(&state, &headers).await?;
    let fetcher = PrescriptionsFetcher {
        backend: caller.backend,
    };
    let hook = DataHook::mount(fetcher, caller.session.user_id).await;
    Ok(Json(hook.snapshot().await).into_response())
}

#[derive(Debug, Deserialize)]
struct NewPrescriptionRequest {
    client_name: String,
    #[serde(default)]
    payload: serde_json::Value,
}

async fn create_prescription_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<NewPrescriptionRequest>,
) -> Result<Response, NutrimaticError> {
    let caller = authenticated(&state, &headers).await?;
    let profile = caller
        .viewer
        .profile
        .ok_or_else(|| NutrimaticError::Validation("profile is not set up".to_string()))?;
    let created = prescriptions::create_prescription(
        &caller.backend,
        &profile,
        &request.client_name,
        request.payload,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

async fn approve_handler(
    state: State<AppState>,
    headers: HeaderMap,
    id: Path<Uuid>,
) -> Result<Response, NutrimaticError> {
    review(state, headers, id, PrescriptionStatus::Approved).await
}

async fn redo_handler(
    state: State<AppState>,
    headers: HeaderMap,
    id: Path<Uuid>,
) -> Result<Response, NutrimaticError> {
    review(state, headers, id, PrescriptionStatus::Redo).await
}

async fn review(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    status: PrescriptionStatus,
) -> Result<Response, NutrimaticError> {
    let caller = authenticated(&state, &headers).await?;
    let updated = prescriptions::change_status(
        &caller.backend,
        &state.webhooks,
        caller.session.user_id,
        id,
        status,
    )
    .await?;
    Ok(Json(updated).into_response())
}

async fn deliveries_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, NutrimaticError> {
    authenticated(&state, &headers).await?;
    let log = state.deliveries.read().await;
    let records: Vec<_> = log.records.iter().cloned().collect();
    Ok(Json(records).into_response())
}
