//! Server-side fetch of remote files for in-browser rendering
//!
//! The upstream body is streamed through untouched, chunk by chunk. Framing
//! restrictions are removed and permissive CORS headers added so a page on any
//! origin can embed the result.

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::state::AppState;

/// Upstream headers never forwarded to the caller
const STRIPPED_HEADERS: &[&str] = &[
    "x-frame-options",
    "content-security-policy",
    "content-security-policy-report-only",
    "connection",
    "keep-alive",
    "transfer-encoding",
    "content-length",
    "access-control-allow-origin",
    "access-control-allow-methods",
    "access-control-allow-headers",
    "access-control-allow-credentials",
];

#[derive(Debug, Deserialize)]
pub struct ProxyParams {
    pub url: Option<String>,
}

fn error_response(status: StatusCode, message: String) -> Response {
    let mut response =
        (status, axum::Json(serde_json::json!({ "error": message }))).into_response();
    add_cors_headers(&mut response);
    response
}

fn add_cors_headers(response: &mut Response) {
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, OPTIONS"),
    );
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
}

/// Validate the target: absolute http(s) URL only
pub fn parse_target(raw: Option<&str>) -> Result<reqwest::Url, String> {
    let raw = raw
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| "missing 'url' query parameter".to_string())?;
    let url = reqwest::Url::parse(raw).map_err(|e| format!("invalid url '{}': {}", raw, e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported scheme '{}'", other)),
    }
}

pub async fn proxy_handler(
    State(state): State<AppState>,
    Query(params): Query<ProxyParams>,
) -> Response {
    let target = match parse_target(params.url.as_deref()) {
        Ok(url) => url,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message),
    };

    let upstream = match state.http.get_stream(target.as_str(), &[]).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Proxy fetch of {} failed: {}", target, e);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to fetch {}: {}", target, e),
            );
        }
    };

    let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
    tracing::debug!(
        "Proxying {} -> {} ({})",
        target,
        status,
        upstream.header("content-type").unwrap_or("no content type")
    );

    let mut response = Response::new(Body::from_stream(upstream.body));
    *response.status_mut() = status;
    {
        let headers = response.headers_mut();
        for (name, value) in &upstream.headers {
            let lower = name.to_ascii_lowercase();
            if STRIPPED_HEADERS.contains(&lower.as_str()) {
                continue;
            }
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(lower.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.append(name, value);
            }
        }
    }
    add_cors_headers(&mut response);
    response
}

pub async fn preflight_handler() -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    add_cors_headers(&mut response);
    response
}
