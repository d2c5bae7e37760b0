//! BDD test world for nutrimatic

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Request};
use cucumber::World;
use tower::ServiceExt;

use nutrimatic::config::{BackendConfig, Config, WebhookConfig};
use nutrimatic::io::{HttpClient, HttpResponse, HttpStream};
use nutrimatic::model::CalendarEvent;
use nutrimatic::server::build_router;
use nutrimatic::state::DeliveryLogHandle;
use nutrimatic::NutrimaticError;

pub const USER_ID: &str = "00000000-0000-0000-0000-0000000000aa";
pub const PRESCRIPTION_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Canned upstream answer, chosen by URL substring
#[derive(Debug, Clone)]
pub struct FakeRoute {
    pub fragment: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// One outbound request seen by [`FakeHttp`]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: &'static str,
    pub url: String,
    pub body: Option<serde_json::Value>,
}

/// Scripted HTTP client shared by the backend, webhooks and proxy.
///
/// Unmatched URLs answer 200 with an empty JSON array.
#[derive(Debug, Default)]
pub struct FakeHttp {
    routes: Mutex<Vec<FakeRoute>>,
    unreachable: Mutex<Vec<String>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeHttp {
    pub fn route(&self, fragment: &str, status: u16, body: &str) {
        self.route_with_headers(fragment, status, Vec::new(), body);
    }

    pub fn route_with_headers(
        &self,
        fragment: &str,
        status: u16,
        headers: Vec<(String, String)>,
        body: &str,
    ) {
        self.routes.lock().unwrap().push(FakeRoute {
            fragment: fragment.to_string(),
            status,
            headers,
            body: body.to_string(),
        });
    }

    pub fn make_unreachable(&self, fragment: &str) {
        self.unreachable.lock().unwrap().push(fragment.to_string());
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn respond(
        &self,
        method: &'static str,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> nutrimatic::Result<HttpResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            url: url.to_string(),
            body: body.cloned(),
        });

        if self
            .unreachable
            .lock()
            .unwrap()
            .iter()
            .any(|f| url.contains(f.as_str()))
        {
            return Err(NutrimaticError::Http(format!(
                "{} {} failed: connection refused",
                method, url
            )));
        }

        let routes = self.routes.lock().unwrap();
        Ok(match routes.iter().find(|r| url.contains(r.fragment.as_str())) {
            Some(route) => HttpResponse {
                status: route.status,
                headers: route.headers.clone(),
                body: route.body.clone().into_bytes(),
            },
            None => HttpResponse {
                status: 200,
                headers: Vec::new(),
                body: b"[]".to_vec(),
            },
        })
    }
}

#[async_trait]
impl HttpClient for FakeHttp {
    async fn get(&self, url: &str, _headers: &[(&str, &str)]) -> nutrimatic::Result<HttpResponse> {
        self.respond("GET", url, None)
    }

    async fn get_stream(
        &self,
        url: &str,
        _headers: &[(&str, &str)],
    ) -> nutrimatic::Result<HttpStream> {
        self.respond("GET", url, None).map(HttpStream::buffered)
    }

    async fn post_json(
        &self,
        url: &str,
        _headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> nutrimatic::Result<HttpResponse> {
        self.respond("POST", url, Some(body))
    }

    async fn patch_json(
        &self,
        url: &str,
        _headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> nutrimatic::Result<HttpResponse> {
        self.respond("PATCH", url, Some(body))
    }
}

#[derive(Debug, Default, World)]
pub struct NutrimaticWorld {
    pub http: Arc<FakeHttp>,
    pub backend_configured: bool,
    pub webhook_urls: Vec<String>,
    pub access_token: Option<String>,

    // Last HTTP exchange
    pub response_status: Option<u16>,
    pub response_headers: Option<HeaderMap>,
    pub response_body: Option<String>,
    pub deliveries: Option<DeliveryLogHandle>,

    // Configuration loading
    pub config_file: Option<tempfile::NamedTempFile>,
    pub env: HashMap<String, String>,
    pub config: Option<Config>,

    // Calendar mapping
    pub calendar_event: Option<CalendarEvent>,
}

impl NutrimaticWorld {
    pub fn app_config(&self) -> Config {
        let backend = if self.backend_configured {
            BackendConfig {
                url: "https://proj.backend.example".to_string(),
                anon_key: "anon".to_string(),
            }
        } else {
            BackendConfig::default()
        };
        Config {
            backend,
            webhooks: WebhookConfig {
                urls: self.webhook_urls.clone(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Send one request through a freshly built router
    pub async fn send(&mut self, method: &str, uri: &str, body: Option<&str>) {
        let http: Arc<dyn HttpClient> = self.http.clone();
        let state = nutrimatic::build_state(&self.app_config(), http).unwrap();
        self.deliveries = Some(Arc::clone(&state.deliveries));

        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = &self.access_token {
            request = request.header(
                "cookie",
                format!("{}={}", nutrimatic::gate::SESSION_COOKIE, token),
            );
        }
        let request = match body {
            Some(json) => request
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = build_router(state).oneshot(request).await.unwrap();
        self.response_status = Some(response.status().as_u16());
        self.response_headers = Some(response.headers().clone());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        self.response_body = Some(String::from_utf8_lossy(&bytes).into_owned());
    }
}
