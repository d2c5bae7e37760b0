//! HTTP client abstraction for testability

use std::fmt;

use async_trait::async_trait;
use axum::body::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};

use crate::NutrimaticError;

/// HTTP response from a request
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Build a response with a JSON body and no headers
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.to_string().into_bytes(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, lossy
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// First header value matching `name`, case-insensitive
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// Response body delivered chunk by chunk
pub type ByteStream = BoxStream<'static, crate::Result<Bytes>>;

/// HTTP response whose body has not been read yet
pub struct HttpStream {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: ByteStream,
}

impl HttpStream {
    /// Stream an already buffered response as a single chunk
    pub fn buffered(response: HttpResponse) -> Self {
        let chunk = Bytes::from(response.body);
        Self {
            status: response.status,
            headers: response.headers,
            body: futures::stream::iter([Ok(chunk)]).boxed(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

impl fmt::Debug for HttpStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpStream")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Abstraction over HTTP client for dependency injection
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait HttpClient: Send + Sync {
    /// Send a GET request to the given URL
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> crate::Result<HttpResponse>;

    /// Send a GET request and hand back the body unread
    async fn get_stream(&self, url: &str, headers: &[(&str, &str)]) -> crate::Result<HttpStream>;

    /// Send a POST request with a JSON body
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> crate::Result<HttpResponse>;

    /// Send a PATCH request with a JSON body
    async fn patch_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> crate::Result<HttpResponse>;
}

/// Production HTTP client using reqwest
#[derive(Default)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    async fn execute(
        &self,
        method: &str,
        url: &str,
        request: reqwest::RequestBuilder,
    ) -> crate::Result<HttpResponse> {
        let response = send(method, url, request).await?;

        let status = response.status().as_u16();
        let headers = header_pairs(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|e| NutrimaticError::Http(format!("Reading response body: {}", e)))?
            .to_vec();

        tracing::debug!("{} {} -> {} ({} bytes)", method, url, status, body.len());
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

async fn send(
    method: &str,
    url: &str,
    request: reqwest::RequestBuilder,
) -> crate::Result<reqwest::Response> {
    request
        .send()
        .await
        .map_err(|e| NutrimaticError::Http(format!("{} {} failed: {}", method, url, e)))
}

fn header_pairs(headers: &reqwest::header::HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(k, v)| {
            v.to_str()
                .ok()
                .map(|v| (k.as_str().to_string(), v.to_string()))
        })
        .collect()
}

fn with_headers(
    mut request: reqwest::RequestBuilder,
    headers: &[(&str, &str)],
) -> reqwest::RequestBuilder {
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    request
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> crate::Result<HttpResponse> {
        tracing::debug!("GET {}", url);
        let request = with_headers(self.client.get(url), headers);
        self.execute("GET", url, request).await
    }

    async fn get_stream(&self, url: &str, headers: &[(&str, &str)]) -> crate::Result<HttpStream> {
        tracing::debug!("GET {} (streamed)", url);
        let request = with_headers(self.client.get(url), headers);
        let response = send("GET", url, request).await?;

        let status = response.status().as_u16();
        let headers = header_pairs(response.headers());
        tracing::debug!(
            "GET {} -> {} (streaming, {:?} bytes announced)",
            url,
            status,
            response.content_length()
        );

        let source = url.to_string();
        let body = response
            .bytes_stream()
            .map_err(move |e| NutrimaticError::Http(format!("Reading {} failed: {}", source, e)))
            .boxed();
        Ok(HttpStream {
            status,
            headers,
            body,
        })
    }

    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> crate::Result<HttpResponse> {
        tracing::debug!("POST {}", url);
        let request = with_headers(self.client.post(url), headers).json(body);
        self.execute("POST", url, request).await
    }

    async fn patch_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> crate::Result<HttpResponse> {
        tracing::debug!("PATCH {}", url);
        let request = with_headers(self.client.patch(url), headers).json(body);
        self.execute("PATCH", url, request).await
    }
}
