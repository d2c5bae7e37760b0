//! Client for the hosted backend: table queries over REST plus session introspection
//!
//! One [`BackendClient`] is constructed at startup and shared through the router
//! state. Per-request copies created with [`BackendClient::as_user`] forward the
//! caller's access token so row-level security applies.

use std::fmt;
use std::sync::Arc;

use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::BackendConfig;
use crate::io::{HttpClient, HttpResponse};
use crate::model::{AuthTokens, Session};
use crate::NutrimaticError;

/// Sort direction for [`Query::order`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Ascending => write!(f, "asc"),
            Direction::Descending => write!(f, "desc"),
        }
    }
}

/// Table query rendered into REST query parameters
#[derive(Debug, Clone)]
pub struct Query {
    table: String,
    select: String,
    filters: Vec<(String, String)>,
    order: Vec<String>,
    range: Option<(u64, u64)>,
}

impl Query {
    pub fn table(name: &str) -> Self {
        Self {
            table: name.to_string(),
            select: "*".to_string(),
            filters: Vec::new(),
            order: Vec::new(),
            range: None,
        }
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.select = columns.to_string();
        self
    }

    pub fn eq(self, column: &str, value: impl fmt::Display) -> Self {
        self.filter(column, "eq", value)
    }

    pub fn gte(self, column: &str, value: impl fmt::Display) -> Self {
        self.filter(column, "gte", value)
    }

    pub fn lt(self, column: &str, value: impl fmt::Display) -> Self {
        self.filter(column, "lt", value)
    }

    fn filter(mut self, column: &str, op: &str, value: impl fmt::Display) -> Self {
        self.filters
            .push((column.to_string(), format!("{}.{}", op, value)));
        self
    }

    pub fn order(mut self, column: &str, direction: Direction) -> Self {
        self.order.push(format!("{}.{}", column, direction));
        self
    }

    /// Inclusive row range, zero based
    pub fn range(mut self, from: u64, to: u64) -> Self {
        self.range = Some((from, to.max(from)));
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Render the query against `base` (`{base}/rest/v1/{table}?...`)
    pub fn to_url(&self, base: &str, with_select: bool) -> crate::Result<Url> {
        let raw = format!("{}/rest/v1/{}", base.trim_end_matches('/'), self.table);
        let mut url = Url::parse(&raw)
            .map_err(|e| NutrimaticError::Config(format!("Invalid backend URL {}: {}", raw, e)))?;
        {
            let mut pairs = url.query_pairs_mut();
            if with_select {
                pairs.append_pair("select", &self.select);
            }
            for (column, condition) in &self.filters {
                pairs.append_pair(column, condition);
            }
            if !self.order.is_empty() {
                pairs.append_pair("order", &self.order.join(","));
            }
            if let Some((from, to)) = self.range {
                pairs.append_pair("offset", &from.to_string());
                pairs.append_pair("limit", &(to - from + 1).to_string());
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url)
    }
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

/// Hosted backend connection
#[derive(Clone)]
pub struct BackendClient {
    base_url: String,
    anon_key: String,
    access_token: Option<String>,
    http: Arc<dyn HttpClient>,
}

impl fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.access_token.is_some())
            .finish()
    }
}

impl BackendClient {
    pub fn new(config: &BackendConfig, http: Arc<dyn HttpClient>) -> crate::Result<Self> {
        if !config.is_configured() {
            return Err(NutrimaticError::Config(
                "backend URL and anon key must be set and must not be placeholders".to_string(),
            ));
        }
        Url::parse(&config.url).map_err(|e| {
            NutrimaticError::Config(format!("Invalid backend URL {}: {}", config.url, e))
        })?;

        tracing::debug!("Created BackendClient for {}", config.url);
        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            access_token: None,
            http,
        })
    }

    /// Copy of this client that authenticates as the session's user
    pub fn as_user(&self, session: &Session) -> Self {
        Self {
            access_token: Some(session.access_token.clone()),
            ..self.clone()
        }
    }

    fn bearer(&self) -> String {
        format!(
            "Bearer {}",
            self.access_token.as_deref().unwrap_or(&self.anon_key)
        )
    }

    fn check(&self, context: &str, response: HttpResponse) -> crate::Result<HttpResponse> {
        if response.is_success() {
            Ok(response)
        } else {
            Err(NutrimaticError::Backend(format!(
                "{}: {} {}",
                context,
                response.status,
                response.text()
            )))
        }
    }

    /// Fetch rows matching `query`
    pub async fn select<T: DeserializeOwned>(&self, query: &Query) -> crate::Result<Vec<T>> {
        let url = query.to_url(&self.base_url, true)?;
        let bearer = self.bearer();
        let headers = [
            ("apikey", self.anon_key.as_str()),
            ("Authorization", bearer.as_str()),
        ];

        let response = self.http.get(url.as_str(), &headers).await?;
        let response = self.check(query.table_name(), response)?;
        let rows: Vec<T> = serde_json::from_slice(&response.body)?;
        tracing::debug!("Selected {} row(s) from {}", rows.len(), query.table_name());
        Ok(rows)
    }

    /// Fetch the first row matching `query`, if any
    pub async fn select_one<T: DeserializeOwned>(&self, query: &Query) -> crate::Result<Option<T>> {
        let rows = self.select(&query.clone().range(0, 0)).await?;
        Ok(rows.into_iter().next())
    }

    /// Insert a row and return its stored representation
    pub async fn insert<T: Serialize>(
        &self,
        table: &str,
        row: &T,
    ) -> crate::Result<serde_json::Value> {
        let url = Query::table(table).to_url(&self.base_url, false)?;
        let bearer = self.bearer();
        let headers = [
            ("apikey", self.anon_key.as_str()),
            ("Authorization", bearer.as_str()),
            ("Prefer", "return=representation"),
        ];
        let body = serde_json::to_value(row)?;

        let response = self.http.post_json(url.as_str(), &headers, &body).await?;
        let response = self.check(table, response)?;
        let inserted: serde_json::Value = if response.body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&response.body)?
        };
        tracing::debug!("Inserted row into {}", table);
        Ok(match inserted {
            serde_json::Value::Array(mut rows) if !rows.is_empty() => rows.swap_remove(0),
            other => other,
        })
    }

    /// Patch every row matching the query's filters
    pub async fn update(&self, query: &Query, patch: &serde_json::Value) -> crate::Result<()> {
        self.patch(query, patch, "return=minimal").await?;
        tracing::debug!("Updated {}", query.table_name());
        Ok(())
    }

    /// Patch matching rows and return them as stored.
    ///
    /// An empty result means no row matched the filters, which lets callers
    /// use an `eq` filter on the old value as a compare-and-set.
    pub async fn update_returning(
        &self,
        query: &Query,
        patch: &serde_json::Value,
    ) -> crate::Result<Vec<serde_json::Value>> {
        let response = self.patch(query, patch, "return=representation").await?;
        let rows: Vec<serde_json::Value> = if response.body.is_empty() {
            Vec::new()
        } else {
            serde_json::from_slice(&response.body)?
        };
        tracing::debug!("Updated {} row(s) in {}", rows.len(), query.table_name());
        Ok(rows)
    }

    async fn patch(
        &self,
        query: &Query,
        patch: &serde_json::Value,
        prefer: &str,
    ) -> crate::Result<HttpResponse> {
        let url = query.to_url(&self.base_url, false)?;
        let bearer = self.bearer();
        let headers = [
            ("apikey", self.anon_key.as_str()),
            ("Authorization", bearer.as_str()),
            ("Prefer", prefer),
        ];

        let response = self.http.patch_json(url.as_str(), &headers, patch).await?;
        self.check(query.table_name(), response)
    }

    /// Resolve an access token to a session; rejected tokens yield `None`
    pub async fn get_session(&self, access_token: &str) -> crate::Result<Option<Session>> {
        let url = format!("{}/auth/v1/user", self.base_url);
        let bearer = format!("Bearer {}", access_token);
        let headers = [
            ("apikey", self.anon_key.as_str()),
            ("Authorization", bearer.as_str()),
        ];

        let response = self.http.get(&url, &headers).await?;
        if response.status == 401 || response.status == 403 {
            tracing::debug!("Access token rejected ({})", response.status);
            return Ok(None);
        }
        let response = self.check("auth", response)?;
        let user: AuthUser = serde_json::from_slice(&response.body)?;

        Ok(Some(Session {
            user_id: user.id,
            email: user.email,
            access_token: access_token.to_string(),
        }))
    }

    /// Exchange email and password for tokens
    pub async fn sign_in(&self, email: &str, password: &str) -> crate::Result<AuthTokens> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.base_url);
        let bearer = format!("Bearer {}", self.anon_key);
        let headers = [
            ("apikey", self.anon_key.as_str()),
            ("Authorization", bearer.as_str()),
        ];
        let body = serde_json::to_value(PasswordGrant { email, password })?;

        let response = self.http.post_json(&url, &headers, &body).await?;
        if response.status == 400 || response.status == 401 {
            return Err(NutrimaticError::Auth("invalid email or password".to_string()));
        }
        let response = self.check("auth", response)?;
        Ok(serde_json::from_slice(&response.body)?)
    }
}
