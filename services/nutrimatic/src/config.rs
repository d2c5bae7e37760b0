//! Configuration types for the nutrimatic service

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable carrying the backend project URL
pub const BACKEND_URL_ENV: &str = "NUTRIMATIC_BACKEND_URL";
/// Environment variable carrying the backend anonymous key
pub const BACKEND_ANON_KEY_ENV: &str = "NUTRIMATIC_BACKEND_ANON_KEY";
/// Environment variable carrying comma-separated webhook destinations
pub const WEBHOOK_URLS_ENV: &str = "NUTRIMATIC_WEBHOOK_URLS";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub webhooks: WebhookConfig,
    #[serde(default)]
    pub clients: ClientsConfig,
}

impl Config {
    /// Overlay credentials and webhook destinations from the process environment
    pub fn resolve_env(&mut self) {
        self.apply_env(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary lookup; environment values win over the file
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(BACKEND_URL_ENV) {
            tracing::debug!("Backend URL taken from {}", BACKEND_URL_ENV);
            self.backend.url = url;
        }
        if let Some(key) = lookup(BACKEND_ANON_KEY_ENV) {
            tracing::debug!("Backend anon key taken from {}", BACKEND_ANON_KEY_ENV);
            self.backend.anon_key = key;
        }
        if let Some(urls) = lookup(WEBHOOK_URLS_ENV) {
            self.webhooks.urls = urls
                .split(',')
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string)
                .collect();
            tracing::debug!(
                "{} webhook destination(s) taken from {}",
                self.webhooks.urls.len(),
                WEBHOOK_URLS_ENV
            );
        }
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Mark the session cookie `Secure`; turn off only when served over plain HTTP
    #[serde(default = "default_true")]
    pub secure_cookies: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            secure_cookies: default_true(),
        }
    }
}

/// Hosted backend credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub anon_key: String,
}

impl BackendConfig {
    /// True only when both credentials are present and neither is a placeholder
    pub fn is_configured(&self) -> bool {
        is_real_value(&self.url) && is_real_value(&self.anon_key)
    }
}

fn is_real_value(value: &str) -> bool {
    !value.trim().is_empty() && !value.to_ascii_lowercase().contains("placeholder")
}

/// Outbound webhook configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default = "default_webhook_urls")]
    pub urls: Vec<String>,
    #[serde(default = "default_delivery_history_size")]
    pub delivery_history_size: usize,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            urls: default_webhook_urls(),
            delivery_history_size: default_delivery_history_size(),
        }
    }
}

/// Client list source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientsConfig {
    #[serde(default = "default_true")]
    pub fixtures: bool,
}

impl Default for ClientsConfig {
    fn default() -> Self {
        Self {
            fixtures: default_true(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    11120
}

fn default_webhook_urls() -> Vec<String> {
    vec![
        "https://automacao.nutrimatic.app/webhook-test/prescricao-status".to_string(),
        "https://automacao.nutrimatic.app/webhook/prescricao-status".to_string(),
    ]
}

fn default_delivery_history_size() -> usize {
    100
}

fn default_true() -> bool {
    true
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::NutrimaticError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}
