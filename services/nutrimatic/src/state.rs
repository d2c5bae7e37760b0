//! Shared state for the HTTP handlers and the webhook delivery history

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::backend::BackendClient;
use crate::config::{BACKEND_ANON_KEY_ENV, BACKEND_URL_ENV};
use crate::io::HttpClient;
use crate::webhook::{DeliveryRecord, WebhookDispatcher};
use crate::NutrimaticError;

/// Bounded history of webhook deliveries, oldest first
#[derive(Debug)]
pub struct DeliveryLog {
    pub records: VecDeque<DeliveryRecord>,
    pub max_size: usize,
}

impl DeliveryLog {
    pub fn new(max_size: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    /// Append a record, evicting the oldest once full
    pub fn add(&mut self, record: DeliveryRecord) {
        if self.max_size == 0 {
            return;
        }
        if self.records.len() >= self.max_size {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }
}

/// Thread-safe delivery log handle
pub type DeliveryLogHandle = Arc<RwLock<DeliveryLog>>;

pub fn new_delivery_log(max_size: usize) -> DeliveryLogHandle {
    Arc::new(RwLock::new(DeliveryLog::new(max_size)))
}

/// Router state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    /// `None` when the backend credentials are missing or placeholders
    pub backend: Option<BackendClient>,
    pub webhooks: Arc<WebhookDispatcher>,
    pub deliveries: DeliveryLogHandle,
    pub http: Arc<dyn HttpClient>,
    pub client_fixtures: bool,
    pub secure_cookies: bool,
}

impl AppState {
    pub fn backend(&self) -> crate::Result<&BackendClient> {
        self.backend.as_ref().ok_or_else(|| {
            NutrimaticError::Config(format!(
                "backend is not configured; set {} and {}",
                BACKEND_URL_ENV, BACKEND_ANON_KEY_ENV
            ))
        })
    }
}
