//! Best-effort webhook notifications to the external workflow service
//!
//! Every dispatch spawns one detached task per destination. The caller never
//! waits on delivery; outcomes only reach the log and the delivery history.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::io::HttpClient;
use crate::model::{Prescription, PrescriptionStatus};
use crate::state::DeliveryLogHandle;
use crate::NutrimaticError;

/// Outcome of one POST to one destination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub url: String,
    pub success: bool,
    pub status: Option<u16>,
    pub error: Option<String>,
    pub timestamp_epoch_ms: u64,
}

/// Body posted when a prescription changes status
#[derive(Debug, Clone, Serialize)]
pub struct PrescriptionEvent {
    pub event: &'static str,
    pub prescription_id: Uuid,
    pub nutritionist_id: Uuid,
    pub client_name: String,
    pub status: PrescriptionStatus,
    pub previous_status: PrescriptionStatus,
    pub file_url: Option<String>,
    pub changed_at: DateTime<Utc>,
}

impl PrescriptionEvent {
    pub fn status_changed(prescription: &Prescription, previous: PrescriptionStatus) -> Self {
        Self {
            event: "prescription.status_changed",
            prescription_id: prescription.id,
            nutritionist_id: prescription.nutritionist_id,
            client_name: prescription.client_name.clone(),
            status: prescription.status,
            previous_status: previous,
            file_url: prescription.file_url.clone(),
            changed_at: Utc::now(),
        }
    }
}

pub struct WebhookDispatcher {
    urls: Vec<String>,
    http: Arc<dyn HttpClient>,
    log: DeliveryLogHandle,
}

impl std::fmt::Debug for WebhookDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookDispatcher")
            .field("urls", &self.urls)
            .finish()
    }
}

impl WebhookDispatcher {
    pub fn new(urls: Vec<String>, http: Arc<dyn HttpClient>, log: DeliveryLogHandle) -> Self {
        tracing::debug!(
            "Created WebhookDispatcher with {} destination(s)",
            urls.len()
        );
        Self { urls, http, log }
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// Post `payload` once to every destination without waiting for the results.
    ///
    /// The returned handles may be dropped; the tasks keep running and still
    /// record their outcome.
    pub fn dispatch(&self, payload: serde_json::Value) -> Vec<JoinHandle<DeliveryRecord>> {
        let payload = Arc::new(payload);
        self.urls
            .iter()
            .map(|url| {
                let http = Arc::clone(&self.http);
                let log = Arc::clone(&self.log);
                let payload = Arc::clone(&payload);
                let url = url.clone();
                tokio::spawn(async move { deliver(http, url, payload, log).await })
            })
            .collect()
    }

    /// Serialize `event` and dispatch it; serialization failures are logged and dropped
    pub fn dispatch_event<T: Serialize>(&self, event: &T) -> Vec<JoinHandle<DeliveryRecord>> {
        match serde_json::to_value(event) {
            Ok(payload) => self.dispatch(payload),
            Err(e) => {
                tracing::warn!("Webhook payload could not be serialized: {}", e);
                Vec::new()
            }
        }
    }
}

async fn deliver(
    http: Arc<dyn HttpClient>,
    url: String,
    payload: Arc<serde_json::Value>,
    log: DeliveryLogHandle,
) -> DeliveryRecord {
    let result = http.post_json(&url, &[], &payload).await;

    let record = match result {
        Ok(response) if response.is_success() => {
            tracing::info!("Webhook {} delivered ({})", url, response.status);
            DeliveryRecord {
                url,
                success: true,
                status: Some(response.status),
                error: None,
                timestamp_epoch_ms: current_epoch_ms(),
            }
        }
        Ok(response) => {
            tracing::warn!(
                "Webhook {} rejected with status {}: {}",
                url,
                response.status,
                response.text()
            );
            let error =
                NutrimaticError::Webhook(format!("{} answered {}", url, response.status));
            DeliveryRecord {
                url,
                success: false,
                status: Some(response.status),
                error: Some(error.to_string()),
                timestamp_epoch_ms: current_epoch_ms(),
            }
        }
        Err(e) => {
            tracing::warn!("Webhook {} failed: {}", url, e);
            DeliveryRecord {
                url,
                success: false,
                status: None,
                error: Some(e.to_string()),
                timestamp_epoch_ms: current_epoch_ms(),
            }
        }
    };

    log.write().await.add(record.clone());
    record
}

fn current_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
