//! Prescription review actions and profile usage bookkeeping

use uuid::Uuid;

use crate::backend::{BackendClient, Query};
use crate::model::{
    NewPrescription, Prescription, PrescriptionStatus, Profile, Session, PRESCRIPTIONS_TABLE,
    PROFILES_TABLE,
};
use crate::webhook::{PrescriptionEvent, WebhookDispatcher};
use crate::NutrimaticError;

/// Prescription allowance given to a newly created profile
pub const DEFAULT_PRESCRIPTION_LIMIT: u32 = 10;

/// Set a prescription's status and notify the workflow service.
///
/// The webhook is fired after the update succeeds and is not awaited; delivery
/// failures never fail the status change.
pub async fn change_status(
    backend: &BackendClient,
    webhooks: &WebhookDispatcher,
    owner: Uuid,
    id: Uuid,
    status: PrescriptionStatus,
) -> crate::Result<Prescription> {
    let query = Query::table(PRESCRIPTIONS_TABLE)
        .eq("id", id)
        .eq("nutricionista_id", owner);
    let mut prescription: Prescription = backend
        .select_one(&query)
        .await?
        .ok_or_else(|| NutrimaticError::NotFound(format!("prescription {}", id)))?;

    let previous = prescription.status;
    backend
        .update(&query, &serde_json::json!({ "status": status }))
        .await?;
    prescription.status = status;
    tracing::info!(
        "Prescription {} for '{}' changed {} -> {}",
        id,
        prescription.client_name,
        previous,
        status
    );

    let event = PrescriptionEvent::status_changed(&prescription, previous);
    let _detached = webhooks.dispatch_event(&event);
    Ok(prescription)
}

/// Request a new prescription, consuming one unit of the profile's allowance.
///
/// The counter is bumped first, conditioned on the value the caller saw, so
/// concurrent requests cannot overrun the limit. A failed insert gives the
/// unit back.
pub async fn create_prescription(
    backend: &BackendClient,
    profile: &Profile,
    client_name: &str,
    payload: serde_json::Value,
) -> crate::Result<Prescription> {
    let client_name = client_name.trim();
    if client_name.is_empty() {
        return Err(NutrimaticError::Validation(
            "client name must not be empty".to_string(),
        ));
    }
    if !profile.can_generate() {
        return Err(NutrimaticError::UsageLimit(format!(
            "{} of {} prescriptions used",
            profile.generated_count, profile.max_allowed
        )));
    }

    let counter = Query::table(PROFILES_TABLE)
        .eq("id", profile.id)
        .eq("prescricoes_geradas", profile.generated_count);
    let consumed = serde_json::json!({ "prescricoes_geradas": profile.generated_count + 1 });
    let bumped = backend.update_returning(&counter, &consumed).await?;
    if bumped.is_empty() {
        return Err(NutrimaticError::Conflict(format!(
            "prescription count for profile {} changed; reload and try again",
            profile.id
        )));
    }

    let row = NewPrescription {
        nutritionist_id: profile.id,
        client_name: client_name.to_string(),
        status: PrescriptionStatus::Pending,
        payload,
    };
    let inserted = match backend.insert(PRESCRIPTIONS_TABLE, &row).await {
        Ok(inserted) => inserted,
        Err(e) => {
            release_allowance(backend, profile).await;
            return Err(e);
        }
    };
    let prescription: Prescription = serde_json::from_value(inserted)?;

    tracing::info!(
        "Created prescription {} for '{}' ({} remaining)",
        prescription.id,
        prescription.client_name,
        profile.remaining().saturating_sub(1)
    );
    Ok(prescription)
}

/// Give back the unit taken by a create whose insert failed
async fn release_allowance(backend: &BackendClient, profile: &Profile) {
    let counter = Query::table(PROFILES_TABLE)
        .eq("id", profile.id)
        .eq("prescricoes_geradas", profile.generated_count + 1);
    let restored = serde_json::json!({ "prescricoes_geradas": profile.generated_count });
    match backend.update(&counter, &restored).await {
        Ok(()) => tracing::debug!("Released prescription allowance for {}", profile.id),
        Err(e) => tracing::warn!(
            "Failed to release prescription allowance for {}: {}",
            profile.id,
            e
        ),
    }
}

/// Mark the caller's profile active, creating it on first setup
pub async fn activate_profile(
    backend: &BackendClient,
    session: &Session,
    name: &str,
) -> crate::Result<Profile> {
    let name = name.trim();
    let query = Query::table(PROFILES_TABLE).eq("id", session.user_id);

    match backend.select_one::<Profile>(&query).await? {
        Some(mut profile) => {
            let mut patch = serde_json::json!({ "ativo": true });
            if !name.is_empty() {
                patch["nome"] = serde_json::Value::from(name);
                profile.name = name.to_string();
            }
            backend.update(&query, &patch).await?;
            profile.active = true;
            tracing::info!("Activated profile {}", profile.id);
            Ok(profile)
        }
        None => {
            if name.is_empty() {
                return Err(NutrimaticError::Validation(
                    "name is required to create a profile".to_string(),
                ));
            }
            let profile = Profile {
                id: session.user_id,
                name: name.to_string(),
                email: session.email.clone(),
                active: true,
                generated_count: 0,
                max_allowed: DEFAULT_PRESCRIPTION_LIMIT,
            };
            backend.insert(PROFILES_TABLE, &profile).await?;
            tracing::info!("Created profile {}", profile.id);
            Ok(profile)
        }
    }
}
