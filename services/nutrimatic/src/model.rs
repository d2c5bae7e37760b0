//! Domain records stored in the hosted backend and the view shapes derived from them

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const CLIENTS_TABLE: &str = "clientes";
pub const PRESCRIPTIONS_TABLE: &str = "prescricoes";
pub const PROFILES_TABLE: &str = "nutricionistas";
pub const EVENTS_TABLE: &str = "agenda_eventos";

/// Authenticated identity as reported by the backend auth service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub access_token: String,
}

/// Tokens returned by a password sign-in
#[derive(Debug, Clone, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Nutritionist account record, distinct from the raw session identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    #[serde(rename = "nome", default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "ativo", default)]
    pub active: bool,
    #[serde(rename = "prescricoes_geradas", default)]
    pub generated_count: u32,
    #[serde(rename = "limite_prescricoes", default)]
    pub max_allowed: u32,
}

impl Profile {
    pub fn remaining(&self) -> u32 {
        self.max_allowed.saturating_sub(self.generated_count)
    }

    pub fn can_generate(&self) -> bool {
        self.generated_count < self.max_allowed
    }
}

/// Review state of a generated prescription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrescriptionStatus {
    Pending,
    Approved,
    Redo,
}

impl fmt::Display for PrescriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrescriptionStatus::Pending => write!(f, "Pending"),
            PrescriptionStatus::Approved => write!(f, "Approved"),
            PrescriptionStatus::Redo => write!(f, "Redo"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    pub id: Uuid,
    #[serde(rename = "nutricionista_id")]
    pub nutritionist_id: Uuid,
    #[serde(rename = "nome_cliente")]
    pub client_name: String,
    pub status: PrescriptionStatus,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(rename = "pdf_url", default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Row inserted when a new prescription is requested
#[derive(Debug, Clone, Serialize)]
pub struct NewPrescription {
    #[serde(rename = "nutricionista_id")]
    pub nutritionist_id: Uuid,
    #[serde(rename = "nome_cliente")]
    pub client_name: String,
    pub status: PrescriptionStatus,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    Active,
    Inactive,
}

impl fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientStatus::Active => write!(f, "Active"),
            ClientStatus::Inactive => write!(f, "Inactive"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "telefone", default)]
    pub phone: String,
    pub status: ClientStatus,
}

/// Embedded client columns on a schedule row
#[derive(Debug, Clone, Deserialize)]
pub struct EventClient {
    #[serde(rename = "nome")]
    pub name: String,
}

/// Raw schedule row joined to its client
#[derive(Debug, Clone, Deserialize)]
pub struct EventRow {
    pub id: Uuid,
    #[serde(rename = "data")]
    pub date: NaiveDate,
    #[serde(rename = "hora", default)]
    pub time: Option<NaiveTime>,
    #[serde(rename = "acao")]
    pub action: String,
    #[serde(rename = "clientes", default)]
    pub client: Option<EventClient>,
}

/// Color tag shown on the calendar, derived from the action name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventColor {
    Blue,
    Green,
    Purple,
    Orange,
    Red,
    Gray,
}

impl EventColor {
    /// Keyword match on the action name, ignoring case and accents
    pub fn for_action(action: &str) -> Self {
        let folded = fold_accents(&action.to_lowercase());
        if folded.contains("consulta") {
            EventColor::Blue
        } else if folded.contains("retorno") {
            EventColor::Green
        } else if folded.contains("avalia") {
            EventColor::Purple
        } else if folded.contains("prescri") {
            EventColor::Orange
        } else if folded.contains("pagamento") {
            EventColor::Red
        } else {
            EventColor::Gray
        }
    }

    pub fn css(&self) -> &'static str {
        match self {
            EventColor::Blue => "#cfe2ff",
            EventColor::Green => "#d1e7dd",
            EventColor::Purple => "#e2d9f3",
            EventColor::Orange => "#ffe5d0",
            EventColor::Red => "#f8d7da",
            EventColor::Gray => "#e2e3e5",
        }
    }
}

fn fold_accents(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// Display-friendly projection of a schedule row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarEvent {
    pub id: Uuid,
    pub date: NaiveDate,
    pub time: Option<String>,
    pub title: String,
    pub color: EventColor,
}

impl From<EventRow> for CalendarEvent {
    fn from(row: EventRow) -> Self {
        let title = match &row.client {
            Some(client) => format!("{} - {}", row.action, client.name),
            None => row.action.clone(),
        };
        Self {
            id: row.id,
            date: row.date,
            time: row.time.map(|t| t.format("%H:%M").to_string()),
            color: EventColor::for_action(&row.action),
            title,
        }
    }
}
