// libs/appointment-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed number of appointments returned per listing page.
pub const PAGE_SIZE: u64 = 20;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub user_id: i64,
    pub provider_id: i64,
    pub date: DateTime<Utc>,
    pub canceled_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Appointment {
    pub fn is_active(&self) -> bool {
        self.canceled_at.is_none()
    }
}

/// Insert payload; `date` is already truncated to the hour.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAppointment {
    pub user_id: i64,
    pub provider_id: i64,
    pub date: DateTime<Utc>,
}

/// Projection used by the listing: only what the response needs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppointmentRow {
    pub id: i64,
    pub date: DateTime<Utc>,
    pub provider_id: i64,
}

// ==============================================================================
// REFERENCED ENTITIES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProviderRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub provider: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FileRecord {
    pub id: i64,
    pub path: String,
}

/// A provider's name together with its avatar file, if one is set.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderProfile {
    pub id: i64,
    pub name: String,
    pub avatar: Option<FileRecord>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListAppointmentsQuery {
    pub page: Option<String>,
}

impl ListAppointmentsQuery {
    /// Absent, non-numeric and zero pages all read as the first page.
    pub fn page(&self) -> Page {
        self.page
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .map(Page::new)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page(u32);

impl Page {
    pub fn new(number: u32) -> Self {
        Self(number.max(1))
    }

    pub fn number(self) -> u32 {
        self.0
    }

    pub fn limit(self) -> u64 {
        PAGE_SIZE
    }

    pub fn offset(self) -> u64 {
        u64::from(self.0 - 1) * PAGE_SIZE
    }
}

impl Default for Page {
    fn default() -> Self {
        Self(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppointmentSummary {
    pub id: i64,
    pub date: DateTime<Utc>,
    pub provider: Option<ProviderSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderSummary {
    pub id: i64,
    pub name: String,
    pub avatar: Option<AvatarSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvatarSummary {
    pub id: i64,
    pub path: String,
    pub url: String,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppointmentError {
    #[error("Validation fails")]
    Validation(Vec<FieldError>),

    #[error("You can only appointments with providers")]
    InvalidProvider,

    #[error("Past date are not permitted")]
    PastDate,

    #[error("Appointment date is not available")]
    SlotTaken,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<anyhow::Error> for AppointmentError {
    fn from(err: anyhow::Error) -> Self {
        AppointmentError::Database(err.to_string())
    }
}
