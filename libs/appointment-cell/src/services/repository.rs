// libs/appointment-cell/src/services/repository.rs
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Method,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    Appointment, AppointmentRow, FileRecord, NewAppointment, Page, ProviderProfile, ProviderRecord,
};

/// Persistence port for appointments and the users they reference.
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    /// Active appointments of `user_id`, ordered by date, one page at a time.
    async fn find_active_appointments_for_user(
        &self,
        user_id: i64,
        page: Page,
    ) -> Result<Vec<AppointmentRow>>;

    /// Provider name and avatar file, whether or not the user is still flagged as a provider.
    async fn find_provider_avatar(&self, provider_id: i64) -> Result<Option<ProviderProfile>>;

    /// The user `provider_id`, only when flagged as a provider.
    async fn find_provider(&self, provider_id: i64) -> Result<Option<ProviderRecord>>;

    async fn find_active_appointment_at(
        &self,
        provider_id: i64,
        date: DateTime<Utc>,
    ) -> Result<Option<Appointment>>;

    async fn create_appointment(&self, appointment: NewAppointment) -> Result<Appointment>;
}

#[derive(Debug, Deserialize)]
struct ProviderProfileRow {
    id: i64,
    name: String,
    avatar_id: Option<i64>,
}

/// PostgREST-backed repository; every call carries the caller's token so row
/// level security applies.
pub struct SupabaseAppointmentRepository {
    supabase: SupabaseClient,
    auth_token: Option<String>,
}

impl SupabaseAppointmentRepository {
    pub fn new(config: &AppConfig, auth_token: Option<&str>) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            auth_token: auth_token.map(str::to_string),
        }
    }

    async fn select<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        debug!("Querying {}", path);
        self.supabase
            .request(Method::GET, path, self.auth_token.as_deref(), None)
            .await
    }

    async fn select_one<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        Ok(self.select(path).await?.into_iter().next())
    }
}

fn encode_timestamp(date: DateTime<Utc>) -> String {
    urlencoding::encode(&date.to_rfc3339_opts(SecondsFormat::Secs, true)).into_owned()
}

#[async_trait]
impl AppointmentRepository for SupabaseAppointmentRepository {
    async fn find_active_appointments_for_user(
        &self,
        user_id: i64,
        page: Page,
    ) -> Result<Vec<AppointmentRow>> {
        let path = format!(
            "/rest/v1/appointments?select=id,date,provider_id&user_id=eq.{}&canceled_at=is.null&order=date.asc,id.asc&limit={}&offset={}",
            user_id,
            page.limit(),
            page.offset()
        );
        self.select(&path).await
    }

    async fn find_provider_avatar(&self, provider_id: i64) -> Result<Option<ProviderProfile>> {
        let path = format!(
            "/rest/v1/users?select=id,name,avatar_id&id=eq.{}&limit=1",
            provider_id
        );
        let Some(row) = self.select_one::<ProviderProfileRow>(&path).await? else {
            return Ok(None);
        };

        let avatar = match row.avatar_id {
            Some(file_id) => {
                let path = format!("/rest/v1/files?select=id,path&id=eq.{}&limit=1", file_id);
                self.select_one::<FileRecord>(&path).await?
            }
            None => None,
        };

        Ok(Some(ProviderProfile {
            id: row.id,
            name: row.name,
            avatar,
        }))
    }

    async fn find_provider(&self, provider_id: i64) -> Result<Option<ProviderRecord>> {
        let path = format!(
            "/rest/v1/users?select=id,name,provider&id=eq.{}&provider=is.true&limit=1",
            provider_id
        );
        self.select_one(&path).await
    }

    async fn find_active_appointment_at(
        &self,
        provider_id: i64,
        date: DateTime<Utc>,
    ) -> Result<Option<Appointment>> {
        let path = format!(
            "/rest/v1/appointments?provider_id=eq.{}&canceled_at=is.null&date=eq.{}&limit=1",
            provider_id,
            encode_timestamp(date)
        );
        self.select_one(&path).await
    }

    async fn create_appointment(&self, appointment: NewAppointment) -> Result<Appointment> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let body = json!({
            "user_id": appointment.user_id,
            "provider_id": appointment.provider_id,
            "date": appointment.date.to_rfc3339_opts(SecondsFormat::Secs, true),
            "canceled_at": null,
            "created_at": now,
            "updated_at": now
        });

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let created: Vec<Appointment> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                self.auth_token.as_deref(),
                Some(body),
                Some(headers),
            )
            .await?;

        created
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Failed to create appointment"))
    }
}
