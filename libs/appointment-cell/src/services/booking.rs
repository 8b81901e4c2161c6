// libs/appointment-cell/src/services/booking.rs
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use shared_config::AppConfig;

use crate::clock::{start_of_hour, Clock, SystemClock};
use crate::models::{
    Appointment, AppointmentError, AppointmentSummary, AvatarSummary, NewAppointment, Page,
    ProviderProfile, ProviderSummary,
};
use crate::services::repository::{AppointmentRepository, SupabaseAppointmentRepository};
use crate::validation::CreateAppointmentPayload;

/// Lists and books appointments for the authenticated requester.
///
/// The availability check and the insert are separate repository calls, so
/// two concurrent bookings of one slot can both succeed unless the store
/// enforces uniqueness of active `(provider_id, date)` pairs.
pub struct AppointmentBookingService {
    config: Arc<AppConfig>,
    repository: Arc<dyn AppointmentRepository>,
    clock: Arc<dyn Clock>,
}

impl AppointmentBookingService {
    pub fn new(config: Arc<AppConfig>, auth_token: &str) -> Self {
        let repository = Arc::new(SupabaseAppointmentRepository::new(&config, Some(auth_token)));
        Self::with_repository(config, repository, Arc::new(SystemClock))
    }

    pub fn with_repository(
        config: Arc<AppConfig>,
        repository: Arc<dyn AppointmentRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            repository,
            clock,
        }
    }

    /// Active appointments of `user_id` on `page`, each with its provider.
    pub async fn list_appointments(
        &self,
        user_id: i64,
        page: Page,
    ) -> Result<Vec<AppointmentSummary>, AppointmentError> {
        debug!("Listing appointments for user {} (page {})", user_id, page.number());

        let rows = self
            .repository
            .find_active_appointments_for_user(user_id, page)
            .await?;

        let mut providers: HashMap<i64, Option<ProviderSummary>> = HashMap::new();
        let mut summaries = Vec::with_capacity(rows.len());

        for row in rows {
            let provider = match providers.get(&row.provider_id) {
                Some(cached) => cached.clone(),
                None => {
                    let fetched = self
                        .repository
                        .find_provider_avatar(row.provider_id)
                        .await?
                        .map(|profile| self.provider_summary(profile));
                    providers.insert(row.provider_id, fetched.clone());
                    fetched
                }
            };

            summaries.push(AppointmentSummary {
                id: row.id,
                date: row.date,
                provider,
            });
        }

        Ok(summaries)
    }

    /// Books a slot with a provider. Checks run in order and the first
    /// failure is returned without writing anything.
    pub async fn create_appointment(
        &self,
        user_id: i64,
        payload: &CreateAppointmentPayload,
    ) -> Result<Appointment, AppointmentError> {
        let request = payload.validate().map_err(|errors| {
            debug!("Appointment payload rejected: {:?}", errors);
            AppointmentError::Validation(errors)
        })?;

        let Some(provider_id) = request.provider_id else {
            warn!("Provider id in request names no user");
            return Err(AppointmentError::InvalidProvider);
        };

        if self.repository.find_provider(provider_id).await?.is_none() {
            warn!("User {} is not a provider", provider_id);
            return Err(AppointmentError::InvalidProvider);
        }

        let hour_start = start_of_hour(request.date);
        if hour_start < self.clock.now() {
            warn!("Rejected past appointment date {}", hour_start);
            return Err(AppointmentError::PastDate);
        }

        if self
            .repository
            .find_active_appointment_at(provider_id, hour_start)
            .await?
            .is_some()
        {
            warn!(
                "Provider {} already booked at {}",
                provider_id, hour_start
            );
            return Err(AppointmentError::SlotTaken);
        }

        let appointment = self
            .repository
            .create_appointment(NewAppointment {
                user_id,
                provider_id,
                date: hour_start,
            })
            .await?;

        info!(
            "Appointment {} booked by user {} with provider {} at {}",
            appointment.id, user_id, appointment.provider_id, appointment.date
        );
        Ok(appointment)
    }

    fn provider_summary(&self, profile: ProviderProfile) -> ProviderSummary {
        ProviderSummary {
            id: profile.id,
            name: profile.name,
            avatar: profile.avatar.map(|file| AvatarSummary {
                url: self.config.file_url(&file.path),
                id: file.id,
                path: file.path,
            }),
        }
    }
}
