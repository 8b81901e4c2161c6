// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use tracing::{debug, error};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    Appointment, AppointmentError, AppointmentSummary, FieldError, ListAppointmentsQuery,
};
use crate::services::booking::AppointmentBookingService;
use crate::validation::CreateAppointmentPayload;

fn requester_id(user: &User) -> Result<i64, AppError> {
    user.numeric_id()
        .ok_or_else(|| AppError::Auth("Invalid user identifier".to_string()))
}

fn to_app_error(err: AppointmentError) -> AppError {
    match err {
        AppointmentError::Validation(_) => AppError::ValidationError(err.to_string()),
        AppointmentError::InvalidProvider => AppError::Auth(err.to_string()),
        AppointmentError::PastDate | AppointmentError::SlotTaken => {
            AppError::BadRequest(err.to_string())
        }
        AppointmentError::Database(msg) => {
            error!("Appointment store failure: {}", msg);
            AppError::Database("Internal server error".to_string())
        }
    }
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<ListAppointmentsQuery>,
) -> Result<Json<Vec<AppointmentSummary>>, AppError> {
    let user_id = requester_id(&user)?;
    let booking_service = AppointmentBookingService::new(state, auth.token());

    let appointments = booking_service
        .list_appointments(user_id, query.page())
        .await
        .map_err(to_app_error)?;

    Ok(Json(appointments))
}

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    body: Result<Json<CreateAppointmentPayload>, JsonRejection>,
) -> Result<Json<Appointment>, AppError> {
    let user_id = requester_id(&user)?;

    let Json(payload) = body.map_err(|rejection| {
        debug!("Unreadable appointment body: {}", rejection.body_text());
        to_app_error(AppointmentError::Validation(vec![FieldError::new(
            "body",
            "body must be a JSON object",
        )]))
    })?;

    let booking_service = AppointmentBookingService::new(state, auth.token());

    let appointment = booking_service
        .create_appointment(user_id, &payload)
        .await
        .map_err(to_app_error)?;

    Ok(Json(appointment))
}
