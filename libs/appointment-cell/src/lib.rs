pub mod clock;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod validation;

pub use models::{Appointment, AppointmentError, AppointmentSummary, Page};
pub use router::appointment_routes;

pub mod api {
    pub use crate::services::booking::AppointmentBookingService;
    pub use crate::services::repository::{AppointmentRepository, SupabaseAppointmentRepository};
}
