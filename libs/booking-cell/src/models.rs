use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// A booked appointment. The occupied interval is
/// `[date_time, date_time + booked service duration)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub customer_id: String,
    pub provider_id: i64,
    pub service_id: i64,
    pub date_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The time span an existing appointment occupies, resolved against the
/// duration of its booked service. Half-open: the end instant is free again.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BookedInterval {
    pub start: DateTime<Utc>,
    pub duration_hours: i32,
}

impl BookedInterval {
    pub fn end(&self) -> DateTime<Utc> {
        self.start + chrono::Duration::hours(self.duration_hours as i64)
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

/// Customer self-booking. Fields are optional so that presence can be
/// validated as one step and reported as a single missing-fields error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub service_id: Option<i64>,
    pub provider_id: Option<i64>,
    pub date_time: Option<DateTime<Utc>>,
}

/// Admin booking on behalf of another customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookForOtherRequest {
    pub customer_id: Option<String>,
    pub service_id: Option<i64>,
    pub provider_id: Option<i64>,
    pub date_time: Option<DateTime<Utc>>,
}

/// Edit of an existing appointment; every field must be supplied, as the
/// edit form re-submits the full selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub service_id: Option<i64>,
    pub provider_id: Option<i64>,
    pub date_time: Option<DateTime<Utc>>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum BookingError {
    #[error("Missing required fields")]
    MissingFields,

    #[error("Provider with ID {0} not found")]
    ProviderNotFound(i64),

    #[error("Service with ID {0} not found")]
    ServiceNotFound(i64),

    #[error("Provider with ID {provider_id} does not offer service with ID {service_id}")]
    ServiceNotOffered { provider_id: i64, service_id: i64 },

    #[error("No appointment found with id={0}")]
    AppointmentNotFound(i64),

    #[error("Customer not found")]
    CustomerNotFound,

    #[error("Selected service is not available at the selected time from the selected provider")]
    SlotNotAvailable,

    #[error("Currently logged-in user is not an admin")]
    AdminRequired,

    #[error("Current user does not match the appointment's customer")]
    NotOwner,

    #[error("Database error: {0}")]
    DatabaseError(String),
}
