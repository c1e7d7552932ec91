use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use catalog_cell::services::CatalogService;

use crate::models::{
    BookAppointmentRequest, BookForOtherRequest, BookingError, UpdateAppointmentRequest,
};
use crate::services::availability::AvailabilityService;
use crate::services::booking::BookingService;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct AvailabilityQueryParams {
    pub provider_id: i64,
    pub service_id: i64,
    pub date: NaiveDate,
    pub exclude_appointment_id: Option<i64>,
}

// ==============================================================================
// ERROR MAPPING
// ==============================================================================

fn map_booking_error(e: BookingError) -> AppError {
    match e {
        BookingError::MissingFields => AppError::BadRequest(e.to_string()),
        BookingError::SlotNotAvailable => AppError::BadRequest(e.to_string()),
        BookingError::ServiceNotOffered { .. } => AppError::Conflict(e.to_string()),
        BookingError::ProviderNotFound(_)
        | BookingError::ServiceNotFound(_)
        | BookingError::AppointmentNotFound(_)
        | BookingError::CustomerNotFound => AppError::NotFound(e.to_string()),
        BookingError::AdminRequired | BookingError::NotOwner => AppError::Forbidden(e.to_string()),
        BookingError::DatabaseError(msg) => AppError::Database(msg),
    }
}

// ==============================================================================
// AVAILABILITY HANDLER
// ==============================================================================

/// The timeslots at which a provider is free to perform a service on a given
/// date, as an ordered list of ISO-8601 datetimes.
#[axum::debug_handler]
pub async fn get_available_time_slots(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<AvailabilityQueryParams>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let availability = AvailabilityService::new(&state);

    let slots = availability
        .get_available_slots(
            params.provider_id,
            params.service_id,
            params.date,
            params.exclude_appointment_id,
            auth.token(),
        )
        .await
        .map_err(|e| match e {
            BookingError::DatabaseError(ref msg) => {
                error!(
                    "Error getting available time slots. ProviderId: {}, ServiceId: {}, Date: {}: {}",
                    params.provider_id, params.service_id, params.date, msg
                );
                if state.is_development() {
                    AppError::Internal(msg.clone())
                } else {
                    AppError::Internal(
                        "An error occurred while getting available time slots.".to_string(),
                    )
                }
            }
            other => map_booking_error(other),
        })?;

    Ok(Json(json!(slots)))
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    // Self-booking is a customer operation
    if user.role.as_deref() != Some("customer") {
        return Err(AppError::Forbidden(
            "Only customers can book appointments for themselves".to_string(),
        ));
    }

    let booking = BookingService::new(&state);

    let appointment = booking
        .book_appointment(&user, request, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    })))
}

#[axum::debug_handler]
pub async fn book_for_other(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookForOtherRequest>,
) -> Result<Json<Value>, AppError> {
    let booking = BookingService::new(&state);

    let appointment = booking
        .book_for_other(&user, request, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let booking = BookingService::new(&state);

    let appointment = booking
        .get_appointment(appointment_id, auth.token())
        .await
        .map_err(map_booking_error)?;

    // Owner, the assigned provider, or an admin may view
    let mut authorized = appointment.customer_id == user.id || user.is_admin();
    if !authorized && user.is_provider() {
        let catalog = CatalogService::new(&state);
        if let Some(provider) = catalog
            .find_provider_by_user(&user.id, auth.token())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            authorized = provider.id == appointment.provider_id;
        }
    }

    if !authorized {
        return Err(AppError::Forbidden(
            "Not authorized to view this appointment".to_string(),
        ));
    }

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let booking = BookingService::new(&state);

    let appointment = booking
        .update_appointment(&user, appointment_id, request, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment updated successfully"
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let booking = BookingService::new(&state);

    booking
        .delete_appointment(&user, appointment_id, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment deleted"
    })))
}

// ==============================================================================
// LISTING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_my_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let booking = BookingService::new(&state);

    let appointments = booking
        .list_for_customer(&user.id, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn list_provider_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let catalog = CatalogService::new(&state);

    let provider = catalog
        .find_provider_by_user(&user.id, auth.token())
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| {
            AppError::BadRequest(
                "The currently logged in user does not have a provider profile".to_string(),
            )
        })?;

    let booking = BookingService::new(&state);
    let appointments = booking
        .list_for_provider(provider.id, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "provider_id": provider.id,
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn list_all_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden(
            "Only admins can list all appointments".to_string(),
        ));
    }

    let booking = BookingService::new(&state);
    let appointments = booking
        .list_all(auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}
