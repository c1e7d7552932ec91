use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;

use catalog_cell::models::CatalogError;
use catalog_cell::services::CatalogService;

use crate::models::{
    Appointment, BookAppointmentRequest, BookForOtherRequest, BookingError,
    UpdateAppointmentRequest,
};
use crate::services::availability::AvailabilityService;

pub struct BookingService {
    supabase: SupabaseClient,
    availability: AvailabilityService,
    catalog: CatalogService,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            availability: AvailabilityService::new(config),
            catalog: CatalogService::new(config),
        }
    }

    /// Book an appointment for the acting customer. The requested start time
    /// must be a member of the currently available slot set.
    pub async fn book_appointment(
        &self,
        user: &User,
        request: BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        let (service_id, provider_id, date_time) =
            match (request.service_id, request.provider_id, request.date_time) {
                (Some(s), Some(p), Some(d)) => (s, p, d),
                _ => return Err(BookingError::MissingFields),
            };

        info!(
            "Booking appointment for customer {} with provider {}",
            user.id, provider_id
        );

        self.verify_customer_exists(&user.id, auth_token).await?;

        self.check_slot_is_available(provider_id, service_id, date_time, None, auth_token)
            .await?;

        self.insert_appointment(&user.id, provider_id, service_id, date_time, auth_token)
            .await
    }

    /// Admin booking on behalf of another customer.
    pub async fn book_for_other(
        &self,
        acting_user: &User,
        request: BookForOtherRequest,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        let (service_id, provider_id, date_time) =
            match (request.service_id, request.provider_id, request.date_time) {
                (Some(s), Some(p), Some(d)) => (s, p, d),
                _ => return Err(BookingError::MissingFields),
            };
        let customer_id = request.customer_id.ok_or(BookingError::MissingFields)?;

        if !acting_user.is_admin() {
            return Err(BookingError::AdminRequired);
        }

        info!(
            "Admin {} booking appointment for customer {} with provider {}",
            acting_user.id, customer_id, provider_id
        );

        self.verify_customer_exists(&customer_id, auth_token).await?;

        self.check_slot_is_available(provider_id, service_id, date_time, None, auth_token)
            .await?;

        self.insert_appointment(&customer_id, provider_id, service_id, date_time, auth_token)
            .await
    }

    pub async fn get_appointment(
        &self,
        appointment_id: i64,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        debug!("Fetching appointment: {}", appointment_id);

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(BookingError::AppointmentNotFound(appointment_id));
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| BookingError::DatabaseError(format!("Failed to parse appointment: {}", e)))
    }

    /// Edit an existing appointment. Re-resolves provider and service and
    /// re-runs the availability check with the edited appointment excluded,
    /// so the booking cannot collide with itself.
    pub async fn update_appointment(
        &self,
        user: &User,
        appointment_id: i64,
        request: UpdateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        let (service_id, provider_id, date_time) =
            match (request.service_id, request.provider_id, request.date_time) {
                (Some(s), Some(p), Some(d)) => (s, p, d),
                _ => return Err(BookingError::MissingFields),
            };

        debug!("Updating appointment: {}", appointment_id);

        let current = self.get_appointment(appointment_id, auth_token).await?;

        if current.customer_id != user.id && !user.is_admin() {
            return Err(BookingError::NotOwner);
        }

        self.catalog
            .get_provider(provider_id, auth_token)
            .await
            .map_err(map_catalog_error)?;
        self.catalog
            .get_service(service_id, auth_token)
            .await
            .map_err(map_catalog_error)?;

        self.check_slot_is_available(
            provider_id,
            service_id,
            date_time,
            Some(appointment_id),
            auth_token,
        )
        .await?;

        let update_data = json!({
            "service_id": service_id,
            "provider_id": provider_id,
            "date_time": date_time.to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(update_data),
                Some(headers),
            )
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(BookingError::DatabaseError(
                "Failed to update appointment".to_string(),
            ));
        }

        let updated: Appointment = serde_json::from_value(result[0].clone())
            .map_err(|e| BookingError::DatabaseError(format!("Failed to parse appointment: {}", e)))?;

        info!("Appointment {} updated successfully", appointment_id);
        Ok(updated)
    }

    /// Delete an appointment; owner or admin only.
    pub async fn delete_appointment(
        &self,
        user: &User,
        appointment_id: i64,
        auth_token: &str,
    ) -> Result<(), BookingError> {
        debug!("Deleting appointment: {}", appointment_id);

        let current = self.get_appointment(appointment_id, auth_token).await?;

        if current.customer_id != user.id && !user.is_admin() {
            return Err(BookingError::NotOwner);
        }

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let _: Vec<Value> = self
            .supabase
            .request(Method::DELETE, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        info!("Appointment {} deleted", appointment_id);
        Ok(())
    }

    pub async fn list_for_customer(
        &self,
        customer_id: &str,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, BookingError> {
        let path = format!(
            "/rest/v1/appointments?customer_id=eq.{}&order=date_time.asc",
            customer_id
        );
        self.list_appointments(&path, auth_token).await
    }

    pub async fn list_for_provider(
        &self,
        provider_id: i64,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, BookingError> {
        let path = format!(
            "/rest/v1/appointments?provider_id=eq.{}&order=date_time.asc",
            provider_id
        );
        self.list_appointments(&path, auth_token).await
    }

    pub async fn list_all(&self, auth_token: &str) -> Result<Vec<Appointment>, BookingError> {
        self.list_appointments("/rest/v1/appointments?order=date_time.asc", auth_token)
            .await
    }

    // ==============================================================================
    // PRIVATE HELPER METHODS
    // ==============================================================================

    async fn list_appointments(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, BookingError> {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| BookingError::DatabaseError(format!("Failed to parse appointments: {}", e)))
    }

    async fn verify_customer_exists(
        &self,
        customer_id: &str,
        auth_token: &str,
    ) -> Result<(), BookingError> {
        let path = format!("/rest/v1/customers?id=eq.{}", customer_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(BookingError::CustomerNotFound);
        }

        Ok(())
    }

    /// The requested start time must land exactly on one of the currently
    /// available slots. There is no serialization between this check and the
    /// insert, so two concurrent bookings can both pass it.
    async fn check_slot_is_available(
        &self,
        provider_id: i64,
        service_id: i64,
        date_time: DateTime<Utc>,
        exclude_appointment_id: Option<i64>,
        auth_token: &str,
    ) -> Result<(), BookingError> {
        let available = self
            .availability
            .get_available_slots(
                provider_id,
                service_id,
                date_time.date_naive(),
                exclude_appointment_id,
                auth_token,
            )
            .await?;

        if !available.contains(&date_time) {
            warn!(
                "Requested slot {} for provider {} is not available",
                date_time, provider_id
            );
            return Err(BookingError::SlotNotAvailable);
        }

        Ok(())
    }

    async fn insert_appointment(
        &self,
        customer_id: &str,
        provider_id: i64,
        service_id: i64,
        date_time: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        let now = Utc::now();
        let appointment_data = json!({
            "customer_id": customer_id,
            "provider_id": provider_id,
            "service_id": service_id,
            "date_time": date_time.to_rfc3339(),
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(appointment_data),
                Some(headers),
            )
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(BookingError::DatabaseError(
                "Failed to create appointment".to_string(),
            ));
        }

        let appointment: Appointment = serde_json::from_value(result[0].clone())
            .map_err(|e| BookingError::DatabaseError(format!("Failed to parse appointment: {}", e)))?;

        info!(
            "Appointment {} booked for customer {} at {}",
            appointment.id, customer_id, date_time
        );
        Ok(appointment)
    }
}

fn map_catalog_error(e: CatalogError) -> BookingError {
    match e {
        CatalogError::ProviderNotFound(id) => BookingError::ProviderNotFound(id),
        CatalogError::ServiceNotFound(id) => BookingError::ServiceNotFound(id),
        CatalogError::DatabaseError(msg) => BookingError::DatabaseError(msg),
    }
}
