use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use catalog_cell::models::CatalogError;
use catalog_cell::services::CatalogService;

use crate::models::{Appointment, BookedInterval, BookingError};

/// The provider day runs 05:00 to midnight (exclusive), independent of
/// provider-specific hours.
const WINDOW_OPEN_HOUR: u32 = 5;
/// Candidate start times are generated on a fixed half-hour grid.
const SLOT_STEP_MINUTES: i64 = 30;

pub struct AvailabilityService {
    supabase: SupabaseClient,
    catalog: CatalogService,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            catalog: CatalogService::new(config),
        }
    }

    /// Compute the start times at which the provider is free to perform the
    /// service on `date`. Passing `exclude_appointment_id` lets an edit flow
    /// re-check availability without colliding with the appointment being
    /// edited.
    pub async fn get_available_slots(
        &self,
        provider_id: i64,
        service_id: i64,
        date: NaiveDate,
        exclude_appointment_id: Option<i64>,
        auth_token: &str,
    ) -> Result<Vec<DateTime<Utc>>, BookingError> {
        debug!(
            "Calculating available slots for provider {} and service {} on {}",
            provider_id, service_id, date
        );

        // Verify all entities exist before doing any slot work
        self.catalog
            .get_provider(provider_id, auth_token)
            .await
            .map_err(map_catalog_error)?;

        let service = self
            .catalog
            .get_service(service_id, auth_token)
            .await
            .map_err(map_catalog_error)?;

        // The provider must actually offer the requested service
        let offered = self
            .catalog
            .provider_offers_service(provider_id, service_id, auth_token)
            .await
            .map_err(map_catalog_error)?;
        if !offered {
            return Err(BookingError::ServiceNotOffered {
                provider_id,
                service_id,
            });
        }

        let booked = self
            .booked_intervals_for_date(provider_id, date, exclude_appointment_id, auth_token)
            .await?;

        let slots = compute_free_slots(date, service.duration_hours, &booked);
        debug!("Found {} available slots", slots.len());

        Ok(slots)
    }

    /// The provider's appointments on `date`, each resolved to the interval
    /// its booked service occupies.
    async fn booked_intervals_for_date(
        &self,
        provider_id: i64,
        date: NaiveDate,
        exclude_appointment_id: Option<i64>,
        auth_token: &str,
    ) -> Result<Vec<BookedInterval>, BookingError> {
        let day_start = date.and_hms_opt(0, 0, 0).unwrap().and_utc();
        let day_end = day_start + Duration::days(1);

        // RFC3339 offsets must be percent-encoded inside PostgREST filters
        let mut query_parts = vec![
            format!("provider_id=eq.{}", provider_id),
            format!("date_time=gte.{}", urlencoding::encode(&day_start.to_rfc3339())),
            format!("date_time=lt.{}", urlencoding::encode(&day_end.to_rfc3339())),
        ];

        if let Some(exclude_id) = exclude_appointment_id {
            query_parts.push(format!("id=neq.{}", exclude_id));
        }

        let path = format!(
            "/rest/v1/appointments?{}&order=date_time.asc",
            query_parts.join("&")
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        let appointments: Vec<Appointment> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| BookingError::DatabaseError(format!("Failed to parse appointments: {}", e)))?;

        if appointments.is_empty() {
            return Ok(vec![]);
        }

        let durations = self
            .service_durations(appointments.iter().map(|a| a.service_id), auth_token)
            .await?;

        appointments
            .into_iter()
            .map(|appointment| {
                let duration_hours = durations.get(&appointment.service_id).copied().ok_or_else(|| {
                    BookingError::DatabaseError(format!(
                        "Appointment {} references unknown service {}",
                        appointment.id, appointment.service_id
                    ))
                })?;
                Ok(BookedInterval {
                    start: appointment.date_time,
                    duration_hours,
                })
            })
            .collect()
    }

    /// Duration lookup for the day's booked services, one batched query.
    async fn service_durations(
        &self,
        service_ids: impl Iterator<Item = i64>,
        auth_token: &str,
    ) -> Result<HashMap<i64, i32>, BookingError> {
        let mut ids: Vec<i64> = service_ids.collect();
        ids.sort_unstable();
        ids.dedup();

        let id_list = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let path = format!("/rest/v1/services?id=in.({})&select=id,duration_hours", id_list);

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        let mut durations = HashMap::new();
        for row in result {
            if let (Some(id), Some(duration)) = (row["id"].as_i64(), row["duration_hours"].as_i64())
            {
                durations.insert(id, duration as i32);
            }
        }

        Ok(durations)
    }
}

fn map_catalog_error(e: CatalogError) -> BookingError {
    match e {
        CatalogError::ProviderNotFound(id) => BookingError::ProviderNotFound(id),
        CatalogError::ServiceNotFound(id) => BookingError::ServiceNotFound(id),
        CatalogError::DatabaseError(msg) => BookingError::DatabaseError(msg),
    }
}

/// Pure slot enumeration over one provider day. Candidates step through the
/// 05:00..midnight window on the half-hour grid; a candidate survives iff its
/// half-open interval intersects none of the booked intervals. Slots near the
/// end of the window are returned even when the service would run past
/// midnight, matching the historical behavior of the booking form.
pub fn compute_free_slots(
    date: NaiveDate,
    service_duration_hours: i32,
    booked: &[BookedInterval],
) -> Vec<DateTime<Utc>> {
    let window_start = date.and_hms_opt(WINDOW_OPEN_HOUR, 0, 0).unwrap().and_utc();
    let window_end = date.and_hms_opt(0, 0, 0).unwrap().and_utc() + Duration::days(1);
    let requested = Duration::hours(service_duration_hours as i64);

    let mut slots = Vec::new();
    let mut candidate = window_start;

    while candidate < window_end {
        let candidate_end = candidate + requested;

        let has_conflict = booked
            .iter()
            .any(|interval| candidate < interval.end() && candidate_end > interval.start);

        if !has_conflict {
            slots.push(candidate);
        }

        candidate += Duration::minutes(SLOT_STEP_MINUTES);
    }

    slots
}
