use serde::{Deserialize, Serialize};

/// A bookable service. `duration_hours` is the only attribute the
/// availability calculator consumes; whole hours, always positive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub duration_hours: i32,
    pub price: i32,
    pub requirements: Vec<String>,
    pub disclaimers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub id: i64,
    pub user_id: String,
    pub display_name: String,
    pub provider_type: String,
}

/// Join row linking a provider to a service it offers. A provider can only
/// be booked for services present in this set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderService {
    pub id: i64,
    pub provider_id: i64,
    pub service_id: i64,
}

/// Slim projection used by the booking front-end's provider dropdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSummary {
    pub id: i64,
    pub display_name: String,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum CatalogError {
    #[error("Service with ID {0} not found")]
    ServiceNotFound(i64),

    #[error("Provider with ID {0} not found")]
    ProviderNotFound(i64),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
