use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{CatalogError, Provider, ProviderSummary, Service};

pub struct CatalogService {
    supabase: SupabaseClient,
}

impl CatalogService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn get_service(
        &self,
        service_id: i64,
        auth_token: &str,
    ) -> Result<Service, CatalogError> {
        let path = format!("/rest/v1/services?id=eq.{}", service_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| CatalogError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(CatalogError::ServiceNotFound(service_id));
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| CatalogError::DatabaseError(format!("Failed to parse service: {}", e)))
    }

    pub async fn list_services(&self, auth_token: &str) -> Result<Vec<Service>, CatalogError> {
        let result: Vec<Value> = self
            .supabase
            .request(
                Method::GET,
                "/rest/v1/services?order=id.asc",
                Some(auth_token),
                None,
            )
            .await
            .map_err(|e| CatalogError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Service>, _>>()
            .map_err(|e| CatalogError::DatabaseError(format!("Failed to parse services: {}", e)))
    }

    pub async fn get_provider(
        &self,
        provider_id: i64,
        auth_token: &str,
    ) -> Result<Provider, CatalogError> {
        let path = format!("/rest/v1/providers?id=eq.{}", provider_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| CatalogError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(CatalogError::ProviderNotFound(provider_id));
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| CatalogError::DatabaseError(format!("Failed to parse provider: {}", e)))
    }

    pub async fn list_providers(&self, auth_token: &str) -> Result<Vec<Provider>, CatalogError> {
        let result: Vec<Value> = self
            .supabase
            .request(
                Method::GET,
                "/rest/v1/providers?order=id.asc",
                Some(auth_token),
                None,
            )
            .await
            .map_err(|e| CatalogError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Provider>, _>>()
            .map_err(|e| CatalogError::DatabaseError(format!("Failed to parse providers: {}", e)))
    }

    /// Resolve the provider profile belonging to an identity user, if any.
    pub async fn find_provider_by_user(
        &self,
        user_id: &str,
        auth_token: &str,
    ) -> Result<Option<Provider>, CatalogError> {
        let path = format!("/rest/v1/providers?user_id=eq.{}", user_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| CatalogError::DatabaseError(e.to_string()))?;

        match result.into_iter().next() {
            Some(row) => serde_json::from_value(row)
                .map(Some)
                .map_err(|e| CatalogError::DatabaseError(format!("Failed to parse provider: {}", e))),
            None => Ok(None),
        }
    }

    /// Whether the provider's offered-service set contains the service.
    pub async fn provider_offers_service(
        &self,
        provider_id: i64,
        service_id: i64,
        auth_token: &str,
    ) -> Result<bool, CatalogError> {
        let path = format!(
            "/rest/v1/provider_services?provider_id=eq.{}&service_id=eq.{}",
            provider_id, service_id
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| CatalogError::DatabaseError(e.to_string()))?;

        Ok(!result.is_empty())
    }

    /// Providers whose offered-service set contains `service_id`, in id
    /// order. Unknown service ids simply produce an empty list.
    pub async fn providers_for_service(
        &self,
        service_id: i64,
        auth_token: &str,
    ) -> Result<Vec<ProviderSummary>, CatalogError> {
        debug!("Listing providers offering service {}", service_id);

        let path = format!(
            "/rest/v1/provider_services?service_id=eq.{}&order=provider_id.asc",
            service_id
        );
        let links: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| CatalogError::DatabaseError(e.to_string()))?;

        let provider_ids: Vec<i64> = links
            .iter()
            .filter_map(|link| link["provider_id"].as_i64())
            .collect();

        if provider_ids.is_empty() {
            return Ok(vec![]);
        }

        let id_list = provider_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let path = format!("/rest/v1/providers?id=in.({})&order=id.asc", id_list);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| CatalogError::DatabaseError(e.to_string()))?;

        let providers: Vec<Provider> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Provider>, _>>()
            .map_err(|e| CatalogError::DatabaseError(format!("Failed to parse providers: {}", e)))?;

        Ok(providers
            .into_iter()
            .map(|p| ProviderSummary {
                id: p.id,
                display_name: p.display_name,
            })
            .collect())
    }
}
