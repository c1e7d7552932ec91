use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::Value;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::CatalogError;
use crate::services::CatalogService;

fn map_catalog_error(e: CatalogError) -> AppError {
    match e {
        CatalogError::ServiceNotFound(_) | CatalogError::ProviderNotFound(_) => {
            AppError::NotFound(e.to_string())
        }
        CatalogError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn list_services(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let catalog = CatalogService::new(&state);

    let services = catalog
        .list_services(auth.token())
        .await
        .map_err(map_catalog_error)?;

    Ok(Json(serde_json::json!(services)))
}

#[axum::debug_handler]
pub async fn get_service(
    State(state): State<Arc<AppConfig>>,
    Path(service_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let catalog = CatalogService::new(&state);

    let service = catalog
        .get_service(service_id, auth.token())
        .await
        .map_err(map_catalog_error)?;

    Ok(Json(serde_json::json!(service)))
}

#[axum::debug_handler]
pub async fn list_providers(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let catalog = CatalogService::new(&state);

    let providers = catalog
        .list_providers(auth.token())
        .await
        .map_err(map_catalog_error)?;

    Ok(Json(serde_json::json!(providers)))
}

#[axum::debug_handler]
pub async fn get_provider(
    State(state): State<Arc<AppConfig>>,
    Path(provider_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let catalog = CatalogService::new(&state);

    let provider = catalog
        .get_provider(provider_id, auth.token())
        .await
        .map_err(map_catalog_error)?;

    Ok(Json(serde_json::json!(provider)))
}

/// Populates the provider dropdown once the customer picks a service.
#[axum::debug_handler]
pub async fn get_providers_for_service(
    State(state): State<Arc<AppConfig>>,
    Path(service_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let catalog = CatalogService::new(&state);

    let providers = catalog
        .providers_for_service(service_id, auth.token())
        .await
        .map_err(map_catalog_error)?;

    Ok(Json(serde_json::json!(providers)))
}
