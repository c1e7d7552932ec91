use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn catalog_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/services", get(handlers::list_services))
        .route("/services/{service_id}", get(handlers::get_service))
        .route(
            "/services/{service_id}/providers",
            get(handlers::get_providers_for_service),
        )
        .route("/providers", get(handlers::list_providers))
        .route("/providers/{provider_id}", get(handlers::get_provider))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
