//! Route configuration module.

use axum::{middleware, routing::get, Router};

use crate::api::docs::docs_routes;
use crate::api::handlers::{
    activity_tree_handler, get_organization_handler, health_handler,
    organizations_by_activity_handler, organizations_by_building_handler,
    organizations_by_location_handler, organizations_by_name_handler, readiness_handler,
    search_by_activity_tree_handler,
};
use crate::api::middlewares::api_key_auth;
use crate::api::state::AppState;

/// Creates and configures all application routes.
///
/// # Routes
///
/// ## Health Check Routes
/// - `GET /health` - Liveness probe
/// - `GET /ready` - Readiness probe
///
/// ## Documentation Routes
/// - `GET /docs` - Swagger UI
/// - `GET /redoc` - ReDoc
/// - `GET /openapi.json` - OpenAPI document
///
/// ## Directory Routes (require `X-API-Key`)
/// - `GET /organizations/by_building/{building_id}`
/// - `GET /organizations/by_activity/{activity_id}`
/// - `GET /organizations/by_location`
/// - `GET /organizations/search`
/// - `GET /organizations/{org_id}`
/// - `GET /activities/search`
/// - `GET /activities/tree`
pub fn create_routes(state: AppState) -> Router {
    // Static segments win over `{org_id}` in axum's router
    let directory_routes = Router::new()
        .route(
            "/organizations/by_building/{building_id}",
            get(organizations_by_building_handler),
        )
        .route(
            "/organizations/by_activity/{activity_id}",
            get(organizations_by_activity_handler),
        )
        .route(
            "/organizations/by_location",
            get(organizations_by_location_handler),
        )
        .route("/organizations/search", get(organizations_by_name_handler))
        .route("/organizations/{org_id}", get(get_organization_handler))
        .route("/activities/search", get(search_by_activity_tree_handler))
        .route("/activities/tree", get(activity_tree_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), api_key_auth));

    Router::new()
        // Health check routes (no auth required)
        .route("/health", get(health_handler))
        .route("/ready", get(readiness_handler))
        .merge(directory_routes)
        .with_state(state)
        .merge(docs_routes())
}
