//! OpenAPI document and the interactive documentation routes.

use axum::Router;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_redoc::{Redoc, Servable};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::handlers::{self, HealthResponse, ReadinessResponse};
use crate::api::middlewares::API_KEY_HEADER;
use crate::api::schemas::{ActivityOut, BuildingOut, OrganizationOut};
use crate::error::ErrorResponse;

/// Path of the generated OpenAPI document.
pub const OPENAPI_PATH: &str = "/openapi.json";

#[derive(OpenApi)]
#[openapi(
    info(title = "Organizations Directory API"),
    paths(
        handlers::organizations_by_building_handler,
        handlers::organizations_by_activity_handler,
        handlers::organizations_by_location_handler,
        handlers::organizations_by_name_handler,
        handlers::get_organization_handler,
        handlers::search_by_activity_tree_handler,
        handlers::activity_tree_handler,
        handlers::health_handler,
        handlers::readiness_handler,
    ),
    components(schemas(
        OrganizationOut,
        BuildingOut,
        ActivityOut,
        ErrorResponse,
        HealthResponse,
        ReadinessResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "organizations", description = "Organization lookups"),
        (name = "activities", description = "Activity catalogue"),
        (name = "health", description = "Probes"),
    )
)]
pub struct ApiDoc;

/// Registers the `X-API-Key` header scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_key",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(API_KEY_HEADER))),
        );
    }
}

/// Swagger UI at `/docs`, ReDoc at `/redoc` and the raw document.
pub fn docs_routes() -> Router {
    let openapi = ApiDoc::openapi();

    Router::new()
        .merge(SwaggerUi::new("/docs").url(OPENAPI_PATH, openapi.clone()))
        .merge(Redoc::with_url("/redoc", openapi))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_directory_paths() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        for expected in [
            "/organizations/by_building/{building_id}",
            "/organizations/by_activity/{activity_id}",
            "/organizations/by_location",
            "/organizations/search",
            "/organizations/{org_id}",
            "/activities/search",
            "/activities/tree",
        ] {
            assert!(
                paths.iter().any(|p| p.as_str() == expected),
                "missing path {expected}"
            );
        }
    }

    #[test]
    fn test_openapi_has_api_key_scheme() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_value(&doc).unwrap();

        assert_eq!(
            json["components"]["securitySchemes"]["api_key"]["name"],
            API_KEY_HEADER
        );
        assert_eq!(json["info"]["title"], "Organizations Directory API");
    }
}
