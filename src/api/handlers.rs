//! HTTP request handler module.

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use deadpool_redis::{redis::AsyncCommands, Pool as RedisPool};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::api::schemas::{
    organizations_out, ActivityOut, ActivitySearchQuery, LocationQuery, NameQuery,
    OrganizationOut, TreeQuery,
};
use crate::api::state::AppState;
use crate::error::{AppError, AppResult, ErrorResponse, ValidationErrorExt};
use crate::models::{
    ActivityRepository, OrganizationDetails, OrganizationRepository, SEARCH_LEVELS_BELOW,
};

/// Organizations located in a building.
///
/// # Route
///
/// `GET /organizations/by_building/{building_id}`
#[utoipa::path(
    get,
    path = "/organizations/by_building/{building_id}",
    tag = "organizations",
    params(("building_id" = i64, Path, description = "Building id")),
    responses(
        (status = 200, body = [OrganizationOut]),
        (status = 403, body = ErrorResponse),
        (status = 422, body = ErrorResponse),
    ),
    security(("api_key" = []))
)]
#[tracing::instrument(skip(state, path))]
pub async fn organizations_by_building_handler(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<Vec<OrganizationOut>>> {
    let Path(building_id) = path?;

    let organizations = OrganizationRepository::list_by_building(&state.db, building_id).await?;
    Ok(Json(organizations_out(organizations)))
}

/// Organizations directly linked to an activity.
///
/// # Route
///
/// `GET /organizations/by_activity/{activity_id}`
#[utoipa::path(
    get,
    path = "/organizations/by_activity/{activity_id}",
    tag = "organizations",
    params(("activity_id" = i64, Path, description = "Activity id")),
    responses(
        (status = 200, body = [OrganizationOut]),
        (status = 403, body = ErrorResponse),
        (status = 422, body = ErrorResponse),
    ),
    security(("api_key" = []))
)]
pub async fn organizations_by_activity_handler(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<Vec<OrganizationOut>>> {
    let Path(activity_id) = path?;

    let organizations =
        OrganizationRepository::list_by_activities(&state.db, &[activity_id]).await?;
    Ok(Json(organizations_out(organizations)))
}

/// Organizations in buildings within a radius of a point.
///
/// # Route
///
/// `GET /organizations/by_location?lat=..&lon=..&radius=..`
#[utoipa::path(
    get,
    path = "/organizations/by_location",
    tag = "organizations",
    params(LocationQuery),
    responses(
        (status = 200, body = [OrganizationOut]),
        (status = 403, body = ErrorResponse),
        (status = 422, body = ErrorResponse),
    ),
    security(("api_key" = []))
)]
#[tracing::instrument(skip(state, query))]
pub async fn organizations_by_location_handler(
    State(state): State<AppState>,
    query: Result<Query<LocationQuery>, QueryRejection>,
) -> AppResult<Json<Vec<OrganizationOut>>> {
    let Query(query) = query?;
    query.validate().map_err(|e| e.to_validation_error())?;

    let organizations =
        OrganizationRepository::list_within_radius(&state.db, query.lat, query.lon, query.radius)
            .await?;

    tracing::debug!(
        lat = query.lat,
        lon = query.lon,
        radius = query.radius,
        found = organizations.len(),
        "Location search finished"
    );

    Ok(Json(organizations_out(organizations)))
}

/// Case-insensitive search by organization name.
///
/// # Route
///
/// `GET /organizations/search?name=..`
#[utoipa::path(
    get,
    path = "/organizations/search",
    tag = "organizations",
    params(NameQuery),
    responses(
        (status = 200, body = [OrganizationOut]),
        (status = 403, body = ErrorResponse),
        (status = 422, body = ErrorResponse),
    ),
    security(("api_key" = []))
)]
pub async fn organizations_by_name_handler(
    State(state): State<AppState>,
    query: Result<Query<NameQuery>, QueryRejection>,
) -> AppResult<Json<Vec<OrganizationOut>>> {
    let Query(query) = query?;
    query.validate().map_err(|e| e.to_validation_error())?;

    let organizations = OrganizationRepository::search_by_name(&state.db, &query.name).await?;
    Ok(Json(organizations_out(organizations)))
}

/// Single organization by id.
///
/// Served from the Redis cache when one is configured.
///
/// # Route
///
/// `GET /organizations/{org_id}`
#[utoipa::path(
    get,
    path = "/organizations/{org_id}",
    tag = "organizations",
    params(("org_id" = i64, Path, description = "Organization id")),
    responses(
        (status = 200, body = OrganizationOut),
        (status = 403, body = ErrorResponse),
        (status = 404, body = ErrorResponse),
        (status = 422, body = ErrorResponse),
    ),
    security(("api_key" = []))
)]
#[tracing::instrument(skip(state, path))]
pub async fn get_organization_handler(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<OrganizationOut>> {
    let Path(org_id) = path?;
    let cache_key = organization_cache_key(org_id);

    if let Some(cache) = &state.cache {
        if let Some(details) = read_cached(cache, &cache_key).await {
            if details.id == org_id {
                return Ok(Json(details.into()));
            }
        }
    }

    let details = OrganizationRepository::find_by_id(&state.db, org_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;

    if let Some(cache) = &state.cache {
        write_cached(cache, &cache_key, &details, state.cache_ttl_secs).await;
    }

    Ok(Json(details.into()))
}

/// Organizations linked to an activity or its descendants (two levels down).
///
/// # Route
///
/// `GET /activities/search?activity_id=..`
#[utoipa::path(
    get,
    path = "/activities/search",
    tag = "activities",
    params(ActivitySearchQuery),
    responses(
        (status = 200, body = [OrganizationOut]),
        (status = 403, body = ErrorResponse),
        (status = 422, body = ErrorResponse),
    ),
    security(("api_key" = []))
)]
#[tracing::instrument(skip(state, query))]
pub async fn search_by_activity_tree_handler(
    State(state): State<AppState>,
    query: Result<Query<ActivitySearchQuery>, QueryRejection>,
) -> AppResult<Json<Vec<OrganizationOut>>> {
    let Query(query) = query?;

    let activity_ids =
        ActivityRepository::subtree_ids(&state.db, query.activity_id, SEARCH_LEVELS_BELOW).await?;
    tracing::debug!(root = query.activity_id, ids = ?activity_ids, "Resolved activity subtree");

    let organizations =
        OrganizationRepository::list_by_activities(&state.db, &activity_ids).await?;
    Ok(Json(organizations_out(organizations)))
}

/// Flattened activity tree limited to `max_depth` levels.
///
/// # Route
///
/// `GET /activities/tree?max_depth=3`
#[utoipa::path(
    get,
    path = "/activities/tree",
    tag = "activities",
    params(TreeQuery),
    responses(
        (status = 200, body = [ActivityOut]),
        (status = 403, body = ErrorResponse),
        (status = 422, body = ErrorResponse),
    ),
    security(("api_key" = []))
)]
pub async fn activity_tree_handler(
    State(state): State<AppState>,
    query: Result<Query<TreeQuery>, QueryRejection>,
) -> AppResult<Json<Vec<ActivityOut>>> {
    let Query(query) = query?;
    query.validate().map_err(|e| e.to_validation_error())?;

    let tree = ActivityRepository::load_tree(&state.db).await?;
    let activities = tree
        .flatten(query.max_depth)
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(activities))
}

/// Cache key for a single organization.
fn organization_cache_key(org_id: i64) -> String {
    format!("organizations:{org_id}")
}

/// Reads an organization from the cache. Cache faults are logged and treated as misses.
async fn read_cached(cache: &RedisPool, key: &str) -> Option<OrganizationDetails> {
    let mut conn = match cache.get().await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::warn!(cache_key = %key, error = %e, "Redis connection error, bypassing cache");
            return None;
        }
    };

    match conn.get::<_, Option<Vec<u8>>>(key).await {
        Ok(Some(bytes)) => match rmp_serde::from_slice::<OrganizationDetails>(&bytes) {
            Ok(details) => Some(details),
            Err(e) => {
                tracing::warn!(cache_key = %key, error = %e, "Discarding undecodable cache entry");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(cache_key = %key, error = %e, "Redis read failed");
            None
        }
    }
}

/// Stores an organization in the cache (MessagePack). Failures are logged only.
async fn write_cached(cache: &RedisPool, key: &str, details: &OrganizationDetails, ttl_secs: u64) {
    let data = match rmp_serde::to_vec(details) {
        Ok(data) => data,
        Err(e) => {
            tracing::error!(cache_key = %key, error = %e, "Failed to serialize organization for cache");
            return;
        }
    };

    let mut conn = match cache.get().await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::warn!(cache_key = %key, error = %e, "Redis connection error, not caching");
            return;
        }
    };

    let result: Result<(), deadpool_redis::redis::RedisError> =
        conn.set_ex(key, data, ttl_secs).await;
    if let Err(e) = result {
        tracing::error!(
            cache_key = %key,
            error = %e,
            "Failed to cache organization - DB load may increase"
        );
    }
}

/// Health check response.
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Liveness probe handler.
///
/// # Route
///
/// `GET /health`
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness check response.
#[derive(Serialize, ToSchema)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub cache: &'static str,
}

/// Readiness probe handler.
///
/// Checks database and, when configured, cache connectivity.
///
/// # Route
///
/// `GET /ready`
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, body = ReadinessResponse),
        (status = 503, body = ReadinessResponse),
    )
)]
pub async fn readiness_handler(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let db_ok = sqlx::query("SELECT 1").fetch_one(&state.db).await.is_ok();

    let cache = match &state.cache {
        None => "disabled",
        Some(pool) if pool.get().await.is_ok() => "connected",
        Some(_) => "disconnected",
    };
    let cache_ok = cache != "disconnected";

    let response = ReadinessResponse {
        status: if db_ok && cache_ok { "ok" } else { "degraded" },
        database: if db_ok { "connected" } else { "disconnected" },
        cache,
    };

    if db_ok && cache_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_organization_cache_key() {
        assert_eq!(organization_cache_key(42), "organizations:42");
    }

    #[tokio::test]
    async fn test_health_handler_returns_ok() {
        let response = health_handler().await;
        assert_eq!(response.status, "ok");
        assert!(!response.version.is_empty());
    }

    #[test]
    fn test_readiness_response_serialize() {
        let response = ReadinessResponse {
            status: "ok",
            database: "connected",
            cache: "disabled",
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("connected"));
        assert!(json.contains("disabled"));
    }
}
