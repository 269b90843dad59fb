//! Redis cache configuration module.

use deadpool_redis::{Config, Pool, PoolConfig, Runtime};
use once_cell::sync::OnceCell;

use crate::config::env::APP_CONFIG;
use crate::error::{AppError, AppResult};

static CACHE_POOL: OnceCell<Pool> = OnceCell::new();

/// Builds the Redis connection URL from host, port and optional password.
pub fn redis_url(host: &str, port: u16, password: &str) -> String {
    if password.is_empty() {
        format!("redis://{host}:{port}")
    } else {
        format!("redis://:{password}@{host}:{port}")
    }
}

/// Initializes the Redis connection pool.
///
/// Returns `Ok(None)` when no Redis host is configured; the service then
/// runs without a cache.
///
/// # Errors
///
/// Returns an error if a host is configured but the connection cannot be established
pub async fn init_cache() -> AppResult<Option<Pool>> {
    if let Some(pool) = CACHE_POOL.get() {
        return Ok(Some(pool.clone()));
    }

    if !APP_CONFIG.cache_enabled() {
        tracing::info!("REDIS_HOST not set, organization cache disabled");
        return Ok(None);
    }

    let url = redis_url(
        &APP_CONFIG.redis_host,
        APP_CONFIG.redis_port,
        &APP_CONFIG.redis_password,
    );

    let mut cfg = Config::from_url(url);
    cfg.pool = Some(PoolConfig {
        max_size: APP_CONFIG.redis_max_connections,
        ..PoolConfig::default()
    });

    let pool = cfg
        .create_pool(Some(Runtime::Tokio1))
        .map_err(|e| AppError::Internal(format!("Redis pool error: {e}")))?;

    // Test connection
    let conn = pool.get().await?;
    drop(conn);

    CACHE_POOL.set(pool.clone()).ok();
    tracing::info!(
        max_connections = APP_CONFIG.redis_max_connections,
        ttl_secs = APP_CONFIG.cache_ttl_secs,
        "Redis connection pool established"
    );

    Ok(Some(pool))
}

/// Closes the Redis connection pool.
pub fn close_cache() {
    if let Some(pool) = CACHE_POOL.get() {
        pool.close();
        tracing::info!("Redis connection pool closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_url_without_password() {
        assert_eq!(redis_url("localhost", 6379, ""), "redis://localhost:6379");
    }

    #[test]
    fn test_redis_url_with_password() {
        assert_eq!(
            redis_url("cache.internal", 6380, "s3cret"),
            "redis://:s3cret@cache.internal:6380"
        );
    }
}
