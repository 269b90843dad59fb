//! Application state module.
//!
//! Contains shared state for database and cache connections.

use std::sync::Arc;

use deadpool_redis::Pool as RedisPool;
use sqlx::SqlitePool;

/// Shared application state.
///
/// This struct holds references to shared resources like database
/// and cache connections that handlers need access to.
#[derive(Clone)]
pub struct AppState {
    /// `SQLite` connection pool
    pub db: SqlitePool,
    /// Redis connection pool, `None` when caching is disabled
    pub cache: Option<RedisPool>,
    /// Expected value of the `X-API-Key` header
    pub api_key: Arc<str>,
    /// Lifetime of cached organizations
    pub cache_ttl_secs: u64,
}

impl AppState {
    /// Creates a new `AppState` instance.
    #[must_use]
    pub fn new(
        db: SqlitePool,
        cache: Option<RedisPool>,
        api_key: impl Into<Arc<str>>,
        cache_ttl_secs: u64,
    ) -> Self {
        Self {
            db,
            cache,
            api_key: api_key.into(),
            cache_ttl_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone + Send + Sync>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn test_app_state_struct_size() {
        // Pools are Arc based so the state stays small
        let size = std::mem::size_of::<AppState>();
        assert!(size > 0);
        assert!(size < 256);
    }
}
