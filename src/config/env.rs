//! Environment variable configuration module.
//!
//! Provides environment variable loading and the global `APP_CONFIG` instance.

use std::env;
use std::sync::Once;

use once_cell::sync::Lazy;

static INIT: Once = Once::new();

/// Initializes the environment by loading the .env file.
/// This is called automatically when `get_env` is first used.
fn init_env() {
    INIT.call_once(|| {
        if let Err(e) = dotenvy::dotenv() {
            tracing::warn!("Warning: .env file not found or error loading: {}", e);
        }
    });
}

/// Retrieves an environment variable by key.
///
/// If the variable is not set, returns the provided default value.
/// If no default is provided and the variable is not set, returns an empty string.
pub fn get_env(key: &str, default: Option<&str>) -> String {
    init_env();
    env::var(key).unwrap_or_else(|_| default.unwrap_or("").to_string())
}

/// Retrieves an environment variable as a parsed type.
pub fn get_env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    init_env();
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Retrieves a boolean flag. Accepts `true`/`1`/`yes` (case-insensitive).
pub fn get_env_flag(key: &str, default: bool) -> bool {
    init_env();
    env::var(key).map_or(default, |v| {
        matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
    })
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Server settings
    pub server_port: u16,

    // Environment
    pub is_production: bool,

    // Authentication
    pub api_key: String,

    // Sentry settings
    pub sentry_dsn: String,
    pub sentry_traces_sample_rate: f32,

    // Database settings
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub db_idle_timeout_secs: u64,
    pub db_max_lifetime_secs: u64,

    // Cache settings (empty host disables the cache)
    pub redis_host: String,
    pub redis_port: u16,
    pub redis_password: String,
    pub redis_max_connections: usize,
    pub cache_ttl_secs: u64,

    // CORS settings
    pub cors_origins: String,

    // Rate limiting
    pub rate_limit_per_second: u64,
    pub rate_limit_burst_size: u32,

    // Startup tasks
    pub run_migrations: bool,
    pub seed_demo_data: bool,
}

impl AppConfig {
    /// Creates a new `AppConfig` from environment variables.
    pub fn from_env() -> Self {
        let rust_env = get_env("RUST_ENV", Some("development"));
        let is_production = rust_env == "production" || rust_env == "prod";

        Self {
            server_port: get_env_parsed("SERVER_PORT", 8000),

            is_production,

            api_key: get_env("API_KEY", Some("STATIC_API_KEY")),

            sentry_dsn: get_env("SENTRY_DSN", None),
            sentry_traces_sample_rate: get_env_parsed("SENTRY_TRACES_SAMPLE_RATE", 0.1),

            database_url: get_env("DATABASE_URL", Some("sqlite://orgs.db")),
            db_max_connections: get_env_parsed("DB_MAX_CONNECTIONS", 8),
            db_min_connections: get_env_parsed("DB_MIN_CONNECTIONS", 1),
            db_acquire_timeout_secs: get_env_parsed("DB_ACQUIRE_TIMEOUT_SECS", 5),
            db_idle_timeout_secs: get_env_parsed("DB_IDLE_TIMEOUT_SECS", 600),
            db_max_lifetime_secs: get_env_parsed("DB_MAX_LIFETIME_SECS", 1800),

            redis_host: get_env("REDIS_HOST", None),
            redis_port: get_env_parsed("REDIS_PORT", 6379),
            redis_password: get_env("REDIS_PASSWORD", None),
            redis_max_connections: get_env_parsed("REDIS_MAX_CONNECTIONS", 20),
            cache_ttl_secs: get_env_parsed("CACHE_TTL_SECS", 300),

            cors_origins: get_env("CORS_ORIGINS", Some("*")),

            rate_limit_per_second: get_env_parsed("RATE_LIMIT_PER_SECOND", 10),
            rate_limit_burst_size: get_env_parsed("RATE_LIMIT_BURST_SIZE", 50),

            run_migrations: get_env_flag("RUN_MIGRATIONS", true),
            seed_demo_data: get_env_flag("SEED_DEMO_DATA", false),
        }
    }

    /// Returns true when a Redis host has been configured.
    pub fn cache_enabled(&self) -> bool {
        !self.redis_host.trim().is_empty()
    }
}

/// Global application configuration instance.
pub static APP_CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_env_with_default() {
        let result = get_env("NON_EXISTENT_VAR_FOR_TEST_12345", Some("default_value"));
        assert_eq!(result, "default_value");
    }

    #[test]
    fn test_get_env_no_default() {
        let result = get_env("NON_EXISTENT_VAR_FOR_TEST_67890", None);
        assert_eq!(result, "");
    }

    #[test]
    fn test_get_env_parsed_default_u16() {
        let result: u16 = get_env_parsed("NON_EXISTENT_U16_VAR", 8000);
        assert_eq!(result, 8000);
    }

    #[test]
    fn test_get_env_parsed_default_f32() {
        let result: f32 = get_env_parsed("NON_EXISTENT_F32_VAR", 0.5);
        assert!((result - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_get_env_flag_default() {
        assert!(get_env_flag("NON_EXISTENT_FLAG_TRUE", true));
        assert!(!get_env_flag("NON_EXISTENT_FLAG_FALSE", false));
    }

    #[test]
    fn test_app_config_defaults_are_sane() {
        let config = AppConfig::from_env();

        assert!(config.server_port > 0);
        assert!(!config.api_key.is_empty());
        assert!(!config.database_url.is_empty());
        assert!(config.db_max_connections >= config.db_min_connections);
        assert!(config.cache_ttl_secs > 0);
        assert!(config.rate_limit_per_second > 0);
        assert!(config.rate_limit_burst_size > 0);
    }

    #[test]
    fn test_app_config_default_port_is_8000() {
        if std::env::var("SERVER_PORT").is_err() {
            assert_eq!(AppConfig::from_env().server_port, 8000);
        }
    }

    #[test]
    fn test_cache_disabled_without_host() {
        let mut config = AppConfig::from_env();
        config.redis_host = String::new();
        assert!(!config.cache_enabled());

        config.redis_host = "  ".to_string();
        assert!(!config.cache_enabled());

        config.redis_host = "localhost".to_string();
        assert!(config.cache_enabled());
    }

    #[test]
    fn test_app_config_debug() {
        let config = AppConfig::from_env();
        let debug_str = format!("{config:?}");

        assert!(debug_str.contains("AppConfig"));
        assert!(debug_str.contains("database_url"));
        assert!(debug_str.contains("seed_demo_data"));
    }

    #[test]
    fn test_app_config_sentry_traces_sample_rate_range() {
        let config = AppConfig::from_env();
        assert!(config.sentry_traces_sample_rate >= 0.0);
        assert!(config.sentry_traces_sample_rate <= 1.0);
    }

    #[test]
    fn test_app_config_global_same_instance() {
        let port1 = APP_CONFIG.server_port;
        let port2 = APP_CONFIG.server_port;
        assert_eq!(port1, port2);
    }
}
