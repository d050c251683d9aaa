use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::database::{PoolConfig, RetryPolicy};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub filter: FilterConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    pub max_limit: Option<u32>,
    pub debug_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(skip_serializing)]
    pub url: String,
    pub min_connections: u32,
    pub max_connections: u32,
    pub idle_timeout_secs: u64,
    pub acquire_timeout_secs: u64,
    pub statement_timeout_ms: u64,
    pub max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub enable_slow_query_warning: bool,
    pub slow_query_threshold_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub enable_audit_logging: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        Self::preset(environment).with_overrides(|key| env::var(key).ok())
    }

    pub fn preset(environment: Environment) -> Self {
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
    }

    /// Apply per-key overrides. Values that fail to parse keep the preset.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        fn set<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut T) {
            if let Some(parsed) = lookup(key).and_then(|v| v.trim().parse().ok()) {
                *slot = parsed;
            }
        }

        // Filter overrides
        if let Some(v) = lookup("FILTER_MAX_LIMIT") {
            match v.trim() {
                "none" | "0" => self.filter.max_limit = None,
                other => {
                    if let Ok(limit) = other.parse() {
                        self.filter.max_limit = Some(limit);
                    }
                }
            }
        }
        set(&lookup, "FILTER_DEBUG_LOGGING", &mut self.filter.debug_logging);

        // Database overrides
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
        }
        let db = &mut self.database;
        set(&lookup, "DATABASE_MIN_CONNECTIONS", &mut db.min_connections);
        set(&lookup, "DATABASE_MAX_CONNECTIONS", &mut db.max_connections);
        set(&lookup, "DATABASE_IDLE_TIMEOUT_SECS", &mut db.idle_timeout_secs);
        set(&lookup, "DATABASE_ACQUIRE_TIMEOUT_SECS", &mut db.acquire_timeout_secs);
        set(&lookup, "DATABASE_STATEMENT_TIMEOUT_MS", &mut db.statement_timeout_ms);
        set(&lookup, "DATABASE_MAX_ATTEMPTS", &mut db.max_attempts);
        set(&lookup, "DATABASE_RETRY_BASE_DELAY_MS", &mut db.retry_base_delay_ms);
        set(&lookup, "DATABASE_RETRY_MAX_DELAY_MS", &mut db.retry_max_delay_ms);
        set(&lookup, "DATABASE_ENABLE_SLOW_QUERY_WARNING", &mut db.enable_slow_query_warning);
        set(&lookup, "DATABASE_SLOW_QUERY_THRESHOLD_MS", &mut db.slow_query_threshold_ms);

        // API overrides
        set(&lookup, "API_PORT", &mut self.api.port);
        set(&lookup, "API_MAX_REQUEST_SIZE_BYTES", &mut self.api.max_request_size_bytes);

        // Security overrides
        set(&lookup, "SECURITY_ENABLE_CORS", &mut self.security.enable_cors);
        if let Some(v) = lookup("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(secret) = lookup("SECURITY_JWT_SECRET") {
            self.security.jwt_secret = secret;
        }
        set(&lookup, "SECURITY_ENABLE_AUDIT_LOGGING", &mut self.security.enable_audit_logging);

        self
    }

    pub fn pool_config(&self) -> PoolConfig {
        let db = &self.database;
        PoolConfig {
            url: db.url.clone(),
            min_connections: db.min_connections,
            max_connections: db.max_connections.max(1),
            idle_timeout: Duration::from_secs(db.idle_timeout_secs),
            acquire_timeout: Duration::from_secs(db.acquire_timeout_secs),
            statement_timeout: Duration::from_millis(db.statement_timeout_ms),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let db = &self.database;
        RetryPolicy {
            max_attempts: db.max_attempts.max(1),
            base_delay: Duration::from_millis(db.retry_base_delay_ms),
            max_delay: Duration::from_millis(db.retry_max_delay_ms),
        }
    }

    pub fn slow_query_threshold(&self) -> Option<Duration> {
        self.database
            .enable_slow_query_warning
            .then(|| Duration::from_millis(self.database.slow_query_threshold_ms))
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            filter: FilterConfig {
                max_limit: Some(1000),
                debug_logging: true,
            },
            database: DatabaseConfig {
                url: "postgres://localhost:5432/carelink".to_string(),
                min_connections: 1,
                max_connections: 10,
                idle_timeout_secs: 300,
                acquire_timeout_secs: 30,
                statement_timeout_ms: 30_000,
                max_attempts: 3,
                retry_base_delay_ms: 100,
                retry_max_delay_ms: 2_000,
                enable_slow_query_warning: true,
                slow_query_threshold_ms: 100,
            },
            api: ApiConfig {
                port: 3000,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                jwt_secret: String::new(),
                enable_audit_logging: false,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            filter: FilterConfig {
                max_limit: Some(500),
                debug_logging: false,
            },
            database: DatabaseConfig {
                url: String::new(),
                min_connections: 2,
                max_connections: 20,
                idle_timeout_secs: 300,
                acquire_timeout_secs: 10,
                statement_timeout_ms: 15_000,
                max_attempts: 3,
                retry_base_delay_ms: 100,
                retry_max_delay_ms: 2_000,
                enable_slow_query_warning: true,
                slow_query_threshold_ms: 500,
            },
            api: ApiConfig {
                port: 3000,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.carelink.example".to_string()],
                jwt_secret: String::new(),
                enable_audit_logging: true,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            filter: FilterConfig {
                max_limit: Some(100),
                debug_logging: false,
            },
            database: DatabaseConfig {
                url: String::new(),
                min_connections: 5,
                max_connections: 50,
                idle_timeout_secs: 600,
                acquire_timeout_secs: 5,
                statement_timeout_ms: 10_000,
                max_attempts: 4,
                retry_base_delay_ms: 50,
                retry_max_delay_ms: 1_000,
                enable_slow_query_warning: true,
                slow_query_threshold_ms: 1000,
            },
            api: ApiConfig {
                port: 8080,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.carelink.example".to_string()],
                jwt_secret: String::new(),
                enable_audit_logging: true,
            },
        }
    }
}

// Global singleton config - read by the binaries only
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}
