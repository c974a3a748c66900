use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEV_JWT_SECRET: &str = "development-only-jwt-secret";
const BCRYPT_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub storage: StorageConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }

    fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        }
    }

    /// Reads `APP_ENV`, falling back to `NODE_ENV` for existing deployments.
    pub fn from_env() -> Self {
        Self::parse(env::var("APP_ENV").or_else(|_| env::var("NODE_ENV")).ok().as_deref())
    }

    /// Like [`Environment::from_env`], but when the process sets neither
    /// variable the dotenv file at `path` is consulted without loading it.
    pub fn resolve(path: impl AsRef<Path>) -> Self {
        match env::var("APP_ENV").or_else(|_| env::var("NODE_ENV")) {
            Ok(raw) => Self::parse(Some(&raw)),
            Err(_) => Self::parse(dotenv_environment(path.as_ref()).as_deref()),
        }
    }
}

/// `APP_ENV`, else `NODE_ENV`, as written in a dotenv file.
fn dotenv_environment(path: &Path) -> Option<String> {
    let mut node_env = None;
    for (key, value) in dotenvy::from_path_iter(path).ok()?.flatten() {
        match key.as_str() {
            "APP_ENV" => return Some(value),
            "NODE_ENV" => {
                node_env.get_or_insert(value);
            }
            _ => {}
        }
    }
    node_env
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    pub port: u16,
    pub api_prefix: String,
    pub frontend_url: Option<String>,
    pub protected_routes_path: PathBuf,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub slow_query_threshold_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub cookie_domain: Option<String>,
    pub secure_cookies: bool,
    pub bcrypt_cost: u32,
    pub min_password_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    #[serde(skip_serializing)]
    pub secret_access_key: Option<String>,
    pub endpoint: Option<String>,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub max_file_size_bytes: usize,
    pub allowed_mime_types: Vec<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = Environment::from_env();

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("APP_BACKEND_NAME") {
            self.server.name = v;
        }
        if let Some(v) = env::var("APP_BACKEND_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("APP_API_PREFIX") {
            self.server.api_prefix = v;
        }
        if let Ok(v) = env::var("APP_FRONTEND_URL") {
            self.server.frontend_url = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("PROTECTED_ROUTES_PATH") {
            self.server.protected_routes_path = PathBuf::from(v);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.server.max_request_size_bytes = v.parse().unwrap_or(self.server.max_request_size_bytes);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout_secs = v.parse().unwrap_or(self.database.connection_timeout_secs);
        }
        if let Ok(v) = env::var("DATABASE_IDLE_TIMEOUT") {
            self.database.idle_timeout_secs = v.parse().unwrap_or(self.database.idle_timeout_secs);
        }
        if let Ok(v) = env::var("DATABASE_MAX_RETRIES") {
            self.database.max_retries = v.parse().unwrap_or(self.database.max_retries);
        }
        if let Ok(v) = env::var("DATABASE_RETRY_DELAY_MS") {
            self.database.retry_delay_ms = v.parse().unwrap_or(self.database.retry_delay_ms);
        }
        if let Ok(v) = env::var("DATABASE_SLOW_QUERY_THRESHOLD_MS") {
            self.database.slow_query_threshold_ms = v.parse().unwrap_or(self.database.slow_query_threshold_ms);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET_KEY") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("COOKIE_DOMAIN") {
            self.security.cookie_domain = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("COOKIE_SECURE") {
            self.security.secure_cookies = v.parse().unwrap_or(self.security.secure_cookies);
        }
        if let Ok(v) = env::var("BCRYPT_COST") {
            self.security.bcrypt_cost = v.parse().unwrap_or(self.security.bcrypt_cost);
        }

        // Storage overrides
        let var = |name: &str| env::var(name).ok().filter(|s| !s.is_empty());
        self.storage.bucket = var("AWS_BUCKET_NAME").or(self.storage.bucket);
        self.storage.region = var("AWS_REGION").or(self.storage.region);
        self.storage.access_key_id = var("AWS_ACCESS_KEY_ID").or(self.storage.access_key_id);
        self.storage.secret_access_key = var("AWS_SECRET_ACCESS_KEY").or(self.storage.secret_access_key);
        self.storage.endpoint = var("AWS_S3_ENDPOINT").or(self.storage.endpoint);

        // Upload overrides
        if let Ok(v) = env::var("UPLOAD_MAX_FILE_SIZE_BYTES") {
            self.upload.max_file_size_bytes = v.parse().unwrap_or(self.upload.max_file_size_bytes);
        }

        self
    }

    /// Checks the values the server cannot start without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        if self.server.name.trim().is_empty() {
            return Err(ConfigError::Missing("APP_BACKEND_NAME"));
        }
        if self.server.port == 0 {
            return Err(ConfigError::Invalid {
                field: "APP_BACKEND_PORT",
                reason: "port must be between 1 and 65535".to_string(),
            });
        }
        if self.security.jwt_secret.is_empty()
            || (self.environment == Environment::Production && self.security.jwt_secret == DEV_JWT_SECRET)
        {
            return Err(ConfigError::Missing("JWT_SECRET_KEY"));
        }
        if !BCRYPT_COST_RANGE.contains(&self.security.bcrypt_cost) {
            return Err(ConfigError::Invalid {
                field: "BCRYPT_COST",
                reason: format!(
                    "must be between {} and {}",
                    BCRYPT_COST_RANGE.start(),
                    BCRYPT_COST_RANGE.end()
                ),
            });
        }
        if !self.server.api_prefix.is_empty() && !self.server.api_prefix.starts_with('/') {
            return Err(ConfigError::Invalid {
                field: "APP_API_PREFIX",
                reason: "must start with '/'".to_string(),
            });
        }
        Ok(())
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                name: "Recruitment Agent Backend API".to_string(),
                port: 2500,
                api_prefix: "/api/v1".to_string(),
                frontend_url: None,
                protected_routes_path: PathBuf::from("data/protected-routes.json"),
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout_secs: 5,
                idle_timeout_secs: 30,
                max_retries: 5,
                retry_delay_ms: 2000,
                slow_query_threshold_ms: 500,
            },
            security: SecurityConfig {
                jwt_secret: DEV_JWT_SECRET.to_string(),
                jwt_expiry_hours: 1,
                cookie_domain: None,
                secure_cookies: false,
                bcrypt_cost: 10,
                min_password_length: 8,
            },
            storage: StorageConfig {
                bucket: None,
                region: None,
                access_key_id: None,
                secret_access_key: None,
                endpoint: None,
                max_attempts: 3,
            },
            upload: UploadConfig {
                max_file_size_bytes: 5 * 1024 * 1024, // 5MB
                allowed_mime_types: vec!["image/jpeg".to_string(), "image/png".to_string()],
            },
        }
    }

    pub fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.server.max_request_size_bytes = 8 * 1024 * 1024;
        config.security.secure_cookies = true;
        config
    }

    pub fn production() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Production;
        config.server.max_request_size_bytes = 8 * 1024 * 1024;
        config.security.secure_cookies = true;
        config
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_environment_from_dotenv_file() {
        let path = env::temp_dir().join(format!("recruit-api-{}.env", uuid::Uuid::new_v4()));
        std::fs::write(&path, "PORT=2600\nNODE_ENV=production\nAPP_ENV=staging\n").unwrap();
        assert_eq!(dotenv_environment(&path).as_deref(), Some("staging"));

        std::fs::write(&path, "NODE_ENV=production\n").unwrap();
        assert_eq!(dotenv_environment(&path).as_deref(), Some("production"));
        std::fs::remove_file(&path).unwrap();

        assert_eq!(dotenv_environment(&path), None);
        assert_eq!(Environment::parse(Some("prod")), Environment::Production);
        assert_eq!(Environment::parse(None), Environment::Development);
    }

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.server.port, 2500);
        assert_eq!(config.server.api_prefix, "/api/v1");
        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.database.max_retries, 5);
        assert!(!config.security.secure_cookies);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(config.is_production());
        assert!(config.security.secure_cookies);
        assert_eq!(config.security.jwt_expiry_hours, 1);
    }

    #[test]
    fn validate_requires_database_url() {
        let config = AppConfig::development();
        assert_eq!(config.validate(), Err(ConfigError::Missing("DATABASE_URL")));

        let mut config = AppConfig::development();
        config.database.url = Some("postgres://localhost/recruit".to_string());
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_development_secret_in_production() {
        let mut config = AppConfig::production();
        config.database.url = Some("postgres://localhost/recruit".to_string());
        assert_eq!(config.validate(), Err(ConfigError::Missing("JWT_SECRET_KEY")));

        config.security.jwt_secret = "a-real-secret".to_string();
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn validate_checks_api_prefix() {
        let mut config = AppConfig::development();
        config.database.url = Some("postgres://localhost/recruit".to_string());
        config.server.api_prefix = "api".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field: "APP_API_PREFIX", .. })));
    }
}
