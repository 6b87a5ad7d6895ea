/// Configuration management for the clinic backend
use crate::error::{ClinicError, ClinicResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
    /// Maximum request body size in bytes
    pub upload_limit: usize,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
    /// Insert demo accounts and appointments into an empty database on startup
    pub seed_demo: bool,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Lifetime in seconds of tokens issued by the login endpoint
    pub token_ttl: i64,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Requests per second for requests carrying a bearer token
    pub authenticated_rps: u32,
    /// Requests per second for anonymous requests (login, register, health)
    pub unauthenticated_rps: u32,
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            authenticated_rps: 100,
            unauthenticated_rps: 10,
            burst_size: 50,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ClinicResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("CLINIC_HOSTNAME").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("CLINIC_PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .map_err(|_| ClinicError::Validation("Invalid port number".to_string()))?;
        let version = env::var("CLINIC_VERSION")
            .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());
        let upload_limit = env::var("CLINIC_UPLOAD_LIMIT")
            .unwrap_or_else(|_| "16777216".to_string())
            .parse()
            .unwrap_or(16 * 1024 * 1024);

        let data_directory: PathBuf = env::var("CLINIC_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database = env::var("CLINIC_DATABASE_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("clinic.sqlite"));
        let seed_demo = env::var("CLINIC_SEED_DEMO")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        let jwt_secret = env::var("CLINIC_JWT_SECRET")
            .map_err(|_| ClinicError::Validation("JWT secret required".to_string()))?;
        let token_ttl = env::var("CLINIC_TOKEN_TTL")
            .unwrap_or_else(|_| "86400".to_string())
            .parse()
            .unwrap_or(86400);

        let defaults = RateLimitConfig::default();
        let rate_limit_enabled = env::var("CLINIC_RATE_LIMITS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);
        let authenticated_rps = env::var("CLINIC_RATE_LIMIT_AUTHENTICATED_RPS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.authenticated_rps);
        let unauthenticated_rps = env::var("CLINIC_RATE_LIMIT_UNAUTHENTICATED_RPS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.unauthenticated_rps);
        let burst_size = env::var("CLINIC_RATE_LIMIT_BURST")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.burst_size);

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
                upload_limit,
            },
            storage: StorageConfig {
                data_directory,
                database,
                seed_demo,
            },
            authentication: AuthConfig {
                jwt_secret,
                token_ttl,
            },
            rate_limit: RateLimitConfig {
                enabled: rate_limit_enabled,
                authenticated_rps,
                unauthenticated_rps,
                burst_size,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> ClinicResult<()> {
        if self.service.hostname.is_empty() {
            return Err(ClinicError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(ClinicError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.authentication.token_ttl <= 0 {
            return Err(ClinicError::Validation(
                "Token lifetime must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// Minimal configuration shared by unit tests
#[cfg(test)]
pub fn test_config() -> ServerConfig {
    ServerConfig {
        service: ServiceConfig {
            hostname: "localhost".to_string(),
            port: 5000,
            version: "0.1.0".to_string(),
            upload_limit: 16 * 1024 * 1024,
        },
        storage: StorageConfig {
            data_directory: PathBuf::from("./data"),
            database: PathBuf::from(":memory:"),
            seed_demo: false,
        },
        authentication: AuthConfig {
            jwt_secret: "test-secret-key-for-testing-only".to_string(),
            token_ttl: 86400,
        },
        rate_limit: RateLimitConfig {
            enabled: false,
            ..RateLimitConfig::default()
        },
        logging: LoggingConfig {
            level: "info".to_string(),
        },
    }
}
