/// Application context and dependency injection
use crate::{
    account::AccountManager,
    appointment::AppointmentManager,
    config::ServerConfig,
    crypto::TokenIssuer,
    db,
    error::{ClinicError, ClinicResult},
    medical_record::RecordManager,
    rate_limit::RateLimiter,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub account_manager: Arc<AccountManager>,
    pub appointment_manager: Arc<AppointmentManager>,
    pub record_manager: Arc<RecordManager>,
    pub tokens: Arc<TokenIssuer>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> ClinicResult<Self> {
        config.validate()?;

        Self::ensure_directories(&config).await?;

        let db = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;

        db::run_migrations(&db).await?;

        db::test_connection(&db).await?;

        let ctx = Self::from_pool(config, db);

        if ctx.config.storage.seed_demo {
            db::seed::seed_demo(&ctx).await?;
        }

        Ok(ctx)
    }

    /// Wire services around an already migrated pool
    pub fn from_pool(config: ServerConfig, db: SqlitePool) -> Self {
        let account_manager = Arc::new(AccountManager::new(db.clone()));
        let appointment_manager = Arc::new(AppointmentManager::new(db.clone()));
        let record_manager = Arc::new(RecordManager::new(db.clone()));
        let tokens = Arc::new(TokenIssuer::new(&config.authentication));
        let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit));

        Self {
            config: Arc::new(config),
            db,
            account_manager,
            appointment_manager,
            record_manager,
            tokens,
            rate_limiter,
        }
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> ClinicResult<()> {
        let dir = &config.storage.data_directory;
        if !dir.exists() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                ClinicError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
            })?;
        }

        Ok(())
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}

/// Context over a fresh in-memory database
#[cfg(test)]
pub async fn test_context() -> AppContext {
    let pool = db::create_memory_pool().await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    AppContext::from_pool(crate::config::test_config(), pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    #[tokio::test]
    async fn test_new_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config();
        config.storage.data_directory = dir.path().join("data");
        config.storage.database = dir.path().join("data").join("clinic.sqlite");

        let ctx = AppContext::new(config).await.unwrap();

        assert!(ctx.config.storage.database.exists());
        assert_eq!(ctx.account_manager.count_accounts().await.unwrap(), 0);
        assert_eq!(ctx.service_url(), "http://localhost:5000");
    }

    #[tokio::test]
    async fn test_new_rejects_invalid_config() {
        let mut config = test_config();
        config.authentication.jwt_secret = "short".to_string();

        assert!(matches!(
            AppContext::new(config).await,
            Err(ClinicError::Validation(_))
        ));
    }
}
