use std::future::Future;
use std::time::{Duration, Instant};

use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::DatabaseConfig;

/// Errors from the database layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// How often and how patiently failed queries are retried.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub slow_threshold: Duration,
}

impl From<&DatabaseConfig> for RetryPolicy {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            delay: Duration::from_millis(config.retry_delay_ms),
            slow_threshold: Duration::from_millis(config.slow_query_threshold_ms),
        }
    }
}

/// Shared Postgres pool plus the retry policy every repository query runs under.
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
    retry: RetryPolicy,
}

impl Database {
    /// Builds the pool without opening a connection; call
    /// [`Database::test_connection`] to fail fast at startup.
    pub fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let url = config
            .url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;
        url::Url::parse(url).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .connect_lazy(url)?;

        Ok(Self::from_pool(pool, RetryPolicy::from(config)))
    }

    pub fn from_pool(pool: PgPool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs `op`, retrying transient failures (I/O, pool timeouts) and
    /// warning when the whole operation is slow.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, DatabaseError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        let started = Instant::now();
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => {
                    let elapsed = started.elapsed();
                    if elapsed > self.retry.slow_threshold {
                        warn!("Slow query detected ({}): {}ms", label, elapsed.as_millis());
                    }
                    return Ok(value);
                }
                Err(e) if is_transient(&e) && attempt < self.retry.max_attempts => {
                    error!(
                        "Query failed ({}), attempt {} of {}: {}",
                        label, attempt, self.retry.max_attempts, e
                    );
                    tokio::time::sleep(self.retry.delay).await;
                    attempt += 1;
                }
                Err(e) if is_transient(&e) => {
                    error!("Query failed ({}) after {} attempts: {}", label, attempt, e);
                    return Err(DatabaseError::Unavailable(e.to_string()));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Startup check; the server refuses to start when this fails.
    pub async fn test_connection(&self) -> Result<(), DatabaseError> {
        let now: chrono::DateTime<chrono::Utc> = sqlx::query_scalar("SELECT NOW()")
            .fetch_one(&self.pool)
            .await?;
        info!("Database connected, server time {}", now);
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed database pool");
    }
}

fn is_transient(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::Protocol(_) | sqlx::Error::Tls(_)
    )
}
