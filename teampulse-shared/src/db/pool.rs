/// PostgreSQL connection pool
///
/// Builds the shared `PgPool` used by every request handler. A `SELECT 1`
/// probe runs right after connecting so a misconfigured `DATABASE_URL`
/// fails at startup rather than on the first request.
///
/// # Example
///
/// ```no_run
/// use teampulse_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), sqlx::Error> {
/// let pool = create_pool(DatabaseConfig::with_url("postgresql://localhost/teampulse")).await?;
/// # Ok(())
/// # }
/// ```

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Pool tuning knobs
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Upper bound on open connections
    pub max_connections: u32,

    /// Connections kept warm while idle
    pub min_connections: u32,

    /// Seconds to wait for a free connection
    pub acquire_timeout_seconds: u64,

    /// Idle connections older than this are closed
    pub idle_timeout_seconds: Option<u64>,

    /// Connections are recycled after this many seconds
    pub max_lifetime_seconds: Option<u64>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_seconds: 30,
            idle_timeout_seconds: Some(600),
            max_lifetime_seconds: Some(1800),
        }
    }
}

impl DatabaseConfig {
    /// Default settings pointed at `url`
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Creates the connection pool and verifies connectivity
///
/// # Errors
///
/// Returns an error if the database is unreachable or the health probe fails.
pub async fn create_pool(config: DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Creating database connection pool"
    );

    let mut options = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds));

    if let Some(idle) = config.idle_timeout_seconds {
        options = options.idle_timeout(Duration::from_secs(idle));
    }

    if let Some(lifetime) = config.max_lifetime_seconds {
        options = options.max_lifetime(Duration::from_secs(lifetime));
    }

    let pool = options.connect(&config.url).await?;
    health_check(&pool).await?;

    info!("Database connection pool ready");
    Ok(pool)
}

/// Runs `SELECT 1` against the pool
pub async fn health_check(pool: &PgPool) -> Result<(), sqlx::Error> {
    let (value,): (i32,) = sqlx::query_as("SELECT 1").fetch_one(pool).await?;

    if value != 1 {
        warn!(value, "Database health check returned unexpected value");
        return Err(sqlx::Error::Protocol(
            "Health check returned unexpected value".into(),
        ));
    }

    debug!("Database health check passed");
    Ok(())
}

/// Snapshot of pool usage, reported by the health endpoint
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct PoolStats {
    pub active_connections: u32,
    pub idle_connections: u32,
}

pub fn get_pool_stats(pool: &PgPool) -> PoolStats {
    let size = pool.size();
    let idle = pool.num_idle() as u32;

    PoolStats {
        active_connections: size.saturating_sub(idle),
        idle_connections: idle,
    }
}

/// Closes every connection; used on graceful shutdown
pub async fn close_pool(pool: PgPool) {
    info!("Closing database connection pool");
    pool.close().await;
}
