use sqlx::{PgPool, Postgres, migrate::MigrateDatabase, postgres::PgPoolOptions};
use std::time::Duration;

/// Database pool configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Maximum time to wait for a connection
    pub acquire_timeout: Duration,
    /// Maximum idle time before a connection is closed
    pub idle_timeout: Duration,
    /// Maximum lifetime of a connection
    pub max_lifetime: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),  // 10 minutes
            max_lifetime: Duration::from_secs(1800), // 30 minutes
        }
    }
}

impl PoolConfig {
    /// Create config from `DB_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(n) = env_parse("DB_MAX_CONNECTIONS") {
            config.max_connections = n;
        }
        if let Some(n) = env_parse("DB_MIN_CONNECTIONS") {
            config.min_connections = n;
        }
        if let Some(n) = env_parse("DB_ACQUIRE_TIMEOUT") {
            config.acquire_timeout = Duration::from_secs(n);
        }
        if let Some(n) = env_parse("DB_IDLE_TIMEOUT") {
            config.idle_timeout = Duration::from_secs(n);
        }
        if let Some(n) = env_parse("DB_MAX_LIFETIME") {
            config.max_lifetime = Duration::from_secs(n);
        }

        config
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok()?.parse().ok()
}

/// Create a database connection pool with configuration from the environment
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    create_pool_with_config(database_url, PoolConfig::from_env()).await
}

pub async fn create_pool_with_config(database_url: &str, config: PoolConfig) -> anyhow::Result<PgPool> {
    if !Postgres::database_exists(database_url).await? {
        Postgres::create_database(database_url).await?;
        tracing::info!("Database created successfully");
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .max_lifetime(config.max_lifetime)
        .test_before_acquire(true)
        .connect(database_url)
        .await?;

    tracing::info!(
        "Database pool created: max={}, min={}, acquire_timeout={}s",
        config.max_connections,
        config.min_connections,
        config.acquire_timeout.as_secs()
    );

    Ok(pool)
}

pub async fn migrate(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations completed");
    Ok(())
}

/// Check database health
pub async fn health_check(pool: &PgPool) -> bool {
    sqlx::query("SELECT 1").execute(pool).await.is_ok()
}
