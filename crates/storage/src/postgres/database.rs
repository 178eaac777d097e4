//! PostgreSQL database connection and configuration.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, instrument};

use sidecar_core::error::{StorageError, StorageResult};

/// Tables holding derived data, children before parents.
const DATA_TABLES: &[&str] = &[
    "contract_logs",
    "nft_events",
    "ft_events",
    "stx_events",
    "smart_contracts",
    "txs",
    "blocks",
];

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Minimum number of connections to maintain.
    pub min_connections: u32,
    /// Connection acquisition timeout.
    pub acquire_timeout: Duration,
    /// Idle connection timeout.
    pub idle_timeout: Duration,
    /// Maximum connection lifetime.
    pub max_lifetime: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/stacks_sidecar".to_string(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }
}

impl DatabaseConfig {
    /// Configuration for the sidecar's writer.
    ///
    /// Writes are serialized, so the pool stays small.
    pub fn for_sidecar(url: &str) -> Self {
        Self {
            url: url.to_string(),
            max_connections: 4,
            min_connections: 1,
            ..Default::default()
        }
    }
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to the database with the given configuration.
    #[instrument(skip_all)]
    pub async fn connect(config: &DatabaseConfig) -> StorageResult<Self> {
        debug!(
            max_conn = config.max_connections,
            min_conn = config.min_connections,
            "Creating connection pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .max_lifetime(Some(config.max_lifetime))
            .connect(&config.url)
            .await
            .map_err(|e| StorageError::ConnectionError(e.to_string()))?;

        debug!("Connection pool created");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn migrate(&self) -> StorageResult<()> {
        debug!("Running migrations");

        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::MigrationError(e.to_string()))?;

        debug!("Migrations completed");

        Ok(())
    }

    /// Close the connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Delete all derived data, keeping the schema and migration history.
    #[instrument(skip(self))]
    pub async fn purge(&self) -> StorageResult<PurgeStats> {
        debug!("Starting database purge");

        let blocks = self.count("blocks").await?;
        let transactions = self.count("txs").await?;
        let contracts = self.count("smart_contracts").await?;
        let mut events = 0;
        for table in ["stx_events", "ft_events", "nft_events", "contract_logs"] {
            events += self.count(table).await?;
        }

        sqlx::query(&format!("TRUNCATE {}", DATA_TABLES.join(", ")))
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;

        debug!("Database purge completed");

        Ok(PurgeStats {
            blocks_removed: blocks,
            transactions_removed: transactions,
            contracts_removed: contracts,
            events_removed: events,
        })
    }

    async fn count(&self, table: &str) -> StorageResult<u64> {
        // Table names come from DATA_TABLES, never from input
        let row: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;
        Ok(row.0 as u64)
    }
}

/// Statistics from a database purge operation.
#[derive(Debug, Clone)]
pub struct PurgeStats {
    /// Number of blocks removed.
    pub blocks_removed: u64,
    /// Number of transactions removed.
    pub transactions_removed: u64,
    /// Number of contracts removed.
    pub contracts_removed: u64,
    /// Number of event rows removed, all kinds together.
    pub events_removed: u64,
}
