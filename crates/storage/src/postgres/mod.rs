//! PostgreSQL storage adapter.
//!
//! Implements the `DataStore` port of `sidecar-core` on top of a
//! PostgreSQL connection pool.
//!
//! # Architecture
//!
//! - [`Database`] - Connection pool, migrations, purge
//! - [`PgStore`] - `DataStore` implementation
//! - Individual repos: `PgBlockRepository`, `PgTxRepository`, `PgEventRepository`
//!
//! # Usage
//!
//! ```ignore
//! let config = DatabaseConfig::for_sidecar(&database_url);
//! let db = Database::connect(&config).await?;
//! db.migrate().await?;
//!
//! let store = PgStore::new(&db);
//! ```

mod block_repo;
mod database;
mod event_repo;
mod helpers;
mod tx_repo;

pub use block_repo::PgBlockRepository;
pub use database::{Database, DatabaseConfig, PurgeStats};
pub use event_repo::PgEventRepository;
pub use tx_repo::PgTxRepository;

use async_trait::async_trait;
use tracing::trace;

use sidecar_core::error::StorageResult;
use sidecar_core::models::{
    BlockRecord, ContractRecord, FtEvent, NftEvent, SmartContractEvent, StxEvent,
    TransactionRecord,
};
use sidecar_core::ports::DataStore;

/// PostgreSQL data store.
///
/// Every call is a single statement on the pool, so a record is either
/// fully written or not written at all.
pub struct PgStore {
    blocks: PgBlockRepository,
    txs: PgTxRepository,
    events: PgEventRepository,
}

impl PgStore {
    /// Build the repositories over `db`'s pool. The pool is shared, so
    /// closing `db` also closes this store.
    pub fn new(db: &Database) -> Self {
        let pool = db.pool().clone();
        Self {
            blocks: PgBlockRepository::new(pool.clone()),
            txs: PgTxRepository::new(pool.clone()),
            events: PgEventRepository::new(pool),
        }
    }
}

#[async_trait]
impl DataStore for PgStore {
    async fn update_block(&self, block: &BlockRecord) -> StorageResult<()> {
        trace!(height = block.block_height, "Writing block");
        self.blocks.upsert(block).await
    }

    async fn update_tx(&self, tx: &TransactionRecord) -> StorageResult<()> {
        trace!(tx_id = %tx.tx_id, "Writing transaction");
        self.txs.upsert_tx(tx).await
    }

    async fn update_smart_contract(&self, contract: &ContractRecord) -> StorageResult<()> {
        self.txs.upsert_contract(contract).await
    }

    async fn update_stx_event(&self, event: &StxEvent) -> StorageResult<()> {
        self.events.insert_stx(event).await
    }

    async fn update_ft_event(&self, event: &FtEvent) -> StorageResult<()> {
        self.events.insert_ft(event).await
    }

    async fn update_nft_event(&self, event: &NftEvent) -> StorageResult<()> {
        self.events.insert_nft(event).await
    }

    async fn update_smart_contract_event(&self, event: &SmartContractEvent) -> StorageResult<()> {
        self.events.insert_contract_log(event).await
    }
}
