//! Port trait for the persistent store.
//!
//! This is the only surface the sidecar writes through. Implementations
//! live in the infrastructure layer (e.g., `sidecar-storage`). Every call
//! is awaited before the next one is issued, and calls from different
//! messages never overlap.

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::models::{
    BlockRecord, ContractRecord, FtEvent, NftEvent, SmartContractEvent, StxEvent,
    TransactionRecord,
};

/// Store for records derived from node notifications.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Insert or update a block.
    async fn update_block(&self, block: &BlockRecord) -> StorageResult<()>;

    /// Insert or update a transaction.
    async fn update_tx(&self, tx: &TransactionRecord) -> StorageResult<()>;

    /// Insert or update a deployed contract.
    async fn update_smart_contract(&self, contract: &ContractRecord) -> StorageResult<()>;

    /// Insert an STX asset event.
    async fn update_stx_event(&self, event: &StxEvent) -> StorageResult<()>;

    /// Insert a fungible token event.
    async fn update_ft_event(&self, event: &FtEvent) -> StorageResult<()>;

    /// Insert a non-fungible token event.
    async fn update_nft_event(&self, event: &NftEvent) -> StorageResult<()>;

    /// Insert a contract log event.
    async fn update_smart_contract_event(&self, event: &SmartContractEvent) -> StorageResult<()>;
}
