//! In-memory storage backend.
//!
//! Keeps every record in RAM with the same insert/update rules as the
//! PostgreSQL store: blocks, transactions and contracts are replaced on
//! conflict, events are kept from their first write per block, keyed by
//! index block hash. Useful for tests
//! and for running the sidecar without a database. All data is lost
//! when the process exits.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use sidecar_core::error::{StorageError, StorageResult};
use sidecar_core::models::{
    BlockHash, BlockRecord, ContractRecord, EventRecord, FtEvent, NftEvent, SmartContractEvent,
    StxEvent, TransactionRecord,
};
use sidecar_core::ports::DataStore;

#[derive(Default)]
struct Tables {
    blocks: Vec<BlockRecord>,
    transactions: Vec<TransactionRecord>,
    contracts: Vec<ContractRecord>,
    events: Vec<EventRecord>,
    writes: usize,
}

/// In-memory data store.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> StorageResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StorageError::TransactionError("in-memory store lock poisoned".into()))
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> T {
        let tables = self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&tables)
    }

    /// Blocks in first-write order.
    pub fn blocks(&self) -> Vec<BlockRecord> {
        self.read(|t| t.blocks.clone())
    }

    pub fn block(&self, index_block_hash: &BlockHash) -> Option<BlockRecord> {
        self.read(|t| {
            t.blocks
                .iter()
                .find(|b| &b.index_block_hash == index_block_hash)
                .cloned()
        })
    }

    /// Transactions in first-write order.
    pub fn transactions(&self) -> Vec<TransactionRecord> {
        self.read(|t| t.transactions.clone())
    }

    pub fn contracts(&self) -> Vec<ContractRecord> {
        self.read(|t| t.contracts.clone())
    }

    pub fn contract(&self, contract_id: &str) -> Option<ContractRecord> {
        self.read(|t| {
            t.contracts
                .iter()
                .rev()
                .find(|c| c.contract_id == contract_id)
                .cloned()
        })
    }

    /// Events of every kind, in first-write order.
    pub fn events(&self) -> Vec<EventRecord> {
        self.read(|t| t.events.clone())
    }

    /// Events for one block height, ordered by event index.
    pub fn events_at(&self, block_height: u64) -> Vec<EventRecord> {
        let mut events: Vec<EventRecord> = self.read(|t| {
            t.events
                .iter()
                .filter(|e| e.header().block_height == block_height)
                .cloned()
                .collect()
        });
        events.sort_by_key(EventRecord::event_index);
        events
    }

    /// Number of store calls that succeeded.
    pub fn write_count(&self) -> usize {
        self.read(|t| t.writes)
    }

    fn insert_event(&self, record: EventRecord) -> StorageResult<()> {
        let mut tables = self.tables()?;
        let header = record.header();
        let exists = tables.events.iter().any(|e| {
            let h = e.header();
            h.index_block_hash == header.index_block_hash
                && h.tx_id == header.tx_id
                && h.event_index == header.event_index
                && e.kind() == record.kind()
        });
        if !exists {
            tables.events.push(record);
        }
        tables.writes += 1;
        Ok(())
    }
}

fn upsert<T>(rows: &mut Vec<T>, row: &T, same_key: impl Fn(&T) -> bool)
where
    T: Clone,
{
    match rows.iter_mut().find(|r| same_key(r)) {
        Some(existing) => *existing = row.clone(),
        None => rows.push(row.clone()),
    }
}

#[async_trait]
impl DataStore for InMemoryStore {
    async fn update_block(&self, block: &BlockRecord) -> StorageResult<()> {
        let mut tables = self.tables()?;
        upsert(&mut tables.blocks, block, |b| {
            b.index_block_hash == block.index_block_hash
        });
        tables.writes += 1;
        Ok(())
    }

    async fn update_tx(&self, tx: &TransactionRecord) -> StorageResult<()> {
        let mut tables = self.tables()?;
        upsert(&mut tables.transactions, tx, |t| {
            t.tx_id == tx.tx_id && t.index_block_hash == tx.index_block_hash
        });
        tables.writes += 1;
        Ok(())
    }

    async fn update_smart_contract(&self, contract: &ContractRecord) -> StorageResult<()> {
        let mut tables = self.tables()?;
        upsert(&mut tables.contracts, contract, |c| {
            c.contract_id == contract.contract_id && c.tx_id == contract.tx_id
        });
        tables.writes += 1;
        Ok(())
    }

    async fn update_stx_event(&self, event: &StxEvent) -> StorageResult<()> {
        self.insert_event(EventRecord::StxAsset(event.clone()))
    }

    async fn update_ft_event(&self, event: &FtEvent) -> StorageResult<()> {
        self.insert_event(EventRecord::FungibleTokenAsset(event.clone()))
    }

    async fn update_nft_event(&self, event: &NftEvent) -> StorageResult<()> {
        self.insert_event(EventRecord::NonFungibleTokenAsset(event.clone()))
    }

    async fn update_smart_contract_event(&self, event: &SmartContractEvent) -> StorageResult<()> {
        self.insert_event(EventRecord::SmartContractLog(event.clone()))
    }
}
