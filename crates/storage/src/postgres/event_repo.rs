//! Event repository implementation for PostgreSQL.
//!
//! Each event kind has its own table. Rows are keyed by
//! `(index_block_hash, tx_id, event_index)`; a replayed event keeps its
//! first row.

use sqlx::PgPool;

use sidecar_core::error::{StorageError, StorageResult};
use sidecar_core::models::{EventHeader, FtEvent, NftEvent, SmartContractEvent, StxEvent};

use super::helpers::{to_bigint, to_integer};

/// Bind-ready form of [`EventHeader`].
struct HeaderParams<'a> {
    index_block_hash: &'a [u8],
    block_height: i64,
    tx_id: &'a [u8],
    event_index: i32,
    canonical: bool,
}

impl<'a> HeaderParams<'a> {
    fn new(header: &'a EventHeader) -> StorageResult<Self> {
        Ok(Self {
            index_block_hash: &header.index_block_hash.0[..],
            block_height: to_bigint(header.block_height, "event.block_height")?,
            tx_id: &header.tx_id.0[..],
            event_index: to_integer(header.event_index, "event.event_index")?,
            canonical: header.canonical,
        })
    }
}

/// PostgreSQL writes for the event tables.
pub struct PgEventRepository {
    pool: PgPool,
}

impl PgEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert_stx(&self, event: &StxEvent) -> StorageResult<()> {
        let h = HeaderParams::new(&event.header)?;
        sqlx::query(
            r#"
            INSERT INTO stx_events (
                index_block_hash, block_height, tx_id, event_index, canonical,
                asset_event_type_id, sender, recipient, amount
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9::NUMERIC)
            ON CONFLICT (index_block_hash, tx_id, event_index) DO NOTHING
            "#,
        )
        .bind(h.index_block_hash)
        .bind(h.block_height)
        .bind(h.tx_id)
        .bind(h.event_index)
        .bind(h.canonical)
        .bind(event.asset_event_type.id())
        .bind(event.sender.as_deref())
        .bind(event.recipient.as_deref())
        .bind(event.amount.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(())
    }

    pub async fn insert_ft(&self, event: &FtEvent) -> StorageResult<()> {
        let h = HeaderParams::new(&event.header)?;
        sqlx::query(
            r#"
            INSERT INTO ft_events (
                index_block_hash, block_height, tx_id, event_index, canonical,
                asset_event_type_id, asset_identifier, sender, recipient, amount
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10::NUMERIC)
            ON CONFLICT (index_block_hash, tx_id, event_index) DO NOTHING
            "#,
        )
        .bind(h.index_block_hash)
        .bind(h.block_height)
        .bind(h.tx_id)
        .bind(h.event_index)
        .bind(h.canonical)
        .bind(event.asset_event_type.id())
        .bind(&event.asset_identifier)
        .bind(event.sender.as_deref())
        .bind(event.recipient.as_deref())
        .bind(event.amount.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(())
    }

    pub async fn insert_nft(&self, event: &NftEvent) -> StorageResult<()> {
        let h = HeaderParams::new(&event.header)?;
        sqlx::query(
            r#"
            INSERT INTO nft_events (
                index_block_hash, block_height, tx_id, event_index, canonical,
                asset_event_type_id, asset_identifier, sender, recipient, value
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (index_block_hash, tx_id, event_index) DO NOTHING
            "#,
        )
        .bind(h.index_block_hash)
        .bind(h.block_height)
        .bind(h.tx_id)
        .bind(h.event_index)
        .bind(h.canonical)
        .bind(event.asset_event_type.id())
        .bind(&event.asset_identifier)
        .bind(event.sender.as_deref())
        .bind(event.recipient.as_deref())
        .bind(&event.value)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(())
    }

    pub async fn insert_contract_log(&self, event: &SmartContractEvent) -> StorageResult<()> {
        let h = HeaderParams::new(&event.header)?;
        sqlx::query(
            r#"
            INSERT INTO contract_logs (
                index_block_hash, block_height, tx_id, event_index, canonical,
                contract_identifier, topic, value
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (index_block_hash, tx_id, event_index) DO NOTHING
            "#,
        )
        .bind(h.index_block_hash)
        .bind(h.block_height)
        .bind(h.tx_id)
        .bind(h.event_index)
        .bind(h.canonical)
        .bind(&event.contract_identifier)
        .bind(&event.topic)
        .bind(&event.value)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(())
    }
}
