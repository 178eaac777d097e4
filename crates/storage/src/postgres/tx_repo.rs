//! Transaction and contract repository implementation for PostgreSQL.

use sqlx::PgPool;

use sidecar_core::error::{StorageError, StorageResult};
use sidecar_core::models::{ContractRecord, TransactionRecord};

use super::helpers::{to_bigint, to_integer, to_json};

/// PostgreSQL writes for the `txs` and `smart_contracts` tables.
pub struct PgTxRepository {
    pool: PgPool,
}

impl PgTxRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a transaction, or replace it within the same block.
    pub async fn upsert_tx(&self, tx: &TransactionRecord) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO txs (
                tx_id, index_block_hash, tx_index, block_hash, block_height,
                burn_block_time, type_id, status, raw_result, canonical,
                post_conditions, fee_rate, nonce, sponsored, sender_address,
                sponsor_address, origin_hash_mode, payload
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12::NUMERIC, $13::NUMERIC,
                    $14, $15, $16, $17, $18)
            ON CONFLICT (tx_id, index_block_hash) DO UPDATE SET
                tx_index = EXCLUDED.tx_index,
                block_hash = EXCLUDED.block_hash,
                block_height = EXCLUDED.block_height,
                burn_block_time = EXCLUDED.burn_block_time,
                type_id = EXCLUDED.type_id,
                status = EXCLUDED.status,
                raw_result = EXCLUDED.raw_result,
                canonical = EXCLUDED.canonical,
                post_conditions = EXCLUDED.post_conditions,
                fee_rate = EXCLUDED.fee_rate,
                nonce = EXCLUDED.nonce,
                sponsored = EXCLUDED.sponsored,
                sender_address = EXCLUDED.sender_address,
                sponsor_address = EXCLUDED.sponsor_address,
                origin_hash_mode = EXCLUDED.origin_hash_mode,
                payload = EXCLUDED.payload
            "#,
        )
        .bind(&tx.tx_id.0[..])
        .bind(&tx.index_block_hash.0[..])
        .bind(to_integer(tx.tx_index, "tx.tx_index")?)
        .bind(&tx.block_hash.0[..])
        .bind(to_bigint(tx.block_height, "tx.block_height")?)
        .bind(tx.burn_block_time)
        .bind(tx.type_id().id())
        .bind(tx.status.id())
        .bind(&tx.raw_result)
        .bind(tx.canonical)
        .bind(&tx.post_conditions)
        .bind(tx.fee_rate.to_string())
        .bind(tx.nonce.to_string())
        .bind(tx.sponsored)
        .bind(&tx.sender_address)
        .bind(tx.sponsor_address.as_deref())
        .bind(i16::from(tx.origin_hash_mode))
        .bind(to_json(&tx.payload, "tx.payload")?)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(())
    }

    /// Insert a contract, or replace the row deployed by the same transaction.
    pub async fn upsert_contract(&self, contract: &ContractRecord) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO smart_contracts (
                contract_id, tx_id, canonical, block_height, source_code, abi
            )
            VALUES ($1, $2, $3, $4, $5, $6::JSONB)
            ON CONFLICT (contract_id, tx_id) DO UPDATE SET
                canonical = EXCLUDED.canonical,
                block_height = EXCLUDED.block_height,
                source_code = EXCLUDED.source_code,
                abi = EXCLUDED.abi
            "#,
        )
        .bind(&contract.contract_id)
        .bind(&contract.tx_id.0[..])
        .bind(contract.canonical)
        .bind(to_bigint(contract.block_height, "contract.block_height")?)
        .bind(&contract.source_code)
        .bind(contract.abi.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(())
    }
}
