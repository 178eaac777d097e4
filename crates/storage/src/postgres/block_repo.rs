//! Block repository implementation for PostgreSQL.

use sqlx::PgPool;

use sidecar_core::error::{StorageError, StorageResult};
use sidecar_core::models::BlockRecord;

use super::helpers::to_bigint;

/// PostgreSQL writes for the `blocks` table.
pub struct PgBlockRepository {
    pool: PgPool,
}

impl PgBlockRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a block, or replace the row with the same index block hash.
    pub async fn upsert(&self, block: &BlockRecord) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO blocks (
                index_block_hash, block_hash, parent_block_hash, parent_microblock,
                block_height, burn_block_time, canonical
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (index_block_hash) DO UPDATE SET
                block_hash = EXCLUDED.block_hash,
                parent_block_hash = EXCLUDED.parent_block_hash,
                parent_microblock = EXCLUDED.parent_microblock,
                block_height = EXCLUDED.block_height,
                burn_block_time = EXCLUDED.burn_block_time,
                canonical = EXCLUDED.canonical,
                indexed_at = NOW()
            "#,
        )
        .bind(&block.index_block_hash.0[..])
        .bind(&block.block_hash.0[..])
        .bind(&block.parent_block_hash.0[..])
        .bind(&block.parent_microblock.0[..])
        .bind(to_bigint(block.block_height, "block.block_height")?)
        .bind(block.burn_block_time)
        .bind(block.canonical)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(())
    }
}
