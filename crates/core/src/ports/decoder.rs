//! Port trait for the node's native transaction format.
//!
//! The sidecar never interprets transaction bytes itself; an adapter
//! (e.g., `sidecar-stacks`) turns them into a [`DecodedTransaction`].

use crate::error::DecodeResult;
use crate::models::TransactionPayload;

/// Network a transaction was signed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionVersion {
    Mainnet,
    Testnet,
}

/// Signer of a transaction (origin or sponsor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendingCondition {
    /// Address hash mode byte.
    pub hash_mode: u8,
    /// Hash160 of the signer's key(s).
    pub signer: [u8; 20],
    /// c32check address derived from hash mode, network and signer.
    pub address: String,
    pub nonce: u64,
    pub fee_rate: u64,
}

/// Typed view of one serialized transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTransaction {
    pub version: TransactionVersion,
    pub chain_id: u32,
    pub origin: SpendingCondition,
    /// Present for sponsored transactions.
    pub sponsor: Option<SpendingCondition>,
    pub anchor_mode: u8,
    pub post_condition_mode: u8,
    /// Serialized post-condition section, count prefix included.
    pub post_conditions: Vec<u8>,
    pub payload: TransactionPayload,
}

impl DecodedTransaction {
    pub fn sender_address(&self) -> &str {
        &self.origin.address
    }

    pub fn is_sponsored(&self) -> bool {
        self.sponsor.is_some()
    }

    /// Fee of whoever pays for the transaction.
    pub fn fee_rate(&self) -> u64 {
        self.sponsor
            .as_ref()
            .map_or(self.origin.fee_rate, |s| s.fee_rate)
    }
}

/// Decoder for serialized transactions.
pub trait TransactionDecoder: Send + Sync {
    /// Decode one serialized transaction.
    fn decode(&self, raw_tx: &[u8]) -> DecodeResult<DecodedTransaction>;
}
