//! Field parsers shared by message parsing and event classification.

use std::str::FromStr;

use num_bigint::BigUint;

use crate::error::{DomainError, DomainResult};
use crate::models::{BlockHash, TxId};

/// Decode a hex string (with or without `0x` prefix). Empty input yields no bytes.
pub fn decode_hex(field: &str, value: &str) -> DomainResult<Vec<u8>> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(digits).map_err(|e| DomainError::InvalidHex {
        field: field.to_string(),
        reason: e.to_string(),
    })
}

/// Parse a non-negative decimal amount of any size.
pub fn parse_amount(field: &str, value: &str) -> DomainResult<BigUint> {
    let invalid = || DomainError::InvalidAmount {
        field: field.to_string(),
        value: value.to_string(),
    };

    // BigUint also accepts a leading '+' and digit separators; the node sends neither
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    BigUint::from_str(value).map_err(|_| invalid())
}

pub fn parse_block_hash(field: &str, value: &str) -> DomainResult<BlockHash> {
    BlockHash::from_hex(value).map_err(|_| DomainError::InvalidHash {
        field: field.to_string(),
        value: value.to_string(),
    })
}

pub fn parse_tx_id(field: &str, value: &str) -> DomainResult<TxId> {
    TxId::from_hex(value).map_err(|_| DomainError::InvalidHash {
        field: field.to_string(),
        value: value.to_string(),
    })
}
