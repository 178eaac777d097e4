//! Domain models representing records derived from node notifications.
//!
//! These models are storage-agnostic. Every record produced by the sidecar
//! is freshly received from the node and therefore canonical.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

// =============================================================================
// 32-byte Hash Types
// =============================================================================

/// Macro to generate 32-byte hash newtypes with common functionality.
///
/// Generates:
/// - `from_hex()` - Parse from hex string (with or without 0x prefix)
/// - `to_hex()` - Convert to 0x-prefixed hex string
/// - `Display` trait implementation
/// - `From<[u8; 32]>` implementation
macro_rules! hash32_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            /// Parse from hex string (with or without 0x prefix).
            pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
                let s = s.strip_prefix("0x").unwrap_or(s);
                let bytes = hex::decode(s)?;
                let arr: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| hex::FromHexError::InvalidStringLength)?;
                Ok(Self(arr))
            }

            /// Convert to 0x-prefixed hex string.
            pub fn to_hex(&self) -> String {
                format!("0x{}", hex::encode(self.0))
            }

            /// Get the inner bytes.
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }
    };
}

hash32_newtype!(
    /// 32-byte block hash (block hash, index block hash or microblock hash).
    BlockHash
);

hash32_newtype!(
    /// 32-byte transaction id.
    TxId
);

// =============================================================================
// Blocks
// =============================================================================

/// Block derived from one node notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    /// Stacks block hash.
    pub block_hash: BlockHash,
    /// Index block hash (block hash bound to its burnchain fork).
    pub index_block_hash: BlockHash,
    /// Parent Stacks block hash.
    pub parent_block_hash: BlockHash,
    /// Last microblock of the parent stream that this block confirms.
    pub parent_microblock: BlockHash,
    /// Block height.
    pub block_height: u64,
    /// Burnchain block timestamp (unix seconds).
    pub burn_block_time: i64,
    /// Always true for freshly received blocks.
    pub canonical: bool,
}

// =============================================================================
// Transactions
// =============================================================================

/// Transaction kind, numbered as on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    TokenTransfer,
    SmartContract,
    ContractCall,
    PoisonMicroblock,
    Coinbase,
}

impl TransactionType {
    /// Numeric id used as the storage discriminant.
    pub fn id(self) -> i16 {
        match self {
            Self::TokenTransfer => 0,
            Self::SmartContract => 1,
            Self::ContractCall => 2,
            Self::PoisonMicroblock => 3,
            Self::Coinbase => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TokenTransfer => "token_transfer",
            Self::SmartContract => "smart_contract",
            Self::ContractCall => "contract_call",
            Self::PoisonMicroblock => "poison_microblock",
            Self::Coinbase => "coinbase",
        }
    }
}

/// Execution result reported by the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Success,
    AbortByResponse,
    AbortByPostCondition,
}

impl TransactionStatus {
    /// Parse the node's status string.
    pub fn from_node(status: &str) -> Option<Self> {
        match status {
            "success" => Some(Self::Success),
            "abort_by_response" => Some(Self::AbortByResponse),
            "abort_by_post_condition" => Some(Self::AbortByPostCondition),
            _ => None,
        }
    }

    /// Numeric id used as the storage discriminant.
    pub fn id(self) -> i16 {
        match self {
            Self::Success => 1,
            Self::AbortByResponse => 0,
            Self::AbortByPostCondition => -1,
        }
    }
}

/// Decoded transaction payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransactionPayload {
    /// Native STX transfer.
    TokenTransfer {
        /// Recipient principal (`address` or `address.contract`).
        recipient: String,
        /// Amount in micro-STX.
        amount: u64,
        /// 34-byte memo.
        memo: Vec<u8>,
    },
    /// Contract deployment.
    SmartContract {
        contract_name: String,
        code_body: String,
        /// Clarity version for versioned deployments.
        clarity_version: Option<u8>,
    },
    /// Public function call.
    ContractCall {
        contract_address: String,
        contract_name: String,
        function_name: String,
        /// Serialized argument list (count prefix included).
        function_args: Vec<u8>,
    },
    /// Proof of a microblock stream fork.
    PoisonMicroblock { header_1: Vec<u8>, header_2: Vec<u8> },
    /// Block reward claim.
    Coinbase {
        payload: Vec<u8>,
        /// Reward recipient, when not the miner.
        alt_recipient: Option<String>,
    },
}

impl TransactionPayload {
    pub fn transaction_type(&self) -> TransactionType {
        match self {
            Self::TokenTransfer { .. } => TransactionType::TokenTransfer,
            Self::SmartContract { .. } => TransactionType::SmartContract,
            Self::ContractCall { .. } => TransactionType::ContractCall,
            Self::PoisonMicroblock { .. } => TransactionType::PoisonMicroblock,
            Self::Coinbase { .. } => TransactionType::Coinbase,
        }
    }
}

/// Transaction included in a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub tx_id: TxId,
    /// Position within the block (0-based).
    pub tx_index: u32,
    pub block_hash: BlockHash,
    pub index_block_hash: BlockHash,
    pub block_height: u64,
    pub burn_block_time: i64,
    pub status: TransactionStatus,
    /// Serialized Clarity result of the transaction.
    pub raw_result: Vec<u8>,
    pub canonical: bool,
    /// Serialized post-condition section (count prefix included).
    pub post_conditions: Vec<u8>,
    /// Fee paid by the paying spending condition.
    pub fee_rate: u64,
    /// Origin nonce.
    pub nonce: u64,
    pub sponsored: bool,
    /// c32check origin address.
    pub sender_address: String,
    /// c32check sponsor address, when sponsored.
    pub sponsor_address: Option<String>,
    pub origin_hash_mode: u8,
    pub payload: TransactionPayload,
}

impl TransactionRecord {
    pub fn type_id(&self) -> TransactionType {
        self.payload.transaction_type()
    }
}

/// Contract deployed by a smart-contract transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractRecord {
    pub tx_id: TxId,
    pub canonical: bool,
    /// `<sender address>.<contract name>`.
    pub contract_id: String,
    pub block_height: u64,
    pub source_code: String,
    /// Contract ABI as JSON text, when the node provided one.
    pub abi: Option<String>,
}

// =============================================================================
// Events
// =============================================================================

/// Movement kind of an asset event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetEventType {
    Transfer,
    Mint,
    Burn,
}

impl AssetEventType {
    /// Numeric id used as the storage discriminant.
    pub fn id(self) -> i16 {
        match self {
            Self::Transfer => 1,
            Self::Mint => 2,
            Self::Burn => 3,
        }
    }
}

/// Fields shared by every event record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventHeader {
    /// Position of the event within its message (0-based).
    pub event_index: u32,
    pub tx_id: TxId,
    /// Block the event was emitted in. Sibling blocks at one height
    /// each keep their own events.
    pub index_block_hash: BlockHash,
    pub block_height: u64,
    pub canonical: bool,
}

/// `print` output of a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartContractEvent {
    #[serde(flatten)]
    pub header: EventHeader,
    pub contract_identifier: String,
    pub topic: String,
    /// Serialized Clarity value.
    pub value: Vec<u8>,
}

/// Native STX movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StxEvent {
    #[serde(flatten)]
    pub header: EventHeader,
    pub asset_event_type: AssetEventType,
    /// Absent for mints.
    pub sender: Option<String>,
    /// Absent for burns.
    pub recipient: Option<String>,
    pub amount: BigUint,
}

/// Fungible token movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FtEvent {
    #[serde(flatten)]
    pub header: EventHeader,
    pub asset_event_type: AssetEventType,
    pub asset_identifier: String,
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub amount: BigUint,
}

/// Non-fungible token movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftEvent {
    #[serde(flatten)]
    pub header: EventHeader,
    pub asset_event_type: AssetEventType,
    pub asset_identifier: String,
    pub sender: Option<String>,
    pub recipient: Option<String>,
    /// Serialized Clarity value identifying the token instance.
    pub value: Vec<u8>,
}

/// Normalized event record. Closed over the kinds the node reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventRecord {
    SmartContractLog(SmartContractEvent),
    StxAsset(StxEvent),
    FungibleTokenAsset(FtEvent),
    NonFungibleTokenAsset(NftEvent),
}

impl EventRecord {
    pub fn header(&self) -> &EventHeader {
        match self {
            Self::SmartContractLog(e) => &e.header,
            Self::StxAsset(e) => &e.header,
            Self::FungibleTokenAsset(e) => &e.header,
            Self::NonFungibleTokenAsset(e) => &e.header,
        }
    }

    pub fn event_index(&self) -> u32 {
        self.header().event_index
    }

    /// Label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SmartContractLog(_) => "smart_contract_log",
            Self::StxAsset(_) => "stx_asset",
            Self::FungibleTokenAsset(_) => "ft_asset",
            Self::NonFungibleTokenAsset(_) => "nft_asset",
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_hash_hex_roundtrip() {
        let hex = "0x1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef";
        let hash = BlockHash::from_hex(hex).unwrap();
        assert_eq!(hash.to_hex(), hex);
    }

    #[test]
    fn test_tx_id_without_prefix() {
        let hex = "1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef";
        let id = TxId::from_hex(hex).unwrap();
        assert_eq!(id.to_hex(), format!("0x{}", hex));
    }

    #[test]
    fn test_hash32_invalid_length() {
        assert!(BlockHash::from_hex("0x1234").is_err());
    }

    #[test]
    fn test_transaction_status_from_node() {
        assert_eq!(
            TransactionStatus::from_node("abort_by_post_condition"),
            Some(TransactionStatus::AbortByPostCondition)
        );
        assert_eq!(TransactionStatus::from_node("pending"), None);
    }

    #[test]
    fn test_payload_maps_to_type() {
        let payload = TransactionPayload::SmartContract {
            contract_name: "foo".into(),
            code_body: "(define-public (f) (ok u1))".into(),
            clarity_version: None,
        };
        assert_eq!(payload.transaction_type(), TransactionType::SmartContract);
        assert_eq!(payload.transaction_type().id(), 1);
    }
}
