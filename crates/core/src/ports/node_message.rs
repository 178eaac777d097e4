//! Wire types for the notifications a Stacks node posts to its observers.
//!
//! These structures mirror the node's JSON one-to-one and are kept
//! as received: hashes and hex payloads stay strings until the message
//! is parsed by [`crate::services::parse_message`].

use serde::{Deserialize, Serialize};

/// One block notification as sent by the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreNodeMessage {
    pub block_hash: String,
    pub index_block_hash: String,
    pub parent_block_hash: String,
    pub parent_microblock: String,
    pub block_height: u64,
    pub burn_block_time: i64,
    #[serde(default)]
    pub transactions: Vec<CoreNodeTransaction>,
    #[serde(default)]
    pub events: Vec<CoreNodeEvent>,
}

/// Transaction entry of a block notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreNodeTransaction {
    pub txid: String,
    /// Hex-encoded serialized transaction.
    pub raw_tx: String,
    pub status: String,
    /// Hex-encoded serialized Clarity result.
    #[serde(default)]
    pub raw_result: String,
    /// ABI of a deployed contract, when the node includes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_abi: Option<serde_json::Value>,
}

/// Event entry of a block notification.
///
/// The `type` tag selects which payload object is populated. The tag is
/// kept as a string so an unrecognized kind surfaces as a classification
/// error for that event rather than a framing error for the whole message.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CoreNodeEvent {
    pub txid: String,
    #[serde(default)]
    pub committed: bool,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_event: Option<ContractEventData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stx_transfer_event: Option<StxTransferEventData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stx_mint_event: Option<StxMintEventData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stx_burn_event: Option<StxBurnEventData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ft_transfer_event: Option<FtTransferEventData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ft_mint_event: Option<FtMintEventData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nft_transfer_event: Option<NftTransferEventData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nft_mint_event: Option<NftMintEventData>,
}

/// Recognized event tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreEventType {
    ContractEvent,
    StxTransferEvent,
    StxMintEvent,
    StxBurnEvent,
    FtTransferEvent,
    FtMintEvent,
    NftTransferEvent,
    NftMintEvent,
}

impl CoreEventType {
    /// Map a node tag onto the closed set; `None` for anything else.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "contract_event" => Some(Self::ContractEvent),
            "stx_transfer_event" => Some(Self::StxTransferEvent),
            "stx_mint_event" => Some(Self::StxMintEvent),
            "stx_burn_event" => Some(Self::StxBurnEvent),
            "ft_transfer_event" => Some(Self::FtTransferEvent),
            "ft_mint_event" => Some(Self::FtMintEvent),
            "nft_transfer_event" => Some(Self::NftTransferEvent),
            "nft_mint_event" => Some(Self::NftMintEvent),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ContractEvent => "contract_event",
            Self::StxTransferEvent => "stx_transfer_event",
            Self::StxMintEvent => "stx_mint_event",
            Self::StxBurnEvent => "stx_burn_event",
            Self::FtTransferEvent => "ft_transfer_event",
            Self::FtMintEvent => "ft_mint_event",
            Self::NftTransferEvent => "nft_transfer_event",
            Self::NftMintEvent => "nft_mint_event",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractEventData {
    pub contract_identifier: String,
    pub topic: String,
    pub raw_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StxTransferEventData {
    pub sender: String,
    pub recipient: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StxMintEventData {
    pub recipient: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StxBurnEventData {
    pub sender: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FtTransferEventData {
    pub asset_identifier: String,
    pub sender: String,
    pub recipient: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FtMintEventData {
    pub asset_identifier: String,
    pub recipient: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftTransferEventData {
    pub asset_identifier: String,
    pub sender: String,
    pub recipient: String,
    pub raw_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftMintEventData {
    pub asset_identifier: String,
    pub recipient: String,
    pub raw_value: String,
}
