//! Event classification.
//!
//! Maps one raw node event onto exactly one [`EventRecord`] variant. The
//! set of recognized tags is closed: anything else is an error for the
//! enclosing message, never a silent default.

use crate::error::{DomainError, DomainResult};
use crate::models::{
    AssetEventType, BlockRecord, EventHeader, EventRecord, FtEvent, NftEvent, SmartContractEvent,
    StxEvent, TxId,
};
use crate::ports::{CoreEventType, CoreNodeEvent};

use super::parsing::{decode_hex, parse_amount};

/// Classify one raw event.
///
/// `event_index` is the event's position within its message and is
/// carried unchanged into the record.
pub fn classify_event(
    event: &CoreNodeEvent,
    event_index: u32,
    tx_id: &TxId,
    block: &BlockRecord,
) -> DomainResult<EventRecord> {
    let kind = CoreEventType::from_tag(&event.event_type).ok_or_else(|| {
        DomainError::UnknownEventType {
            event_index,
            tag: event.event_type.clone(),
        }
    })?;

    let missing = || DomainError::MissingEventPayload {
        event_index,
        tag: kind.as_str().to_string(),
    };

    let header = EventHeader {
        event_index,
        tx_id: tx_id.clone(),
        index_block_hash: block.index_block_hash.clone(),
        block_height: block.block_height,
        canonical: true,
    };

    let record = match kind {
        CoreEventType::ContractEvent => {
            let data = event.contract_event.as_ref().ok_or_else(missing)?;
            EventRecord::SmartContractLog(SmartContractEvent {
                header,
                contract_identifier: data.contract_identifier.clone(),
                topic: data.topic.clone(),
                value: decode_hex("contract_event.raw_value", &data.raw_value)?,
            })
        }
        CoreEventType::StxTransferEvent => {
            let data = event.stx_transfer_event.as_ref().ok_or_else(missing)?;
            EventRecord::StxAsset(StxEvent {
                header,
                asset_event_type: AssetEventType::Transfer,
                sender: Some(data.sender.clone()),
                recipient: Some(data.recipient.clone()),
                amount: parse_amount("stx_transfer_event.amount", &data.amount)?,
            })
        }
        CoreEventType::StxMintEvent => {
            let data = event.stx_mint_event.as_ref().ok_or_else(missing)?;
            EventRecord::StxAsset(StxEvent {
                header,
                asset_event_type: AssetEventType::Mint,
                sender: None,
                recipient: Some(data.recipient.clone()),
                amount: parse_amount("stx_mint_event.amount", &data.amount)?,
            })
        }
        CoreEventType::StxBurnEvent => {
            let data = event.stx_burn_event.as_ref().ok_or_else(missing)?;
            EventRecord::StxAsset(StxEvent {
                header,
                asset_event_type: AssetEventType::Burn,
                sender: Some(data.sender.clone()),
                recipient: None,
                amount: parse_amount("stx_burn_event.amount", &data.amount)?,
            })
        }
        CoreEventType::FtTransferEvent => {
            let data = event.ft_transfer_event.as_ref().ok_or_else(missing)?;
            EventRecord::FungibleTokenAsset(FtEvent {
                header,
                asset_event_type: AssetEventType::Transfer,
                asset_identifier: data.asset_identifier.clone(),
                sender: Some(data.sender.clone()),
                recipient: Some(data.recipient.clone()),
                amount: parse_amount("ft_transfer_event.amount", &data.amount)?,
            })
        }
        CoreEventType::FtMintEvent => {
            let data = event.ft_mint_event.as_ref().ok_or_else(missing)?;
            EventRecord::FungibleTokenAsset(FtEvent {
                header,
                asset_event_type: AssetEventType::Mint,
                asset_identifier: data.asset_identifier.clone(),
                sender: None,
                recipient: Some(data.recipient.clone()),
                amount: parse_amount("ft_mint_event.amount", &data.amount)?,
            })
        }
        CoreEventType::NftTransferEvent => {
            let data = event.nft_transfer_event.as_ref().ok_or_else(missing)?;
            EventRecord::NonFungibleTokenAsset(NftEvent {
                header,
                asset_event_type: AssetEventType::Transfer,
                asset_identifier: data.asset_identifier.clone(),
                sender: Some(data.sender.clone()),
                recipient: Some(data.recipient.clone()),
                value: decode_hex("nft_transfer_event.raw_value", &data.raw_value)?,
            })
        }
        CoreEventType::NftMintEvent => {
            let data = event.nft_mint_event.as_ref().ok_or_else(missing)?;
            EventRecord::NonFungibleTokenAsset(NftEvent {
                header,
                asset_event_type: AssetEventType::Mint,
                asset_identifier: data.asset_identifier.clone(),
                sender: None,
                recipient: Some(data.recipient.clone()),
                value: decode_hex("nft_mint_event.raw_value", &data.raw_value)?,
            })
        }
    };

    Ok(record)
}
