//! Message application - turns one node notification into ordered store writes.
//!
//! Application happens in two phases. Parsing decodes every transaction
//! and derives block, transaction and contract records without touching
//! the store; a parse failure writes nothing. Writing then issues, in
//! order, the block, each transaction (followed by its contract, if it
//! deploys one), and each event. A failing write or an unclassifiable
//! event stops the message; records already written stay written.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, instrument, trace};

use crate::error::{DomainError, DomainResult, IngestResult, StorageResult};
use crate::metrics::{ProcessingTimer, record_apply_error, record_event_applied, record_message_applied};
use crate::models::{
    BlockRecord, ContractRecord, EventRecord, TransactionPayload, TransactionRecord,
    TransactionStatus, TxId,
};
use crate::ports::{CoreNodeEvent, CoreNodeMessage, DataStore, TransactionDecoder};

use super::classifier::classify_event;
use super::parsing::{decode_hex, parse_block_hash, parse_tx_id};

// =============================================================================
// Parsing
// =============================================================================

/// Transaction record plus the contract it deploys, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTransaction {
    pub record: TransactionRecord,
    pub contract: Option<ContractRecord>,
}

/// Event awaiting classification.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEvent {
    /// Position within the message (0-based).
    pub event_index: u32,
    pub tx_id: TxId,
    pub raw: CoreNodeEvent,
}

/// Node message with every transaction decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMessage {
    pub block: BlockRecord,
    pub transactions: Vec<ParsedTransaction>,
    pub events: Vec<PendingEvent>,
}

/// Parse a node message.
///
/// Events are checked against the message's transactions but are not
/// classified here, so an unknown event kind only fails once the records
/// before it have been written.
pub fn parse_message(
    message: CoreNodeMessage,
    decoder: &dyn TransactionDecoder,
) -> DomainResult<ParsedMessage> {
    let block = BlockRecord {
        block_hash: parse_block_hash("block_hash", &message.block_hash)?,
        index_block_hash: parse_block_hash("index_block_hash", &message.index_block_hash)?,
        parent_block_hash: parse_block_hash("parent_block_hash", &message.parent_block_hash)?,
        parent_microblock: parse_block_hash("parent_microblock", &message.parent_microblock)?,
        block_height: message.block_height,
        burn_block_time: message.burn_block_time,
        canonical: true,
    };

    let mut transactions = Vec::with_capacity(message.transactions.len());
    for (tx_index, tx) in message.transactions.into_iter().enumerate() {
        let tx_id = parse_tx_id("txid", &tx.txid)?;
        let status = TransactionStatus::from_node(&tx.status)
            .ok_or_else(|| DomainError::UnknownTransactionStatus(tx.status.clone()))?;
        let raw_tx = decode_hex("raw_tx", &tx.raw_tx)?;
        let decoded = decoder
            .decode(&raw_tx)
            .map_err(|source| DomainError::TransactionDecode {
                tx_id: tx.txid.clone(),
                source,
            })?;
        let raw_result = decode_hex("raw_result", &tx.raw_result)?;

        let contract = match &decoded.payload {
            TransactionPayload::SmartContract {
                contract_name,
                code_body,
                ..
            } => Some(ContractRecord {
                tx_id: tx_id.clone(),
                canonical: true,
                contract_id: format!("{}.{}", decoded.sender_address(), contract_name),
                block_height: block.block_height,
                source_code: code_body.clone(),
                abi: tx.contract_abi.as_ref().map(|abi| abi.to_string()),
            }),
            _ => None,
        };

        let record = TransactionRecord {
            tx_id,
            tx_index: tx_index as u32,
            block_hash: block.block_hash.clone(),
            index_block_hash: block.index_block_hash.clone(),
            block_height: block.block_height,
            burn_block_time: block.burn_block_time,
            status,
            raw_result,
            canonical: true,
            fee_rate: decoded.fee_rate(),
            nonce: decoded.origin.nonce,
            sponsored: decoded.is_sponsored(),
            sender_address: decoded.origin.address.clone(),
            sponsor_address: decoded.sponsor.as_ref().map(|s| s.address.clone()),
            origin_hash_mode: decoded.origin.hash_mode,
            post_conditions: decoded.post_conditions,
            payload: decoded.payload,
        };

        transactions.push(ParsedTransaction { record, contract });
    }

    let known: HashSet<&TxId> = transactions.iter().map(|t| &t.record.tx_id).collect();
    let mut events = Vec::with_capacity(message.events.len());
    for (index, raw) in message.events.into_iter().enumerate() {
        let event_index = index as u32;
        let tx_id = parse_tx_id("event.txid", &raw.txid)?;
        if !known.contains(&tx_id) {
            return Err(DomainError::OrphanEvent {
                event_index,
                tx_id: raw.txid,
            });
        }
        events.push(PendingEvent {
            event_index,
            tx_id,
            raw,
        });
    }

    Ok(ParsedMessage {
        block,
        transactions,
        events,
    })
}

// =============================================================================
// MessageApplier
// =============================================================================

/// Counts of records written for one message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub block_height: u64,
    pub transactions: usize,
    pub contracts: usize,
    pub events: usize,
}

/// Applies node messages to a [`DataStore`].
///
/// The applier itself does no locking. Callers must not run two
/// applications concurrently against the same store; the serial queue
/// ([`crate::services::SerialQueue`]) exists for that.
pub struct MessageApplier<S: DataStore, D: TransactionDecoder> {
    store: Arc<S>,
    decoder: Arc<D>,
}

impl<S: DataStore, D: TransactionDecoder> MessageApplier<S, D> {
    pub fn new(store: Arc<S>, decoder: Arc<D>) -> Self {
        Self { store, decoder }
    }

    /// Apply one message.
    #[instrument(skip_all, fields(block = message.block_height))]
    pub async fn apply(&self, message: CoreNodeMessage) -> IngestResult<ApplySummary> {
        let _timer = ProcessingTimer::new();
        trace!("Applying message");

        match self.apply_inner(message).await {
            Ok(summary) => {
                record_message_applied();
                info!(
                    txs = summary.transactions,
                    contracts = summary.contracts,
                    events = summary.events,
                    "📦 Block applied"
                );
                Ok(summary)
            }
            Err(e) => {
                record_apply_error(e.kind());
                Err(e)
            }
        }
    }

    async fn apply_inner(&self, message: CoreNodeMessage) -> IngestResult<ApplySummary> {
        let parsed = parse_message(message, self.decoder.as_ref())?;
        let block_height = parsed.block.block_height;
        let mut summary = ApplySummary {
            block_height,
            ..Default::default()
        };

        self.store.update_block(&parsed.block).await?;

        for tx in &parsed.transactions {
            self.store.update_tx(&tx.record).await?;
            summary.transactions += 1;

            if let Some(contract) = &tx.contract {
                debug!(contract = %contract.contract_id, "Contract deployed");
                self.store.update_smart_contract(contract).await?;
                summary.contracts += 1;
            }
        }

        for pending in &parsed.events {
            let record = classify_event(
                &pending.raw,
                pending.event_index,
                &pending.tx_id,
                &parsed.block,
            )?;
            self.write_event(&record).await.inspect_err(|e| {
                debug!(event_index = pending.event_index, error = %e, "Event write failed");
            })?;
            record_event_applied(record.kind());
            summary.events += 1;
        }

        Ok(summary)
    }

    async fn write_event(&self, record: &EventRecord) -> StorageResult<()> {
        match record {
            EventRecord::SmartContractLog(e) => self.store.update_smart_contract_event(e).await,
            EventRecord::StxAsset(e) => self.store.update_stx_event(e).await,
            EventRecord::FungibleTokenAsset(e) => self.store.update_ft_event(e).await,
            EventRecord::NonFungibleTokenAsset(e) => self.store.update_nft_event(e).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IngestError;
    use crate::models::{AssetEventType, BlockHash};
    use crate::ports::{
        ContractEventData, FtMintEventData, FtTransferEventData, NftMintEventData,
        NftTransferEventData, StxBurnEventData, StxMintEventData, StxTransferEventData,
    };
    use crate::services::test_support::{
        RecordingStore, STUB_SENDER, StoreOp, StubDecoder, contract_deploy_tx, event_for,
        message, transfer_tx, tx_id,
    };
    use num_bigint::BigUint;

    fn applier(store: Arc<RecordingStore>) -> MessageApplier<RecordingStore, StubDecoder> {
        MessageApplier::new(store, Arc::new(StubDecoder))
    }

    fn mint_and_log(txid: u8) -> Vec<CoreNodeEvent> {
        let mut mint = event_for(txid, "stx_mint_event");
        mint.stx_mint_event = Some(StxMintEventData {
            recipient: "SPabc".into(),
            amount: "500".into(),
        });
        let mut log = event_for(txid, "contract_event");
        log.contract_event = Some(ContractEventData {
            contract_identifier: "SPabc.foo".into(),
            topic: "print".into(),
            raw_value: "0x0100".into(),
        });
        vec![mint, log]
    }

    #[tokio::test]
    async fn test_applies_block_mint_and_log_in_order() {
        let store = Arc::new(RecordingStore::default());
        let msg = message(100, vec![transfer_tx(1)], mint_and_log(1));

        let summary = applier(store.clone()).apply(msg).await.unwrap();
        assert_eq!(
            summary,
            ApplySummary {
                block_height: 100,
                transactions: 1,
                contracts: 0,
                events: 2
            }
        );

        assert_eq!(
            store.ops(),
            vec![
                StoreOp::Block(100),
                StoreOp::Tx(tx_id(1)),
                StoreOp::StxEvent(0),
                StoreOp::ContractLog(1),
            ]
        );

        let events = store.events();
        let EventRecord::StxAsset(mint) = &events[0] else {
            panic!("expected stx mint");
        };
        assert_eq!(mint.asset_event_type, AssetEventType::Mint);
        assert_eq!(mint.recipient.as_deref(), Some("SPabc"));
        assert_eq!(mint.sender, None);
        assert_eq!(mint.amount, BigUint::from(500u32));
        assert_eq!(mint.header.event_index, 0);

        let EventRecord::SmartContractLog(log) = &events[1] else {
            panic!("expected contract log");
        };
        assert_eq!(log.contract_identifier, "SPabc.foo");
        assert_eq!(log.topic, "print");
        assert_eq!(log.value, vec![0x01, 0x00]);
        assert_eq!(log.header.event_index, 1);
        assert_eq!(log.header.block_height, 100);
    }

    const TOKEN: &str = "SP3K8BC0PPEVCV7NZ6QSRWPQ2JE9E5B6N3PA0KBR9.token::tok";

    /// One event of every recognized tag, in tag-table order.
    fn one_of_each(txid: u8) -> Vec<CoreNodeEvent> {
        let mut events = mint_and_log(txid);

        let mut e = event_for(txid, "stx_transfer_event");
        e.stx_transfer_event = Some(StxTransferEventData {
            sender: "SPa".into(),
            recipient: "SPb".into(),
            amount: "10".into(),
        });
        events.push(e);

        let mut e = event_for(txid, "stx_burn_event");
        e.stx_burn_event = Some(StxBurnEventData {
            sender: "SPa".into(),
            amount: "3".into(),
        });
        events.push(e);

        let mut e = event_for(txid, "ft_transfer_event");
        e.ft_transfer_event = Some(FtTransferEventData {
            asset_identifier: TOKEN.into(),
            sender: "SPa".into(),
            recipient: "SPb".into(),
            amount: "340282366920938463463374607431768211456".into(),
        });
        events.push(e);

        let mut e = event_for(txid, "ft_mint_event");
        e.ft_mint_event = Some(FtMintEventData {
            asset_identifier: TOKEN.into(),
            recipient: "SPb".into(),
            amount: "25".into(),
        });
        events.push(e);

        let mut e = event_for(txid, "nft_transfer_event");
        e.nft_transfer_event = Some(NftTransferEventData {
            asset_identifier: TOKEN.into(),
            sender: "SPa".into(),
            recipient: "SPb".into(),
            raw_value: "0x0100000000000000000000000000000001".into(),
        });
        events.push(e);

        let mut e = event_for(txid, "nft_mint_event");
        e.nft_mint_event = Some(NftMintEventData {
            asset_identifier: TOKEN.into(),
            recipient: "SPb".into(),
            raw_value: "0x03".into(),
        });
        events.push(e);

        events
    }

    #[tokio::test]
    async fn test_every_event_kind_reaches_its_store_operation() {
        let store = Arc::new(RecordingStore::default());
        let msg = message(42, vec![transfer_tx(1)], one_of_each(1));

        let summary = applier(store.clone()).apply(msg).await.unwrap();
        assert_eq!(summary.events, 8);

        assert_eq!(
            store.ops(),
            vec![
                StoreOp::Block(42),
                StoreOp::Tx(tx_id(1)),
                StoreOp::StxEvent(0),
                StoreOp::ContractLog(1),
                StoreOp::StxEvent(2),
                StoreOp::StxEvent(3),
                StoreOp::FtEvent(4),
                StoreOp::FtEvent(5),
                StoreOp::NftEvent(6),
                StoreOp::NftEvent(7),
            ]
        );

        let events = store.events();
        for (i, e) in events.iter().enumerate() {
            let header = e.header();
            assert_eq!(header.event_index, i as u32);
            assert_eq!(header.tx_id, tx_id(1));
            assert_eq!(header.block_height, 42);
            assert_eq!(header.index_block_hash, BlockHash([0xb1; 32]));
            assert!(header.canonical);
        }

        let EventRecord::StxAsset(transfer) = &events[2] else {
            panic!("expected stx transfer");
        };
        assert_eq!(transfer.asset_event_type, AssetEventType::Transfer);
        assert_eq!(transfer.sender.as_deref(), Some("SPa"));
        assert_eq!(transfer.recipient.as_deref(), Some("SPb"));
        assert_eq!(transfer.amount, BigUint::from(10u32));

        let EventRecord::StxAsset(burn) = &events[3] else {
            panic!("expected stx burn");
        };
        assert_eq!(burn.asset_event_type, AssetEventType::Burn);
        assert_eq!(burn.sender.as_deref(), Some("SPa"));
        assert_eq!(burn.recipient, None);
        assert_eq!(burn.amount, BigUint::from(3u32));

        let EventRecord::FungibleTokenAsset(ft_transfer) = &events[4] else {
            panic!("expected ft transfer");
        };
        assert_eq!(ft_transfer.asset_event_type, AssetEventType::Transfer);
        assert_eq!(ft_transfer.asset_identifier, TOKEN);
        assert_eq!(ft_transfer.sender.as_deref(), Some("SPa"));
        assert_eq!(ft_transfer.recipient.as_deref(), Some("SPb"));
        assert_eq!(ft_transfer.amount, BigUint::from(u128::MAX) + 1u32);

        let EventRecord::FungibleTokenAsset(ft_mint) = &events[5] else {
            panic!("expected ft mint");
        };
        assert_eq!(ft_mint.asset_event_type, AssetEventType::Mint);
        assert_eq!(ft_mint.sender, None);
        assert_eq!(ft_mint.recipient.as_deref(), Some("SPb"));
        assert_eq!(ft_mint.amount, BigUint::from(25u32));

        let EventRecord::NonFungibleTokenAsset(nft_transfer) = &events[6] else {
            panic!("expected nft transfer");
        };
        assert_eq!(nft_transfer.asset_event_type, AssetEventType::Transfer);
        assert_eq!(nft_transfer.asset_identifier, TOKEN);
        assert_eq!(nft_transfer.sender.as_deref(), Some("SPa"));
        assert_eq!(nft_transfer.value.len(), 17);

        let EventRecord::NonFungibleTokenAsset(nft_mint) = &events[7] else {
            panic!("expected nft mint");
        };
        assert_eq!(nft_mint.asset_event_type, AssetEventType::Mint);
        assert_eq!(nft_mint.sender, None);
        assert_eq!(nft_mint.recipient.as_deref(), Some("SPb"));
        assert_eq!(nft_mint.value, vec![0x03]);
    }

    #[tokio::test]
    async fn test_contract_deploy_writes_contract_after_tx() {
        let store = Arc::new(RecordingStore::default());
        let mut deploy = contract_deploy_tx(2, "my-token");
        deploy.contract_abi = Some(serde_json::json!({ "functions": [] }));
        let msg = message(5, vec![transfer_tx(1), deploy], vec![]);

        applier(store.clone()).apply(msg).await.unwrap();

        let contract_id = format!("{STUB_SENDER}.my-token");
        assert_eq!(
            store.ops(),
            vec![
                StoreOp::Block(5),
                StoreOp::Tx(tx_id(1)),
                StoreOp::Tx(tx_id(2)),
                StoreOp::Contract(contract_id.clone()),
            ]
        );

        let contracts = store.contracts();
        assert_eq!(contracts[0].contract_id, contract_id);
        assert!(contracts[0].canonical);
        assert_eq!(contracts[0].block_height, 5);
        assert_eq!(contracts[0].abi.as_deref(), Some(r#"{"functions":[]}"#));
        assert_eq!(contracts[0].tx_id, tx_id(2));
    }

    #[tokio::test]
    async fn test_transactions_keep_message_order_and_block_fields() {
        let store = Arc::new(RecordingStore::default());
        let msg = message(9, vec![transfer_tx(3), transfer_tx(1)], vec![]);

        applier(store.clone()).apply(msg).await.unwrap();

        let txs = store.transactions();
        assert_eq!(txs[0].tx_id, tx_id(3));
        assert_eq!(txs[0].tx_index, 0);
        assert_eq!(txs[1].tx_id, tx_id(1));
        assert_eq!(txs[1].tx_index, 1);
        assert!(txs.iter().all(|t| t.block_height == 9 && t.canonical));
        assert_eq!(txs[0].sender_address, STUB_SENDER);
        assert_eq!(txs[0].status, TransactionStatus::Success);
    }

    #[tokio::test]
    async fn test_unknown_event_keeps_earlier_records() {
        let store = Arc::new(RecordingStore::default());
        let mut events = mint_and_log(1);
        events.insert(1, event_for(1, "stx_lock_event"));
        let msg = message(100, vec![transfer_tx(1)], events);

        let err = applier(store.clone()).apply(msg).await.unwrap_err();
        assert!(matches!(
            err,
            IngestError::Domain(DomainError::UnknownEventType { event_index: 1, .. })
        ));

        // Block, tx and the first event stay applied; nothing after the failure
        assert_eq!(
            store.ops(),
            vec![StoreOp::Block(100), StoreOp::Tx(tx_id(1)), StoreOp::StxEvent(0)]
        );
    }

    #[tokio::test]
    async fn test_store_failure_aborts_remaining_writes() {
        let store = Arc::new(RecordingStore::failing_on("update_stx_event"));
        let msg = message(100, vec![transfer_tx(1)], mint_and_log(1));

        let err = applier(store.clone()).apply(msg).await.unwrap_err();
        assert_eq!(err.kind(), "storage");
        assert_eq!(store.ops(), vec![StoreOp::Block(100), StoreOp::Tx(tx_id(1))]);
    }

    #[tokio::test]
    async fn test_decode_failure_writes_nothing() {
        let store = Arc::new(RecordingStore::default());
        let mut bad = transfer_tx(2);
        bad.raw_tx = "0xff".into();
        let msg = message(100, vec![transfer_tx(1), bad], vec![]);

        let err = applier(store.clone()).apply(msg).await.unwrap_err();
        assert!(matches!(
            err,
            IngestError::Domain(DomainError::TransactionDecode { .. })
        ));
        assert!(store.ops().is_empty());
    }

    #[tokio::test]
    async fn test_orphan_event_writes_nothing() {
        let store = Arc::new(RecordingStore::default());
        let msg = message(100, vec![transfer_tx(1)], mint_and_log(9));

        let err = applier(store.clone()).apply(msg).await.unwrap_err();
        assert!(matches!(
            err,
            IngestError::Domain(DomainError::OrphanEvent { event_index: 0, .. })
        ));
        assert!(store.ops().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_status_is_rejected_during_parse() {
        let store = Arc::new(RecordingStore::default());
        let mut tx = transfer_tx(1);
        tx.status = "pending".into();
        let msg = message(1, vec![tx], vec![]);

        let err = applier(store.clone()).apply(msg).await.unwrap_err();
        assert!(matches!(
            err,
            IngestError::Domain(DomainError::UnknownTransactionStatus(_))
        ));
        assert!(store.ops().is_empty());
    }

    #[test]
    fn test_event_index_follows_message_position() {
        let mut events = mint_and_log(1);
        events.extend(mint_and_log(1));
        let parsed = parse_message(message(1, vec![transfer_tx(1)], events), &StubDecoder).unwrap();

        let indexes: Vec<u32> = parsed.events.iter().map(|e| e.event_index).collect();
        assert_eq!(indexes, vec![0, 1, 2, 3]);
    }
}
