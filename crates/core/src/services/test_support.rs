//! Fakes and builders shared by the service tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{DecodeError, DecodeResult, StorageError, StorageResult};
use crate::models::{
    BlockRecord, ContractRecord, EventRecord, FtEvent, NftEvent, SmartContractEvent, StxEvent,
    TransactionPayload, TransactionRecord, TxId,
};
use crate::ports::{
    CoreNodeEvent, CoreNodeMessage, CoreNodeTransaction, DataStore, DecodedTransaction,
    SpendingCondition, TransactionDecoder, TransactionVersion,
};

/// Address every stub-decoded transaction is sent from.
pub const STUB_SENDER: &str = "SP000000000000000000002Q6VF78";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Block(u64),
    Tx(TxId),
    Contract(String),
    StxEvent(u32),
    FtEvent(u32),
    NftEvent(u32),
    ContractLog(u32),
}

#[derive(Default)]
struct Recorded {
    ops: Vec<StoreOp>,
    transactions: Vec<TransactionRecord>,
    contracts: Vec<ContractRecord>,
    events: Vec<EventRecord>,
}

/// Store that records every write in call order.
#[derive(Default)]
pub struct RecordingStore {
    recorded: Mutex<Recorded>,
    fail_on: Option<&'static str>,
    yield_between: bool,
}

impl RecordingStore {
    /// Store whose `operation` always fails.
    pub fn failing_on(operation: &'static str) -> Self {
        Self {
            fail_on: Some(operation),
            ..Default::default()
        }
    }

    /// Store that yields to the runtime before each write.
    pub fn yielding() -> Self {
        Self {
            yield_between: true,
            ..Default::default()
        }
    }

    pub fn ops(&self) -> Vec<StoreOp> {
        self.recorded.lock().unwrap().ops.clone()
    }

    pub fn transactions(&self) -> Vec<TransactionRecord> {
        self.recorded.lock().unwrap().transactions.clone()
    }

    pub fn contracts(&self) -> Vec<ContractRecord> {
        self.recorded.lock().unwrap().contracts.clone()
    }

    pub fn events(&self) -> Vec<EventRecord> {
        self.recorded.lock().unwrap().events.clone()
    }

    async fn write(&self, operation: &'static str, apply: impl FnOnce(&mut Recorded)) -> StorageResult<()> {
        if self.yield_between {
            tokio::task::yield_now().await;
        }
        if self.fail_on == Some(operation) {
            return Err(StorageError::QueryError(format!("{operation} failed")));
        }
        apply(&mut self.recorded.lock().unwrap());
        Ok(())
    }
}

#[async_trait]
impl DataStore for RecordingStore {
    async fn update_block(&self, block: &BlockRecord) -> StorageResult<()> {
        self.write("update_block", |r| r.ops.push(StoreOp::Block(block.block_height)))
            .await
    }

    async fn update_tx(&self, tx: &TransactionRecord) -> StorageResult<()> {
        self.write("update_tx", |r| {
            r.ops.push(StoreOp::Tx(tx.tx_id.clone()));
            r.transactions.push(tx.clone());
        })
        .await
    }

    async fn update_smart_contract(&self, contract: &ContractRecord) -> StorageResult<()> {
        self.write("update_smart_contract", |r| {
            r.ops.push(StoreOp::Contract(contract.contract_id.clone()));
            r.contracts.push(contract.clone());
        })
        .await
    }

    async fn update_stx_event(&self, event: &StxEvent) -> StorageResult<()> {
        self.write("update_stx_event", |r| {
            r.ops.push(StoreOp::StxEvent(event.header.event_index));
            r.events.push(EventRecord::StxAsset(event.clone()));
        })
        .await
    }

    async fn update_ft_event(&self, event: &FtEvent) -> StorageResult<()> {
        self.write("update_ft_event", |r| {
            r.ops.push(StoreOp::FtEvent(event.header.event_index));
            r.events.push(EventRecord::FungibleTokenAsset(event.clone()));
        })
        .await
    }

    async fn update_nft_event(&self, event: &NftEvent) -> StorageResult<()> {
        self.write("update_nft_event", |r| {
            r.ops.push(StoreOp::NftEvent(event.header.event_index));
            r.events.push(EventRecord::NonFungibleTokenAsset(event.clone()));
        })
        .await
    }

    async fn update_smart_contract_event(&self, event: &SmartContractEvent) -> StorageResult<()> {
        self.write("update_smart_contract_event", |r| {
            r.ops.push(StoreOp::ContractLog(event.header.event_index));
            r.events.push(EventRecord::SmartContractLog(event.clone()));
        })
        .await
    }
}

/// Decoder for hand-made transactions.
///
/// `0x00` decodes to a token transfer; `0x01 <name>` to a contract
/// deployment named `<name>`; anything else is rejected.
pub struct StubDecoder;

impl TransactionDecoder for StubDecoder {
    fn decode(&self, raw_tx: &[u8]) -> DecodeResult<DecodedTransaction> {
        let payload = match raw_tx.first() {
            Some(0x00) => TransactionPayload::TokenTransfer {
                recipient: STUB_SENDER.to_string(),
                amount: 1,
                memo: vec![0; 34],
            },
            Some(0x01) => TransactionPayload::SmartContract {
                contract_name: String::from_utf8(raw_tx[1..].to_vec())
                    .map_err(|_| DecodeError::InvalidUtf8("contract name"))?,
                code_body: "(define-public (ping) (ok true))".to_string(),
                clarity_version: None,
            },
            Some(&other) => return Err(DecodeError::UnknownPayloadType(other)),
            None => return Err(DecodeError::UnexpectedEof { offset: 0, needed: 1 }),
        };

        Ok(DecodedTransaction {
            version: TransactionVersion::Mainnet,
            chain_id: 1,
            origin: SpendingCondition {
                hash_mode: 0,
                signer: [0; 20],
                address: STUB_SENDER.to_string(),
                nonce: 7,
                fee_rate: 180,
            },
            sponsor: None,
            anchor_mode: 3,
            post_condition_mode: 1,
            post_conditions: vec![0, 0, 0, 0],
            payload,
        })
    }
}

pub fn hash_hex(n: u8) -> String {
    format!("0x{}", hex::encode([n; 32]))
}

pub fn tx_id(n: u8) -> TxId {
    TxId([n; 32])
}

pub fn transfer_tx(n: u8) -> CoreNodeTransaction {
    CoreNodeTransaction {
        txid: hash_hex(n),
        raw_tx: "0x00".to_string(),
        status: "success".to_string(),
        raw_result: "0x0703".to_string(),
        contract_abi: None,
    }
}

pub fn contract_deploy_tx(n: u8, name: &str) -> CoreNodeTransaction {
    CoreNodeTransaction {
        raw_tx: format!("0x01{}", hex::encode(name)),
        ..transfer_tx(n)
    }
}

/// Event of kind `tag` with no payload set.
pub fn event_for(txid: u8, tag: &str) -> CoreNodeEvent {
    CoreNodeEvent {
        txid: hash_hex(txid),
        committed: true,
        event_type: tag.to_string(),
        ..Default::default()
    }
}

pub fn message(
    height: u64,
    transactions: Vec<CoreNodeTransaction>,
    events: Vec<CoreNodeEvent>,
) -> CoreNodeMessage {
    CoreNodeMessage {
        block_hash: hash_hex(0xb0),
        index_block_hash: hash_hex(0xb1),
        parent_block_hash: hash_hex(0xb2),
        parent_microblock: hash_hex(0x00),
        block_height: height,
        burn_block_time: 1_700_000_000,
        transactions,
        events,
    }
}
