//! Stacks transaction decoder.

use tracing::trace;

use sidecar_core::error::{DecodeError, DecodeResult};
use sidecar_core::models::TransactionPayload;
use sidecar_core::ports::{
    DecodedTransaction, SpendingCondition, TransactionDecoder, TransactionVersion,
};

use crate::c32::{
    MAINNET_MULTISIG, MAINNET_SINGLESIG, TESTNET_MULTISIG, TESTNET_SINGLESIG, c32_address,
};
use crate::clarity::{read_principal, skip_value};
use crate::reader::ByteReader;

const VERSION_MAINNET: u8 = 0x00;
const VERSION_TESTNET: u8 = 0x80;

const AUTH_STANDARD: u8 = 0x04;
const AUTH_SPONSORED: u8 = 0x05;

const HASH_MODE_P2PKH: u8 = 0x00;
const HASH_MODE_P2WPKH: u8 = 0x02;
const MULTISIG_HASH_MODES: [u8; 4] = [0x01, 0x03, 0x05, 0x07];

const PAYLOAD_TOKEN_TRANSFER: u8 = 0x00;
const PAYLOAD_SMART_CONTRACT: u8 = 0x01;
const PAYLOAD_CONTRACT_CALL: u8 = 0x02;
const PAYLOAD_POISON_MICROBLOCK: u8 = 0x03;
const PAYLOAD_COINBASE: u8 = 0x04;
const PAYLOAD_COINBASE_TO_ALT_RECIPIENT: u8 = 0x05;
const PAYLOAD_VERSIONED_SMART_CONTRACT: u8 = 0x06;

const MEMO_LEN: usize = 34;
const MICROBLOCK_HEADER_LEN: usize = 132;
const COINBASE_LEN: usize = 32;
const PUBLIC_KEY_LEN: usize = 33;
const SIGNATURE_LEN: usize = 65;

/// Decoder for the Stacks consensus serialization of transactions.
#[derive(Debug, Clone, Copy, Default)]
pub struct StacksTransactionDecoder;

impl StacksTransactionDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl TransactionDecoder for StacksTransactionDecoder {
    fn decode(&self, raw_tx: &[u8]) -> DecodeResult<DecodedTransaction> {
        let mut reader = ByteReader::new(raw_tx);

        let version = match reader.u8()? {
            VERSION_MAINNET => TransactionVersion::Mainnet,
            VERSION_TESTNET => TransactionVersion::Testnet,
            other => {
                return Err(DecodeError::InvalidValue {
                    field: "transaction version",
                    value: other,
                });
            }
        };
        let chain_id = reader.u32()?;

        let (origin, sponsor) = match reader.u8()? {
            AUTH_STANDARD => (read_spending_condition(&mut reader, version)?, None),
            AUTH_SPONSORED => {
                let origin = read_spending_condition(&mut reader, version)?;
                let sponsor = read_spending_condition(&mut reader, version)?;
                (origin, Some(sponsor))
            }
            other => {
                return Err(DecodeError::InvalidValue {
                    field: "authorization type",
                    value: other,
                });
            }
        };

        let anchor_mode = reader.u8()?;
        let post_condition_mode = reader.u8()?;

        let start = reader.offset();
        let count = reader.u32()?;
        for _ in 0..count {
            skip_post_condition(&mut reader)?;
        }
        let post_conditions = reader.since(start).to_vec();

        let payload = read_payload(&mut reader)?;

        if reader.remaining() > 0 {
            return Err(DecodeError::TrailingBytes(reader.remaining()));
        }

        trace!(
            sender = %origin.address,
            kind = payload.transaction_type().as_str(),
            "Decoded transaction"
        );

        Ok(DecodedTransaction {
            version,
            chain_id,
            origin,
            sponsor,
            anchor_mode,
            post_condition_mode,
            post_conditions,
            payload,
        })
    }
}

fn address_version(hash_mode: u8, version: TransactionVersion) -> u8 {
    match (hash_mode == HASH_MODE_P2PKH, version) {
        (true, TransactionVersion::Mainnet) => MAINNET_SINGLESIG,
        (true, TransactionVersion::Testnet) => TESTNET_SINGLESIG,
        (false, TransactionVersion::Mainnet) => MAINNET_MULTISIG,
        (false, TransactionVersion::Testnet) => TESTNET_MULTISIG,
    }
}

fn read_spending_condition(
    reader: &mut ByteReader<'_>,
    version: TransactionVersion,
) -> DecodeResult<SpendingCondition> {
    let hash_mode = reader.u8()?;
    let signer = reader.array::<20>()?;
    let nonce = reader.u64()?;
    let fee_rate = reader.u64()?;

    if hash_mode == HASH_MODE_P2PKH || hash_mode == HASH_MODE_P2WPKH {
        reader.u8()?; // key encoding
        reader.take(SIGNATURE_LEN)?;
    } else if MULTISIG_HASH_MODES.contains(&hash_mode) {
        let fields = reader.u32()?;
        for _ in 0..fields {
            match reader.u8()? {
                0x00 | 0x01 => reader.take(PUBLIC_KEY_LEN)?,
                0x02 | 0x03 => reader.take(SIGNATURE_LEN)?,
                other => {
                    return Err(DecodeError::InvalidValue {
                        field: "auth field type",
                        value: other,
                    });
                }
            };
        }
        reader.u16()?; // signatures required
    } else {
        return Err(DecodeError::InvalidValue {
            field: "hash mode",
            value: hash_mode,
        });
    }

    Ok(SpendingCondition {
        hash_mode,
        signer,
        address: c32_address(address_version(hash_mode, version), &signer),
        nonce,
        fee_rate,
    })
}

fn skip_post_condition_principal(reader: &mut ByteReader<'_>) -> DecodeResult<()> {
    match reader.u8()? {
        0x01 => {}
        0x02 => {
            reader.take(21)?;
        }
        0x03 => {
            reader.take(21)?;
            reader.short_string("contract name")?;
        }
        other => {
            return Err(DecodeError::InvalidValue {
                field: "post-condition principal",
                value: other,
            });
        }
    }
    Ok(())
}

fn skip_asset_info(reader: &mut ByteReader<'_>) -> DecodeResult<()> {
    reader.take(21)?;
    reader.short_string("contract name")?;
    reader.short_string("asset name")?;
    Ok(())
}

fn skip_post_condition(reader: &mut ByteReader<'_>) -> DecodeResult<()> {
    match reader.u8()? {
        0x00 => {
            skip_post_condition_principal(reader)?;
            reader.u8()?;
            reader.u64()?;
        }
        0x01 => {
            skip_post_condition_principal(reader)?;
            skip_asset_info(reader)?;
            reader.u8()?;
            reader.u64()?;
        }
        0x02 => {
            skip_post_condition_principal(reader)?;
            skip_asset_info(reader)?;
            skip_value(reader)?;
            reader.u8()?;
        }
        other => {
            return Err(DecodeError::InvalidValue {
                field: "post-condition type",
                value: other,
            });
        }
    }
    Ok(())
}

fn read_payload(reader: &mut ByteReader<'_>) -> DecodeResult<TransactionPayload> {
    let payload = match reader.u8()? {
        PAYLOAD_TOKEN_TRANSFER => TransactionPayload::TokenTransfer {
            recipient: read_principal(reader)?,
            amount: reader.u64()?,
            memo: reader.take(MEMO_LEN)?.to_vec(),
        },
        PAYLOAD_SMART_CONTRACT => TransactionPayload::SmartContract {
            contract_name: reader.short_string("contract name")?,
            code_body: reader.long_string("code body")?,
            clarity_version: None,
        },
        PAYLOAD_VERSIONED_SMART_CONTRACT => {
            let clarity_version = reader.u8()?;
            TransactionPayload::SmartContract {
                contract_name: reader.short_string("contract name")?,
                code_body: reader.long_string("code body")?,
                clarity_version: Some(clarity_version),
            }
        }
        PAYLOAD_CONTRACT_CALL => {
            let version = reader.u8()?;
            let hash = reader.array::<20>()?;
            let contract_name = reader.short_string("contract name")?;
            let function_name = reader.short_string("function name")?;

            let start = reader.offset();
            let count = reader.u32()?;
            for _ in 0..count {
                skip_value(reader)?;
            }

            TransactionPayload::ContractCall {
                contract_address: c32_address(version, &hash),
                contract_name,
                function_name,
                function_args: reader.since(start).to_vec(),
            }
        }
        PAYLOAD_POISON_MICROBLOCK => TransactionPayload::PoisonMicroblock {
            header_1: reader.take(MICROBLOCK_HEADER_LEN)?.to_vec(),
            header_2: reader.take(MICROBLOCK_HEADER_LEN)?.to_vec(),
        },
        PAYLOAD_COINBASE => TransactionPayload::Coinbase {
            payload: reader.take(COINBASE_LEN)?.to_vec(),
            alt_recipient: None,
        },
        PAYLOAD_COINBASE_TO_ALT_RECIPIENT => TransactionPayload::Coinbase {
            payload: reader.take(COINBASE_LEN)?.to_vec(),
            alt_recipient: Some(read_principal(reader)?),
        },
        other => return Err(DecodeError::UnknownPayloadType(other)),
    };
    Ok(payload)
}
