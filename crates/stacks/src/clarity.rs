//! Clarity value framing.
//!
//! The decoder never interprets Clarity values; it only needs to know
//! where one ends so that it can keep the raw bytes and continue.

use sidecar_core::error::{DecodeError, DecodeResult};

use crate::c32::c32_address;
use crate::reader::ByteReader;

/// Maximum nesting of lists, tuples, optionals and responses.
pub const MAX_VALUE_DEPTH: usize = 64;

const TYPE_INT: u8 = 0x00;
const TYPE_UINT: u8 = 0x01;
const TYPE_BUFFER: u8 = 0x02;
const TYPE_TRUE: u8 = 0x03;
const TYPE_FALSE: u8 = 0x04;
const TYPE_STANDARD_PRINCIPAL: u8 = 0x05;
const TYPE_CONTRACT_PRINCIPAL: u8 = 0x06;
const TYPE_RESPONSE_OK: u8 = 0x07;
const TYPE_RESPONSE_ERR: u8 = 0x08;
const TYPE_NONE: u8 = 0x09;
const TYPE_SOME: u8 = 0x0a;
const TYPE_LIST: u8 = 0x0b;
const TYPE_TUPLE: u8 = 0x0c;
const TYPE_STRING_ASCII: u8 = 0x0d;
const TYPE_STRING_UTF8: u8 = 0x0e;

/// Advance past one serialized value.
pub(crate) fn skip_value(reader: &mut ByteReader<'_>) -> DecodeResult<()> {
    skip_nested(reader, 0)
}

fn skip_nested(reader: &mut ByteReader<'_>, depth: usize) -> DecodeResult<()> {
    if depth > MAX_VALUE_DEPTH {
        return Err(DecodeError::DepthExceeded(MAX_VALUE_DEPTH));
    }

    match reader.u8()? {
        TYPE_INT | TYPE_UINT => {
            reader.take(16)?;
        }
        TYPE_BUFFER | TYPE_STRING_ASCII | TYPE_STRING_UTF8 => {
            let len = reader.u32()? as usize;
            reader.take(len)?;
        }
        TYPE_TRUE | TYPE_FALSE | TYPE_NONE => {}
        TYPE_STANDARD_PRINCIPAL => {
            reader.take(21)?;
        }
        TYPE_CONTRACT_PRINCIPAL => {
            reader.take(21)?;
            let len = reader.u8()? as usize;
            reader.take(len)?;
        }
        TYPE_RESPONSE_OK | TYPE_RESPONSE_ERR | TYPE_SOME => skip_nested(reader, depth + 1)?,
        TYPE_LIST => {
            let count = reader.u32()?;
            for _ in 0..count {
                skip_nested(reader, depth + 1)?;
            }
        }
        TYPE_TUPLE => {
            let count = reader.u32()?;
            for _ in 0..count {
                let name_len = reader.u8()? as usize;
                reader.take(name_len)?;
                skip_nested(reader, depth + 1)?;
            }
        }
        other => {
            return Err(DecodeError::InvalidValue {
                field: "clarity type",
                value: other,
            });
        }
    }
    Ok(())
}

/// Read a principal value and render it as `address` or `address.contract`.
pub(crate) fn read_principal(reader: &mut ByteReader<'_>) -> DecodeResult<String> {
    match reader.u8()? {
        TYPE_STANDARD_PRINCIPAL => {
            let version = reader.u8()?;
            let hash = reader.array::<20>()?;
            Ok(c32_address(version, &hash))
        }
        TYPE_CONTRACT_PRINCIPAL => {
            let version = reader.u8()?;
            let hash = reader.array::<20>()?;
            let name = reader.short_string("contract name")?;
            Ok(format!("{}.{}", c32_address(version, &hash), name))
        }
        other => Err(DecodeError::InvalidValue {
            field: "principal type",
            value: other,
        }),
    }
}
