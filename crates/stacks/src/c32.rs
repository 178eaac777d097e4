//! c32check address encoding.
//!
//! A Stacks address is `S`, the version character, and the c32 encoding
//! of `hash160 || checksum`, where the checksum is the first four bytes
//! of `sha256(sha256(version || hash160))`.

use sha2::{Digest, Sha256};

const C32_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Mainnet single-signature (`SP`).
pub const MAINNET_SINGLESIG: u8 = 22;
/// Mainnet multi-signature (`SM`).
pub const MAINNET_MULTISIG: u8 = 20;
/// Testnet single-signature (`ST`).
pub const TESTNET_SINGLESIG: u8 = 26;
/// Testnet multi-signature (`SN`).
pub const TESTNET_MULTISIG: u8 = 21;

/// Encode bytes in Crockford-style base32.
///
/// Leading zero bytes are kept as leading `0` characters, one per byte.
pub fn c32_encode(input: &[u8]) -> String {
    let mut out: Vec<u8> = Vec::with_capacity(input.len() * 8 / 5 + 1);
    let mut carry: u16 = 0;
    let mut carry_bits: u32 = 0;

    for &byte in input.iter().rev() {
        carry |= u16::from(byte) << carry_bits;
        carry_bits += 8;
        while carry_bits >= 5 {
            out.push(C32_ALPHABET[(carry & 0x1f) as usize]);
            carry >>= 5;
            carry_bits -= 5;
        }
    }
    if carry_bits > 0 {
        out.push(C32_ALPHABET[(carry & 0x1f) as usize]);
    }

    // Drop zero padding produced by the bit grouping
    while out.last() == Some(&b'0') {
        out.pop();
    }
    for _ in input.iter().take_while(|&&b| b == 0) {
        out.push(b'0');
    }

    out.reverse();
    out.into_iter().map(char::from).collect()
}

/// Format a c32check address.
pub fn c32_address(version: u8, hash160: &[u8; 20]) -> String {
    let mut versioned = Vec::with_capacity(21);
    versioned.push(version);
    versioned.extend_from_slice(hash160);
    let checksum = Sha256::digest(Sha256::digest(&versioned));

    let mut payload = Vec::with_capacity(24);
    payload.extend_from_slice(hash160);
    payload.extend_from_slice(&checksum[..4]);

    let version_char = char::from(C32_ALPHABET[(version & 0x1f) as usize]);
    format!("S{}{}", version_char, c32_encode(&payload))
}
