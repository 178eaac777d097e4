//! Stacks transaction decoding for the event sidecar.
//!
//! Implements [`sidecar_core::ports::TransactionDecoder`] for the Stacks
//! consensus serialization and derives c32check addresses for the
//! spending conditions it finds.

pub mod c32;
mod clarity;
mod decoder;
mod reader;

pub use c32::{c32_address, c32_encode};
pub use clarity::MAX_VALUE_DEPTH;
pub use decoder::StacksTransactionDecoder;
