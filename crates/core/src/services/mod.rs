//! Business logic services.
//!
//! - [`parse_message`] / [`classify_event`] - turn node JSON into records
//! - [`MessageApplier`] - writes one message's records in order
//! - [`SerialQueue`] - runs applications one at a time

mod applier;
mod classifier;
mod parsing;
mod queue;

#[cfg(test)]
pub(crate) mod test_support;

pub use applier::{
    ApplySummary, MessageApplier, ParsedMessage, ParsedTransaction, PendingEvent, parse_message,
};
pub use classifier::classify_event;
pub use parsing::{decode_hex, parse_amount, parse_block_hash, parse_tx_id};
pub use queue::{QueueWorker, SerialQueue, Submission};
