//! Core domain layer for the Stacks event sidecar.
//!
//! This crate contains the domain models, port traits (interfaces), and
//! the services that turn node notifications into store writes. It is the
//! innermost layer and has no dependency on sockets, databases or the
//! transaction wire format.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     sidecar (binary)                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │   sidecar-observer     │  sidecar-stacks  │  sidecar-storage │
//! │   (TCP endpoint)       │  (tx decoding)   │  (memory / PG)   │
//! ├────────────────────────┴──────────────────┴─────────────────┤
//! │                     sidecar-core                            │
//! │               (models, ports, services)                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`models`] - Records written to the store (blocks, txs, events)
//! - [`ports`] - Node wire types and the traits adapters implement
//! - [`services`] - Parsing, classification, application, serial queue
//! - [`error`] - Error types
//! - [`metrics`] - Prometheus metrics definitions
//!
//! # Message flow
//!
//! 1. The observer reads one [`ports::CoreNodeMessage`] per connection
//! 2. It submits `MessageApplier::apply` to the [`services::SerialQueue`]
//! 3. The applier parses the message with a [`ports::TransactionDecoder`]
//!    and writes block, transactions, contracts and events to the
//!    [`ports::DataStore`], in that order
//!
//! Applications never overlap, so the store sees the writes of one
//! message as a contiguous run.

pub mod error;
pub mod metrics;
pub mod models;
pub mod ports;
pub mod services;

pub use error::{DomainError, IngestError, IngestResult, StorageError};
