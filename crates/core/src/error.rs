//! Error types for the sidecar domain layer.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`DomainError`] - Message parsing and event classification failures
//! - [`StorageError`] - Database/store errors
//! - [`DecodeError`] - Stacks transaction wire-format errors
//! - [`FramingError`] - Socket framing errors
//! - [`IngestError`] - Top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Domain Errors
// =============================================================================

/// Message parsing and event classification failures.
///
/// Any of these is fatal for the message being applied. Records written
/// before the failure point stay written.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Event tag outside the closed set of recognized tags.
    #[error("Unknown event type '{tag}' at event index {event_index}")]
    UnknownEventType {
        /// Position of the event within the message.
        event_index: u32,
        /// Tag as sent by the node.
        tag: String,
    },

    /// Recognized tag whose payload object is absent.
    #[error("Event {event_index} of type '{tag}' has no payload")]
    MissingEventPayload {
        /// Position of the event within the message.
        event_index: u32,
        /// Tag as sent by the node.
        tag: String,
    },

    /// Event references a transaction that is not part of the message.
    #[error("Event {event_index} references unknown transaction {tx_id}")]
    OrphanEvent {
        /// Position of the event within the message.
        event_index: u32,
        /// Transaction id named by the event.
        tx_id: String,
    },

    /// Hex-encoded field could not be decoded.
    #[error("Invalid hex in {field}: {reason}")]
    InvalidHex {
        /// Field name, for diagnosis.
        field: String,
        /// Decoder message.
        reason: String,
    },

    /// Decimal amount could not be parsed.
    #[error("Invalid amount in {field}: '{value}'")]
    InvalidAmount {
        /// Field name, for diagnosis.
        field: String,
        /// Raw value as received.
        value: String,
    },

    /// Hash field had the wrong length or encoding.
    #[error("Invalid hash in {field}: {value}")]
    InvalidHash {
        /// Field name, for diagnosis.
        field: String,
        /// Raw value as received.
        value: String,
    },

    /// Transaction status string not recognized.
    #[error("Unknown transaction status: {0}")]
    UnknownTransactionStatus(String),

    /// Transaction payload could not be decoded.
    #[error("Transaction {tx_id} could not be decoded: {source}")]
    TransactionDecode {
        /// Transaction id as sent by the node.
        tx_id: String,
        /// Underlying wire-format error.
        #[source]
        source: DecodeError,
    },

    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Database and store errors.
///
/// These errors originate from storage operations like queries,
/// transactions, and data serialization.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to establish database connection.
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    /// SQL query execution failed.
    #[error("Query execution error: {0}")]
    QueryError(String),

    /// Database migration failed.
    #[error("Migration error: {0}")]
    MigrationError(String),

    /// Transaction commit/rollback failed.
    #[error("Transaction error: {0}")]
    TransactionError(String),

    /// Data serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// =============================================================================
// Decode Errors
// =============================================================================

/// Stacks transaction wire-format errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Input ended before a field was complete.
    #[error("Unexpected end of input at offset {offset}: needed {needed} more bytes")]
    UnexpectedEof {
        /// Offset where the read started.
        offset: usize,
        /// Bytes missing.
        needed: usize,
    },

    /// A field held a value outside its allowed set.
    #[error("Invalid {field}: {value:#04x}")]
    InvalidValue {
        /// Field name.
        field: &'static str,
        /// Offending byte.
        value: u8,
    },

    /// Payload type byte not recognized.
    #[error("Unknown payload type: {0:#04x}")]
    UnknownPayloadType(u8),

    /// A name or code body was not valid UTF-8.
    #[error("Invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),

    /// Clarity value nesting exceeded the depth limit.
    #[error("Clarity value nested deeper than {0}")]
    DepthExceeded(usize),

    /// Bytes remained after the payload.
    #[error("{0} trailing bytes after payload")]
    TrailingBytes(usize),
}

// =============================================================================
// Framing Errors
// =============================================================================

/// Errors reading one message off a connection.
#[derive(Debug, Error)]
pub enum FramingError {
    /// Socket read failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Message exceeded the configured size limit.
    #[error("Message exceeds {limit} bytes")]
    TooLarge {
        /// Configured limit in bytes.
        limit: usize,
    },

    /// Body is not a valid node message.
    #[error("Malformed message: {0}")]
    Malformed(String),
}

// =============================================================================
// Ingest Errors
// =============================================================================

/// Top-level sidecar orchestration errors.
///
/// This is the error type returned by [`crate::services::MessageApplier`]
/// and the serial queue. Wire-format errors reach it through
/// [`DomainError::TransactionDecode`]; framing errors stay with the
/// connection that produced them.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Parsing or classification error.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Storage/database error.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The serial queue no longer admits tasks.
    #[error("Serial queue is closed")]
    QueueClosed,

    /// A queued task panicked before producing a result.
    #[error("Queued task aborted before completion")]
    TaskAborted,

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IngestError {
    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Domain(DomainError::Storage(_)) | Self::Storage(_) => "storage",
            Self::Domain(DomainError::TransactionDecode { .. }) => "decode",
            Self::Domain(_) => "domain",
            Self::ConfigError(_) => "config",
            Self::QueueClosed | Self::TaskAborted => "queue",
            Self::Internal(_) => "internal",
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for sidecar operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type for transaction decoding.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Result type for framing.
pub type FramingResult<T> = Result<T, FramingError>;
