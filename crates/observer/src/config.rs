//! Observer configuration.

use sidecar_core::error::{IngestError, IngestResult};

/// Default bound on one message body (64 MiB).
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 64 * 1024 * 1024;

/// Listening address and framing limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObserverConfig {
    pub host: String,
    pub port: u16,
    pub max_message_bytes: usize,
}

impl ObserverConfig {
    /// Build a configuration, rejecting a missing host or port.
    ///
    /// There is no default listening address: the node must be pointed
    /// at an address the operator chose.
    pub fn from_parts(
        host: Option<String>,
        port: Option<u16>,
        max_message_bytes: Option<usize>,
    ) -> IngestResult<Self> {
        let host = host
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .ok_or_else(|| IngestError::ConfigError("event observer host is not set".into()))?;
        let port =
            port.ok_or_else(|| IngestError::ConfigError("event observer port is not set".into()))?;
        let max_message_bytes = max_message_bytes.unwrap_or(DEFAULT_MAX_MESSAGE_BYTES);
        if max_message_bytes == 0 {
            return Err(IngestError::ConfigError(
                "max message size must be positive".into(),
            ));
        }

        Ok(Self {
            host,
            port,
            max_message_bytes,
        })
    }

    /// `host:port`, suitable for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
