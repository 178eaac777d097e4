//! One message per connection.
//!
//! The node opens a connection, writes one JSON document and closes its
//! side. The whole body is read up to EOF, bounded by a size limit.

use tokio::io::{AsyncRead, AsyncReadExt};

use sidecar_core::error::{FramingError, FramingResult};
use sidecar_core::ports::CoreNodeMessage;

/// Read the single message carried by `reader`.
///
/// Returns `Ok(None)` when the body is empty or only whitespace.
pub async fn read_one_message<R>(
    reader: &mut R,
    max_bytes: usize,
) -> FramingResult<Option<CoreNodeMessage>>
where
    R: AsyncRead + Unpin,
{
    let mut body = Vec::new();
    // One byte past the limit tells "exactly at the limit" from "over it"
    let mut limited = reader.take(max_bytes as u64 + 1);
    limited.read_to_end(&mut body).await?;

    if body.len() > max_bytes {
        return Err(FramingError::TooLarge { limit: max_bytes });
    }
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    serde_json::from_slice(&body)
        .map(Some)
        .map_err(|e| FramingError::Malformed(e.to_string()))
}
