//! Event observer TCP endpoint.
//!
//! Accepts node connections, frames one message from each, and submits
//! its application to the serial queue. Connections are handled on their
//! own tasks; nothing that happens on one connection reaches the
//! acceptor or any other connection.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

use sidecar_core::error::{IngestError, IngestResult};
use sidecar_core::metrics::record_connection;
use sidecar_core::ports::{DataStore, TransactionDecoder};
use sidecar_core::services::{MessageApplier, SerialQueue};

use crate::config::ObserverConfig;
use crate::framing::read_one_message;

/// How long shutdown waits for connections still being read.
const CONNECTION_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Bound event observer endpoint.
pub struct EventObserver<S: DataStore, D: TransactionDecoder> {
    listener: TcpListener,
    max_message_bytes: usize,
    queue: SerialQueue,
    applier: Arc<MessageApplier<S, D>>,
}

impl<S, D> EventObserver<S, D>
where
    S: DataStore + 'static,
    D: TransactionDecoder + 'static,
{
    /// Bind the listening socket.
    pub async fn bind(
        config: &ObserverConfig,
        queue: SerialQueue,
        applier: Arc<MessageApplier<S, D>>,
    ) -> IngestResult<Self> {
        let addr = config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| IngestError::Internal(format!("failed to bind {addr}: {e}")))?;

        Ok(Self {
            listener,
            max_message_bytes: config.max_message_bytes,
            queue,
            applier,
        })
    }

    pub fn local_addr(&self) -> IngestResult<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| IngestError::Internal(e.to_string()))
    }

    /// Accept connections until shutdown is signalled.
    ///
    /// On shutdown, stops accepting and waits a bounded time for
    /// connections that are still being read to submit their message.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) -> IngestResult<()> {
        info!(addr = %self.local_addr()?, "📡 Event observer listening");
        let mut connections = JoinSet::new();

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }

                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        connections.spawn(handle_connection(
                            stream,
                            peer,
                            self.max_message_bytes,
                            self.queue.clone(),
                            self.applier.clone(),
                        ));
                    }
                    Err(e) => {
                        warn!(error = %e, "⚠️  Failed to accept connection");
                    }
                },

                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "❌ Connection task failed");
                    }
                }
            }
        }

        info!(in_flight = connections.len(), "🛑 Event observer stopping");
        let drained = tokio::time::timeout(CONNECTION_DRAIN_TIMEOUT, async {
            while connections.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(
                aborted = connections.len(),
                "⚠️  Connections still open at shutdown, aborting"
            );
            connections.abort_all();
        }

        debug!("Event observer stopped");
        Ok(())
    }
}

/// Make dropping `stream` send a reset instead of a clean close.
///
/// `set_linger` is deprecated because a non-zero linger blocks the
/// runtime thread on drop. A zero linger never blocks.
#[allow(deprecated)]
fn reset_on_close(stream: &TcpStream) -> std::io::Result<()> {
    stream.set_linger(Some(Duration::ZERO))
}

#[instrument(skip_all, fields(peer = %peer))]
async fn handle_connection<S, D>(
    mut stream: TcpStream,
    peer: SocketAddr,
    max_message_bytes: usize,
    queue: SerialQueue,
    applier: Arc<MessageApplier<S, D>>,
) where
    S: DataStore + 'static,
    D: TransactionDecoder + 'static,
{
    let message = match read_one_message(&mut stream, max_message_bytes).await {
        Ok(Some(message)) => message,
        Ok(None) => {
            debug!("Empty message, ignoring");
            record_connection("empty");
            return;
        }
        Err(e) => {
            warn!(error = %e, "⚠️  Undecodable message, resetting connection");
            record_connection("malformed");
            if let Err(e) = reset_on_close(&stream) {
                debug!(error = %e, "Could not set linger");
            }
            return;
        }
    };
    drop(stream);

    let block = message.block_height;
    record_connection("submitted");
    let submission = queue.submit(async move { applier.apply(message).await });

    match submission.await {
        Ok(Ok(summary)) => {
            debug!(block, events = summary.events, "Message applied");
        }
        Ok(Err(e)) => {
            error!(block, kind = e.kind(), error = %e, "❌ Failed to apply message");
        }
        Err(e) => {
            error!(block, error = %e, "❌ Message was not applied");
        }
    }
}
