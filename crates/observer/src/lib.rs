//! Event observer endpoint for the Stacks event sidecar.
//!
//! The Stacks node pushes one JSON notification per connection. This
//! crate owns the listening socket, the framing of those notifications
//! and their hand-off to the serial queue of `sidecar-core`.

mod config;
mod framing;
mod server;

pub use config::{DEFAULT_MAX_MESSAGE_BYTES, ObserverConfig};
pub use framing::read_one_message;
pub use server::EventObserver;
