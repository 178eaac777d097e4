mod decoder;
mod node_message;
mod store;

pub use decoder::*;
pub use node_message::*;
pub use store::*;
