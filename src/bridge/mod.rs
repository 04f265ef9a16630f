//! Native-messaging host: length-prefixed JSON frames over stdin/stdout.

pub mod codec;
mod session;

pub use session::BridgeSession;
