pub mod message;
pub mod types;

pub use message::{ControlMessage, IncomingMessage, OutgoingMessage, PageMessage};
pub use types::{ClassificationResult, Label, Verdict};
