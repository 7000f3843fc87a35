//! Core logic of the chat relay: the topic gate deciding which
//! conversations are served, and the relay streaming completions back.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod prompt;
pub mod relay;
pub mod topic;

pub use prompt::{REJECTION_MESSAGE, SYSTEM_PROMPT};
pub use relay::{DeltaStream, Relay, RelayError, RelayReply};
pub use topic::TopicGate;

/// Re-exports of [`fitchat_model`] crate.
pub mod model {
    pub use fitchat_model::*;
}
