//! The chat client of FitchatAI.
//!
//! A [`ChatSession`] keeps the conversation shown to the user, sends it to
//! the relay on every submission and appends the reply as it streams in.
//! The crate ships a terminal front end, and you can also use it as a
//! library to drive the chat from your own host apps.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod conversation;
mod decoder;
mod input;
mod session;
pub mod transport;

pub use conversation::{Conversation, Item, MessageId};
pub use decoder::Utf8Decoder;
pub use input::{InputBuffer, KeyAction};
pub use session::{ChatSession, ChatSessionBuilder, SessionSnapshot, TurnOutcome};
pub use transport::{HttpTransport, Transport, TransportError};

/// The first message of every conversation.
pub const GREETING: &str =
    "Hi! I'm the Headstarter support assistant. How can I help you today?";

/// Replaces the reply of a turn that failed.
pub const APOLOGY_MESSAGE: &str =
    "I'm sorry, but I encountered an error. Please try again later.";

/// Re-exports of [`fitchat_model`] crate.
pub mod model {
    pub use fitchat_model::*;
}
