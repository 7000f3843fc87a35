//! Provider-neutral types for talking to chat completion services.
//!
//! The relay and the chat client only speak the types defined here, so
//! that the hosted completion API can be swapped (or faked in tests)
//! without touching the code that gates and forwards conversations.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod message;
mod provider;
mod request;
mod response;

pub use error::*;
pub use message::*;
pub use provider::*;
pub use request::*;
pub use response::*;
