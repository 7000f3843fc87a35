//! A lightweight actor framework on top of tokio tasks.
//!
//! An actor owns its state exclusively; other parties only hold an
//! [`Actor`] handle and mutate the state by sending [`Message`]s, which
//! are handled sequentially on the actor's task.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod error;
mod handle;
mod scheduler;

pub use error::ActorStoppedError;
pub use handle::{Actor, Message};

/// The state owned by an actor.
pub trait ActorState: Send + 'static {
    /// Invoked once on the actor's task after it stops handling messages.
    ///
    /// Use it to release resources, like aborting background tasks the
    /// actor has spawned.
    fn stopped(&mut self) {}
}
