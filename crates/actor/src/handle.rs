use std::fmt::Debug;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::Instrument;

use crate::scheduler::run_actor;
use crate::{ActorState, ActorStoppedError};

/// The message that an actor can handle.
pub trait Message<S>: Send + Debug + 'static {
    /// Handles the message with mutable access to the actor's state.
    fn handle(self, state: &mut S, actor: &Actor<S>);
}

/// Object-safe form of [`Message`] for the mailbox.
pub(crate) trait Envelope<S>: Send + Debug + 'static {
    fn deliver(self: Box<Self>, state: &mut S, actor: &Actor<S>);
}

impl<S, M: Message<S>> Envelope<S> for M {
    #[inline]
    fn deliver(self: Box<Self>, state: &mut S, actor: &Actor<S>) {
        (*self).handle(state, actor)
    }
}

pub(crate) type BoxEnvelope<S> = Box<dyn Envelope<S>>;

pub(crate) struct Mailbox<S> {
    msg_tx: mpsc::UnboundedSender<BoxEnvelope<S>>,
    stop_tx: watch::Sender<bool>,
}

/// Handle to an actor.
///
/// The actor keeps running as long as any handle is alive, or until
/// [`Actor::try_stop`] is called.
pub struct Actor<S> {
    mailbox: Arc<Mailbox<S>>,
}

impl<S: ActorState> Actor<S> {
    /// Spawns a new actor with the specified state and an optional label
    /// for the tracing span.
    ///
    /// Must be called within a tokio runtime.
    pub fn spawn(state: S, label: Option<&str>) -> Self {
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);
        let mailbox = Arc::new(Mailbox { msg_tx, stop_tx });
        tokio::spawn(
            run_actor(Arc::downgrade(&mailbox), state, msg_rx, stop_rx)
                .instrument(trace_span!("actor", label = label)),
        );
        Self { mailbox }
    }
}

impl<S> Actor<S> {
    #[inline]
    pub(crate) fn from_mailbox(mailbox: Arc<Mailbox<S>>) -> Self {
        Self { mailbox }
    }

    /// Sends a message to the actor.
    ///
    /// Messages are handled one at a time, in the order they were sent.
    #[inline]
    pub fn send<M: Message<S>>(&self, msg: M) -> Result<(), ActorStoppedError> {
        self.mailbox
            .msg_tx
            .send(Box::new(msg))
            .map_err(|_| ActorStoppedError)
    }

    /// Attempts to stop the actor.
    ///
    /// The actor is not guaranteed to stop immediately, but it will stop
    /// handling further messages and quit soon.
    #[inline]
    pub fn try_stop(&self) {
        self.mailbox.stop_tx.send(true).ok();
    }

    /// Returns `true` if the actor still accepts messages.
    #[inline]
    pub fn is_alive(&self) -> bool {
        !self.mailbox.msg_tx.is_closed()
    }
}

impl<S> Clone for Actor<S> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            mailbox: Arc::clone(&self.mailbox),
        }
    }
}
