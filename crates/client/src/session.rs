mod builder;
mod state;

use fitchat_actor::{Actor, ActorState};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::conversation::Conversation;
use crate::transport::TransportClient;
pub use builder::ChatSessionBuilder;
use state::{QuerySnapshot, Submit, TurnStage};

/// How a turn ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The whole reply arrived.
    Completed,
    /// The turn failed and its reply was replaced with an apology.
    Failed,
}

/// A copy of the session state at some point in time.
#[derive(Clone, Debug)]
pub struct SessionSnapshot {
    /// The conversation shown to the user.
    pub conversation: Conversation,
    /// `true` while a turn is running. Submissions are ignored meanwhile.
    pub busy: bool,
}

pub(crate) struct SessionState {
    transport: TransportClient,
    conversation: Conversation,
    stage: TurnStage,
    running_turn: Option<JoinHandle<()>>,

    on_update: Option<Box<dyn Fn(&Conversation) + Send + Sync>>,
    on_fragment: Option<Box<dyn Fn(&str) + Send + Sync>>,
    on_turn_end: Option<Box<dyn Fn(TurnOutcome) + Send + Sync>>,
}

impl ActorState for SessionState {
    fn stopped(&mut self) {
        if let Some(task) = self.running_turn.take() {
            debug!("cancelling the running turn");
            task.abort();
        }
    }
}

/// A chat session, like a window that displays messages and has an input
/// box.
///
/// At most one turn runs at a time: a submission is ignored while the
/// previous reply is still streaming.
pub struct ChatSession {
    actor: Actor<SessionState>,
}

impl ChatSession {
    /// Submits a user message.
    ///
    /// Blank input and input submitted while busy are dropped.
    pub fn submit<S: Into<String>>(&self, input: S) {
        if self.actor.send(Submit(input.into())).is_err() {
            warn!("session has been closed, submission dropped");
        }
    }

    /// Takes a snapshot of the session, or `None` if it has been closed.
    pub async fn snapshot(&self) -> Option<SessionSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.actor.send(QuerySnapshot(tx)).ok()?;
        rx.await.ok()
    }

    /// Closes the session, cancelling the running turn.
    #[inline]
    pub fn close(&self) {
        self.actor.try_stop();
    }
}

impl ChatSession {
    fn spawn_from_builder(builder: ChatSessionBuilder) -> Self {
        let ChatSessionBuilder {
            transport,
            conversation,
            on_update,
            on_fragment,
            on_turn_end,
        } = builder;

        let state = SessionState {
            transport,
            conversation,
            stage: TurnStage::default(),
            running_turn: None,
            on_update,
            on_fragment,
            on_turn_end,
        };
        let actor = Actor::spawn(state, Some("chat session"));
        Self { actor }
    }
}
