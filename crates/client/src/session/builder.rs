use super::{ChatSession, TurnOutcome};
use crate::conversation::Conversation;
use crate::transport::{Transport, TransportClient};

/// [`ChatSession`] builder.
pub struct ChatSessionBuilder {
    pub(crate) transport: TransportClient,
    pub(crate) conversation: Conversation,
    pub(crate) on_update: Option<Box<dyn Fn(&Conversation) + Send + Sync>>,
    pub(crate) on_fragment: Option<Box<dyn Fn(&str) + Send + Sync>>,
    pub(crate) on_turn_end: Option<Box<dyn Fn(TurnOutcome) + Send + Sync>>,
}

impl ChatSessionBuilder {
    /// Creates a new builder with the specified transport.
    #[inline]
    pub fn with_transport<T: Transport>(transport: T) -> Self {
        Self {
            transport: TransportClient::new(transport),
            conversation: Conversation::default(),
            on_update: None,
            on_fragment: None,
            on_turn_end: None,
        }
    }

    /// Replaces the seeded greeting.
    #[inline]
    pub fn with_greeting<S: Into<String>>(mut self, greeting: S) -> Self {
        self.conversation = Conversation::with_greeting(greeting);
        self
    }

    /// Attaches a callback to be invoked whenever the conversation changes.
    #[inline]
    pub fn on_update(
        mut self,
        on_update: impl Fn(&Conversation) + Send + Sync + 'static,
    ) -> Self {
        self.on_update = Some(Box::new(on_update));
        self
    }

    /// Attaches a callback to be invoked with each piece of the reply, as
    /// it's appended.
    #[inline]
    pub fn on_fragment(
        mut self,
        on_fragment: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        self.on_fragment = Some(Box::new(on_fragment));
        self
    }

    /// Attaches a callback to be invoked when a turn ends and the session
    /// accepts input again.
    #[inline]
    pub fn on_turn_end(
        mut self,
        on_turn_end: impl Fn(TurnOutcome) + Send + Sync + 'static,
    ) -> Self {
        self.on_turn_end = Some(Box::new(on_turn_end));
        self
    }

    /// Builds the session.
    ///
    /// Must be called within a tokio runtime.
    #[inline]
    pub fn build(self) -> ChatSession {
        ChatSession::spawn_from_builder(self)
    }
}
