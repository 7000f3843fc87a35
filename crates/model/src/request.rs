use crate::Message;

/// A request to be sent to the model provider.
///
/// Responses are always requested in streaming mode, there is no
/// non-streaming variant of this request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ModelRequest {
    /// The input messages, including the system prompt if any.
    pub messages: Vec<Message>,
}

impl ModelRequest {
    /// Creates a request with the given messages.
    #[inline]
    pub fn with_messages(messages: impl Into<Vec<Message>>) -> Self {
        Self {
            messages: messages.into(),
        }
    }
}
