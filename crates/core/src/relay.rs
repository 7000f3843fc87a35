//! Relays accepted conversations to the completion service and streams
//! the generated text back.

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::Bytes;
use fitchat_model::{
    ErrorKind, Message, ModelProvider, ModelProviderError, ModelRequest,
    ModelResponse, ModelResponseEvent,
};
use futures_util::Stream;
use tracing::Span;

use crate::prompt::{REJECTION_MESSAGE, SYSTEM_PROMPT};
use crate::topic::TopicGate;

/// The completion service failed while the reply was being streamed.
#[derive(Debug)]
pub struct RelayError {
    kind: ErrorKind,
    source: Box<dyn StdError + Send + Sync>,
}

impl RelayError {
    fn new<E: ModelProviderError>(err: E) -> Self {
        Self {
            kind: err.kind(),
            source: Box::new(err),
        }
    }

    /// Returns the kind of the upstream error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "completion service failed: {}", self.source)
    }
}

impl StdError for RelayError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&*self.source)
    }
}

/// The outcome of relaying a conversation.
pub enum RelayReply<R: ModelResponse> {
    /// The conversation is off-topic, reply with this text as-is.
    Rejected(&'static str),
    /// The conversation was sent to the completion service.
    Streaming(DeltaStream<R>),
}

impl<R: ModelResponse> fmt::Debug for RelayReply<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(text) => f.debug_tuple("Rejected").field(text).finish(),
            Self::Streaming(_) => f.debug_tuple("Streaming").finish_non_exhaustive(),
        }
    }
}

/// Gates conversations by topic and relays the accepted ones to a model
/// provider.
///
/// A relay holds no per-request state, one instance serves any number of
/// concurrent requests.
pub struct Relay<P> {
    provider: P,
    gate: TopicGate,
    system_prompt: String,
}

impl<P: ModelProvider> Relay<P> {
    /// Creates a relay with the default topic gate and system prompt.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            gate: TopicGate::default(),
            system_prompt: SYSTEM_PROMPT.to_owned(),
        }
    }

    /// Replaces the system prompt.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Replaces the topic gate.
    #[inline]
    pub fn with_topic_gate(mut self, gate: TopicGate) -> Self {
        self.gate = gate;
        self
    }

    /// Returns the system prompt.
    #[inline]
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Relays a conversation.
    ///
    /// Off-topic conversations are answered with [`REJECTION_MESSAGE`]
    /// without touching the provider. Otherwise the request is issued with
    /// the system prompt prepended, and the returned stream yields the
    /// text deltas as the provider produces them.
    pub fn relay(&self, conversation: Vec<Message>) -> RelayReply<P::Response> {
        if !self.gate.is_in_scope(&conversation) {
            info!(messages = conversation.len(), "conversation rejected");
            return RelayReply::Rejected(REJECTION_MESSAGE);
        }
        info!(messages = conversation.len(), "conversation accepted");

        let mut messages = Vec::with_capacity(conversation.len() + 1);
        messages.push(Message::system(self.system_prompt.as_str()));
        messages.extend(conversation);
        let req = ModelRequest { messages };
        trace!("sending request: {req:?}");

        let connect = self.provider.send_request(&req);
        RelayReply::Streaming(DeltaStream {
            state: State::Connecting(Box::pin(connect)),
            forwarded: 0,
            span: Span::current(),
        })
    }
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

enum State<R: ModelResponse> {
    Connecting(PinnedFuture<Result<R, R::Error>>),
    Streaming(Pin<Box<R>>),
    Done,
}

/// The text deltas of one completion, as UTF-8 bytes.
///
/// The upstream request only makes progress while the stream is polled,
/// and each poll pulls at most up to the next non-empty delta, so the
/// stream never runs ahead of its consumer. Deltas come out in arrival order,
/// unmodified; events without text are skipped.
///
/// An upstream failure is yielded once as an error item, after which the
/// stream is terminated.
///
/// Polling happens inside the span that was current when the stream was
/// created.
pub struct DeltaStream<R: ModelResponse> {
    state: State<R>,
    forwarded: usize,
    span: Span,
}

impl<R: ModelResponse> DeltaStream<R> {
    fn fail(&mut self, err: R::Error) -> Poll<Option<Result<Bytes, RelayError>>> {
        error!(forwarded = self.forwarded, "relay aborted: {err}");
        self.state = State::Done;
        Poll::Ready(Some(Err(RelayError::new(err))))
    }
}

impl<R: ModelResponse> Stream for DeltaStream<R> {
    type Item = Result<Bytes, RelayError>;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let span = this.span.clone();
        let _guard = span.enter();
        loop {
            match &mut this.state {
                State::Connecting(connect) => match ready!(connect.as_mut().poll(cx)) {
                    Ok(resp) => {
                        debug!("completion stream opened");
                        this.state = State::Streaming(Box::pin(resp));
                    }
                    Err(err) => return this.fail(err),
                },
                State::Streaming(resp) => {
                    match ready!(resp.as_mut().poll_next_event(cx)) {
                        Ok(Some(ModelResponseEvent::MessageDelta(delta)))
                            if !delta.is_empty() =>
                        {
                            this.forwarded += 1;
                            return Poll::Ready(Some(Ok(Bytes::from(delta))));
                        }
                        Ok(Some(event)) => {
                            trace!("skipped event: {event:?}");
                        }
                        Ok(None) => {
                            debug!(forwarded = this.forwarded, "relay finished");
                            this.state = State::Done;
                            return Poll::Ready(None);
                        }
                        Err(err) => return this.fail(err),
                    }
                }
                State::Done => return Poll::Ready(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::future::ready;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use fitchat_model::Role;
    use fitchat_test_model::{
        PresetEvent, PresetResponse, ScriptedModelProvider,
    };
    use futures_util::StreamExt;

    use super::*;

    #[derive(Debug)]
    struct NeverFails;

    impl Display for NeverFails {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("never fails")
        }
    }

    impl StdError for NeverFails {}

    impl ModelProviderError for NeverFails {
        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    /// Counts how many events were pulled from the response.
    struct CountingProvider {
        deltas: Vec<&'static str>,
        polls: Arc<AtomicUsize>,
    }

    struct CountingResponse {
        deltas: VecDeque<&'static str>,
        polls: Arc<AtomicUsize>,
    }

    impl ModelResponse for CountingResponse {
        type Error = NeverFails;

        fn poll_next_event(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
            let this = self.get_mut();
            this.polls.fetch_add(1, Ordering::SeqCst);
            let event = this
                .deltas
                .pop_front()
                .map(|delta| ModelResponseEvent::MessageDelta(delta.to_owned()));
            Poll::Ready(Ok(event))
        }
    }

    impl ModelProvider for CountingProvider {
        type Error = NeverFails;
        type Response = CountingResponse;

        fn send_request(
            &self,
            _req: &ModelRequest,
        ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
        {
            ready(Ok(CountingResponse {
                deltas: self.deltas.iter().copied().collect(),
                polls: Arc::clone(&self.polls),
            }))
        }
    }

    async fn drain<R: ModelResponse>(
        stream: DeltaStream<R>,
    ) -> Vec<Result<Bytes, RelayError>> {
        stream.collect().await
    }

    fn expect_streaming<R: ModelResponse>(reply: RelayReply<R>) -> DeltaStream<R> {
        match reply {
            RelayReply::Streaming(stream) => stream,
            RelayReply::Rejected(text) => panic!("unexpected rejection: {text}"),
        }
    }

    #[tokio::test]
    async fn test_rejected() {
        let provider = ScriptedModelProvider::default();
        let relay = Relay::new(provider.clone());

        let reply = relay.relay(vec![Message::user("What's the capital of France?")]);
        assert!(matches!(reply, RelayReply::Rejected(REJECTION_MESSAGE)));
        assert_eq!(provider.request_count(), 0);
    }

    #[tokio::test]
    async fn test_accepted() {
        let provider = ScriptedModelProvider::default();
        provider.add_response(PresetResponse::with_deltas([
            "Try ", "deep breath", "ing.",
        ]));
        let relay = Relay::new(provider.clone());

        let conversation = vec![
            Message::assistant("Hi! How can I help you today?"),
            Message::user("Can you give me tips to reduce stress?"),
        ];
        let stream = expect_streaming(relay.relay(conversation.clone()));
        let chunks = drain(stream).await;
        let chunks: Vec<_> = chunks.into_iter().map(Result::unwrap).collect();
        assert_eq!(chunks, ["Try ", "deep breath", "ing."]);

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        let sent = &requests[0].messages;
        assert_eq!(sent[0], Message::system(SYSTEM_PROMPT));
        assert_eq!(&sent[1..], &conversation[..]);
    }

    #[tokio::test]
    async fn test_skip_empty_deltas() {
        let provider = ScriptedModelProvider::default();
        provider.add_response(PresetResponse::with_deltas([
            "", "Eat ", "", "more ", "greens", "",
        ]));
        let relay = Relay::new(provider);

        let stream = expect_streaming(relay.relay(vec![Message::user("diet?")]));
        let body: Vec<u8> = drain(stream)
            .await
            .into_iter()
            .flat_map(|chunk| chunk.unwrap().to_vec())
            .collect();
        assert_eq!(body, b"Eat more greens");
    }

    #[tokio::test]
    async fn test_upstream_failure() {
        let provider = ScriptedModelProvider::default();
        provider.add_response(PresetResponse::with_events([
            PresetEvent::MessageDelta("Stretch ".to_owned()),
            PresetEvent::Failure("connection reset".to_owned()),
            PresetEvent::MessageDelta("daily".to_owned()),
        ]));
        let relay = Relay::new(provider);

        let mut stream =
            expect_streaming(relay.relay(vec![Message::user("fitness plan")]));
        assert_eq!(stream.next().await.unwrap().unwrap(), "Stretch ");
        let err = stream.next().await.unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert!(stream.next().await.is_none());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_connect_failure() {
        let provider = ScriptedModelProvider::default();
        provider.add_response(PresetResponse::with_request_failure("unauthorized"));
        let relay = Relay::new(provider.clone());

        let stream = expect_streaming(relay.relay(vec![Message::user("therapy")]));
        let chunks = drain(stream).await;
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].is_err());
        assert_eq!(provider.request_count(), 1);
    }

    #[tokio::test]
    async fn test_custom_prompt_and_gate() {
        let provider = ScriptedModelProvider::default();
        provider.add_response(PresetResponse::with_deltas(["Namaste"]));
        let relay = Relay::new(provider.clone())
            .with_system_prompt("You are a yoga teacher.")
            .with_topic_gate(TopicGate::with_keywords(["yoga"]));

        let reply = relay.relay(vec![Message::user("health")]);
        assert!(matches!(reply, RelayReply::Rejected(_)));

        let stream = expect_streaming(relay.relay(vec![Message::user("Yoga?")]));
        assert_eq!(drain(stream).await.len(), 1);
        let sent = &provider.requests()[0].messages;
        assert_eq!(sent[0].role, Role::System);
        assert_eq!(sent[0].content, "You are a yoga teacher.");
    }

    #[tokio::test]
    async fn test_pulls_on_demand() {
        let polls = Arc::new(AtomicUsize::new(0));
        let relay = Relay::new(CountingProvider {
            deltas: vec!["Drink ", "", "water."],
            polls: Arc::clone(&polls),
        });

        let mut stream =
            expect_streaming(relay.relay(vec![Message::user("nutrition")]));
        assert_eq!(polls.load(Ordering::SeqCst), 0);

        assert_eq!(stream.next().await.unwrap().unwrap(), "Drink ");
        assert_eq!(polls.load(Ordering::SeqCst), 1);

        // The empty delta is pulled and skipped on the way to the next one.
        assert_eq!(stream.next().await.unwrap().unwrap(), "water.");
        assert_eq!(polls.load(Ordering::SeqCst), 3);

        assert!(stream.next().await.is_none());
        assert_eq!(polls.load(Ordering::SeqCst), 4);
    }
}
