//! How the session reaches the relay.

use std::error::Error;
use std::fmt::{self, Display};
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use fitchat_model::Message;
use futures_util::Stream;
use futures_util::stream;
use reqwest::Client;

/// Path of the chat endpoint, relative to the relay's base URL.
pub const CHAT_PATH: &str = "/api/chat";

/// The body of a reply, chunk by chunk as it arrives.
pub type ReplyStream =
    Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// The reasons a turn can fail in transit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportError {
    /// The relay answered with a non-success status.
    Status(u16),
    /// The request couldn't be delivered.
    Connect(String),
    /// The reply body broke off.
    Stream(String),
}

impl Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(code) => write!(f, "unexpected status {code}"),
            Self::Connect(msg) => write!(f, "failed to reach the relay: {msg}"),
            Self::Stream(msg) => write!(f, "reply interrupted: {msg}"),
        }
    }
}

impl Error for TransportError {}

/// Sends conversations to the relay.
pub trait Transport: Send + Sync + 'static {
    /// Posts the conversation and resolves once the reply starts.
    ///
    /// The future is detached from `self`, so callers can drive it on
    /// another task.
    fn send(
        &self,
        conversation: Vec<Message>,
    ) -> impl Future<Output = Result<ReplyStream, TransportError>> + Send + 'static;
}

type BoxedSendFuture =
    Pin<Box<dyn Future<Output = Result<ReplyStream, TransportError>> + Send>>;
type SendFn = Arc<dyn Fn(Vec<Message>) -> BoxedSendFuture + Send + Sync>;

/// A type-erased [`Transport`].
#[derive(Clone)]
pub(crate) struct TransportClient {
    send_fn: SendFn,
}

impl TransportClient {
    pub fn new<T: Transport>(transport: T) -> Self {
        let send_fn: SendFn = Arc::new(move |conversation| {
            Box::pin(transport.send(conversation))
        });
        Self { send_fn }
    }

    #[inline]
    pub async fn send(
        &self,
        conversation: Vec<Message>,
    ) -> Result<ReplyStream, TransportError> {
        (self.send_fn)(conversation).await
    }
}

/// [`Transport`] over HTTP.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    url: String,
}

impl HttpTransport {
    /// Creates a transport to the relay at `base_url`.
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Creates a transport sharing an existing client.
    pub fn with_client(client: Client, base_url: &str) -> Self {
        let url = format!("{}{CHAT_PATH}", base_url.trim_end_matches('/'));
        Self { client, url }
    }

    /// Returns the chat endpoint URL.
    #[inline]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        conversation: Vec<Message>,
    ) -> impl Future<Output = Result<ReplyStream, TransportError>> + Send + 'static
    {
        let fut = self.client.post(&self.url).json(&conversation).send();
        async move {
            let resp = fut
                .await
                .map_err(|err| TransportError::Connect(err.to_string()))?;
            let status = resp.status();
            if !status.is_success() {
                return Err(TransportError::Status(status.as_u16()));
            }
            debug!("reply started");

            let body = stream::unfold(Some(resp), |resp| async move {
                let mut resp = resp?;
                match resp.chunk().await {
                    Ok(Some(chunk)) => Some((Ok(chunk), Some(resp))),
                    Ok(None) => None,
                    Err(err) => {
                        Some((Err(TransportError::Stream(err.to_string())), None))
                    }
                }
            });
            Ok(Box::pin(body) as ReplyStream)
        }
    }
}
