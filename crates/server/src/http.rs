//! Routes and handlers of the chat relay.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use fitchat_core::model::{Message, ModelProvider};
use fitchat_core::{Relay, RelayReply};

/// Chat relay endpoint path.
pub const CHAT_PATH: &str = "/api/chat";
/// Health endpoint path.
pub const HEALTH_PATH: &str = "/health";
/// Chat page path.
pub const PAGE_PATH: &str = "/";

const PAGE_HTML: &str = include_str!("../assets/index.html");
const TEXT_PLAIN_UTF_8: &str = "text/plain; charset=utf-8";

/// Shared state of the HTTP handlers.
pub struct AppState<P> {
    relay: Arc<Relay<P>>,
    next_request_id: Arc<AtomicU64>,
}

impl<P: ModelProvider> AppState<P> {
    /// Creates the state serving the given relay.
    pub fn new(relay: Relay<P>) -> Self {
        Self {
            relay: Arc::new(relay),
            next_request_id: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl<P> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            relay: Arc::clone(&self.relay),
            next_request_id: Arc::clone(&self.next_request_id),
        }
    }
}

/// Build the chat relay routes.
pub fn chat_routes<P: ModelProvider + 'static>() -> Router<AppState<P>> {
    Router::new().route(CHAT_PATH, post(chat::<P>))
}

/// Build the page and health routes.
pub fn page_routes<S: Clone + Send + Sync + 'static>() -> Router<S> {
    Router::new()
        .route(PAGE_PATH, get(page))
        .route(HEALTH_PATH, get(health))
}

/// Build the complete application router.
pub fn router<P: ModelProvider + 'static>(state: AppState<P>) -> Router {
    Router::new()
        .merge(page_routes())
        .merge(chat_routes())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    StatusCode::OK
}

async fn page() -> Html<&'static str> {
    Html(PAGE_HTML)
}

/// Relays the posted conversation.
///
/// Both outcomes answer `200 OK` with plain text: the canned rejection in
/// one piece, or the completion streamed as it's generated. Upstream
/// failures abort the body.
async fn chat<P: ModelProvider + 'static>(
    State(st): State<AppState<P>>,
    Json(conversation): Json<Vec<Message>>,
) -> Response {
    let id = st.next_request_id.fetch_add(1, Ordering::Relaxed);
    let span = info_span!("relay", id);
    match span.in_scope(|| st.relay.relay(conversation)) {
        RelayReply::Rejected(text) => text.into_response(),
        RelayReply::Streaming(stream) => {
            let mut resp = Body::from_stream(stream).into_response();
            let headers = resp.headers_mut();
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static(TEXT_PLAIN_UTF_8),
            );
            headers.insert(
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-cache"),
            );
            headers.insert(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            );
            resp
        }
    }
}
