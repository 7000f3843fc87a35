use std::pin::Pin;
use std::task::{Context, Poll, ready};

use fitchat_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
};
use pin_project_lite::pin_project;

use crate::Error;
use crate::io::Sse;
use crate::proto::ChatCompletionChunk;

struct PartialState {
    sse: Sse,
    id: Option<String>,
    // A chunk may carry the last delta and the finish reason together. The
    // delta is delivered first, and this is delivered on the next poll.
    pending_finish_reason: Option<ModelFinishReason>,
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    pub struct OpenAIResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
    }
}

impl OpenAIResponse {
    #[inline]
    pub fn from_sse(sse: Sse) -> Self {
        let partial_state = PartialState {
            sse,
            id: None,
            pending_finish_reason: None,
        };
        let next_event_fut = async move { next_event(partial_state).await };
        Self {
            next_event_fut: Some(Box::pin(next_event_fut)),
        }
    }
}

impl ModelResponse for OpenAIResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let (event, partial_state) =
            match ready!(next_event_fut.as_mut().poll(cx)) {
                Ok((Some(event), partial_state)) => (event, partial_state),
                Ok((None, _)) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Ok(None));
                }
                Err(err) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Err(err));
                }
            };

        // The stream may still have more data to pull, create a new future for
        // the next event.
        let next_event_fut = async move { next_event(partial_state).await };
        *this.next_event_fut = Some(Box::pin(next_event_fut));

        Poll::Ready(Ok(Some(event)))
    }
}

async fn next_event(
    mut partial_state: PartialState,
) -> Result<(Option<ModelResponseEvent>, PartialState), Error> {
    if let Some(finish_reason) = partial_state.pending_finish_reason.take() {
        return Ok((
            Some(ModelResponseEvent::Completed(finish_reason)),
            partial_state,
        ));
    }

    loop {
        let sse_event = match partial_state.sse.next_event().await {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(err) => {
                return Err(Error::new(format!("{err:?}"), ErrorKind::Other));
            }
        };
        trace!("got sse event: {sse_event}");
        if sse_event == "[DONE]" {
            break;
        }
        if sse_event.is_empty() {
            continue;
        }

        let chunk = serde_json::from_str::<ChatCompletionChunk>(&sse_event)
            .map_err(|err| Error::new(format!("{err}"), ErrorKind::Other))?;
        if let Some(chunk_id) = &chunk.id {
            if partial_state.id.get_or_insert_with(|| chunk_id.clone())
                != chunk_id
            {
                return Err(Error::new("chunk id mismatch", ErrorKind::Other));
            }
        }

        // Usage reports arrive without choices.
        let Some(choice) = chunk.into_first_choice() else {
            continue;
        };

        let finish_reason = choice.finish_reason.map(|reason| {
            if reason == "length" {
                ModelFinishReason::Length
            } else {
                ModelFinishReason::Stop
            }
        });

        if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
            partial_state.pending_finish_reason = finish_reason;
            return Ok((
                Some(ModelResponseEvent::MessageDelta(content)),
                partial_state,
            ));
        }

        if let Some(finish_reason) = finish_reason {
            return Ok((
                Some(ModelResponseEvent::Completed(finish_reason)),
                partial_state,
            ));
        }

        // Role-only chunks carry nothing to deliver.
    }

    Ok((None, partial_state))
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use bytes::Bytes;

    use super::*;
    use crate::io::{Chunks, ChunksError};

    async fn collect(
        chunks: Chunks,
    ) -> (Vec<ModelResponseEvent>, Option<Error>) {
        let mut resp = pin!(OpenAIResponse::from_sse(Sse::new(chunks)));
        let mut events = vec![];
        loop {
            match poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await {
                Ok(Some(event)) => events.push(event),
                Ok(None) => return (events, None),
                Err(err) => return (events, Some(err)),
            }
        }
    }

    #[tokio::test]
    async fn test_recorded_response() {
        let chunks = Chunks::from_vec_deque(
            vec![Bytes::from_static(include_bytes!(
                "../fixtures/test_response.txt"
            ))]
            .into(),
        );
        let (events, err) = collect(chunks).await;
        assert!(err.is_none());
        assert_eq!(
            events,
            vec![
                ModelResponseEvent::MessageDelta("Try ".to_owned()),
                ModelResponseEvent::MessageDelta("box breath".to_owned()),
                ModelResponseEvent::MessageDelta("ing for ".to_owned()),
                ModelResponseEvent::MessageDelta("stress relief.".to_owned()),
                ModelResponseEvent::Completed(ModelFinishReason::Stop),
            ]
        );
    }

    #[tokio::test]
    async fn test_exhausted_without_done() {
        let chunks = Chunks::from_vec_deque(
            vec![Bytes::from_static(
                b"data: {\"id\":\"a\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hi\"},\"finish_reason\":null}]}\n\n",
            )]
            .into(),
        );
        let (events, err) = collect(chunks).await;
        assert!(err.is_none());
        assert_eq!(
            events,
            vec![ModelResponseEvent::MessageDelta("Hi".to_owned())]
        );
    }

    #[tokio::test]
    async fn test_mid_stream_failure() {
        let chunks = Chunks::from_results(
            vec![
                Ok(Bytes::from_static(
                    b"data: {\"id\":\"a\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Eat \"},\"finish_reason\":null}]}\n\n",
                )),
                Err(ChunksError("connection reset".to_owned())),
            ]
            .into(),
        );
        let (events, err) = collect(chunks).await;
        assert_eq!(
            events,
            vec![ModelResponseEvent::MessageDelta("Eat ".to_owned())]
        );
        assert_eq!(err.unwrap().kind, ErrorKind::Other);
    }

    #[tokio::test]
    async fn test_delta_with_finish_reason() {
        let chunks = Chunks::from_vec_deque(
            vec![Bytes::from_static(
                b"data: {\"id\":\"a\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Rest.\"},\"finish_reason\":\"length\"}]}\n\ndata: [DONE]\n\n",
            )]
            .into(),
        );
        let (events, err) = collect(chunks).await;
        assert!(err.is_none());
        assert_eq!(
            events,
            vec![
                ModelResponseEvent::MessageDelta("Rest.".to_owned()),
                ModelResponseEvent::Completed(ModelFinishReason::Length),
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_chunk() {
        let chunks = Chunks::from_vec_deque(
            vec![Bytes::from_static(b"data: {not json}\n\n")].into(),
        );
        let (events, err) = collect(chunks).await;
        assert!(events.is_empty());
        assert!(err.is_some());
    }

    #[tokio::test]
    async fn test_unknown_fields_and_empty_data() {
        let chunks = Chunks::from_vec_deque(
            vec![Bytes::from_static(
                b"data\n\nx-request-id: 42\ndata: {\"id\":\"a\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Sleep.\"},\"finish_reason\":null}]}\n\ndata: [DONE]\n\n",
            )]
            .into(),
        );
        let (events, err) = collect(chunks).await;
        assert!(err.is_none());
        assert_eq!(
            events,
            vec![ModelResponseEvent::MessageDelta("Sleep.".to_owned())]
        );
    }
}
