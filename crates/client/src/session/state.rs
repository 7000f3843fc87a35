use fitchat_actor::{Actor, Message as ActorMessage};
use fitchat_model::Message;
use futures_util::StreamExt;
use tokio::sync::oneshot;
use tracing::Instrument;

use super::{SessionSnapshot, SessionState, TurnOutcome};
use crate::APOLOGY_MESSAGE;
use crate::conversation::MessageId;
use crate::decoder::Utf8Decoder;
use crate::transport::{TransportClient, TransportError};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TurnStage {
    #[default]
    Idle,
    /// Posted, nothing received yet.
    Awaiting,
    Streaming,
}

impl SessionState {
    fn submit(&mut self, input: String, actor: &Actor<Self>) {
        if self.stage != TurnStage::Idle {
            debug!(stage = ?self.stage, "busy, submission dropped");
            return;
        }
        if input.trim().is_empty() {
            trace!("blank submission ignored");
            return;
        }

        self.conversation.push(Message::user(input));
        // The placeholder is not part of what gets sent.
        let history = self.conversation.messages();
        let reply_id = self.conversation.push(Message::assistant(""));
        self.stage = TurnStage::Awaiting;
        self.notify_update();

        let transport = self.transport.clone();
        let actor = actor.clone();
        let task = tokio::spawn(
            async move {
                let result =
                    run_turn(&transport, history, reply_id, &actor).await;
                actor.send(TurnEnded { reply_id, result }).ok();
            }
            .instrument(debug_span!("turn", reply = %reply_id)),
        );
        self.running_turn = Some(task);
    }

    fn append_fragment(&mut self, reply_id: MessageId, text: &str) {
        if !self.conversation.append_to(reply_id, text) {
            warn!("fragment for unknown message {reply_id} discarded");
            return;
        }
        self.stage = TurnStage::Streaming;
        if let Some(on_fragment) = &self.on_fragment {
            on_fragment(text);
        }
        self.notify_update();
    }

    fn end_turn(
        &mut self,
        reply_id: MessageId,
        result: Result<(), TransportError>,
    ) {
        self.running_turn = None;
        let outcome = match result {
            Ok(()) => {
                debug!("turn completed");
                TurnOutcome::Completed
            }
            Err(err) => {
                error!("turn failed: {err}");
                self.conversation.set_content(reply_id, APOLOGY_MESSAGE);
                TurnOutcome::Failed
            }
        };
        self.stage = TurnStage::Idle;
        self.notify_update();
        if let Some(on_turn_end) = &self.on_turn_end {
            on_turn_end(outcome);
        }
    }

    #[inline]
    fn notify_update(&self) {
        if let Some(on_update) = &self.on_update {
            on_update(&self.conversation);
        }
    }
}

/// Posts the history and forwards the decoded reply to the session.
async fn run_turn(
    transport: &TransportClient,
    history: Vec<Message>,
    reply_id: MessageId,
    actor: &Actor<SessionState>,
) -> Result<(), TransportError> {
    let mut body = transport.send(history).await?;
    let mut decoder = Utf8Decoder::default();
    let forward = |text: String| {
        if !text.is_empty() {
            actor.send(AppendFragment { reply_id, text }).ok();
        }
    };

    while let Some(chunk) = body.next().await {
        forward(decoder.decode(&chunk?));
    }
    forward(decoder.finish());
    Ok(())
}

#[derive(Debug)]
pub struct Submit(pub String);

impl ActorMessage<SessionState> for Submit {
    fn handle(self, state: &mut SessionState, actor: &Actor<SessionState>) {
        state.submit(self.0, actor);
    }
}

#[derive(Debug)]
pub struct QuerySnapshot(pub oneshot::Sender<SessionSnapshot>);

impl ActorMessage<SessionState> for QuerySnapshot {
    fn handle(self, state: &mut SessionState, _actor: &Actor<SessionState>) {
        self.0
            .send(SessionSnapshot {
                conversation: state.conversation.clone(),
                busy: state.stage != TurnStage::Idle,
            })
            .ok();
    }
}

#[derive(Debug)]
struct AppendFragment {
    reply_id: MessageId,
    text: String,
}

impl ActorMessage<SessionState> for AppendFragment {
    fn handle(self, state: &mut SessionState, _actor: &Actor<SessionState>) {
        state.append_fragment(self.reply_id, &self.text);
    }
}

#[derive(Debug)]
struct TurnEnded {
    reply_id: MessageId,
    result: Result<(), TransportError>,
}

impl ActorMessage<SessionState> for TurnEnded {
    fn handle(self, state: &mut SessionState, _actor: &Actor<SessionState>) {
        state.end_turn(self.reply_id, self.result);
    }
}
