use std::sync::Weak;

use tokio::select;
use tokio::sync::{mpsc, watch};

use crate::handle::{BoxEnvelope, Mailbox};
use crate::{Actor, ActorState};

pub(crate) async fn run_actor<S: ActorState>(
    mailbox: Weak<Mailbox<S>>,
    mut state: S,
    mut msg_rx: mpsc::UnboundedReceiver<BoxEnvelope<S>>,
    mut stop_rx: watch::Receiver<bool>,
) {
    debug!("started");
    loop {
        let msg = select! {
            biased;

            _ = stop_rx.changed() => {
                break;
            }
            msg = msg_rx.recv() => {
                let Some(msg) = msg else {
                    break;
                };
                msg
            }
        };
        trace!("received message: {msg:?}");

        let Some(mailbox) = mailbox.upgrade() else {
            warn!("last handle has been dropped, discard the message");
            break;
        };
        trace_span!("proc msg").in_scope(|| {
            msg.deliver(&mut state, &Actor::from_mailbox(mailbox));
        });
    }

    // Refuse further messages before running the hook, so that handles
    // observe the actor as stopped.
    msg_rx.close();
    state.stopped();
    debug!("stopped");
}
