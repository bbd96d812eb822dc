// libs/realtime-cell/src/services/broadcaster.rs
use tokio::sync::broadcast;
use tracing::debug;

use crate::models::ChangeEvent;

const CHANNEL_CAPACITY: usize = 1000;

/// Fans every committed mutation out to all open admin sessions.
///
/// Publishing never blocks and never fails the mutation that triggered it:
/// with no subscribers the event is simply dropped, and a slow consumer that
/// lags behind the channel capacity observes a `Lagged` gap and re-syncs.
pub struct RealtimeBroadcaster {
    sender: broadcast::Sender<ChangeEvent>,
}

impl RealtimeBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, event: ChangeEvent) {
        debug!(
            "Broadcasting {:?} change for {}",
            event.entity, event.entity_id
        );
        if self.sender.send(event).is_err() {
            // No session is connected; nothing to fan out to.
            debug!("No realtime subscribers, event dropped");
        }
    }

    /// Open an explicit subscription handle for one admin session. The
    /// subscription lives until the handle is dropped (session end).
    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn session_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for RealtimeBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-session receive handle. Opened on session start, closed (dropped) on
/// session end.
pub struct SessionSubscription {
    receiver: broadcast::Receiver<ChangeEvent>,
}

impl SessionSubscription {
    /// Next event for this session, or `None` once the broadcaster is gone.
    /// A lagged gap is skipped rather than surfaced: the consumer's keyed
    /// merge tolerates missed intermediate states on the next update.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("Realtime session lagged, skipped {} events", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
