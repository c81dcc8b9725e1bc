use tokio::sync::mpsc;

use crate::models::GameEvent;

/// Outbound side of the game event channel.
///
/// A sink without a receiver (or whose receiver was dropped) swallows events,
/// so the game keeps running with no presentation attached.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<GameEvent>>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<GameEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink with nobody listening
    #[cfg(test)]
    pub fn detached() -> Self {
        Self { tx: None }
    }

    /// Create a sink together with its receiving end
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<GameEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn emit(&self, event: GameEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).is_err() {
                tracing::trace!("Event dropped, no subscriber");
            }
        }
    }
}
