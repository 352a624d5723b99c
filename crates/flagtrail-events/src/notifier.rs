//! Queue-backed notifier.
//!
//! Dispatching hands the event id to an in-process channel and returns.
//! Whoever owns the receiving end performs the actual delivery.

use flagtrail_core::error::FlagtrailResult;
use flagtrail_core::notifier::{Notifier, NotifierFactory};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::info;
use uuid::Uuid;

use crate::error::DispatchError;

/// Builds [`QueuedNotifier`]s that share one delivery queue.
#[derive(Debug, Clone)]
pub struct QueuedNotifierFactory {
    sender: UnboundedSender<Uuid>,
}

impl QueuedNotifierFactory {
    pub fn new(sender: UnboundedSender<Uuid>) -> Self {
        Self { sender }
    }

    /// A factory together with the receiving end of its queue.
    pub fn channel() -> (Self, UnboundedReceiver<Uuid>) {
        let (sender, receiver) = unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl NotifierFactory for QueuedNotifierFactory {
    type Notifier = QueuedNotifier;

    fn create_notifier(&self, event_id: Uuid) -> FlagtrailResult<QueuedNotifier> {
        Ok(QueuedNotifier {
            event_id,
            sender: self.sender.clone(),
        })
    }
}

/// Notifier bound to a single event.
#[derive(Debug)]
pub struct QueuedNotifier {
    event_id: Uuid,
    sender: UnboundedSender<Uuid>,
}

impl QueuedNotifier {
    pub fn event_id(&self) -> Uuid {
        self.event_id
    }
}

impl Notifier for QueuedNotifier {
    async fn dispatch(&self) -> FlagtrailResult<()> {
        self.sender
            .send(self.event_id)
            .map_err(|_| DispatchError::QueueClosed {
                event_id: self.event_id,
            })?;
        info!(event_id = %self.event_id, "Queued event notification");
        Ok(())
    }
}
