//! Dispatch error types.

use flagtrail_core::error::FlagtrailError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("notification queue is closed, event {event_id} was not handed off")]
    QueueClosed { event_id: Uuid },
}

impl From<DispatchError> for FlagtrailError {
    fn from(err: DispatchError) -> Self {
        FlagtrailError::Notifier(err.to_string())
    }
}
