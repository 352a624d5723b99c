//! Notifier collaborator.
//!
//! A notifier is built for one event id and dispatched once. How and when
//! the notification reaches the remote endpoint is up to the
//! implementation; `dispatch` returns as soon as delivery is initiated.

use uuid::Uuid;

use crate::error::FlagtrailResult;

pub trait Notifier: Send + Sync {
    fn dispatch(&self) -> impl Future<Output = FlagtrailResult<()>> + Send;
}

pub trait NotifierFactory: Send + Sync {
    type Notifier: Notifier;

    fn create_notifier(&self, event_id: Uuid) -> FlagtrailResult<Self::Notifier>;
}
