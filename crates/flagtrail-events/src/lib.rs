//! Flagtrail Events: audit log listing and history, webhook test-event
//! dispatch, and the queue-backed notifier.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod notifier;
pub mod service;

pub use config::EventsConfig;
pub use dispatcher::WebhookTestDispatcher;
pub use error::DispatchError;
pub use notifier::{QueuedNotifier, QueuedNotifierFactory};
pub use service::{EventPage, EventService, HistoryEntry, HistoryPage};
