//! SurrealDB repository implementations.

mod event;
mod webhook;

pub use event::SurrealEventRepository;
pub use webhook::SurrealWebhookRepository;
