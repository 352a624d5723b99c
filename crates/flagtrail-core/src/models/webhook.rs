//! Event webhook domain model.
//!
//! Webhooks subscribe an external endpoint to audit events of one
//! organization. Delivery itself is handled by the notifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered event webhook.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Webhook {
    pub id: String,
    /// The organization this webhook belongs to.
    pub organization_id: String,
    pub name: String,
    /// The URL events are delivered to.
    pub url: String,
    /// Event types this webhook is subscribed to (e.g., `["feature.updated"]`).
    pub events: Vec<String>,
    /// Environments the webhook is limited to. Empty means all.
    pub environments: Vec<String>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a new webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWebhook {
    pub organization_id: String,
    pub name: String,
    pub url: String,
    pub events: Vec<String>,
    pub environments: Vec<String>,
}
