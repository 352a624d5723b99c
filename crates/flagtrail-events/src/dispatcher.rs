//! Webhook test-event dispatch.
//!
//! Sending a test event records a `webhook.test` audit event for the
//! webhook and hands it to the notifier, exactly like a real event would
//! be delivered.

use flagtrail_core::error::{FlagtrailError, FlagtrailResult};
use flagtrail_core::models::actor::{Actor, Permissions};
use flagtrail_core::models::event::{
    CURRENT_PAYLOAD_VERSION, ChangeBody, CreateEvent, EventPayload, EventRecord, Snapshot,
};
use flagtrail_core::notifier::{Notifier, NotifierFactory};
use flagtrail_core::repository::{EventRepository, WebhookRepository};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::EventsConfig;

pub const WEBHOOK_TEST_EVENT: &str = "webhook.test";
pub const WEBHOOK_OBJECT: &str = "webhook";

/// Records and dispatches webhook test events.
pub struct WebhookTestDispatcher<E: EventRepository, W: WebhookRepository, N: NotifierFactory> {
    events: E,
    webhooks: W,
    notifiers: N,
    config: EventsConfig,
}

impl<E: EventRepository, W: WebhookRepository, N: NotifierFactory> WebhookTestDispatcher<E, W, N> {
    pub fn new(events: E, webhooks: W, notifiers: N, config: EventsConfig) -> Self {
        Self {
            events,
            webhooks,
            notifiers,
            config,
        }
    }

    /// Record a `webhook.test` event for `webhook_id` and dispatch it.
    ///
    /// Returns the persisted record once delivery has been initiated. If
    /// the notifier fails the error is returned, but the record stays in
    /// the log.
    pub async fn send_webhook_test_event<P: Permissions>(
        &self,
        actor: &Actor<P>,
        webhook_id: &str,
    ) -> FlagtrailResult<EventRecord> {
        let organization_id = actor.organization_id.as_str();

        if !actor.permissions.can_create_event_webhook(organization_id) {
            return Err(FlagtrailError::permission_denied(
                "missing permission to create event webhooks",
            ));
        }

        let webhook = self.webhooks.get_by_id(organization_id, webhook_id).await?;

        let mut object = Snapshot::new();
        object.insert("webhookId".into(), Value::String(webhook.id.clone()));
        let payload = EventPayload::new(
            WEBHOOK_TEST_EVENT,
            WEBHOOK_OBJECT,
            self.config.api_version.clone(),
            ChangeBody {
                object: Some(object),
                ..Default::default()
            },
        );

        let record = self
            .events
            .append(CreateEvent {
                organization_id: organization_id.to_string(),
                object: WEBHOOK_OBJECT.into(),
                object_id: webhook.id,
                event: WEBHOOK_TEST_EVENT.into(),
                version: CURRENT_PAYLOAD_VERSION,
                data: payload,
            })
            .await?;

        if let Err(err) = self.notify(record.id).await {
            warn!(
                event_id = %record.id,
                webhook_id,
                error = %err,
                "Webhook test event recorded but dispatch failed"
            );
            return Err(err);
        }

        info!(
            event_id = %record.id,
            organization_id,
            webhook_id,
            "Dispatched webhook test event"
        );
        Ok(record)
    }

    async fn notify(&self, event_id: Uuid) -> FlagtrailResult<()> {
        self.notifiers.create_notifier(event_id)?.dispatch().await
    }
}
