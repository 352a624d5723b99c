//! Event service: permission-checked listing, counting and change history.

use flagtrail_core::error::{FlagtrailError, FlagtrailResult};
use flagtrail_core::models::actor::{Actor, Permissions};
use flagtrail_core::models::event::EventRecord;
use flagtrail_core::query::{CountParams, EventQueryParams, FEATURE_EVENT_TYPES};
use flagtrail_core::reconstruct::{ReconstructedDiff, format_event_type, reconstruct_diff};
use flagtrail_core::repository::EventRepository;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::config::EventsConfig;

/// One page of events plus the total number of matches.
#[derive(Debug, Clone, Serialize)]
pub struct EventPage {
    pub events: Vec<EventRecord>,
    pub count: u64,
}

/// A history row, ready for display.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub record: EventRecord,
    /// Id of the entity the change concerns.
    pub subject_id: Option<String>,
    /// Display name of the user who made the change.
    pub actor: Option<String>,
    /// Email of the user who made the change, shown next to the name.
    pub actor_email: Option<String>,
    /// Short event label, e.g. `Updated`.
    pub label: String,
    pub diff: ReconstructedDiff,
    /// Whether `diff` has both sides needed for a field-by-field view.
    pub structured_diff: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryPage {
    pub entries: Vec<HistoryEntry>,
    pub count: u64,
}

impl HistoryEntry {
    fn from_record(record: EventRecord) -> Self {
        let diff = reconstruct_diff(&record);
        let event_type = record.effective_event_type().to_string();
        Self {
            subject_id: record.subject_id().map(str::to_string),
            actor: record
                .user()
                .and_then(|u| u.display_name())
                .map(str::to_string),
            actor_email: record
                .user()
                .and_then(|u| u.email.as_deref())
                .filter(|e| !e.is_empty())
                .map(str::to_string),
            label: format_event_type(&event_type),
            structured_diff: diff.can_show_structured_diff(&event_type),
            diff,
            record,
        }
    }
}

/// Read side of the audit log.
///
/// Generic over the event repository so that the service has no
/// dependency on the database crate.
pub struct EventService<E: EventRepository> {
    events: E,
    config: EventsConfig,
}

impl<E: EventRepository> EventService<E> {
    pub fn new(events: E, config: EventsConfig) -> Self {
        Self { events, config }
    }

    pub fn config(&self) -> &EventsConfig {
        &self.config
    }

    /// One page of the actor's organization's events.
    pub async fn list_events<P: Permissions>(
        &self,
        actor: &Actor<P>,
        params: EventQueryParams,
    ) -> FlagtrailResult<EventPage> {
        ensure_can_view(actor)?;
        let params = params.with_default_per_page(self.config.default_per_page);
        if params.per_page > Some(self.config.max_per_page) {
            return Err(FlagtrailError::validation(format!(
                "perPage must not exceed {}",
                self.config.max_per_page
            )));
        }

        let spec = params.into_spec(actor.organization_id.as_str())?;
        debug!(
            organization_id = %actor.organization_id,
            page = spec.page,
            per_page = spec.per_page,
            "Listing events"
        );
        let result = self.events.query(&spec).await?;
        Ok(EventPage {
            events: result.items,
            count: result.total,
        })
    }

    pub async fn count_events<P: Permissions>(
        &self,
        actor: &Actor<P>,
        params: CountParams,
    ) -> FlagtrailResult<u64> {
        ensure_can_view(actor)?;
        let filter = params.into_filter(actor.organization_id.as_str());
        self.events.count(&filter).await
    }

    pub async fn get_event<P: Permissions>(
        &self,
        actor: &Actor<P>,
        id: Uuid,
    ) -> FlagtrailResult<EventRecord> {
        ensure_can_view(actor)?;
        self.events.get_by_id(&actor.organization_id, id).await
    }

    /// Feature change history with reconstructed diffs. Without explicit
    /// types, all feature lifecycle events are included.
    pub async fn list_history<P: Permissions>(
        &self,
        actor: &Actor<P>,
        mut params: EventQueryParams,
    ) -> FlagtrailResult<HistoryPage> {
        if params.types.is_empty() {
            params.types = FEATURE_EVENT_TYPES.iter().map(|t| t.to_string()).collect();
        }
        let page = self.list_events(actor, params).await?;
        Ok(HistoryPage {
            entries: page
                .events
                .into_iter()
                .map(HistoryEntry::from_record)
                .collect(),
            count: page.count,
        })
    }
}

fn ensure_can_view<P: Permissions>(actor: &Actor<P>) -> FlagtrailResult<()> {
    if actor.permissions.can_view_audit_logs() {
        Ok(())
    } else {
        Err(FlagtrailError::permission_denied(
            "missing permission to view audit logs",
        ))
    }
}
