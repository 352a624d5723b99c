//! Audit event domain model.
//!
//! An [`EventRecord`] is an immutable audit-log entry describing one change
//! to a managed entity. Its payload layout depends on the record's schema
//! version; see [`PayloadVersion`] and [`Change`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{FlagtrailError, FlagtrailResult};

/// An insertion-ordered JSON object holding an entity snapshot or delta.
pub type Snapshot = Map<String, Value>;

/// Payload schema version written by this release.
pub const CURRENT_PAYLOAD_VERSION: u32 = 1;

/// API version string stamped on payloads when none is configured.
pub const DEFAULT_API_VERSION: &str = "2024-07-31";

/// Payload schema version of an event record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadVersion {
    /// Version 0: snapshots nested under `current` / `previous`.
    Legacy,
    /// Version 1: snapshot under `object` plus a `previous_attributes` delta.
    V1,
}

impl PayloadVersion {
    /// Maps a stored version number onto a known layout. Numbers above the
    /// newest known layout are read with the newest accessor.
    pub fn from_number(version: u32) -> Self {
        match version {
            0 => Self::Legacy,
            _ => Self::V1,
        }
    }

    pub fn number(self) -> u32 {
        match self {
            Self::Legacy => 0,
            Self::V1 => 1,
        }
    }
}

/// Actor that caused an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl EventUser {
    /// Name if set, otherwise email; `None` when neither is usable.
    pub fn display_name(&self) -> Option<&str> {
        non_empty(self.name.as_deref()).or_else(|| non_empty(self.email.as_deref()))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Raw change body as stored. Which fields are meaningful depends on the
/// record's [`PayloadVersion`]; read it through [`EventRecord::change`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<Snapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_attributes: Option<Snapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<Snapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<Snapshot>,
}

/// Version-resolved view of a record's change body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Change<'a> {
    Legacy {
        current: Option<&'a Snapshot>,
        previous: Option<&'a Snapshot>,
        previous_attributes: Option<&'a Snapshot>,
    },
    V1 {
        object: Option<&'a Snapshot>,
        previous_attributes: Option<&'a Snapshot>,
    },
}

impl<'a> Change<'a> {
    pub fn previous_attributes(&self) -> Option<&'a Snapshot> {
        match *self {
            Change::Legacy {
                previous_attributes,
                ..
            }
            | Change::V1 {
                previous_attributes,
                ..
            } => previous_attributes,
        }
    }
}

/// Versioned event payload, shaped like the notification envelope sent to
/// webhook subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPayload {
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub api_version: String,
    /// Creation time in epoch seconds.
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub data: ChangeBody,
    #[serde(default)]
    pub user: Option<EventUser>,
    #[serde(default)]
    pub environments: Vec<String>,
    #[serde(default)]
    pub projects: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "containsSecrets", default)]
    pub contains_secrets: bool,
}

impl EventPayload {
    /// A payload stamped with the current time and no actor, scopes or
    /// secrets.
    pub fn new(
        event: impl Into<String>,
        object: impl Into<String>,
        api_version: impl Into<String>,
        data: ChangeBody,
    ) -> Self {
        Self {
            event: event.into(),
            object: object.into(),
            api_version: api_version.into(),
            created: Utc::now().timestamp(),
            data,
            user: None,
            environments: Vec::new(),
            projects: Vec::new(),
            tags: Vec::new(),
            contains_secrets: false,
        }
    }
}

/// An immutable audit-log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: Uuid,
    /// The organization (tenant) this event belongs to.
    pub organization_id: String,
    /// Entity kind, e.g. `feature` or `webhook`.
    pub object: String,
    pub object_id: String,
    /// Dotted event type, e.g. `feature.updated`.
    pub event: String,
    pub version: u32,
    pub data: EventPayload,
    pub date_created: DateTime<Utc>,
}

impl EventRecord {
    pub fn payload_version(&self) -> PayloadVersion {
        PayloadVersion::from_number(self.version)
    }

    pub fn change(&self) -> Change<'_> {
        let body = &self.data.data;
        match self.payload_version() {
            PayloadVersion::Legacy => Change::Legacy {
                current: body.current.as_ref(),
                previous: body.previous.as_ref(),
                previous_attributes: body.previous_attributes.as_ref(),
            },
            PayloadVersion::V1 => Change::V1 {
                object: body.object.as_ref(),
                previous_attributes: body.previous_attributes.as_ref(),
            },
        }
    }

    /// The payload's event type, falling back to the record's.
    pub fn effective_event_type(&self) -> &str {
        if self.data.event.is_empty() {
            &self.event
        } else {
            &self.data.event
        }
    }

    /// The `id` field of the changed entity's snapshot, if recorded.
    pub fn subject_id(&self) -> Option<&str> {
        match self.change() {
            Change::V1 { object, .. } => snapshot_id(object),
            Change::Legacy {
                current, previous, ..
            } => snapshot_id(current).or_else(|| snapshot_id(previous)),
        }
    }

    pub fn user(&self) -> Option<&EventUser> {
        self.data.user.as_ref()
    }
}

fn snapshot_id(snapshot: Option<&Snapshot>) -> Option<&str> {
    snapshot?.get("id")?.as_str()
}

/// Fields required to append a new event. `id` and `date_created` are
/// assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateEvent {
    pub organization_id: String,
    pub object: String,
    pub object_id: String,
    pub event: String,
    pub version: u32,
    pub data: EventPayload,
}

impl CreateEvent {
    /// Rejects inputs with a blank required field.
    pub fn validate(&self) -> FlagtrailResult<()> {
        let required = [
            ("organization_id", &self.organization_id),
            ("object", &self.object),
            ("object_id", &self.object_id),
            ("event", &self.event),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(FlagtrailError::validation(format!(
                    "event field `{field}` is required"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(value: Value) -> Snapshot {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    fn record(version: u32, data: ChangeBody) -> EventRecord {
        EventRecord {
            id: Uuid::new_v4(),
            organization_id: "org".into(),
            object: "feature".into(),
            object_id: "feat-1".into(),
            event: "feature.updated".into(),
            version,
            data: EventPayload::new("feature.updated", "feature", DEFAULT_API_VERSION, data),
            date_created: Utc::now(),
        }
    }

    #[test]
    fn payload_version_from_number() {
        assert_eq!(PayloadVersion::from_number(0), PayloadVersion::Legacy);
        assert_eq!(PayloadVersion::from_number(1), PayloadVersion::V1);
        assert_eq!(PayloadVersion::from_number(7), PayloadVersion::V1);
        assert_eq!(PayloadVersion::V1.number(), CURRENT_PAYLOAD_VERSION);
    }

    #[test]
    fn payload_serializes_notification_envelope() {
        let mut payload = EventPayload::new(
            "webhook.test",
            "webhook",
            "2024-07-31",
            ChangeBody {
                object: Some(snapshot(json!({ "webhookId": "webhook-aabb" }))),
                ..Default::default()
            },
        );
        payload.created = 1_700_000_000;

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "webhook.test",
                "object": "webhook",
                "api_version": "2024-07-31",
                "created": 1_700_000_000,
                "data": { "object": { "webhookId": "webhook-aabb" } },
                "user": null,
                "environments": [],
                "projects": [],
                "tags": [],
                "containsSecrets": false
            })
        );
    }

    #[test]
    fn delta_key_order_survives_serialization() {
        let raw = r#"{"previous_attributes":{"zeta":1,"alpha":2,"mid":3}}"#;
        let body: ChangeBody = serde_json::from_str(raw).unwrap();
        let keys: Vec<_> = body
            .previous_attributes
            .as_ref()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
        assert_eq!(serde_json::to_string(&body).unwrap(), raw);
    }

    #[test]
    fn change_resolves_by_version() {
        let body = ChangeBody {
            object: Some(snapshot(json!({ "id": "new" }))),
            current: Some(snapshot(json!({ "id": "legacy" }))),
            ..Default::default()
        };

        let v1 = record(1, body.clone());
        assert!(matches!(v1.change(), Change::V1 { object: Some(_), .. }));
        assert_eq!(v1.subject_id(), Some("new"));

        let legacy = record(0, body);
        assert!(matches!(
            legacy.change(),
            Change::Legacy {
                current: Some(_),
                ..
            }
        ));
        assert_eq!(legacy.subject_id(), Some("legacy"));
    }

    #[test]
    fn legacy_subject_id_falls_back_to_previous() {
        let legacy = record(
            0,
            ChangeBody {
                previous: Some(snapshot(json!({ "id": "gone" }))),
                ..Default::default()
            },
        );
        assert_eq!(legacy.subject_id(), Some("gone"));
        assert_eq!(record(1, ChangeBody::default()).subject_id(), None);
    }

    #[test]
    fn effective_event_type_prefers_payload() {
        let mut rec = record(1, ChangeBody::default());
        rec.event = "feature.created".into();
        assert_eq!(rec.effective_event_type(), "feature.updated");
        rec.data.event.clear();
        assert_eq!(rec.effective_event_type(), "feature.created");
    }

    #[test]
    fn display_name_prefers_name_then_email() {
        let user = EventUser {
            id: None,
            name: Some("Ada".into()),
            email: Some("ada@example.com".into()),
        };
        assert_eq!(user.display_name(), Some("Ada"));

        let user = EventUser {
            name: Some(String::new()),
            email: Some("ada@example.com".into()),
            ..Default::default()
        };
        assert_eq!(user.display_name(), Some("ada@example.com"));
        assert_eq!(EventUser::default().display_name(), None);
    }

    #[test]
    fn create_event_requires_identifying_fields() {
        let input = CreateEvent {
            organization_id: "org".into(),
            object: "feature".into(),
            object_id: " ".into(),
            event: "feature.created".into(),
            version: 1,
            data: EventPayload::new("feature.created", "feature", "v", ChangeBody::default()),
        };
        let err = input.validate().unwrap_err();
        assert!(matches!(err, FlagtrailError::Validation { .. }));
        assert!(err.to_string().contains("object_id"));
    }
}
