//! Delta reconstruction.
//!
//! Derives a "before" snapshot and a display summary from a single
//! [`EventRecord`], without a second stored copy of the entity.
//!
//! The previous state is the current snapshot with the recorded
//! `previous_attributes` delta laid over it. This is exact for a single
//! update. A field that changed more than once between two displayed
//! events is not replayed; the reconstruction only ever looks at one
//! record.

use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::models::event::{Change, EventRecord, Snapshot};

/// Most changed field names listed in an update summary.
const MAX_SUMMARY_FIELDS: usize = 3;

/// The change actions that get dedicated wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Created,
    Updated,
    Deleted,
}

/// Splits `<kind>.<action>` for the three change actions. Any other event
/// type yields `None`.
pub fn parse_change_event(event_type: &str) -> Option<(&str, ChangeAction)> {
    let (kind, action) = event_type.rsplit_once('.')?;
    if kind.is_empty() {
        return None;
    }
    let action = match action {
        "created" => ChangeAction::Created,
        "updated" => ChangeAction::Updated,
        "deleted" => ChangeAction::Deleted,
        _ => return None,
    };
    Some((kind, action))
}

fn is_update(event_type: &str) -> bool {
    matches!(
        parse_change_event(event_type),
        Some((_, ChangeAction::Updated))
    )
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// One-line description of a change, e.g. `Changed: defaultValue, description`.
///
/// Field names appear in the delta's own key order. Unrecognized event
/// types are returned unchanged.
pub fn summarize(event_type: &str, previous_attributes: Option<&Snapshot>) -> String {
    let Some((kind, action)) = parse_change_event(event_type) else {
        return event_type.to_string();
    };
    let kind = capitalize(kind);

    match action {
        ChangeAction::Created => format!("{kind} created"),
        ChangeAction::Deleted => format!("{kind} deleted"),
        ChangeAction::Updated => {
            let fields: Vec<&str> = previous_attributes
                .map(|delta| delta.keys().map(String::as_str).collect())
                .unwrap_or_default();

            if fields.is_empty() {
                format!("{kind} updated")
            } else if fields.len() <= MAX_SUMMARY_FIELDS {
                format!("Changed: {}", fields.join(", "))
            } else {
                format!(
                    "Changed: {}, +{} more",
                    fields[..MAX_SUMMARY_FIELDS].join(", "),
                    fields.len() - MAX_SUMMARY_FIELDS
                )
            }
        }
    }
}

/// Short label for an event type: `Created`, `Updated`, `Deleted`, or the
/// type itself.
pub fn format_event_type(event_type: &str) -> String {
    match parse_change_event(event_type) {
        Some((_, ChangeAction::Created)) => "Created".into(),
        Some((_, ChangeAction::Updated)) => "Updated".into(),
        Some((_, ChangeAction::Deleted)) => "Deleted".into(),
        None => event_type.to_string(),
    }
}

/// Whether a before/after comparison can be shown instead of a single
/// snapshot.
pub fn can_show_structured_diff(
    event_type: &str,
    previous: Option<&Snapshot>,
    current: Option<&Snapshot>,
) -> bool {
    is_update(event_type) && previous.is_some() && current.is_some()
}

/// Advisory note produced while reconstructing. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconstructionWarning {
    /// The delta names a field the current snapshot does not have. The
    /// delta's value is used as-is.
    FieldMissingFromCurrent { field: String },
}

impl fmt::Display for ReconstructionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldMissingFromCurrent { field } => {
                write!(f, "delta field `{field}` is absent from the current snapshot")
            }
        }
    }
}

/// Overlays `delta` onto a shallow copy of `current`. Delta values win;
/// keys the delta does not name keep their current value.
pub fn merge_delta(current: &Snapshot, delta: &Snapshot) -> (Snapshot, Vec<ReconstructionWarning>) {
    let mut merged = current.clone();
    let mut warnings = Vec::new();
    for (field, value) in delta {
        if !current.contains_key(field) {
            warnings.push(ReconstructionWarning::FieldMissingFromCurrent {
                field: field.clone(),
            });
        }
        merged.insert(field.clone(), value.clone());
    }
    (merged, warnings)
}

/// The entity snapshot after the change.
pub fn current_state(record: &EventRecord) -> Option<&Snapshot> {
    match record.change() {
        Change::V1 { object, .. } => object,
        Change::Legacy { current, .. } => current,
    }
}

/// Snapshot pair derived from one record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconstructedStates {
    pub previous_state: Option<Snapshot>,
    pub current_state: Option<Snapshot>,
    pub warnings: Vec<ReconstructionWarning>,
}

pub fn reconstruct_previous_state(record: &EventRecord) -> ReconstructedStates {
    let change = record.change();
    let current = current_state(record);
    let delta = change.previous_attributes().filter(|d| !d.is_empty());

    if let (Some(current), Some(delta)) = (current, delta) {
        let (previous, warnings) = merge_delta(current, delta);
        for warning in &warnings {
            warn!(event_id = %record.id, %warning, "Partial previous state reconstruction");
        }
        return ReconstructedStates {
            previous_state: Some(previous),
            current_state: Some(current.clone()),
            warnings,
        };
    }

    // Creations, deletions, and legacy records without a delta.
    let previous = match change {
        Change::V1 { object, .. } => object,
        Change::Legacy {
            current, previous, ..
        } => previous.or(current),
    };

    ReconstructedStates {
        previous_state: previous.cloned(),
        current_state: current.cloned(),
        warnings: Vec::new(),
    }
}

/// Display-ready reconstruction of one record. Computed on read, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconstructedDiff {
    pub previous_state: Option<Snapshot>,
    pub current_state: Option<Snapshot>,
    pub summary: String,
    pub warnings: Vec<ReconstructionWarning>,
}

impl ReconstructedDiff {
    pub fn can_show_structured_diff(&self, event_type: &str) -> bool {
        can_show_structured_diff(
            event_type,
            self.previous_state.as_ref(),
            self.current_state.as_ref(),
        )
    }
}

pub fn reconstruct_diff(record: &EventRecord) -> ReconstructedDiff {
    let states = reconstruct_previous_state(record);
    ReconstructedDiff {
        previous_state: states.previous_state,
        current_state: states.current_state,
        summary: summarize(
            record.effective_event_type(),
            record.change().previous_attributes(),
        ),
        warnings: states.warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::{ChangeBody, EventPayload};
    use chrono::Utc;
    use serde_json::{Value, json};
    use uuid::Uuid;

    fn snapshot(value: Value) -> Snapshot {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    fn feature_event(event: &str, version: u32, body: ChangeBody) -> EventRecord {
        EventRecord {
            id: Uuid::new_v4(),
            organization_id: "org".into(),
            object: "feature".into(),
            object_id: "checkout".into(),
            event: event.into(),
            version,
            data: EventPayload::new(event, "feature", "test", body),
            date_created: Utc::now(),
        }
    }

    fn numbered_delta(n: usize) -> Snapshot {
        (1..=n)
            .map(|i| (format!("field{i}"), json!(i)))
            .collect()
    }

    #[test]
    fn summary_lists_changed_fields() {
        let delta = snapshot(json!({
            "defaultValue": "false",
            "description": "Old description"
        }));
        assert_eq!(
            summarize("feature.updated", Some(&delta)),
            "Changed: defaultValue, description"
        );
    }

    #[test]
    fn summary_truncates_long_deltas() {
        let delta = numbered_delta(6);
        assert_eq!(
            summarize("feature.updated", Some(&delta)),
            "Changed: field1, field2, field3, +3 more"
        );
    }

    #[test]
    fn summary_keeps_delta_key_order() {
        let delta = snapshot(json!({ "rules": [], "archived": true, "owner": "x" }));
        assert_eq!(
            summarize("feature.updated", Some(&delta)),
            "Changed: rules, archived, owner"
        );
    }

    #[test]
    fn summary_truncation_law() {
        for n in 1..=8 {
            let delta = numbered_delta(n);
            let summary = summarize("feature.updated", Some(&delta));
            let listed = summary
                .trim_start_matches("Changed: ")
                .split(", ")
                .filter(|part| part.starts_with("field"))
                .count();
            assert_eq!(listed, n.min(MAX_SUMMARY_FIELDS), "n = {n}");
            if n > MAX_SUMMARY_FIELDS {
                assert!(summary.ends_with(&format!("+{} more", n - 3)), "{summary}");
            } else {
                assert!(!summary.contains("more"), "{summary}");
            }
        }
    }

    #[test]
    fn summary_fixed_strings() {
        assert_eq!(summarize("feature.created", None), "Feature created");
        assert_eq!(summarize("feature.deleted", None), "Feature deleted");
        assert_eq!(summarize("feature.updated", None), "Feature updated");
        assert_eq!(
            summarize("feature.updated", Some(&Snapshot::new())),
            "Feature updated"
        );
        assert_eq!(summarize("webhook.created", None), "Webhook created");
    }

    #[test]
    fn summary_passes_unknown_types_through() {
        assert_eq!(summarize("webhook.test", None), "webhook.test");
        assert_eq!(summarize("unknown", None), "unknown");
        assert_eq!(summarize(".updated", None), ".updated");
    }

    #[test]
    fn event_type_labels() {
        assert_eq!(format_event_type("feature.created"), "Created");
        assert_eq!(format_event_type("feature.updated"), "Updated");
        assert_eq!(format_event_type("feature.deleted"), "Deleted");
        assert_eq!(format_event_type("unknown.type"), "unknown.type");
    }

    #[test]
    fn merge_agrees_with_delta_and_current() {
        let current = snapshot(json!({
            "id": "checkout",
            "defaultValue": "true",
            "description": "New",
            "tags": ["a"]
        }));
        let delta = snapshot(json!({ "defaultValue": "false", "description": "Old" }));

        let (merged, warnings) = merge_delta(&current, &delta);

        assert!(warnings.is_empty());
        for (key, value) in &delta {
            assert_eq!(merged.get(key), Some(value));
        }
        for (key, value) in current.iter().filter(|(k, _)| !delta.contains_key(*k)) {
            assert_eq!(merged.get(key), Some(value));
        }
        assert_eq!(merged.len(), current.len());
    }

    #[test]
    fn empty_delta_reconstructs_current_state() {
        let body = ChangeBody {
            object: Some(snapshot(json!({ "id": "checkout", "defaultValue": "true" }))),
            previous_attributes: Some(Snapshot::new()),
            ..Default::default()
        };
        let record = feature_event("feature.updated", 1, body);

        let states = reconstruct_previous_state(&record);
        assert!(states.current_state.is_some());
        assert_eq!(states.previous_state, states.current_state);
    }

    #[test]
    fn update_reconstructs_previous_state() {
        let body = ChangeBody {
            object: Some(snapshot(json!({ "id": "checkout", "defaultValue": "true" }))),
            previous_attributes: Some(snapshot(json!({ "defaultValue": "false" }))),
            ..Default::default()
        };
        let record = feature_event("feature.updated", 1, body);

        let diff = reconstruct_diff(&record);
        assert_eq!(
            diff.previous_state,
            Some(snapshot(json!({ "id": "checkout", "defaultValue": "false" })))
        );
        assert_eq!(diff.summary, "Changed: defaultValue");
        assert!(diff.can_show_structured_diff(record.effective_event_type()));
    }

    #[test]
    fn delta_field_missing_from_current_warns() {
        let body = ChangeBody {
            object: Some(snapshot(json!({ "id": "checkout" }))),
            previous_attributes: Some(snapshot(json!({ "legacyFlag": true }))),
            ..Default::default()
        };
        let record = feature_event("feature.updated", 1, body);

        let states = reconstruct_previous_state(&record);
        assert_eq!(
            states.previous_state,
            Some(snapshot(json!({ "id": "checkout", "legacyFlag": true })))
        );
        assert_eq!(
            states.warnings,
            vec![ReconstructionWarning::FieldMissingFromCurrent {
                field: "legacyFlag".into()
            }]
        );
    }

    #[test]
    fn delta_without_current_snapshot_has_no_previous() {
        let body = ChangeBody {
            previous_attributes: Some(snapshot(json!({ "defaultValue": "false" }))),
            ..Default::default()
        };
        let record = feature_event("feature.updated", 1, body);

        let diff = reconstruct_diff(&record);
        assert_eq!(diff.previous_state, None);
        assert_eq!(diff.current_state, None);
        assert!(!diff.can_show_structured_diff("feature.updated"));
    }

    #[test]
    fn creation_uses_current_as_previous() {
        let body = ChangeBody {
            object: Some(snapshot(json!({ "id": "checkout" }))),
            ..Default::default()
        };
        let record = feature_event("feature.created", 1, body);

        let diff = reconstruct_diff(&record);
        assert_eq!(diff.previous_state, diff.current_state);
        assert_eq!(diff.summary, "Feature created");
        assert!(!diff.can_show_structured_diff("feature.created"));
    }

    #[test]
    fn legacy_records_use_previous_then_current() {
        let body = ChangeBody {
            current: Some(snapshot(json!({ "id": "checkout", "v": 2 }))),
            previous: Some(snapshot(json!({ "id": "checkout", "v": 1 }))),
            ..Default::default()
        };
        let record = feature_event("feature.updated", 0, body);
        let states = reconstruct_previous_state(&record);
        assert_eq!(
            states.previous_state,
            Some(snapshot(json!({ "id": "checkout", "v": 1 })))
        );
        assert_eq!(
            states.current_state,
            Some(snapshot(json!({ "id": "checkout", "v": 2 })))
        );

        let body = ChangeBody {
            current: Some(snapshot(json!({ "id": "checkout" }))),
            ..Default::default()
        };
        let record = feature_event("feature.deleted", 0, body);
        let states = reconstruct_previous_state(&record);
        assert_eq!(states.previous_state, states.current_state);
    }

    #[test]
    fn legacy_delta_overlays_current() {
        let body = ChangeBody {
            current: Some(snapshot(json!({ "id": "checkout", "v": 2 }))),
            previous: Some(snapshot(json!({ "id": "stale" }))),
            previous_attributes: Some(snapshot(json!({ "v": 1 }))),
            ..Default::default()
        };
        let record = feature_event("feature.updated", 0, body);
        let states = reconstruct_previous_state(&record);
        assert_eq!(
            states.previous_state,
            Some(snapshot(json!({ "id": "checkout", "v": 1 })))
        );
    }

    #[test]
    fn structured_diff_needs_update_and_both_states() {
        let s = Snapshot::new();
        assert!(can_show_structured_diff("feature.updated", Some(&s), Some(&s)));
        assert!(!can_show_structured_diff("feature.updated", None, Some(&s)));
        assert!(!can_show_structured_diff("feature.updated", Some(&s), None));
        assert!(!can_show_structured_diff("feature.created", Some(&s), Some(&s)));
    }
}
