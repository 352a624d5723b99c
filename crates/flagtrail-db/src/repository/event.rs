//! SurrealDB implementation of [`EventRepository`].

use chrono::{DateTime, Utc};
use flagtrail_core::error::FlagtrailResult;
use flagtrail_core::models::event::{CreateEvent, EventRecord};
use flagtrail_core::query::{EventFilter, QuerySpec, SortDirection, SortField};
use flagtrail_core::repository::{EventRepository, PaginatedResult};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct EventRow {
    organization_id: String,
    object_type: String,
    object_id: String,
    event_type: String,
    version: u32,
    payload: String,
    date_created: DateTime<Utc>,
}

impl EventRow {
    fn try_into_event(self, id: Uuid) -> Result<EventRecord, DbError> {
        Ok(EventRecord {
            id,
            organization_id: self.organization_id,
            object: self.object_type,
            object_id: self.object_id,
            event: self.event_type,
            version: self.version,
            data: serde_json::from_str(&self.payload)?,
            date_created: self.date_created,
        })
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct EventRowWithId {
    record_id: String,
    organization_id: String,
    object_type: String,
    object_id: String,
    event_type: String,
    version: u32,
    payload: String,
    date_created: DateTime<Utc>,
}

impl EventRowWithId {
    fn try_into_event(self) -> Result<EventRecord, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::InvalidRow(format!("invalid event UUID: {e}")))?;
        EventRow {
            organization_id: self.organization_id,
            object_type: self.object_type,
            object_id: self.object_id,
            event_type: self.event_type,
            version: self.version,
            payload: self.payload,
            date_created: self.date_created,
        }
        .try_into_event(id)
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// `WHERE` body shared by the list and count queries. Only references the
/// parameters the filter actually sets.
fn filter_conditions(filter: &EventFilter) -> String {
    let mut conditions = vec!["organization_id = $organization_id"];
    if !filter.event_types.is_empty() {
        // A type matches either a full event type or an object kind.
        conditions.push("(event_type INSIDE $event_types OR object_type INSIDE $event_types)");
    }
    if filter.date_from.is_some() {
        conditions.push("date_created >= $date_from");
    }
    if filter.date_to.is_some() {
        conditions.push("date_created <= $date_to");
    }
    conditions.join(" AND ")
}

fn order_clause(field: SortField, direction: SortDirection) -> &'static str {
    match (field, direction) {
        (SortField::DateCreated, SortDirection::Asc) => "ORDER BY date_created ASC",
        (SortField::DateCreated, SortDirection::Desc) => "ORDER BY date_created DESC",
    }
}

/// SurrealDB implementation of the append-only event store.
#[derive(Clone)]
pub struct SurrealEventRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealEventRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> EventRepository for SurrealEventRepository<C> {
    async fn append(&self, input: CreateEvent) -> FlagtrailResult<EventRecord> {
        input.validate()?;

        // The UUID is the record key, so a collision fails the insert
        // instead of overwriting an existing event.
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let payload = serde_json::to_string(&input.data).map_err(DbError::from)?;

        let result = self
            .db
            .query(
                "CREATE type::record('audit_event', $id) SET \
                 organization_id = $organization_id, \
                 object_type = $object_type, \
                 object_id = $object_id, \
                 event_type = $event_type, \
                 version = $version, \
                 payload = $payload",
            )
            .bind(("id", id_str.clone()))
            .bind(("organization_id", input.organization_id))
            .bind(("object_type", input.object))
            .bind(("object_id", input.object_id))
            .bind(("event_type", input.event))
            .bind(("version", input.version))
            .bind(("payload", payload))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<EventRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "audit_event".into(),
            id: id_str,
        })?;

        let record = row.try_into_event(id)?;
        info!(
            event_id = %record.id,
            organization_id = %record.organization_id,
            event = %record.event,
            object_id = %record.object_id,
            "Appended audit event"
        );
        Ok(record)
    }

    async fn get_by_id(&self, organization_id: &str, id: Uuid) -> FlagtrailResult<EventRecord> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('audit_event', $id) \
                 WHERE organization_id = $organization_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("organization_id", organization_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<EventRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "audit_event".into(),
            id: id_str,
        })?;

        row.try_into_event(id).map_err(Into::into)
    }

    async fn query(&self, spec: &QuerySpec) -> FlagtrailResult<PaginatedResult<EventRecord>> {
        let filter = &spec.filter;
        let pagination = spec.pagination();
        let total = self.count(filter).await?;

        // Past the last match; also keeps START within SurrealDB's signed range.
        if pagination.offset >= total {
            return Ok(PaginatedResult {
                items: Vec::new(),
                total,
                offset: pagination.offset,
                limit: pagination.limit,
            });
        }

        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM audit_event \
             WHERE {} {} LIMIT $limit START $offset",
            filter_conditions(filter),
            order_clause(spec.sort_field, spec.sort_direction),
        );
        debug!(%query, page = spec.page, per_page = spec.per_page, "Querying audit events");

        let mut builder = self
            .db
            .query(&query)
            .bind(("organization_id", filter.organization_id.clone()))
            .bind(("limit", pagination.limit.min(i64::MAX as u64)))
            .bind(("offset", pagination.offset));
        if !filter.event_types.is_empty() {
            builder = builder.bind(("event_types", filter.event_types.clone()));
        }
        if let Some(from) = filter.date_from {
            builder = builder.bind(("date_from", from));
        }
        if let Some(to) = filter.date_to {
            builder = builder.bind(("date_to", to));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<EventRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_event())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn count(&self, filter: &EventFilter) -> FlagtrailResult<u64> {
        let query = format!(
            "SELECT count() AS total FROM audit_event WHERE {} GROUP ALL",
            filter_conditions(filter),
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("organization_id", filter.organization_id.clone()));
        if !filter.event_types.is_empty() {
            builder = builder.bind(("event_types", filter.event_types.clone()));
        }
        if let Some(from) = filter.date_from {
            builder = builder.bind(("date_from", from));
        }
        if let Some(to) = filter.date_to {
            builder = builder.bind(("date_to", to));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conditions_only_reference_set_parameters() {
        let filter = EventFilter::new("org");
        assert_eq!(filter_conditions(&filter), "organization_id = $organization_id");

        let filter = EventFilter::new("org")
            .with_event_types(["feature"])
            .with_date_range(Some(Utc::now()), None);
        let conditions = filter_conditions(&filter);
        assert!(conditions.contains("$event_types"));
        assert!(conditions.contains("$date_from"));
        assert!(!conditions.contains("$date_to"));
    }

    #[test]
    fn order_follows_direction() {
        assert_eq!(
            order_clause(SortField::DateCreated, SortDirection::Asc),
            "ORDER BY date_created ASC"
        );
        assert_eq!(
            order_clause(SortField::DateCreated, SortDirection::Desc),
            "ORDER BY date_created DESC"
        );
    }
}
