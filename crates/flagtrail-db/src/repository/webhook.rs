//! SurrealDB implementation of [`WebhookRepository`].

use chrono::{DateTime, Utc};
use flagtrail_core::error::FlagtrailResult;
use flagtrail_core::models::webhook::{CreateWebhook, Webhook};
use flagtrail_core::repository::{PaginatedResult, Pagination, WebhookRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct WebhookRow {
    organization_id: String,
    name: String,
    url: String,
    events: Vec<String>,
    environments: Vec<String>,
    enabled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn row_to_webhook(row: WebhookRow, id: String) -> Webhook {
    Webhook {
        id,
        organization_id: row.organization_id,
        name: row.name,
        url: row.url,
        events: row.events,
        environments: row.environments,
        enabled: row.enabled,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

#[derive(Debug, SurrealValue)]
struct WebhookRowWithId {
    record_id: String,
    organization_id: String,
    name: String,
    url: String,
    events: Vec<String>,
    environments: Vec<String>,
    enabled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<WebhookRowWithId> for Webhook {
    fn from(row: WebhookRowWithId) -> Self {
        Webhook {
            id: row.record_id,
            organization_id: row.organization_id,
            name: row.name,
            url: row.url,
            events: row.events,
            environments: row.environments,
            enabled: row.enabled,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the webhook configuration store.
#[derive(Clone)]
pub struct SurrealWebhookRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealWebhookRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> WebhookRepository for SurrealWebhookRepository<C> {
    async fn create(&self, input: CreateWebhook) -> FlagtrailResult<Webhook> {
        let id = Uuid::new_v4().to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('event_webhook', $id) SET \
                 organization_id = $organization_id, \
                 name = $name, \
                 url = $url, \
                 events = $events, \
                 environments = $environments",
            )
            .bind(("id", id.clone()))
            .bind(("organization_id", input.organization_id))
            .bind(("name", input.name))
            .bind(("url", input.url))
            .bind(("events", input.events))
            .bind(("environments", input.environments))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<WebhookRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "event_webhook".into(),
            id: id.clone(),
        })?;

        Ok(row_to_webhook(row, id))
    }

    async fn get_by_id(&self, organization_id: &str, id: &str) -> FlagtrailResult<Webhook> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('event_webhook', $id) \
                 WHERE organization_id = $organization_id",
            )
            .bind(("id", id.to_string()))
            .bind(("organization_id", organization_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<WebhookRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "event_webhook".into(),
            id: id.to_string(),
        })?;

        Ok(row_to_webhook(row, id.to_string()))
    }

    async fn list(
        &self,
        organization_id: &str,
        pagination: Pagination,
    ) -> FlagtrailResult<PaginatedResult<Webhook>> {
        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM event_webhook \
                 WHERE organization_id = $organization_id GROUP ALL",
            )
            .bind(("organization_id", organization_id.to_string()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM event_webhook \
                 WHERE organization_id = $organization_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("organization_id", organization_id.to_string()))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<WebhookRowWithId> = result.take(0).map_err(DbError::from)?;

        Ok(PaginatedResult {
            items: rows.into_iter().map(Webhook::from).collect(),
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
