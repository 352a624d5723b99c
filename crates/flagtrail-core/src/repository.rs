//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Every repository is scoped by
//! `organization_id` to enforce tenant isolation.

use uuid::Uuid;

use crate::error::FlagtrailResult;
use crate::models::{
    event::{CreateEvent, EventRecord},
    webhook::{CreateWebhook, Webhook},
};
use crate::query::{EventFilter, QuerySpec};

/// Pagination parameters for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    /// Number of matches ignoring pagination.
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Audit events (append-only)
// ---------------------------------------------------------------------------

pub trait EventRepository: Send + Sync {
    /// Validate and append a new event, assigning its `id` and
    /// `date_created`. No update or delete operations exist.
    fn append(&self, input: CreateEvent) -> impl Future<Output = FlagtrailResult<EventRecord>> + Send;
    fn get_by_id(
        &self,
        organization_id: &str,
        id: Uuid,
    ) -> impl Future<Output = FlagtrailResult<EventRecord>> + Send;
    /// One sorted page of matching events plus the total match count.
    fn query(
        &self,
        spec: &QuerySpec,
    ) -> impl Future<Output = FlagtrailResult<PaginatedResult<EventRecord>>> + Send;
    /// Number of events matching `filter`.
    fn count(&self, filter: &EventFilter) -> impl Future<Output = FlagtrailResult<u64>> + Send;
}

// ---------------------------------------------------------------------------
// Webhooks
// ---------------------------------------------------------------------------

pub trait WebhookRepository: Send + Sync {
    fn create(&self, input: CreateWebhook) -> impl Future<Output = FlagtrailResult<Webhook>> + Send;
    fn get_by_id(
        &self,
        organization_id: &str,
        id: &str,
    ) -> impl Future<Output = FlagtrailResult<Webhook>> + Send;
    fn list(
        &self,
        organization_id: &str,
        pagination: Pagination,
    ) -> impl Future<Output = FlagtrailResult<PaginatedResult<Webhook>>> + Send;
}
