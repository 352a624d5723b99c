//! The caller on whose behalf an operation runs, and the permission oracle
//! consulted for it.

use super::event::EventUser;

/// Capability checks evaluated per actor.
pub trait Permissions: Send + Sync {
    fn can_view_audit_logs(&self) -> bool;
    fn can_create_event_webhook(&self, organization_id: &str) -> bool;
}

/// Fixed permission answers, independent of the organization asked about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticPermissions {
    pub view_audit_logs: bool,
    pub create_event_webhook: bool,
}

impl StaticPermissions {
    pub fn all() -> Self {
        Self {
            view_audit_logs: true,
            create_event_webhook: true,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}

impl Permissions for StaticPermissions {
    fn can_view_audit_logs(&self) -> bool {
        self.view_audit_logs
    }

    fn can_create_event_webhook(&self, _organization_id: &str) -> bool {
        self.create_event_webhook
    }
}

/// An authenticated caller scoped to one organization.
#[derive(Debug, Clone)]
pub struct Actor<P: Permissions> {
    pub organization_id: String,
    pub user: Option<EventUser>,
    pub permissions: P,
}

impl<P: Permissions> Actor<P> {
    pub fn new(organization_id: impl Into<String>, permissions: P) -> Self {
        Self {
            organization_id: organization_id.into(),
            user: None,
            permissions,
        }
    }
}
