//! Event service configuration.

use flagtrail_core::models::event::DEFAULT_API_VERSION;
use flagtrail_core::query::DEFAULT_PER_PAGE;

/// Configuration shared by the event services.
#[derive(Debug, Clone)]
pub struct EventsConfig {
    /// API version stamped into payloads of events created here.
    pub api_version: String,
    /// Page size applied when a request leaves `perPage` unset (default: 30).
    pub default_per_page: u64,
    /// Largest page size a caller may request (default: 100).
    pub max_per_page: u64,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            api_version: DEFAULT_API_VERSION.into(),
            default_per_page: DEFAULT_PER_PAGE,
            max_per_page: 100,
        }
    }
}
