//! Query filter builder.
//!
//! Translates a caller's `{page, perPage, from, to, type, sortOrder}`
//! request into a canonical [`QuerySpec`], and encodes/decodes the
//! HTTP-style query strings used by the event list and count endpoints.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use url::form_urlencoded;

use crate::error::{FlagtrailError, FlagtrailResult};
use crate::repository::Pagination;

/// Event types shown in the feature change history.
pub const FEATURE_EVENT_TYPES: [&str; 3] = ["feature.created", "feature.updated", "feature.deleted"];

/// Page size used when a request does not name one.
pub const DEFAULT_PER_PAGE: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = FlagtrailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(FlagtrailError::validation(format!(
                "invalid sortOrder `{other}`, expected `asc` or `desc`"
            ))),
        }
    }
}

/// Sortable event attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    DateCreated,
}

/// Record-selection part of a query, shared by the list and count
/// operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFilter {
    pub organization_id: String,
    /// Event types or object kinds to include. Empty means no filter.
    pub event_types: Vec<String>,
    /// Inclusive lower bound on `date_created`.
    pub date_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `date_created`.
    pub date_to: Option<DateTime<Utc>>,
}

impl EventFilter {
    pub fn new(organization_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            event_types: Vec::new(),
            date_from: None,
            date_to: None,
        }
    }

    pub fn with_event_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.event_types = dedup_types(types.into_iter().map(Into::into));
        self
    }

    pub fn with_date_range(
        mut self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Self {
        self.date_from = from;
        self.date_to = to;
        self
    }
}

/// Canonical, validated list query. Built once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    pub filter: EventFilter,
    /// 1-based page number.
    pub page: u64,
    pub per_page: u64,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
}

impl QuerySpec {
    /// Fails with a validation error when `page` or `per_page` is zero.
    pub fn new(filter: EventFilter, page: u64, per_page: u64) -> FlagtrailResult<Self> {
        if page == 0 {
            return Err(FlagtrailError::validation("page must be at least 1"));
        }
        if per_page == 0 {
            return Err(FlagtrailError::validation("perPage must be at least 1"));
        }
        Ok(Self {
            filter,
            page,
            per_page,
            sort_field: SortField::default(),
            sort_direction: SortDirection::default(),
        })
    }

    pub fn sorted_by(mut self, field: SortField, direction: SortDirection) -> Self {
        self.sort_field = field;
        self.sort_direction = direction;
        self
    }

    pub fn pagination(&self) -> Pagination {
        Pagination {
            offset: self.page.saturating_sub(1).saturating_mul(self.per_page),
            limit: self.per_page,
        }
    }
}

/// A caller's list request as carried on the query transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQueryParams {
    pub page: u64,
    /// Requested page size. `None` leaves the choice to the service.
    pub per_page: Option<u64>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub types: Vec<String>,
    pub sort_order: SortDirection,
}

impl Default for EventQueryParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: None,
            from: None,
            to: None,
            types: Vec::new(),
            sort_order: SortDirection::default(),
        }
    }
}

impl EventQueryParams {
    /// Request for the feature change history.
    pub fn feature_history(
        page: u64,
        per_page: u64,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        sort_order: SortDirection,
    ) -> Self {
        Self {
            page,
            per_page: Some(per_page),
            from,
            to,
            types: FEATURE_EVENT_TYPES.iter().map(|t| t.to_string()).collect(),
            sort_order,
        }
    }

    /// Encodes `page`, `perPage`, `from`, `to`, `type` and `sortOrder`.
    /// Absent dates encode as empty values; an unset page size is omitted.
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        serializer.append_pair("page", &self.page.to_string());
        if let Some(per_page) = self.per_page {
            serializer.append_pair("perPage", &per_page.to_string());
        }
        serializer
            .append_pair("from", &self.from.map(format_timestamp).unwrap_or_default())
            .append_pair("to", &self.to.map(format_timestamp).unwrap_or_default())
            .append_pair("type", &encode_types(&self.types))
            .append_pair("sortOrder", self.sort_order.as_str())
            .finish()
    }

    pub fn from_query_string(query: &str) -> FlagtrailResult<Self> {
        let mut params = Self::default();
        for (key, value) in parse_pairs(query) {
            match key.as_str() {
                "page" => params.page = parse_count("page", &value)?,
                "perPage" => params.per_page = Some(parse_count("perPage", &value)?),
                "from" => params.from = parse_timestamp("from", &value)?,
                "to" => params.to = parse_timestamp("to", &value)?,
                "type" => params.types = decode_types(&value)?,
                "sortOrder" => params.sort_order = value.parse()?,
                _ => {}
            }
        }
        Ok(params)
    }

    /// Fills in `per_page` when the request left it unset.
    pub fn with_default_per_page(mut self, per_page: u64) -> Self {
        self.per_page.get_or_insert(per_page);
        self
    }

    /// Unset page sizes fall back to [`DEFAULT_PER_PAGE`].
    pub fn into_spec(self, organization_id: impl Into<String>) -> FlagtrailResult<QuerySpec> {
        let filter = EventFilter::new(organization_id)
            .with_event_types(self.types)
            .with_date_range(self.from, self.to);
        let per_page = self.per_page.unwrap_or(DEFAULT_PER_PAGE);
        Ok(QuerySpec::new(filter, self.page, per_page)?
            .sorted_by(SortField::DateCreated, self.sort_order))
    }
}

/// A caller's count request. Dates are omitted from the query string when
/// absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountParams {
    pub types: Vec<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl CountParams {
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        serializer.append_pair("type", &encode_types(&self.types));
        if let Some(from) = self.from {
            serializer.append_pair("from", &format_timestamp(from));
        }
        if let Some(to) = self.to {
            serializer.append_pair("to", &format_timestamp(to));
        }
        serializer.finish()
    }

    pub fn from_query_string(query: &str) -> FlagtrailResult<Self> {
        let mut params = Self::default();
        for (key, value) in parse_pairs(query) {
            match key.as_str() {
                "type" => params.types = decode_types(&value)?,
                "from" => params.from = parse_timestamp("from", &value)?,
                "to" => params.to = parse_timestamp("to", &value)?,
                _ => {}
            }
        }
        Ok(params)
    }

    pub fn into_filter(self, organization_id: impl Into<String>) -> EventFilter {
        EventFilter::new(organization_id)
            .with_event_types(self.types)
            .with_date_range(self.from, self.to)
    }
}

/// ISO-8601 in UTC with millisecond precision, e.g. `2024-01-15T00:00:00.000Z`.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_pairs(query: &str) -> Vec<(String, String)> {
    let query = query.strip_prefix('?').unwrap_or(query);
    form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

fn parse_count(name: &str, value: &str) -> FlagtrailResult<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| FlagtrailError::validation(format!("{name} must be a positive integer")))
}

fn parse_timestamp(name: &str, value: &str) -> FlagtrailResult<Option<DateTime<Utc>>> {
    if value.is_empty() {
        return Ok(None);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|ts| Some(ts.with_timezone(&Utc)))
        .map_err(|e| FlagtrailError::validation(format!("invalid {name} timestamp: {e}")))
}

fn encode_types(types: &[String]) -> String {
    // Serializing a list of strings cannot fail.
    serde_json::to_string(types).unwrap_or_else(|_| "[]".into())
}

fn decode_types(value: &str) -> FlagtrailResult<Vec<String>> {
    if value.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(value).map_err(|e| {
        FlagtrailError::validation(format!("type must be a JSON array of strings: {e}"))
    })
}

fn dedup_types(types: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for t in types {
        if !t.is_empty() && !out.contains(&t) {
            out.push(t);
        }
    }
    out
}
