//! CloudWatch Logs Data Types
//!
//! Request-scoped DTOs for log groups, Logs Insights queries, saved query
//! definitions and discovered field schemas. Everything here serializes to
//! plain JSON so transports never see SDK types.

#![warn(clippy::all, rust_2018_idioms)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Logs Insights query status.
///
/// `Submitted` is local only: the query was started but not polled yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryStatus {
    Submitted,
    Scheduled,
    Running,
    Complete,
    Failed,
    Cancelled,
    Timeout,
}

impl QueryStatus {
    /// Parse the status string returned by `GetQueryResults`
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Scheduled" => Some(QueryStatus::Scheduled),
            "Running" => Some(QueryStatus::Running),
            "Complete" => Some(QueryStatus::Complete),
            "Failed" => Some(QueryStatus::Failed),
            "Cancelled" => Some(QueryStatus::Cancelled),
            "Timeout" => Some(QueryStatus::Timeout),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryStatus::Submitted => "Submitted",
            QueryStatus::Scheduled => "Scheduled",
            QueryStatus::Running => "Running",
            QueryStatus::Complete => "Complete",
            QueryStatus::Failed => "Failed",
            QueryStatus::Cancelled => "Cancelled",
            QueryStatus::Timeout => "Timeout",
        }
    }

    /// No further status change can follow
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QueryStatus::Complete
                | QueryStatus::Failed
                | QueryStatus::Cancelled
                | QueryStatus::Timeout
        )
    }
}

impl std::fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statistics about a Logs Insights query. Advisory only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryStatistics {
    /// Number of records that matched the query
    pub records_matched: f64,
    /// Total number of records scanned
    pub records_scanned: f64,
    /// Bytes scanned during the query
    pub bytes_scanned: f64,
}

impl QueryStatistics {
    pub fn new(records_matched: f64, records_scanned: f64, bytes_scanned: f64) -> Self {
        Self {
            records_matched,
            records_scanned,
            bytes_scanned,
        }
    }
}

/// A decoded row value.
///
/// Only the payload field can become `Structured`, and only when its text is a
/// JSON object or array. Anything else stays `Text`, unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Structured(serde_json::Value),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Structured(_) => None,
        }
    }

    pub fn as_structured(&self) -> Option<&serde_json::Value> {
        match self {
            FieldValue::Structured(v) => Some(v),
            FieldValue::Text(_) => None,
        }
    }
}

/// One decoded result row, keyed by field name
pub type LogRow = BTreeMap<String, FieldValue>;

/// Outcome of one query lifecycle.
///
/// Any status other than `Complete` comes with an empty `results` list;
/// `message` explains why when the failure was observed locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,
    pub status: QueryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub statistics: QueryStatistics,
    #[serde(default)]
    pub results: Vec<LogRow>,
}

impl QueryResult {
    /// A result with no rows and an explanatory message
    pub fn unsuccessful(
        query_id: Option<String>,
        status: QueryStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            query_id,
            status,
            message: Some(message.into()),
            statistics: QueryStatistics::default(),
            results: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == QueryStatus::Complete
    }
}

/// Opaque identifier of a started query, owned by one query lifecycle
#[derive(Debug, PartialEq, Eq)]
pub struct QueryHandle(String);

impl QueryHandle {
    pub fn new(query_id: impl Into<String>) -> Self {
        Self(query_id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Parameters for `StartQuery`, with the time range already resolved
#[derive(Debug, Clone, PartialEq)]
pub struct StartQueryRequest {
    pub log_group_names: Vec<String>,
    pub query_string: String,
    /// Inclusive start, Unix milliseconds
    pub start_time_ms: i64,
    /// Inclusive end, Unix milliseconds
    pub end_time_ms: i64,
    pub limit: Option<i32>,
}

/// One raw `{field, value}` cell of a result row
#[derive(Debug, Clone, PartialEq)]
pub struct ResultField {
    pub field: String,
    pub value: String,
}

impl ResultField {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Raw answer to one `GetQueryResults` poll
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPoll {
    pub status: QueryStatus,
    pub statistics: QueryStatistics,
    pub rows: Vec<Vec<ResultField>>,
}

impl QueryPoll {
    pub fn pending(status: QueryStatus) -> Self {
        Self {
            status,
            statistics: QueryStatistics::default(),
            rows: Vec::new(),
        }
    }
}

/// Optional query window; missing bounds are filled at submission
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    pub start_time_ms: Option<i64>,
    pub end_time_ms: Option<i64>,
}

impl TimeRange {
    pub fn new(start_time_ms: Option<i64>, end_time_ms: Option<i64>) -> Self {
        Self {
            start_time_ms,
            end_time_ms,
        }
    }

    /// Fill missing bounds: start defaults to `now - window`, end to `now`
    pub fn resolve(&self, now_ms: i64, default_window: chrono::Duration) -> (i64, i64) {
        let start = self
            .start_time_ms
            .unwrap_or_else(|| now_ms.saturating_sub(default_window.num_milliseconds()));
        let end = self.end_time_ms.unwrap_or(now_ms);
        (start, end)
    }
}

/// A configured log group reference and the caller-defined category it sits in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogGroup {
    pub name: String,
    pub category: String,
}

/// Log group as described by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogGroupSummary {
    pub log_group_name: String,
    pub arn: Option<String>,
    pub creation_time: Option<i64>,
    pub retention_in_days: Option<i32>,
    pub stored_bytes: Option<i64>,
}

impl LogGroupSummary {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            log_group_name: name.into(),
            arn: None,
            creation_time: None,
            retention_in_days: None,
            stored_bytes: None,
        }
    }
}

/// Saved Logs Insights query definition. Read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedQuery {
    pub query_definition_id: String,
    pub name: String,
    pub query_string: String,
    /// Unix milliseconds
    pub last_modified: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_group_names: Option<Vec<String>>,
}

/// Inferred type of a discovered field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Array,
    /// The payload field itself when it holds a JSON object
    #[serde(rename = "json")]
    JsonObject,
}

/// Dotted field path to inferred type. The first type recorded for a path wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldSchema(BTreeMap<String, FieldType>);

impl FieldSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `path` unless it is already known. Returns true if recorded.
    pub fn record(&mut self, path: impl Into<String>, field_type: FieldType) -> bool {
        use std::collections::btree_map::Entry;
        match self.0.entry(path.into()) {
            Entry::Vacant(slot) => {
                slot.insert(field_type);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<FieldType> {
        self.0.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, FieldType)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}
