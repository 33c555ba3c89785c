//! Field schema discovery from sampled log records.
//!
//! A small sampling query is run through the [`QueryExecutor`]. The payload
//! field of every sampled row is flattened into dotted paths:
//!
//! - objects recurse with `parent.child` prefixes and are not recorded themselves
//! - arrays are recorded as `array` without looking inside
//! - booleans, numbers and everything else map to `boolean`, `number`, `string`
//!
//! Other fields are typed from their literal text. The first type seen for a
//! path is kept; later samples never overwrite it.

#![warn(clippy::all, rust_2018_idioms)]

use serde_json::{Map, Value};

use super::query::{QueryExecutor, QueryRequest};
use super::types::{FieldSchema, FieldType, FieldValue, LogRow, QueryStatus, TimeRange};
use crate::app::errors::EngineError;

/// Sampling parameters
#[derive(Debug, Clone)]
pub struct SchemaSettings {
    /// Row cap of the sampling query
    pub sample_limit: u32,
    /// How far back the sampling query looks
    pub window: chrono::Duration,
}

impl Default for SchemaSettings {
    fn default() -> Self {
        Self {
            sample_limit: 20,
            window: chrono::Duration::hours(24),
        }
    }
}

#[derive(Clone)]
pub struct SchemaDiscoverer {
    executor: QueryExecutor,
    settings: SchemaSettings,
}

impl SchemaDiscoverer {
    pub fn new(executor: QueryExecutor, settings: SchemaSettings) -> Self {
        Self { executor, settings }
    }

    /// Sample recent records of `log_group_names` and infer their fields.
    ///
    /// A missing log group yields an empty schema. A sampling query that does
    /// not complete is reported as [`EngineError::QueryFailed`].
    pub async fn discover_fields(
        &self,
        log_group_names: &[String],
    ) -> Result<FieldSchema, EngineError> {
        let payload_field = self.executor.settings().payload_field.clone();
        let query = format!(
            "fields @timestamp, {} | limit {}",
            payload_field, self.settings.sample_limit
        );

        let now_ms = chrono::Utc::now().timestamp_millis();
        let window = TimeRange::new(
            Some(now_ms.saturating_sub(self.settings.window.num_milliseconds())),
            Some(now_ms),
        );
        let request = QueryRequest::new(log_group_names.to_vec(), query).with_time_range(window);

        let result = match self.executor.execute(request).await {
            Ok(result) => result,
            Err(EngineError::LogGroupNotFound { log_group }) => {
                log_warn!(
                    "Log group '{}' does not exist, returning an empty schema",
                    log_group
                );
                return Ok(FieldSchema::new());
            }
            Err(other) => return Err(other),
        };

        if result.status != QueryStatus::Complete {
            log_error!(
                "Error discovering fields for log groups {:?}: status {}",
                log_group_names,
                result.status
            );
            return Err(EngineError::QueryFailed {
                status: result.status,
                message: result
                    .message
                    .unwrap_or_else(|| format!("Sampling query ended with status {}", result.status)),
            });
        }

        let schema = infer_schema(&result.results, &payload_field);
        log_info!(
            "Discovered {} fields for log groups {:?}",
            schema.len(),
            log_group_names
        );
        Ok(schema)
    }
}

/// Build a schema from decoded rows, first sample wins
pub fn infer_schema(rows: &[LogRow], payload_field: &str) -> FieldSchema {
    let mut schema = FieldSchema::new();

    for row in rows {
        for (name, value) in row {
            if name == payload_field {
                match value {
                    FieldValue::Structured(Value::Object(object)) => {
                        schema.record(name.as_str(), FieldType::JsonObject);
                        flatten_object(object, "", &mut schema);
                    }
                    FieldValue::Structured(Value::Array(_)) => {
                        schema.record(name.as_str(), FieldType::Array);
                    }
                    _ => {
                        schema.record(name.as_str(), FieldType::String);
                    }
                }
            } else {
                let field_type = match value {
                    FieldValue::Text(text) => infer_literal(text),
                    FieldValue::Structured(v) => json_type(v),
                };
                schema.record(name.as_str(), field_type);
            }
        }
    }

    schema
}

fn flatten_object(object: &Map<String, Value>, prefix: &str, schema: &mut FieldSchema) {
    for (key, value) in object {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            Value::Object(nested) => flatten_object(nested, &path, schema),
            other => {
                schema.record(path, json_type(other));
            }
        }
    }
}

fn json_type(value: &Value) -> FieldType {
    match value {
        Value::Array(_) => FieldType::Array,
        Value::Bool(_) => FieldType::Boolean,
        Value::Number(_) => FieldType::Number,
        Value::Object(_) => FieldType::JsonObject,
        Value::String(_) | Value::Null => FieldType::String,
    }
}

/// Type a non-payload value from its text: digits are numbers, true/false booleans
pub fn infer_literal(text: &str) -> FieldType {
    if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
        FieldType::Number
    } else if text.eq_ignore_ascii_case("true") || text.eq_ignore_ascii_case("false") {
        FieldType::Boolean
    } else {
        FieldType::String
    }
}
