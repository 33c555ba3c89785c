//! CloudWatch Logs Integration Module
//!
//! Log group checks, Logs Insights query execution, schema discovery and saved
//! query definitions.
//!
//! ## Features
//!
//! - Existence gate for log groups before any query is started
//! - Submit-then-poll query execution with backoff, deadline and cancellation
//! - JSON decoding of the payload field (`@message`) in result rows
//! - Field schema inference over sampled records
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use awswatch::app::data_plane::cloudwatch_logs::{
//!     CloudWatchLogsClient, QueryExecutor, QueryRequest, QuerySettings,
//! };
//!
//! # async fn example(aws_config: aws_config::SdkConfig) -> anyhow::Result<()> {
//! let backend = Arc::new(CloudWatchLogsClient::new(&aws_config));
//! let executor = QueryExecutor::new(backend, QuerySettings::default());
//!
//! let request = QueryRequest::new(
//!     vec!["/aws/lambda/my-function".to_string()],
//!     "fields @timestamp, @message | limit 5",
//! );
//! let result = executor.execute(request).await?;
//! println!("{}: {} rows", result.status, result.results.len());
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all, rust_2018_idioms)]

pub mod client;
pub mod query;
pub mod saved_queries;
pub mod schema;
pub mod types;
pub mod validator;

// Re-export commonly used types
pub use client::{CloudWatchLogsClient, LogsBackend};
pub use query::{
    decode_payload, decode_rows, QueryExecutor, QueryRequest, QuerySettings, STOP_QUERY_TIMEOUT,
};
pub use saved_queries::SavedQueryCatalog;
pub use schema::{infer_schema, SchemaDiscoverer, SchemaSettings};
pub use types::{
    FieldSchema, FieldType, FieldValue, LogGroup, LogGroupSummary, LogRow, QueryHandle,
    QueryPoll, QueryResult, QueryStatistics, QueryStatus, ResultField, SavedQuery,
    StartQueryRequest, TimeRange,
};
pub use validator::LogGroupValidator;
