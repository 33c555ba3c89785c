//! CloudWatch Logs Client Wrapper
//!
//! [`LogsBackend`] is the page-level seam used by the validator, the query
//! executor and the saved-query listing. [`CloudWatchLogsClient`] implements it
//! over `aws-sdk-cloudwatchlogs`.

#![warn(clippy::all, rust_2018_idioms)]

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aws_sdk_cloudwatchlogs as cloudwatchlogs;

use super::types::{
    LogGroupSummary, QueryHandle, QueryPoll, QueryStatistics, QueryStatus, ResultField,
    SavedQuery, StartQueryRequest,
};
use crate::app::data_plane::pagination::Page;

/// Page-level access to CloudWatch Logs
#[async_trait]
pub trait LogsBackend: Send + Sync {
    /// One page of log groups whose names start with `prefix`
    async fn describe_log_groups(
        &self,
        prefix: Option<&str>,
        next_token: Option<String>,
    ) -> Result<Page<LogGroupSummary>>;

    /// Start a Logs Insights query
    async fn start_query(&self, request: &StartQueryRequest) -> Result<QueryHandle>;

    /// Poll a started query once
    async fn get_query_results(&self, handle: &QueryHandle) -> Result<QueryPoll>;

    /// Ask the backend to stop a running query
    async fn stop_query(&self, handle: &QueryHandle) -> Result<bool>;

    /// One page of saved query definitions
    async fn describe_query_definitions(
        &self,
        next_token: Option<String>,
    ) -> Result<Page<SavedQuery>>;
}

/// Page size used for prefix lookups of log groups
const LOG_GROUP_PAGE_SIZE: i32 = 50;

/// CloudWatch Logs client wrapper
#[derive(Clone)]
pub struct CloudWatchLogsClient {
    client: cloudwatchlogs::Client,
}

impl CloudWatchLogsClient {
    /// Create a client from a shared SDK config
    pub fn new(aws_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: cloudwatchlogs::Client::new(aws_config),
        }
    }
}

#[async_trait]
impl LogsBackend for CloudWatchLogsClient {
    async fn describe_log_groups(
        &self,
        prefix: Option<&str>,
        next_token: Option<String>,
    ) -> Result<Page<LogGroupSummary>> {
        let response = self
            .client
            .describe_log_groups()
            .set_log_group_name_prefix(prefix.map(str::to_string))
            .limit(LOG_GROUP_PAGE_SIZE)
            .set_next_token(next_token)
            .send()
            .await
            .with_context(|| format!("Failed to describe log groups (prefix: {:?})", prefix))?;

        let groups = response
            .log_groups()
            .iter()
            .filter_map(|group| {
                group.log_group_name().map(|name| LogGroupSummary {
                    log_group_name: name.to_string(),
                    arn: group.arn().map(str::to_string),
                    creation_time: group.creation_time(),
                    retention_in_days: group.retention_in_days(),
                    stored_bytes: group.stored_bytes(),
                })
            })
            .collect();

        Ok(Page::new(groups, response.next_token().map(str::to_string)))
    }

    async fn start_query(&self, request: &StartQueryRequest) -> Result<QueryHandle> {
        // StartQuery takes epoch seconds
        let response = self
            .client
            .start_query()
            .set_log_group_names(Some(request.log_group_names.clone()))
            .start_time(request.start_time_ms / 1000)
            .end_time(request.end_time_ms / 1000)
            .query_string(&request.query_string)
            .set_limit(request.limit)
            .send()
            .await
            .with_context(|| {
                format!(
                    "Failed to start query on log groups {:?}",
                    request.log_group_names
                )
            })?;

        response
            .query_id()
            .map(QueryHandle::new)
            .ok_or_else(|| anyhow!("StartQuery returned no query id"))
    }

    async fn get_query_results(&self, handle: &QueryHandle) -> Result<QueryPoll> {
        let response = self
            .client
            .get_query_results()
            .query_id(handle.as_str())
            .send()
            .await
            .with_context(|| format!("Failed to get results for query {}", handle.as_str()))?;

        let raw_status = response.status().map(|s| s.as_str()).unwrap_or("Unknown");
        let status = QueryStatus::parse(raw_status).ok_or_else(|| {
            anyhow!(
                "Query {} reported unrecognized status '{}'",
                handle.as_str(),
                raw_status
            )
        })?;

        let statistics = response
            .statistics()
            .map(|s| QueryStatistics::new(s.records_matched(), s.records_scanned(), s.bytes_scanned()))
            .unwrap_or_default();

        let rows = response
            .results()
            .iter()
            .map(|row| {
                row.iter()
                    .filter_map(|cell| {
                        cell.field().map(|field| {
                            ResultField::new(field, cell.value().unwrap_or_default())
                        })
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        Ok(QueryPoll {
            status,
            statistics,
            rows,
        })
    }

    async fn stop_query(&self, handle: &QueryHandle) -> Result<bool> {
        let response = self
            .client
            .stop_query()
            .query_id(handle.as_str())
            .send()
            .await
            .with_context(|| format!("Failed to stop query {}", handle.as_str()))?;
        Ok(response.success())
    }

    async fn describe_query_definitions(
        &self,
        next_token: Option<String>,
    ) -> Result<Page<SavedQuery>> {
        let response = self
            .client
            .describe_query_definitions()
            .set_next_token(next_token)
            .send()
            .await
            .context("Failed to describe query definitions")?;

        let queries = response
            .query_definitions()
            .iter()
            .map(|definition| SavedQuery {
                query_definition_id: definition
                    .query_definition_id()
                    .unwrap_or_default()
                    .to_string(),
                name: definition.name().unwrap_or_default().to_string(),
                query_string: definition.query_string().unwrap_or_default().to_string(),
                last_modified: definition.last_modified(),
                log_group_names: definition
                    .log_group_names
                    .as_ref()
                    .map(|names| names.to_vec()),
            })
            .collect();

        Ok(Page::new(queries, response.next_token().map(str::to_string)))
    }
}
