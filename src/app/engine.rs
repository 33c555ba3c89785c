//! Monitoring engine: the operations exposed to the CLI and MCP layers.
//!
//! Every component is built once from injected backends and shares them; no
//! operation keeps state between calls.

#![warn(clippy::all, rust_2018_idioms)]

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::config::{AppConfig, LogGroupCatalog};
use super::data_plane::cloudwatch_alarms::{
    AlarmAggregator, AlarmBackend, CloudWatchAlarmsClient, NormalizedAlarm,
};
use super::data_plane::cloudwatch_logs::{
    CloudWatchLogsClient, FieldSchema, LogGroupSummary, LogGroupValidator, LogsBackend,
    QueryExecutor, QueryRequest, QueryResult, SavedQuery, SavedQueryCatalog, SchemaDiscoverer,
    TimeRange,
};
use super::errors::EngineError;

#[derive(Clone)]
pub struct MonitoringEngine {
    log_groups: LogGroupCatalog,
    alarms: AlarmAggregator,
    validator: LogGroupValidator,
    executor: QueryExecutor,
    schema: SchemaDiscoverer,
    saved_queries: SavedQueryCatalog,
}

impl MonitoringEngine {
    /// Build the engine over arbitrary backends
    pub fn from_backends(
        logs: Arc<dyn LogsBackend>,
        alarms: Arc<dyn AlarmBackend>,
        config: &AppConfig,
    ) -> anyhow::Result<Self> {
        let executor = QueryExecutor::new(logs.clone(), config.query_settings()?);
        Ok(Self {
            log_groups: config.log_groups.clone(),
            alarms: AlarmAggregator::new(alarms),
            validator: executor.validator().clone(),
            schema: SchemaDiscoverer::new(executor.clone(), config.schema_settings()?),
            saved_queries: SavedQueryCatalog::new(logs),
            executor,
        })
    }

    /// Build the engine over the AWS SDK clients for `sdk_config`
    pub fn from_sdk_config(
        sdk_config: &aws_config::SdkConfig,
        config: &AppConfig,
    ) -> anyhow::Result<Self> {
        Self::from_backends(
            Arc::new(CloudWatchLogsClient::new(sdk_config)),
            Arc::new(CloudWatchAlarmsClient::new(sdk_config)),
            config,
        )
    }

    /// The configured log group table, unchanged
    pub fn list_log_groups(&self) -> &LogGroupCatalog {
        &self.log_groups
    }

    pub async fn list_alarms(
        &self,
        only_in_alarm_state: bool,
    ) -> Result<Vec<NormalizedAlarm>, EngineError> {
        self.alarms.formatted_alarms(only_in_alarm_state).await
    }

    pub async fn list_alarms_in_alarm_state(&self) -> Result<Vec<NormalizedAlarm>, EngineError> {
        self.list_alarms(true).await
    }

    /// Fail-closed existence check
    pub async fn log_group_exists(&self, name: &str) -> bool {
        self.validator.exists(name).await
    }

    pub async fn describe_log_groups(
        &self,
        prefix: Option<&str>,
    ) -> Result<Vec<LogGroupSummary>, EngineError> {
        self.validator.describe_log_groups(prefix).await.map_err(|e| {
            log_error!("Error listing log groups (prefix {:?}): {:#}", prefix, e);
            EngineError::transport("describe_log_groups", &e)
        })
    }

    pub async fn discover_fields(
        &self,
        log_group_names: &[String],
    ) -> Result<FieldSchema, EngineError> {
        self.schema.discover_fields(log_group_names).await
    }

    /// Run a Logs Insights query.
    ///
    /// `Err` only for a missing log group; check `status` on the result otherwise.
    pub async fn query_logs(
        &self,
        log_group_names: Vec<String>,
        query_string: &str,
        start_time_ms: Option<i64>,
        end_time_ms: Option<i64>,
    ) -> Result<QueryResult, EngineError> {
        self.query_logs_with(
            QueryRequest::new(log_group_names, query_string)
                .with_time_range(TimeRange::new(start_time_ms, end_time_ms)),
            &CancellationToken::new(),
        )
        .await
    }

    /// Run a fully specified query that the caller can cancel
    pub async fn query_logs_with(
        &self,
        request: QueryRequest,
        cancel: &CancellationToken,
    ) -> Result<QueryResult, EngineError> {
        log_info!(
            "Querying logs for log groups {:?}: {}",
            request.log_group_names,
            request.query_string
        );
        self.executor.execute_with_cancel(request, cancel).await
    }

    pub async fn list_saved_queries(&self) -> Result<Vec<SavedQuery>, EngineError> {
        self.saved_queries.list().await
    }
}
