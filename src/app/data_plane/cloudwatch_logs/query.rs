//! Logs Insights query execution.
//!
//! A query goes through
//!
//! ```text
//! Submitted -> (Scheduled | Running)* -> Complete | Failed | Cancelled | Timeout
//! ```
//!
//! The executor checks that every log group exists, starts the query once with
//! a resolved time range, then polls with exponential backoff until a terminal
//! status, the local deadline or caller cancellation. Backend errors after
//! the existence gate never escape: they become a `Failed` result.

#![warn(clippy::all, rust_2018_idioms)]

use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::client::LogsBackend;
use super::types::{
    FieldValue, LogRow, QueryHandle, QueryPoll, QueryResult, QueryStatus, ResultField,
    StartQueryRequest, TimeRange,
};
use super::validator::LogGroupValidator;
use crate::app::errors::EngineError;

/// Field that carries the raw log line in Logs Insights results
pub const DEFAULT_PAYLOAD_FIELD: &str = "@message";

/// Upper bound on the best-effort StopQuery sent when a wait is abandoned
pub const STOP_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a local wait ended before the query reached a terminal status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    Cancelled,
    TimedOut,
}

/// Timing and decoding knobs for query execution
#[derive(Debug, Clone)]
pub struct QuerySettings {
    /// Upper bound on the local wait for a terminal status
    pub timeout: Duration,
    /// First delay between polls
    pub min_poll_interval: Duration,
    /// Backoff ceiling between polls
    pub max_poll_interval: Duration,
    /// Window used when the caller leaves out the start bound
    pub default_window: chrono::Duration,
    /// Field eligible for structured (JSON) decoding
    pub payload_field: String,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            min_poll_interval: Duration::from_millis(250),
            max_poll_interval: Duration::from_secs(5),
            default_window: chrono::Duration::hours(24),
            payload_field: DEFAULT_PAYLOAD_FIELD.to_string(),
        }
    }
}

/// A query as asked for by a caller
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub log_group_names: Vec<String>,
    pub query_string: String,
    pub time_range: TimeRange,
    pub limit: Option<i32>,
}

impl QueryRequest {
    pub fn new(log_group_names: Vec<String>, query_string: impl Into<String>) -> Self {
        Self {
            log_group_names,
            query_string: query_string.into(),
            time_range: TimeRange::default(),
            limit: None,
        }
    }

    pub fn with_time_range(mut self, time_range: TimeRange) -> Self {
        self.time_range = time_range;
        self
    }

    pub fn with_limit(mut self, limit: i32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Drives Logs Insights queries to completion
#[derive(Clone)]
pub struct QueryExecutor {
    backend: Arc<dyn LogsBackend>,
    validator: LogGroupValidator,
    settings: QuerySettings,
}

impl QueryExecutor {
    pub fn new(backend: Arc<dyn LogsBackend>, settings: QuerySettings) -> Self {
        Self {
            validator: LogGroupValidator::new(backend.clone()),
            backend,
            settings,
        }
    }

    pub fn settings(&self) -> &QuerySettings {
        &self.settings
    }

    pub fn validator(&self) -> &LogGroupValidator {
        &self.validator
    }

    /// Run a query to a terminal status without external cancellation
    pub async fn execute(&self, request: QueryRequest) -> Result<QueryResult, EngineError> {
        self.execute_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Run a query to a terminal status.
    ///
    /// `Err` is only returned for a missing log group, before anything is
    /// submitted. Every other outcome is an `Ok` result whose status must be
    /// inspected.
    ///
    /// The local deadline starts here and covers the existence gate, the
    /// submission and every poll. `cancel` is observed at each of them.
    pub async fn execute_with_cancel(
        &self,
        request: QueryRequest,
        cancel: &CancellationToken,
    ) -> Result<QueryResult, EngineError> {
        // None when the timeout is too large to represent: wait without a deadline
        let deadline = Instant::now().checked_add(self.settings.timeout);

        match self
            .bounded(deadline, cancel, self.validator.require_all(&request.log_group_names))
            .await
        {
            Ok(gate) => gate?,
            Err(interrupt) => return Ok(self.interrupted(None, interrupt)),
        }

        if request.log_group_names.is_empty() {
            return Ok(QueryResult::unsuccessful(
                None,
                QueryStatus::Failed,
                "At least one log group name is required",
            ));
        }

        // Defaults are resolved once here, never per poll
        let (start_time_ms, end_time_ms) = request
            .time_range
            .resolve(Utc::now().timestamp_millis(), self.settings.default_window);

        let start = StartQueryRequest {
            log_group_names: request.log_group_names,
            query_string: request.query_string,
            start_time_ms,
            end_time_ms,
            limit: request.limit,
        };

        let handle = match self
            .bounded(deadline, cancel, self.backend.start_query(&start))
            .await
        {
            Ok(Ok(handle)) => handle,
            Ok(Err(e)) => {
                log_error!(
                    "Error querying logs for log groups {:?}: {:#}",
                    start.log_group_names,
                    e
                );
                return Ok(QueryResult::unsuccessful(
                    None,
                    QueryStatus::Failed,
                    format!("{:#}", e),
                ));
            }
            Err(interrupt) => {
                // No query id came back, so there is nothing to stop
                return Ok(self.interrupted(None, interrupt));
            }
        };

        log_info!(
            "Started query {} on {:?} ({} -> {})",
            handle.as_str(),
            start.log_group_names,
            start_time_ms,
            end_time_ms
        );

        Ok(self.wait_for_completion(&handle, deadline, cancel).await)
    }

    /// Await `fut` unless `cancel` fires or `deadline` passes first
    async fn bounded<F>(
        &self,
        deadline: Option<Instant>,
        cancel: &CancellationToken,
        fut: F,
    ) -> Result<F::Output, Interrupt>
    where
        F: Future,
    {
        let limited = async {
            match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, fut).await.ok(),
                None => Some(fut.await),
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Interrupt::Cancelled),
            output = limited => output.ok_or(Interrupt::TimedOut),
        }
    }

    async fn wait_for_completion(
        &self,
        handle: &QueryHandle,
        deadline: Option<Instant>,
        cancel: &CancellationToken,
    ) -> QueryResult {
        let mut interval = self.settings.min_poll_interval;
        let mut status = QueryStatus::Submitted;

        loop {
            let poll = match self
                .bounded(deadline, cancel, self.backend.get_query_results(handle))
                .await
            {
                Ok(Ok(poll)) => poll,
                Ok(Err(e)) => {
                    log_error!("Error polling query {}: {:#}", handle.as_str(), e);
                    return QueryResult::unsuccessful(
                        Some(handle.as_str().to_string()),
                        QueryStatus::Failed,
                        format!("{:#}", e),
                    );
                }
                Err(interrupt) => return self.abandon(handle, interrupt).await,
            };

            if poll.status != status {
                log_debug!(
                    "Query {} status {} -> {}",
                    handle.as_str(),
                    status,
                    poll.status
                );
                status = poll.status;
            }

            if poll.status.is_terminal() {
                log_info!("Query {} completed with status: {}", handle.as_str(), poll.status);
                return self.finish(handle, poll);
            }

            let now = Instant::now();
            let wait = match deadline {
                Some(deadline) if now >= deadline => {
                    return self.abandon(handle, Interrupt::TimedOut).await;
                }
                Some(deadline) => interval.min(deadline - now),
                None => interval,
            };

            log_debug!(
                "Waiting for query {} to complete... Status: {}",
                handle.as_str(),
                poll.status
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return self.abandon(handle, Interrupt::Cancelled).await;
                }
                _ = tokio::time::sleep(wait) => {}
            }
            interval = interval.saturating_mul(2).min(self.settings.max_poll_interval);
        }
    }

    fn interrupted(&self, query_id: Option<String>, interrupt: Interrupt) -> QueryResult {
        let (status, message) = match interrupt {
            Interrupt::Cancelled => (QueryStatus::Cancelled, "Query cancelled by caller".to_string()),
            Interrupt::TimedOut => (
                QueryStatus::Timeout,
                format!("Query did not complete within {:?}", self.settings.timeout),
            ),
        };
        if query_id.is_none() {
            log_warn!("Query abandoned before it was submitted: {}", message);
        }
        QueryResult::unsuccessful(query_id, status, message)
    }

    /// End the local wait, asking the backend to stop the query on a best-effort basis
    async fn abandon(&self, handle: &QueryHandle, interrupt: Interrupt) -> QueryResult {
        let result = self.interrupted(Some(handle.as_str().to_string()), interrupt);
        log_warn!(
            "Abandoning query {}: {}",
            handle.as_str(),
            result.message.as_deref().unwrap_or_default()
        );

        match tokio::time::timeout(STOP_QUERY_TIMEOUT, self.backend.stop_query(handle)).await {
            Ok(Ok(stopped)) => log_debug!("StopQuery for {} returned {}", handle.as_str(), stopped),
            Ok(Err(e)) => log_warn!("Could not stop query {}: {:#}", handle.as_str(), e),
            Err(_) => log_warn!(
                "StopQuery for {} gave no answer within {:?}",
                handle.as_str(),
                STOP_QUERY_TIMEOUT
            ),
        }
        result
    }

    fn finish(&self, handle: &QueryHandle, poll: QueryPoll) -> QueryResult {
        let query_id = Some(handle.as_str().to_string());
        if poll.status != QueryStatus::Complete {
            return QueryResult {
                query_id,
                status: poll.status,
                message: Some(format!("Query ended with status {}", poll.status)),
                statistics: poll.statistics,
                results: Vec::new(),
            };
        }

        QueryResult {
            query_id,
            status: QueryStatus::Complete,
            message: None,
            statistics: poll.statistics,
            results: decode_rows(poll.rows, &self.settings.payload_field),
        }
    }
}

/// Decode raw result rows, parsing the payload field when it holds JSON
pub fn decode_rows(rows: Vec<Vec<ResultField>>, payload_field: &str) -> Vec<LogRow> {
    rows.into_iter()
        .map(|row| {
            row.into_iter()
                .map(|cell| {
                    let value = if cell.field == payload_field {
                        decode_payload(cell.value)
                    } else {
                        FieldValue::Text(cell.value)
                    };
                    (cell.field, value)
                })
                .collect()
        })
        .collect()
}

/// Parse a payload value as a JSON object or array; otherwise keep it verbatim
pub fn decode_payload(raw: String) -> FieldValue {
    match serde_json::from_str::<serde_json::Value>(&raw) {
        Ok(value @ (serde_json::Value::Object(_) | serde_json::Value::Array(_))) => {
            FieldValue::Structured(value)
        }
        _ => FieldValue::Text(raw),
    }
}
