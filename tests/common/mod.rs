//! In-memory backends shared by the integration tests.
//!
//! Each mock records what it was asked so tests can assert on call counts
//! (pagination, the existence gate, best-effort stops).

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use awswatch::app::config::AppConfig;
use awswatch::app::data_plane::cloudwatch_alarms::{
    Alarm, AlarmBackend, AlarmState, CompositeAlarm, Dimension, MetricAlarm,
};
use awswatch::app::data_plane::cloudwatch_logs::{
    LogGroupSummary, LogsBackend, QueryHandle, QueryPoll, QueryStatistics, QueryStatus,
    ResultField, SavedQuery, StartQueryRequest,
};
use awswatch::app::data_plane::Page;
use awswatch::MonitoringEngine;

#[derive(Debug, Default)]
pub struct LogsCalls {
    pub describe_log_groups: usize,
    pub started: Vec<StartQueryRequest>,
    pub polls: usize,
    pub stopped: Vec<String>,
    pub describe_query_definitions: usize,
}

/// Scripted CloudWatch Logs backend.
///
/// `get_query_results` pops scripted polls in order and keeps answering with
/// the last one once the script runs out.
pub struct MockLogsBackend {
    log_groups: Vec<String>,
    page_size: usize,
    fail_describe: bool,
    fail_start: bool,
    fail_poll: bool,
    hang_describe: bool,
    hang_start: bool,
    hang_stop: bool,
    polls: Mutex<VecDeque<QueryPoll>>,
    last_poll: Mutex<QueryPoll>,
    saved_queries: Vec<SavedQuery>,
    pub calls: Mutex<LogsCalls>,
}

impl MockLogsBackend {
    pub fn new(log_groups: &[&str]) -> Self {
        Self {
            log_groups: log_groups.iter().map(|s| s.to_string()).collect(),
            page_size: 50,
            fail_describe: false,
            fail_start: false,
            fail_poll: false,
            hang_describe: false,
            hang_start: false,
            hang_stop: false,
            polls: Mutex::new(VecDeque::new()),
            last_poll: Mutex::new(QueryPoll::pending(QueryStatus::Running)),
            saved_queries: Vec::new(),
            calls: Mutex::new(LogsCalls::default()),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_polls(self, polls: Vec<QueryPoll>) -> Self {
        *self.polls.lock().unwrap() = polls.into();
        self
    }

    pub fn with_saved_queries(mut self, saved_queries: Vec<SavedQuery>) -> Self {
        self.saved_queries = saved_queries;
        self
    }

    pub fn failing_describe(mut self) -> Self {
        self.fail_describe = true;
        self
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn failing_poll(mut self) -> Self {
        self.fail_poll = true;
        self
    }

    /// DescribeLogGroups never answers
    pub fn hanging_describe(mut self) -> Self {
        self.hang_describe = true;
        self
    }

    /// StartQuery is recorded but never answers
    pub fn hanging_start(mut self) -> Self {
        self.hang_start = true;
        self
    }

    /// StopQuery is recorded but never answers
    pub fn hanging_stop(mut self) -> Self {
        self.hang_stop = true;
        self
    }

    pub fn started(&self) -> Vec<StartQueryRequest> {
        self.calls.lock().unwrap().started.clone()
    }

    pub fn stopped(&self) -> Vec<String> {
        self.calls.lock().unwrap().stopped.clone()
    }

    pub fn poll_count(&self) -> usize {
        self.calls.lock().unwrap().polls
    }
}

/// Continuation tokens are the stringified offset of the next page
fn page_of<T: Clone>(items: &[T], page_size: usize, next_token: Option<String>) -> Result<Page<T>> {
    let offset = match next_token {
        Some(token) => token.parse::<usize>().map_err(|_| anyhow!("bad token {token}"))?,
        None => 0,
    };
    let end = (offset + page_size).min(items.len());
    let next = (end < items.len()).then(|| end.to_string());
    Ok(Page::new(items[offset..end].to_vec(), next))
}

#[async_trait]
impl LogsBackend for MockLogsBackend {
    async fn describe_log_groups(
        &self,
        prefix: Option<&str>,
        next_token: Option<String>,
    ) -> Result<Page<LogGroupSummary>> {
        self.calls.lock().unwrap().describe_log_groups += 1;
        if self.hang_describe {
            std::future::pending::<()>().await;
        }
        if self.fail_describe {
            return Err(anyhow!("AccessDeniedException: not authorized"));
        }
        let matching: Vec<LogGroupSummary> = self
            .log_groups
            .iter()
            .filter(|name| prefix.map_or(true, |p| name.starts_with(p)))
            .map(LogGroupSummary::named)
            .collect();
        page_of(&matching, self.page_size, next_token)
    }

    async fn start_query(&self, request: &StartQueryRequest) -> Result<QueryHandle> {
        let started = {
            let mut calls = self.calls.lock().unwrap();
            calls.started.push(request.clone());
            calls.started.len()
        };
        if self.hang_start {
            std::future::pending::<()>().await;
        }
        if self.fail_start {
            return Err(anyhow!("MalformedQueryException: unexpected symbol"));
        }
        Ok(QueryHandle::new(format!("query-{started}")))
    }

    async fn get_query_results(&self, _handle: &QueryHandle) -> Result<QueryPoll> {
        self.calls.lock().unwrap().polls += 1;
        if self.fail_poll {
            return Err(anyhow!("connection reset by peer"));
        }
        let mut last = self.last_poll.lock().unwrap();
        if let Some(next) = self.polls.lock().unwrap().pop_front() {
            *last = next;
        }
        Ok(last.clone())
    }

    async fn stop_query(&self, handle: &QueryHandle) -> Result<bool> {
        self.calls
            .lock()
            .unwrap()
            .stopped
            .push(handle.as_str().to_string());
        if self.hang_stop {
            std::future::pending::<()>().await;
        }
        Ok(true)
    }

    async fn describe_query_definitions(
        &self,
        next_token: Option<String>,
    ) -> Result<Page<SavedQuery>> {
        self.calls.lock().unwrap().describe_query_definitions += 1;
        if self.fail_describe {
            return Err(anyhow!("ThrottlingException: Rate exceeded"));
        }
        page_of(&self.saved_queries, self.page_size, next_token)
    }
}

/// Paged alarm backend; optionally ignores the state filter
pub struct MockAlarmBackend {
    alarms: Vec<Alarm>,
    page_size: usize,
    server_side_filter: bool,
    fail: bool,
    pub describe_calls: Mutex<usize>,
}

impl MockAlarmBackend {
    pub fn new(alarms: Vec<Alarm>) -> Self {
        Self {
            alarms,
            page_size: 2,
            server_side_filter: true,
            fail: false,
            describe_calls: Mutex::new(0),
        }
    }

    pub fn without_state_filter(mut self) -> Self {
        self.server_side_filter = false;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn describe_calls(&self) -> usize {
        *self.describe_calls.lock().unwrap()
    }
}

#[async_trait]
impl AlarmBackend for MockAlarmBackend {
    async fn describe_alarms(
        &self,
        state: Option<AlarmState>,
        next_token: Option<String>,
    ) -> Result<Page<Alarm>> {
        *self.describe_calls.lock().unwrap() += 1;
        if self.fail {
            return Err(anyhow!("Service Unavailable"));
        }
        let matching: Vec<Alarm> = self
            .alarms
            .iter()
            .filter(|alarm| state.map_or(true, |s| alarm.state() == Some(s)))
            .cloned()
            .collect();
        page_of(&matching, self.page_size, next_token)
    }

    fn supports_state_filter(&self) -> bool {
        self.server_side_filter
    }
}

pub fn metric_alarm(name: &str, state: AlarmState) -> Alarm {
    Alarm::MetricAlarm(MetricAlarm {
        name: name.to_string(),
        description: Some(format!("{name} description")),
        state: Some(state),
        metric_name: Some("CPUUtilization".to_string()),
        namespace: Some("AWS/EC2".to_string()),
        statistic: Some("Average".to_string()),
        dimensions: vec![Dimension {
            name: "InstanceId".to_string(),
            value: "i-0123456789abcdef0".to_string(),
        }],
    })
}

pub fn composite_alarm(name: &str, state: AlarmState) -> Alarm {
    Alarm::CompositeAlarm(CompositeAlarm {
        name: name.to_string(),
        description: None,
        state: Some(state),
        alarm_rule: Some("ALARM(cpu-high) OR ALARM(disk-full)".to_string()),
    })
}

pub fn complete_poll(rows: Vec<Vec<ResultField>>) -> QueryPoll {
    QueryPoll {
        status: QueryStatus::Complete,
        statistics: QueryStatistics::new(rows.len() as f64, 100.0, 2048.0),
        rows,
    }
}

pub fn saved_query(id: &str, name: &str) -> SavedQuery {
    SavedQuery {
        query_definition_id: id.to_string(),
        name: name.to_string(),
        query_string: "fields @timestamp, @message | sort @timestamp desc".to_string(),
        last_modified: Some(1_714_557_600_000),
        log_group_names: Some(vec!["/ecs/api".to_string()]),
    }
}

/// Config with short poll intervals so paused-clock tests advance quickly
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.query.timeout_secs = 10;
    config.query.min_poll_interval_ms = 100;
    config.query.max_poll_interval_ms = 1000;
    config
        .log_groups
        .set("solo", "server-side", vec!["/ecs/api".to_string()]);
    config
}

pub fn engine(logs: Arc<MockLogsBackend>, alarms: Arc<MockAlarmBackend>) -> MonitoringEngine {
    MonitoringEngine::from_backends(logs, alarms, &test_config()).unwrap()
}
