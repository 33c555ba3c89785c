//! End-to-end tests of the engine operations over mock backends.

mod common;

use pretty_assertions::assert_eq;
use std::sync::Arc;

use awswatch::app::data_plane::cloudwatch_alarms::AlarmState;
use awswatch::app::data_plane::cloudwatch_logs::{FieldType, QueryPoll, QueryStatus, ResultField};
use awswatch::app::errors::{EngineError, TransportKind};
use common::{
    complete_poll, composite_alarm, engine, metric_alarm, saved_query, MockAlarmBackend,
    MockLogsBackend,
};

fn no_alarms() -> Arc<MockAlarmBackend> {
    Arc::new(MockAlarmBackend::new(Vec::new()))
}

#[tokio::test]
async fn list_log_groups_passes_the_table_through() {
    let engine = engine(Arc::new(MockLogsBackend::new(&[])), no_alarms());

    let table = engine.list_log_groups();
    assert_eq!(table.names("solo", "server-side"), &["/ecs/api".to_string()]);
    assert!(table.names("solo", "client-side").is_empty());
}

#[tokio::test]
async fn log_group_exists_uses_exact_match() {
    let logs = Arc::new(MockLogsBackend::new(&["/ecs/api", "/ecs/api-gateway"]));
    let engine = engine(logs, no_alarms());

    assert!(engine.log_group_exists("/ecs/api").await);
    assert!(engine.log_group_exists("/ecs/api-gateway").await);
    assert!(!engine.log_group_exists("/ecs/ap").await);
    assert!(!engine.log_group_exists("/ecs/worker").await);
}

#[tokio::test]
async fn log_group_exists_is_fail_closed() {
    let logs = Arc::new(MockLogsBackend::new(&["/ecs/api"]).failing_describe());
    let engine = engine(logs, no_alarms());

    assert!(!engine.log_group_exists("/ecs/api").await);
}

#[tokio::test]
async fn log_group_lookup_follows_every_page() {
    // Every name shares the "/ecs/api" prefix; the exact match sits on the last page
    let mut names: Vec<String> = (0..6).map(|i| format!("/ecs/api-{i}")).collect();
    names.push("/ecs/api".to_string());
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let logs = Arc::new(MockLogsBackend::new(&refs).with_page_size(3));
    let engine = engine(logs.clone(), no_alarms());

    assert!(engine.log_group_exists("/ecs/api").await);
    // pages of 3, 3 and 1
    assert_eq!(logs.calls.lock().unwrap().describe_log_groups, 3);

    let all = engine.describe_log_groups(None).await.unwrap();
    assert_eq!(all.len(), 7);
}

#[tokio::test]
async fn log_group_lookup_stops_at_exact_match() {
    let mut names = vec!["/ecs/api".to_string()];
    names.extend((0..6).map(|i| format!("/ecs/api-{i}")));
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let logs = Arc::new(MockLogsBackend::new(&refs).with_page_size(3));
    let engine = engine(logs.clone(), no_alarms());

    assert!(engine.log_group_exists("/ecs/api").await);
    assert_eq!(logs.calls.lock().unwrap().describe_log_groups, 1);
}

#[tokio::test]
async fn describe_log_groups_reports_transport_errors() {
    let logs = Arc::new(MockLogsBackend::new(&["/ecs/api"]).failing_describe());
    let engine = engine(logs, no_alarms());

    let err = engine.describe_log_groups(Some("/ecs")).await.unwrap_err();
    match err {
        EngineError::Transport { kind, .. } => assert_eq!(kind, TransportKind::AccessDenied),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn discover_fields_flattens_sampled_payloads() {
    let logs = Arc::new(MockLogsBackend::new(&["/ecs/api"]).with_polls(vec![
        QueryPoll::pending(QueryStatus::Running),
        complete_poll(vec![
            vec![
                ResultField::new("@timestamp", "2024-05-01 10:00:00.000"),
                ResultField::new("@message", r#"{"a": {"b": 1}, "c": [1, 2], "d": true}"#),
            ],
            vec![
                ResultField::new("@timestamp", "2024-05-01 10:00:01.000"),
                ResultField::new("@message", r#"{"a": {"b": "one"}, "e": "x"}"#),
            ],
        ]),
    ]));
    let engine = engine(logs.clone(), no_alarms());

    let schema = engine
        .discover_fields(&["/ecs/api".to_string()])
        .await
        .unwrap();

    assert_eq!(schema.get("a.b"), Some(FieldType::Number));
    assert_eq!(schema.get("c"), Some(FieldType::Array));
    assert_eq!(schema.get("d"), Some(FieldType::Boolean));
    assert_eq!(schema.get("e"), Some(FieldType::String));
    assert_eq!(schema.get("@message"), Some(FieldType::JsonObject));
    assert_eq!(schema.get("@timestamp"), Some(FieldType::String));
    assert!(!schema.contains("a"));

    let started = logs.started();
    assert_eq!(
        started[0].query_string,
        "fields @timestamp, @message | limit 20"
    );
}

#[tokio::test(start_paused = true)]
async fn discover_fields_on_missing_group_is_empty() {
    let logs = Arc::new(MockLogsBackend::new(&["/ecs/api"]));
    let engine = engine(logs.clone(), no_alarms());

    let schema = engine
        .discover_fields(&["/ecs/missing".to_string()])
        .await
        .unwrap();

    assert!(schema.is_empty());
    assert!(logs.started().is_empty());
}

#[tokio::test(start_paused = true)]
async fn discover_fields_reports_unfinished_sampling() {
    let logs = Arc::new(
        MockLogsBackend::new(&["/ecs/api"])
            .with_polls(vec![QueryPoll::pending(QueryStatus::Cancelled)]),
    );
    let engine = engine(logs, no_alarms());

    let err = engine
        .discover_fields(&["/ecs/api".to_string()])
        .await
        .unwrap_err();

    match err {
        EngineError::QueryFailed { status, .. } => assert_eq!(status, QueryStatus::Cancelled),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn query_logs_returns_complete_result() {
    let logs = Arc::new(MockLogsBackend::new(&["/ecs/api"]).with_polls(vec![
        QueryPoll::pending(QueryStatus::Scheduled),
        complete_poll(vec![vec![ResultField::new("count", "42")]]),
    ]));
    let engine = engine(logs.clone(), no_alarms());

    let result = engine
        .query_logs(
            vec!["/ecs/api".to_string()],
            "stats count(*) as count",
            Some(1_714_550_400_000),
            Some(1_714_554_000_000),
        )
        .await
        .unwrap();

    assert!(result.is_complete());
    assert_eq!(result.results.len(), 1);
    let started = logs.started();
    assert_eq!(started[0].start_time_ms, 1_714_550_400_000);
    assert_eq!(started[0].end_time_ms, 1_714_554_000_000);
}

#[tokio::test(start_paused = true)]
async fn query_logs_gate_failure_is_an_error() {
    let logs = Arc::new(MockLogsBackend::new(&["/ecs/api"]));
    let engine = engine(logs.clone(), no_alarms());

    let err = engine
        .query_logs(
            vec!["/ecs/api".to_string(), "/ecs/gone".to_string()],
            "fields @message",
            None,
            None,
        )
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Log group '/ecs/gone' does not exist");
    assert!(logs.started().is_empty());
}

#[tokio::test]
async fn list_alarms_through_engine() {
    let alarms = Arc::new(MockAlarmBackend::new(vec![
        composite_alarm("service-degraded", AlarmState::Alarm),
        metric_alarm("cpu-high", AlarmState::Ok),
    ]));
    let engine = engine(Arc::new(MockLogsBackend::new(&[])), alarms);

    let all = engine.list_alarms(false).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].alarm_name, "cpu-high");

    let firing = engine.list_alarms_in_alarm_state().await.unwrap();
    assert_eq!(firing.len(), 1);
    assert_eq!(firing[0].alarm_name, "service-degraded");
}

#[tokio::test]
async fn saved_queries_span_pages() {
    let queries: Vec<_> = (0..5)
        .map(|i| saved_query(&format!("qd-{i}"), &format!("query {i}")))
        .collect();
    let logs = Arc::new(
        MockLogsBackend::new(&[])
            .with_saved_queries(queries.clone())
            .with_page_size(2),
    );
    let engine = engine(logs.clone(), no_alarms());

    assert_eq!(engine.list_saved_queries().await.unwrap(), queries);
    assert_eq!(logs.calls.lock().unwrap().describe_query_definitions, 3);
}

#[tokio::test]
async fn saved_query_failure_is_classified() {
    let logs = Arc::new(MockLogsBackend::new(&[]).failing_describe());
    let engine = engine(logs, no_alarms());

    let err = engine.list_saved_queries().await.unwrap_err();
    assert_eq!(err.code(), "TransportError");
    match err {
        EngineError::Transport {
            operation, kind, ..
        } => {
            assert_eq!(operation, "get_saved_queries");
            assert!(kind.is_retryable());
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
