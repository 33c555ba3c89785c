//! Data Plane Services Module
//!
//! The algorithmic core of awswatch. Data plane services query and analyze
//! data held by AWS (alarm state, log records) as opposed to managing resources.
//!
//! ## Available Services
//!
//! - **CloudWatch Alarms**: metric and composite alarms unified under one shape
//! - **CloudWatch Logs**: log-group checks, Logs Insights queries, schema
//!   discovery and saved query definitions
//!
//! ## Architecture
//!
//! ```text
//! 1. Backend trait (AlarmBackend / LogsBackend)
//!    └─ one SDK-backed implementation per service, mocks in tests
//!
//! 2. Pagination (pagination::collect_pages)
//!    └─ shared accumulate-until-no-token loop
//!
//! 3. Components
//!    └─ AlarmAggregator, LogGroupValidator, QueryExecutor, SchemaDiscoverer
//! ```

pub mod cloudwatch_alarms;
pub mod cloudwatch_logs;
pub mod pagination;

pub use cloudwatch_alarms::{AlarmAggregator, AlarmBackend, CloudWatchAlarmsClient};
pub use cloudwatch_logs::{
    CloudWatchLogsClient, LogGroupValidator, LogsBackend, QueryExecutor, SchemaDiscoverer,
};
pub use pagination::{collect_pages, find_in_pages, Page};
