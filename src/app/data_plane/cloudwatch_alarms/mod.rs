//! CloudWatch Alarms Integration Module
//!
//! Lists metric and composite alarms through one paginated pass and exposes
//! them as a single tagged shape.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use awswatch::app::data_plane::cloudwatch_alarms::{AlarmAggregator, CloudWatchAlarmsClient};
//!
//! # async fn example(aws_config: aws_config::SdkConfig) -> anyhow::Result<()> {
//! let aggregator = AlarmAggregator::new(Arc::new(CloudWatchAlarmsClient::new(&aws_config)));
//!
//! for alarm in aggregator.formatted_alarms(true).await? {
//!     println!("{} is {:?}", alarm.alarm_name, alarm.state_value);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all, rust_2018_idioms)]

pub mod aggregator;
pub mod client;
pub mod types;

pub use aggregator::AlarmAggregator;
pub use client::{AlarmBackend, CloudWatchAlarmsClient};
pub use types::{
    Alarm, AlarmDetails, AlarmKind, AlarmState, CompositeAlarm, Dimension, MetricAlarm,
    NormalizedAlarm,
};
