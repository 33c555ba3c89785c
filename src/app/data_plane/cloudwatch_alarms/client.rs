//! CloudWatch Alarms Client Wrapper
//!
//! [`AlarmBackend`] is the seam between the alarm aggregator and AWS. The
//! SDK-backed implementation fetches one `DescribeAlarms` page at a time and
//! converts both alarm kinds into the closed [`Alarm`] enum.

#![warn(clippy::all, rust_2018_idioms)]

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_cloudwatch as cloudwatch;
use cloudwatch::types::{AlarmType, StateValue};

use super::types::{Alarm, AlarmState, CompositeAlarm, Dimension, MetricAlarm};
use crate::app::data_plane::pagination::Page;

/// Page-level access to CloudWatch alarms
#[async_trait]
pub trait AlarmBackend: Send + Sync {
    /// Fetch one page of alarms of both kinds.
    ///
    /// `state` is only honoured when [`AlarmBackend::supports_state_filter`]
    /// returns true.
    async fn describe_alarms(
        &self,
        state: Option<AlarmState>,
        next_token: Option<String>,
    ) -> Result<Page<Alarm>>;

    /// Whether `describe_alarms` filters by state server-side
    fn supports_state_filter(&self) -> bool {
        true
    }
}

/// CloudWatch client wrapper
#[derive(Clone)]
pub struct CloudWatchAlarmsClient {
    client: cloudwatch::Client,
}

impl CloudWatchAlarmsClient {
    /// Create a client from a shared SDK config
    pub fn new(aws_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: cloudwatch::Client::new(aws_config),
        }
    }
}

#[async_trait]
impl AlarmBackend for CloudWatchAlarmsClient {
    async fn describe_alarms(
        &self,
        state: Option<AlarmState>,
        next_token: Option<String>,
    ) -> Result<Page<Alarm>> {
        // Composite alarms are only returned when asked for explicitly
        let response = self
            .client
            .describe_alarms()
            .alarm_types(AlarmType::MetricAlarm)
            .alarm_types(AlarmType::CompositeAlarm)
            .set_state_value(state.map(|s| StateValue::from(s.as_str())))
            .set_next_token(next_token)
            .send()
            .await
            .context("Failed to describe CloudWatch alarms")?;

        let mut alarms: Vec<Alarm> = response
            .metric_alarms()
            .iter()
            .map(|alarm| Alarm::MetricAlarm(metric_alarm_from_sdk(alarm)))
            .collect();
        alarms.extend(
            response
                .composite_alarms()
                .iter()
                .map(|alarm| Alarm::CompositeAlarm(composite_alarm_from_sdk(alarm))),
        );

        Ok(Page::new(alarms, response.next_token().map(str::to_string)))
    }
}

fn state_from_sdk(state: Option<&StateValue>) -> Option<AlarmState> {
    state.and_then(|s| AlarmState::parse(s.as_str()))
}

fn metric_alarm_from_sdk(alarm: &cloudwatch::types::MetricAlarm) -> MetricAlarm {
    MetricAlarm {
        name: alarm.alarm_name().unwrap_or_default().to_string(),
        description: alarm.alarm_description().map(str::to_string),
        state: state_from_sdk(alarm.state_value()),
        metric_name: alarm.metric_name().map(str::to_string),
        namespace: alarm.namespace().map(str::to_string),
        // Percentile alarms use ExtendedStatistic instead of Statistic
        statistic: alarm
            .statistic()
            .map(|s| s.as_str().to_string())
            .or_else(|| alarm.extended_statistic().map(str::to_string)),
        dimensions: alarm
            .dimensions()
            .iter()
            .map(|d| Dimension {
                name: d.name().unwrap_or_default().to_string(),
                value: d.value().unwrap_or_default().to_string(),
            })
            .collect(),
    }
}

fn composite_alarm_from_sdk(alarm: &cloudwatch::types::CompositeAlarm) -> CompositeAlarm {
    CompositeAlarm {
        name: alarm.alarm_name().unwrap_or_default().to_string(),
        description: alarm.alarm_description().map(str::to_string),
        state: state_from_sdk(alarm.state_value()),
        alarm_rule: alarm.alarm_rule().map(str::to_string),
    }
}
