//! CloudWatch Alarm Data Types
//!
//! Metric and composite alarms are two structurally different records. They
//! are modelled as the closed [`Alarm`] enum: the variant is chosen when the
//! record is converted from the SDK response and never changes afterwards.

#![warn(clippy::all, rust_2018_idioms)]

use serde::{Deserialize, Serialize};

/// Alarm state as reported by CloudWatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlarmState {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "ALARM")]
    Alarm,
    #[serde(rename = "INSUFFICIENT_DATA")]
    InsufficientData,
}

impl AlarmState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlarmState::Ok => "OK",
            AlarmState::Alarm => "ALARM",
            AlarmState::InsufficientData => "INSUFFICIENT_DATA",
        }
    }

    /// Parse the wire form; unknown values yield `None`
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "OK" => Some(AlarmState::Ok),
            "ALARM" => Some(AlarmState::Alarm),
            "INSUFFICIENT_DATA" => Some(AlarmState::InsufficientData),
            _ => None,
        }
    }
}

impl std::fmt::Display for AlarmState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discriminant of an [`Alarm`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlarmKind {
    MetricAlarm,
    CompositeAlarm,
}

/// One metric dimension, kept in the order CloudWatch returned it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

/// Alarm watching a single metric series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricAlarm {
    pub name: String,
    pub description: Option<String>,
    pub state: Option<AlarmState>,
    pub metric_name: Option<String>,
    pub namespace: Option<String>,
    pub statistic: Option<String>,
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
}

/// Alarm combining other alarms through a rule expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeAlarm {
    pub name: String,
    pub description: Option<String>,
    pub state: Option<AlarmState>,
    pub alarm_rule: Option<String>,
}

/// Either kind of alarm, tagged at fetch time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "alarmType")]
pub enum Alarm {
    MetricAlarm(MetricAlarm),
    CompositeAlarm(CompositeAlarm),
}

impl Alarm {
    pub fn kind(&self) -> AlarmKind {
        match self {
            Alarm::MetricAlarm(_) => AlarmKind::MetricAlarm,
            Alarm::CompositeAlarm(_) => AlarmKind::CompositeAlarm,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Alarm::MetricAlarm(a) => &a.name,
            Alarm::CompositeAlarm(a) => &a.name,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            Alarm::MetricAlarm(a) => a.description.as_deref(),
            Alarm::CompositeAlarm(a) => a.description.as_deref(),
        }
    }

    pub fn state(&self) -> Option<AlarmState> {
        match self {
            Alarm::MetricAlarm(a) => a.state,
            Alarm::CompositeAlarm(a) => a.state,
        }
    }

    pub fn is_metric(&self) -> bool {
        matches!(self, Alarm::MetricAlarm(_))
    }
}

/// Uniform projection of an alarm for callers.
///
/// Shared fields always appear; the variant-specific block is chosen by the
/// alarm's tag. Missing optional values serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedAlarm {
    pub alarm_name: String,
    pub alarm_description: Option<String>,
    pub state_value: Option<AlarmState>,
    #[serde(flatten)]
    pub details: AlarmDetails,
}

/// Variant-specific part of a [`NormalizedAlarm`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "alarmType")]
pub enum AlarmDetails {
    MetricAlarm {
        metric: Option<String>,
        namespace: Option<String>,
        statistic: Option<String>,
        #[serde(default)]
        dimensions: Vec<Dimension>,
    },
    #[serde(rename_all = "camelCase")]
    CompositeAlarm { alarm_rule: Option<String> },
}

impl NormalizedAlarm {
    pub fn kind(&self) -> AlarmKind {
        match self.details {
            AlarmDetails::MetricAlarm { .. } => AlarmKind::MetricAlarm,
            AlarmDetails::CompositeAlarm { .. } => AlarmKind::CompositeAlarm,
        }
    }
}

impl From<&Alarm> for NormalizedAlarm {
    fn from(alarm: &Alarm) -> Self {
        let details = match alarm {
            Alarm::MetricAlarm(a) => AlarmDetails::MetricAlarm {
                metric: a.metric_name.clone(),
                namespace: a.namespace.clone(),
                statistic: a.statistic.clone(),
                dimensions: a.dimensions.clone(),
            },
            Alarm::CompositeAlarm(a) => AlarmDetails::CompositeAlarm {
                alarm_rule: a.alarm_rule.clone(),
            },
        };

        Self {
            alarm_name: alarm.name().to_string(),
            alarm_description: alarm.description().map(str::to_string),
            state_value: alarm.state(),
            details,
        }
    }
}
