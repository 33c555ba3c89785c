//! Alarm aggregation across metric and composite alarms.

#![warn(clippy::all, rust_2018_idioms)]

use anyhow::Result;
use std::sync::Arc;

use super::client::AlarmBackend;
use super::types::{Alarm, AlarmState, NormalizedAlarm};
use crate::app::data_plane::pagination::collect_pages;
use crate::app::errors::EngineError;

/// Fetches both alarm kinds and projects them into [`NormalizedAlarm`]s
#[derive(Clone)]
pub struct AlarmAggregator {
    backend: Arc<dyn AlarmBackend>,
}

impl AlarmAggregator {
    pub fn new(backend: Arc<dyn AlarmBackend>) -> Self {
        Self { backend }
    }

    /// List every alarm, optionally restricted to one state.
    ///
    /// Metric alarms come first, then composite alarms, each group in backend
    /// order.
    pub async fn list_alarms(&self, state_filter: Option<AlarmState>) -> Result<Vec<Alarm>> {
        let backend = self.backend.as_ref();
        let server_side = backend.supports_state_filter();
        let requested = if server_side { state_filter } else { None };

        let mut alarms = collect_pages(move |token| backend.describe_alarms(requested, token)).await?;

        if let (false, Some(state)) = (server_side, state_filter) {
            alarms.retain(|alarm| alarm.state() == Some(state));
        }

        let (mut ordered, composite): (Vec<Alarm>, Vec<Alarm>) =
            alarms.into_iter().partition(Alarm::is_metric);
        ordered.extend(composite);

        log_debug!(
            "Fetched {} alarm(s) (state filter: {:?})",
            ordered.len(),
            state_filter
        );
        Ok(ordered)
    }

    /// Project alarms into the uniform shape.
    ///
    /// With `only_alarm_state`, anything not currently in `ALARM` is dropped.
    pub fn format_alarms(alarms: &[Alarm], only_alarm_state: bool) -> Vec<NormalizedAlarm> {
        alarms
            .iter()
            .filter(|alarm| !only_alarm_state || alarm.state() == Some(AlarmState::Alarm))
            .map(NormalizedAlarm::from)
            .collect()
    }

    /// Fetch and format in one step, reporting backend failures as [`EngineError`]
    pub async fn formatted_alarms(
        &self,
        only_in_alarm_state: bool,
    ) -> std::result::Result<Vec<NormalizedAlarm>, EngineError> {
        let filter = only_in_alarm_state.then_some(AlarmState::Alarm);
        match self.list_alarms(filter).await {
            Ok(alarms) => Ok(Self::format_alarms(&alarms, only_in_alarm_state)),
            Err(e) => {
                log_error!("Error listing CloudWatch alarms: {:#}", e);
                Err(EngineError::transport("list_alarms", &e))
            }
        }
    }
}
