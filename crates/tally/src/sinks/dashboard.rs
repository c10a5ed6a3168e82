//! Studio dashboard status push (JSON POST, success is exactly HTTP 200).

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use tallyconf::{DashboardConfig, Studio};

use super::{check_status, http_client, Sink, SinkError};
use crate::aggregate::AggregateState;
use crate::event::{EventKind, NotificationEvent};

/// Body expected by the dashboard. An unknown or ambiguous on-air studio
/// is sent as the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardPayload {
    pub on_air_studio: &'static str,
    pub studio_a_mic_live: bool,
    pub studio_b_mic_live: bool,
    pub studio_c_mic_live: bool,
    pub on_silence: bool,
}

impl From<&AggregateState> for DashboardPayload {
    fn from(state: &AggregateState) -> Self {
        Self {
            on_air_studio: state.on_air_name(),
            studio_a_mic_live: state.mic_live(Studio::StudioA),
            studio_b_mic_live: state.mic_live(Studio::StudioB),
            studio_c_mic_live: state.mic_live(Studio::StudioC),
            on_silence: state.silence_tripped,
        }
    }
}

pub struct DashboardSink {
    url: String,
    client: reqwest::Client,
}

impl DashboardSink {
    pub fn new(config: &DashboardConfig) -> Result<Self, SinkError> {
        Ok(Self {
            url: config.endpoint().unwrap_or_default(),
            client: http_client(config.timeout_ms)?,
        })
    }
}

#[async_trait]
impl Sink for DashboardSink {
    fn name(&self) -> &str {
        "dashboard"
    }

    fn accepts(&self, event: &NotificationEvent) -> bool {
        event.kind != EventKind::MonitorStarted
    }

    async fn deliver(&self, event: &NotificationEvent) -> Result<(), SinkError> {
        let body = DashboardPayload::from(&event.snapshot);
        let response = self.client.post(&self.url).json(&body).send().await?;
        check_status(response, |status| status == StatusCode::OK).await
    }
}
