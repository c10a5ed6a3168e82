//! Pushover-style push notifications (form-encoded POST, any 2xx is success).

use async_trait::async_trait;
use tallyconf::PushConfig;

use super::{check_status, http_client, Sink, SinkError};
use crate::event::{EventKind, NotificationEvent};

/// Which events a push sink carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushProfile {
    /// Silence detector alarms and the startup notice.
    Alerts,
    /// On-air and mic-live changes.
    OnAir,
}

impl PushProfile {
    pub fn name(&self) -> &'static str {
        match self {
            PushProfile::Alerts => "push",
            PushProfile::OnAir => "push_onair",
        }
    }
}

pub struct PushSink {
    profile: PushProfile,
    token: String,
    user: String,
    api_url: String,
    priority: i8,
    retry: Option<u32>,
    expire: Option<u32>,
    tags: String,
    client: reqwest::Client,
}

impl PushSink {
    pub fn new(profile: PushProfile, config: &PushConfig) -> Result<Self, SinkError> {
        Ok(Self {
            profile,
            token: config.token.clone().unwrap_or_default(),
            user: config.user.clone().unwrap_or_default(),
            api_url: config.api_url.clone(),
            priority: config.priority,
            retry: config.retry,
            expire: config.expire,
            tags: config.tags.clone(),
            client: http_client(config.timeout_ms)?,
        })
    }

    /// Form fields for one message.
    pub fn form(&self, message: &str) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("token", self.token.clone()),
            ("user", self.user.clone()),
            ("message", message.to_string()),
            ("priority", self.priority.to_string()),
        ];
        if let Some(retry) = self.retry {
            form.push(("retry", retry.to_string()));
        }
        if let Some(expire) = self.expire {
            form.push(("expire", expire.to_string()));
        }
        form.push(("tags", self.tags.clone()));
        form
    }
}

#[async_trait]
impl Sink for PushSink {
    fn name(&self) -> &str {
        self.profile.name()
    }

    fn accepts(&self, event: &NotificationEvent) -> bool {
        match self.profile {
            PushProfile::Alerts => {
                event.kind.is_silence() || event.kind == EventKind::MonitorStarted
            }
            PushProfile::OnAir => event.kind == EventKind::LineChanged,
        }
    }

    async fn deliver(&self, event: &NotificationEvent) -> Result<(), SinkError> {
        let form = self.form(&event.status_message());
        let response = self.client.post(&self.api_url).form(&form).send().await?;
        check_status(response, |status| status.is_success()).await
    }
}
