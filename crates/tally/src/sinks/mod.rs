//! Notification sinks.
//!
//! Each sink turns a [`NotificationEvent`] into one HTTP request against an
//! external service and reports success or failure. Sinks never retry; the
//! dispatcher logs the outcome and moves on.

mod chat;
mod dashboard;
mod push;

pub use chat::{ChatEmbed, ChatFooter, ChatMessage, ChatSink};
pub use dashboard::{DashboardPayload, DashboardSink};
pub use push::{PushProfile, PushSink};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tallyconf::SinksConfig;
use thiserror::Error;

use crate::event::NotificationEvent;

/// Longest response body kept in an error.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// An external notification endpoint.
#[async_trait]
pub trait Sink: Send + Sync + 'static {
    /// Identity used in logs.
    fn name(&self) -> &str;

    /// Whether this sink wants the event at all.
    fn accepts(&self, event: &NotificationEvent) -> bool;

    /// Deliver one event. Exactly one attempt.
    async fn deliver(&self, event: &NotificationEvent) -> Result<(), SinkError>;
}

/// Build every sink whose credentials are present, in dispatch order:
/// engineering push, on-air push, chat webhook, dashboard.
///
/// Sinks without credentials are skipped; [`tallyconf::TallyConfig::validate`]
/// has already decided whether that is fatal.
pub fn build_sinks(config: &SinksConfig) -> Result<Vec<Arc<dyn Sink>>, SinkError> {
    let mut sinks: Vec<Arc<dyn Sink>> = Vec::new();

    if config.push.missing_field().is_none() {
        sinks.push(Arc::new(PushSink::new(PushProfile::Alerts, &config.push)?));
    }
    if config.push_onair.missing_field().is_none() {
        sinks.push(Arc::new(PushSink::new(
            PushProfile::OnAir,
            &config.push_onair,
        )?));
    }
    if config.chat.missing_field().is_none() {
        sinks.push(Arc::new(ChatSink::new(&config.chat)?));
    }
    if config.dashboard.missing_field().is_none() {
        sinks.push(Arc::new(DashboardSink::new(&config.dashboard)?));
    }

    Ok(sinks)
}

fn http_client(timeout_ms: u64) -> Result<reqwest::Client, SinkError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .user_agent(concat!("tally/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Turn a response into `Ok` when `accept(status)` holds.
async fn check_status(
    response: reqwest::Response,
    accept: impl Fn(StatusCode) -> bool,
) -> Result<(), SinkError> {
    let status = response.status();
    if accept(status) {
        return Ok(());
    }

    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    Err(SinkError::Status { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_sinks_skips_missing_credentials() {
        let config = SinksConfig::default();
        assert!(build_sinks(&config).unwrap().is_empty());
    }

    #[test]
    fn test_build_sinks_order() {
        let mut config = SinksConfig::default();
        config.push.token = Some("t".to_string());
        config.push.user = Some("u".to_string());
        config.push_onair.token = Some("t2".to_string());
        config.push_onair.user = Some("u2".to_string());
        config.chat.webhook_url = Some("http://127.0.0.1:1/hook".to_string());
        config.dashboard.path = Some("http://127.0.0.1:1/status".to_string());

        let names: Vec<_> = build_sinks(&config)
            .unwrap()
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(names, vec!["push", "push_onair", "chat", "dashboard"]);
    }
}
