//! Chat webhook with Discord-style embeds. Success is exactly HTTP 204.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use tallyconf::ChatConfig;

use super::{check_status, http_client, Sink, SinkError};
use crate::event::{EventKind, NotificationEvent};

const TITLE: &str = "Silence Detector";
const COLOR_TRIPPED: u32 = 0xf71202;
const COLOR_RESET: u32 = 0x03f813;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    /// Left empty; the embed carries the message.
    pub content: String,
    pub embeds: Vec<ChatEmbed>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatEmbed {
    pub description: String,
    /// RFC 3339.
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<ChatFooter>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatFooter {
    pub text: String,
}

pub struct ChatSink {
    webhook_url: String,
    client: reqwest::Client,
}

impl ChatSink {
    pub fn new(config: &ChatConfig) -> Result<Self, SinkError> {
        Ok(Self {
            webhook_url: config.webhook_url.clone().unwrap_or_default(),
            client: http_client(config.timeout_ms)?,
        })
    }

    /// Build the webhook body for a silence event.
    pub fn message(event: &NotificationEvent) -> ChatMessage {
        let (description, color) = match event.kind {
            EventKind::SilenceTripped => (
                "Silence Detector Tripped.\nPlease check the correct studio is on air and myriad is functioning correctly"
                    .to_string(),
                COLOR_TRIPPED,
            ),
            _ => (format!("{}.", event.status_message()), COLOR_RESET),
        };

        let footer = event.snapshot.on_air.map(|studio| ChatFooter {
            text: format!("On air: {}", studio.label()),
        });

        ChatMessage {
            content: String::new(),
            embeds: vec![ChatEmbed {
                description,
                timestamp: event.timestamp.to_rfc3339(),
                title: Some(TITLE.to_string()),
                color: Some(color),
                footer,
            }],
        }
    }
}

#[async_trait]
impl Sink for ChatSink {
    fn name(&self) -> &str {
        "chat"
    }

    fn accepts(&self, event: &NotificationEvent) -> bool {
        event.kind.is_silence()
    }

    async fn deliver(&self, event: &NotificationEvent) -> Result<(), SinkError> {
        let body = Self::message(event);
        let response = self.client.post(&self.webhook_url).json(&body).send().await?;
        check_status(response, |status| status == StatusCode::NO_CONTENT).await
    }
}
