//! Notification sink configuration - endpoints and credentials.
//!
//! Credentials normally arrive through the environment rather than config
//! files. A sink whose credentials are absent is either fatal at startup
//! (`required = true`) or silently disabled.

use serde::{Deserialize, Serialize};

/// Default Pushover messages endpoint.
pub const PUSHOVER_API_URL: &str = "https://api.pushover.net/1/messages.json";

/// Pushover-style push notification sink.
///
/// Field defaults are per field, not per profile: an absent `retry` or
/// `expire` means "not sent". Profile defaults come from the section
/// default on [`SinksConfig`] and from the loader's default table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushConfig {
    /// Application token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// User or group key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Pushover priority, -2 (silent) to 2 (emergency).
    #[serde(default)]
    pub priority: i8,

    /// Seconds between re-alerts of an unacknowledged priority message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<u32>,

    /// Seconds after which re-alerting stops.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire: Option<u32>,

    #[serde(default)]
    pub tags: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Refuse to start when credentials are missing.
    #[serde(default = "default_required")]
    pub required: bool,
}

impl PushConfig {
    /// Engineering alert profile: loud, re-alerting, mandatory.
    pub fn alerts() -> Self {
        Self {
            token: None,
            user: None,
            api_url: default_api_url(),
            priority: 1,
            retry: Some(30),
            expire: Some(180),
            tags: "RelayStatusSystem".to_string(),
            timeout_ms: default_timeout_ms(),
            required: true,
        }
    }

    /// On-air status profile: silent delivery, optional.
    pub fn onair() -> Self {
        Self {
            token: None,
            user: None,
            api_url: default_api_url(),
            priority: -2,
            retry: None,
            expire: None,
            tags: "OnAirStatus".to_string(),
            timeout_ms: default_timeout_ms(),
            required: false,
        }
    }

    /// First missing credential field, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        if is_blank(&self.token) {
            Some("token")
        } else if is_blank(&self.user) {
            Some("user")
        } else {
            None
        }
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self::alerts()
    }
}

/// Chat webhook (Discord-compatible embeds).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,

    pub timeout_ms: u64,

    pub required: bool,
}

impl ChatConfig {
    pub fn missing_field(&self) -> Option<&'static str> {
        is_blank(&self.webhook_url).then_some("webhook_url")
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_ms: 10_000,
            required: true,
        }
    }
}

/// Studio dashboard endpoint. The request URL is `host` + `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Scheme and authority, e.g. `http://dashboard.local:8000`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Path of the status endpoint, e.g. `/api/studio-status`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    pub timeout_ms: u64,

    pub required: bool,
}

impl DashboardConfig {
    pub fn missing_field(&self) -> Option<&'static str> {
        is_blank(&self.path).then_some("path")
    }

    /// Full endpoint URL, when a path is configured.
    pub fn endpoint(&self) -> Option<String> {
        let path = self.path.as_deref().filter(|p| !p.trim().is_empty())?;
        let host = self.host.as_deref().unwrap_or("");
        Some(format!("{}{}", host.trim_end_matches('/'), path))
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            host: None,
            path: None,
            timeout_ms: 10_000,
            required: true,
        }
    }
}

/// All notification sinks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinksConfig {
    /// Engineering alerts (silence detector).
    #[serde(default = "PushConfig::alerts")]
    pub push: PushConfig,

    /// On-air and mic-live status changes.
    #[serde(default = "PushConfig::onair")]
    pub push_onair: PushConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub dashboard: DashboardConfig,
}

impl Default for SinksConfig {
    fn default() -> Self {
        Self {
            push: PushConfig::alerts(),
            push_onair: PushConfig::onair(),
            chat: ChatConfig::default(),
            dashboard: DashboardConfig::default(),
        }
    }
}

/// An optional sink that will not run because a credential is absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisabledSink {
    pub sink: &'static str,
    pub field: &'static str,
}

fn default_api_url() -> String {
    PUSHOVER_API_URL.to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_required() -> bool {
    true
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}
