//! Configuration loading for tally.
//!
//! Everything the monitor needs is resolved once at startup into a
//! [`TallyConfig`] value that the binary hands to the sampler and the
//! notification sinks. Nothing is read from the environment afterwards.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/tally/config.toml` (system)
//! 2. `~/.config/tally/config.toml` (user)
//! 3. `./tally.toml` (local override, replaced by `--config`)
//! 4. Environment variables (`TALLY_*` and the legacy detector names)
//!
//! Variables missing from the process environment are looked up in the
//! first dotenv file found among `./.env`, `~/.env` and
//! `/opt/SilenceDetector/venv/.env`.
//!
//! # Example Config
//!
//! ```toml
//! [monitor]
//! poll_interval_ms = 50
//! debounce_ms = 80
//!
//! [gpio]
//! pin_offset = 512
//!
//! [sinks.dashboard]
//! host = "http://dashboard.local:8000"
//! path = "/api/studio-status"
//!
//! [sinks.push_onair]
//! required = false
//!
//! [[lines]]
//! name = "silence_detector"
//! pin = 10
//! role = "SilenceRelay"
//! ```

pub mod infra;
pub mod lines;
pub mod loader;
pub mod sinks;

pub use infra::{GpioConfig, InfraConfig, MonitorConfig, TelemetryConfig};
pub use lines::{default_lines, validate_lines, LineConfig, Role, Studio};
pub use loader::{discover_config_files_with_override, discover_env_file, ConfigSources};
pub use sinks::{ChatConfig, DashboardConfig, DisabledSink, PushConfig, SinksConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid line table: {reason}")]
    InvalidLineTable { reason: String },

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Missing required credential '{field}' for sink '{sink}'")]
    MissingCredential {
        sink: &'static str,
        field: &'static str,
    },
}

/// Complete tally configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyConfig {
    /// Timing, GPIO and logging.
    #[serde(flatten)]
    pub infra: InfraConfig,

    /// Notification endpoints and credentials.
    #[serde(default)]
    pub sinks: SinksConfig,

    /// Monitored inputs, in dispatch order.
    #[serde(default = "default_lines")]
    pub lines: Vec<LineConfig>,
}

impl Default for TallyConfig {
    fn default() -> Self {
        Self {
            infra: InfraConfig::default(),
            sinks: SinksConfig::default(),
            lines: default_lines(),
        }
    }
}

impl TallyConfig {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration with an optional explicit file, then apply env overrides.
    ///
    /// If `config_path` is provided, it takes precedence over `./tally.toml`
    /// and must exist. System and user configs still load first.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration and report which files and variables contributed.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut table = loader::default_table()?;

        for path in loader::discover_config_files_with_override(config_path) {
            let file_table = loader::load_table(&path)?;
            loader::merge_tables(&mut table, file_table);
            sources.files.push(path);
        }

        let mut config = loader::from_table(table, Path::new("<merged>"))?;

        let file_vars = match loader::discover_env_file() {
            Some(path) => {
                let vars = loader::read_env_file(&path)?;
                sources.env_file = Some(path);
                vars
            }
            None => Default::default(),
        };
        loader::apply_env_overrides(&mut config, &mut sources, &file_vars)?;

        Ok((config, sources))
    }

    /// Check the line table and sink credentials.
    ///
    /// Returns the optional sinks that are disabled for lack of credentials.
    /// A required sink without credentials is an error.
    pub fn validate(&self) -> Result<Vec<DisabledSink>, ConfigError> {
        validate_lines(&self.lines)?;

        if self.infra.monitor.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "monitor.poll_interval_ms".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        let checks = [
            ("push", self.sinks.push.missing_field(), self.sinks.push.required),
            (
                "push_onair",
                self.sinks.push_onair.missing_field(),
                self.sinks.push_onair.required,
            ),
            ("chat", self.sinks.chat.missing_field(), self.sinks.chat.required),
            (
                "dashboard",
                self.sinks.dashboard.missing_field(),
                self.sinks.dashboard.required,
            ),
        ];

        let mut disabled = Vec::new();
        for (sink, missing, required) in checks {
            match (missing, required) {
                (None, _) => {}
                (Some(field), true) => return Err(ConfigError::MissingCredential { sink, field }),
                (Some(field), false) => disabled.push(DisabledSink { sink, field }),
            }
        }

        Ok(disabled)
    }

    /// Render the effective configuration as TOML with secrets masked.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# tally configuration\n\n");

        output.push_str("[monitor]\n");
        output.push_str(&format!(
            "poll_interval_ms = {}\n",
            self.infra.monitor.poll_interval_ms
        ));
        output.push_str(&format!("debounce_ms = {}\n", self.infra.monitor.debounce_ms));

        output.push_str("\n[gpio]\n");
        output.push_str(&format!(
            "sysfs_root = {}\n",
            quoted(&self.infra.gpio.sysfs_root.display().to_string())
        ));
        output.push_str(&format!("pin_offset = {}\n", self.infra.gpio.pin_offset));

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!(
            "log_level = {}\n",
            quoted(&self.infra.telemetry.log_level)
        ));

        for (name, push) in [("push", &self.sinks.push), ("push_onair", &self.sinks.push_onair)] {
            output.push_str(&format!("\n[sinks.{}]\n", name));
            push_secret(&mut output, "token", &push.token);
            push_secret(&mut output, "user", &push.user);
            output.push_str(&format!("api_url = {}\n", quoted(&push.api_url)));
            output.push_str(&format!("priority = {}\n", push.priority));
            if let Some(retry) = push.retry {
                output.push_str(&format!("retry = {}\n", retry));
            }
            if let Some(expire) = push.expire {
                output.push_str(&format!("expire = {}\n", expire));
            }
            output.push_str(&format!("tags = {}\n", quoted(&push.tags)));
            output.push_str(&format!("timeout_ms = {}\n", push.timeout_ms));
            output.push_str(&format!("required = {}\n", push.required));
        }

        output.push_str("\n[sinks.chat]\n");
        push_secret(&mut output, "webhook_url", &self.sinks.chat.webhook_url);
        output.push_str(&format!("timeout_ms = {}\n", self.sinks.chat.timeout_ms));
        output.push_str(&format!("required = {}\n", self.sinks.chat.required));

        output.push_str("\n[sinks.dashboard]\n");
        if let Some(host) = &self.sinks.dashboard.host {
            output.push_str(&format!("host = {}\n", quoted(host)));
        }
        if let Some(path) = &self.sinks.dashboard.path {
            output.push_str(&format!("path = {}\n", quoted(path)));
        }
        output.push_str(&format!(
            "timeout_ms = {}\n",
            self.sinks.dashboard.timeout_ms
        ));
        output.push_str(&format!("required = {}\n", self.sinks.dashboard.required));

        for line in &self.lines {
            output.push_str("\n[[lines]]\n");
            output.push_str(&format!("name = {}\n", quoted(&line.name)));
            output.push_str(&format!("pin = {}\n", line.pin));
            output.push_str(&format!("role = {}\n", quoted(&line.role.to_string())));
            if let Some(studio) = line.studio {
                output.push_str(&format!("studio = {}\n", quoted(&studio.to_string())));
            }
        }

        output
    }
}

/// TOML basic string with quotes and backslashes escaped.
fn quoted(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}

fn push_secret(output: &mut String, key: &str, value: &Option<String>) {
    if value.is_some() {
        output.push_str(&format!("{} = \"********\"\n", key));
    } else {
        output.push_str(&format!("# {} = (unset)\n", key));
    }
}
