//! Infrastructure configuration - timing, hardware access, logging.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Sampling loop timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Period of the poll loop in milliseconds.
    /// Default: 50
    #[serde(default = "MonitorConfig::default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Minimum time between accepted state changes on one line.
    /// Relay chatter lasts a few milliseconds; deployments have used 50-300.
    /// Default: 80
    #[serde(default = "MonitorConfig::default_debounce_ms")]
    pub debounce_ms: u64,
}

impl MonitorConfig {
    fn default_poll_interval_ms() -> u64 {
        50
    }

    fn default_debounce_ms() -> u64 {
        80
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: Self::default_poll_interval_ms(),
            debounce_ms: Self::default_debounce_ms(),
        }
    }
}

/// Linux sysfs GPIO access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpioConfig {
    /// Root of the sysfs GPIO class directory.
    /// Default: /sys/class/gpio
    #[serde(default = "GpioConfig::default_sysfs_root")]
    pub sysfs_root: PathBuf,

    /// Added to every BCM pin number before export. Newer Raspberry Pi
    /// kernels number the header GPIOs from 512.
    /// Default: 0
    #[serde(default)]
    pub pin_offset: u32,
}

impl GpioConfig {
    fn default_sysfs_root() -> PathBuf {
        PathBuf::from("/sys/class/gpio")
    }
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            sysfs_root: Self::default_sysfs_root(),
            pin_offset: 0,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level or EnvFilter directive (trace, debug, info, warn, error).
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}

/// Infrastructure configuration - fixed for the life of the process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfraConfig {
    /// Poll and debounce timing.
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// GPIO backend settings.
    #[serde(default)]
    pub gpio: GpioConfig,

    /// Logging settings.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_defaults() {
        let monitor = MonitorConfig::default();
        assert_eq!(monitor.poll_interval(), Duration::from_millis(50));
        assert_eq!(monitor.debounce(), Duration::from_millis(80));
    }

    #[test]
    fn test_gpio_defaults() {
        let gpio = GpioConfig::default();
        assert_eq!(gpio.sysfs_root, PathBuf::from("/sys/class/gpio"));
        assert_eq!(gpio.pin_offset, 0);
    }

    #[test]
    fn test_telemetry_defaults() {
        assert_eq!(TelemetryConfig::default().log_level, "info");
    }
}
