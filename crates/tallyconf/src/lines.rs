//! Monitored line table.
//!
//! One row per digital input. The default table matches the studio
//! wiring: one silence detector relay, three on-air tallies, three mic-live
//! tallies. All inputs are pulled up and asserted by pulling low.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::ConfigError;

/// What a line reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Silence detector relay. Opens (reads high) when the detector trips.
    SilenceRelay,
    /// Studio is feeding the transmitter.
    OnAir,
    /// Studio microphone fader is open.
    MicLive,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SilenceRelay => "SilenceRelay",
            Role::OnAir => "OnAir",
            Role::MicLive => "MicLive",
        }
    }

    /// Human label used in notification text.
    pub fn label(&self) -> &'static str {
        match self {
            Role::SilenceRelay => "Silence Detector",
            Role::OnAir => "On Air",
            Role::MicLive => "Mic Live",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Logical studio. The serialized names are the dashboard's wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Studio {
    StudioA,
    StudioB,
    StudioC,
    Automation,
}

impl Studio {
    pub const ALL: [Studio; 4] = [
        Studio::StudioA,
        Studio::StudioB,
        Studio::StudioC,
        Studio::Automation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Studio::StudioA => "StudioA",
            Studio::StudioB => "StudioB",
            Studio::StudioC => "StudioC",
            Studio::Automation => "Automation",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Studio::StudioA => "Studio A",
            Studio::StudioB => "Studio B",
            Studio::StudioC => "Studio C",
            Studio::Automation => "Automation",
        }
    }
}

impl fmt::Display for Studio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One configured input line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineConfig {
    /// Stable name used in logs, e.g. `studio_a_on_air`.
    pub name: String,

    /// BCM GPIO number.
    pub pin: u32,

    pub role: Role,

    /// Owning studio; absent for the silence relay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub studio: Option<Studio>,
}

impl LineConfig {
    pub fn new(name: &str, pin: u32, role: Role, studio: Option<Studio>) -> Self {
        Self {
            name: name.to_string(),
            pin,
            role,
            studio,
        }
    }
}

/// The studio wiring.
pub fn default_lines() -> Vec<LineConfig> {
    vec![
        LineConfig::new("silence_detector", 10, Role::SilenceRelay, None),
        LineConfig::new("studio_a_on_air", 17, Role::OnAir, Some(Studio::StudioA)),
        LineConfig::new("studio_c_on_air", 27, Role::OnAir, Some(Studio::StudioC)),
        LineConfig::new("automation_on_air", 22, Role::OnAir, Some(Studio::Automation)),
        LineConfig::new("studio_a_mic_live", 23, Role::MicLive, Some(Studio::StudioA)),
        LineConfig::new("studio_c_mic_live", 24, Role::MicLive, Some(Studio::StudioC)),
        LineConfig::new("studio_b_mic_live", 25, Role::MicLive, Some(Studio::StudioB)),
    ]
}

/// Check that a line table is usable by the monitor.
pub fn validate_lines(lines: &[LineConfig]) -> Result<(), ConfigError> {
    let invalid = |reason: String| Err(ConfigError::InvalidLineTable { reason });

    if lines.is_empty() {
        return invalid("no lines configured".to_string());
    }

    let mut names = HashSet::new();
    let mut pins = HashSet::new();
    let mut slots = HashSet::new();
    let mut relays = 0;

    for line in lines {
        if line.name.trim().is_empty() {
            return invalid(format!("line on pin {} has an empty name", line.pin));
        }
        if !names.insert(line.name.as_str()) {
            return invalid(format!("duplicate line name '{}'", line.name));
        }
        if !pins.insert(line.pin) {
            return invalid(format!("pin {} is used by more than one line", line.pin));
        }

        match (line.role, line.studio) {
            (Role::SilenceRelay, None) => relays += 1,
            (Role::SilenceRelay, Some(studio)) => {
                return invalid(format!(
                    "silence relay '{}' must not belong to a studio (got {})",
                    line.name, studio
                ));
            }
            (role, None) => {
                return invalid(format!("{} line '{}' needs a studio", role, line.name));
            }
            (role, Some(studio)) => {
                if !slots.insert((role, studio)) {
                    return invalid(format!("more than one {} line for {}", role, studio));
                }
            }
        }
    }

    if relays != 1 {
        return invalid(format!("expected exactly one SilenceRelay line, found {}", relays));
    }

    Ok(())
}
