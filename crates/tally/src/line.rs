//! Monitored lines and the immutable line table.

use std::fmt;

use tallyconf::{LineConfig, Role, Studio};

/// Index of a line in its [`LineTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineId(pub usize);

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line#{}", self.0)
    }
}

/// One monitored digital input. Immutable after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub id: LineId,
    pub name: String,
    pub pin: u32,
    pub role: Role,
    pub studio: Option<Studio>,
}

impl Line {
    /// Text used in status messages, e.g. "Studio A On Air".
    pub fn label(&self) -> String {
        match self.studio {
            Some(studio) => format!("{} {}", studio.label(), self.role.label()),
            None => self.role.label().to_string(),
        }
    }

    pub fn is_silence_relay(&self) -> bool {
        self.role == Role::SilenceRelay
    }
}

/// All monitored lines in configuration order.
#[derive(Debug, Clone)]
pub struct LineTable {
    lines: Vec<Line>,
    silence_relay: LineId,
}

impl LineTable {
    /// Build the table from configured lines.
    ///
    /// Validates the table first; a table without exactly one silence
    /// relay, or with duplicate pins, is rejected.
    pub fn from_config(configs: &[LineConfig]) -> Result<Self, tallyconf::ConfigError> {
        tallyconf::validate_lines(configs)?;

        let lines: Vec<Line> = configs
            .iter()
            .enumerate()
            .map(|(idx, cfg)| Line {
                id: LineId(idx),
                name: cfg.name.clone(),
                pin: cfg.pin,
                role: cfg.role,
                studio: cfg.studio,
            })
            .collect();

        let silence_relay = lines
            .iter()
            .find(|l| l.is_silence_relay())
            .map(|l| l.id)
            .ok_or_else(|| tallyconf::ConfigError::InvalidLineTable {
                reason: "no SilenceRelay line".to_string(),
            })?;

        Ok(Self {
            lines,
            silence_relay,
        })
    }

    pub fn get(&self, id: LineId) -> Option<&Line> {
        self.lines.get(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn silence_relay(&self) -> &Line {
        &self.lines[self.silence_relay.0]
    }

    /// Lines with the given role, in table order.
    pub fn with_role(&self, role: Role) -> impl Iterator<Item = &Line> {
        self.lines.iter().filter(move |l| l.role == role)
    }
}
