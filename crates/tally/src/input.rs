//! Digital input sources.
//!
//! The monitor only needs the current electrical level of each line. Reads
//! must be fast and non-blocking; a source that cannot produce a valid level
//! returns an error and the monitor stops.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{debug, warn};

use crate::line::{Line, LineTable};

#[derive(Debug, Error)]
pub enum InputError {
    #[error("GPIO {pin}: {op} failed: {source}")]
    Io {
        pin: u32,
        op: &'static str,
        source: io::Error,
    },

    #[error("GPIO {pin}: unexpected value {value:?}")]
    Garbled { pin: u32, value: String },

    #[error("line '{0}' is not provided by this input source")]
    UnknownLine(String),
}

/// Source of raw line levels.
pub trait InputSource: Send {
    /// Current level of `line`; `true` is electrical high.
    fn read_line(&mut self, line: &Line) -> Result<bool, InputError>;

    /// Release hardware handles. Called once on shutdown; must be idempotent.
    fn release(&mut self) {}
}

/// Linux sysfs GPIO (`/sys/class/gpio`).
///
/// Pins are exported and set to input on open. Pull-ups are not configurable
/// through sysfs; they are expected from the device tree or external
/// resistors.
#[derive(Debug)]
pub struct SysfsGpio {
    root: PathBuf,
    offset: u32,
    value_files: HashMap<u32, PathBuf>,
    exported: Vec<u32>,
}

impl SysfsGpio {
    /// Export every line's pin and configure it as an input.
    pub fn open(root: &Path, offset: u32, table: &LineTable) -> Result<Self, InputError> {
        let mut gpio = Self {
            root: root.to_path_buf(),
            offset,
            value_files: HashMap::new(),
            exported: Vec::new(),
        };

        for line in table.iter() {
            if let Err(e) = gpio.setup_pin(line.pin) {
                gpio.release();
                return Err(e);
            }
        }

        Ok(gpio)
    }

    fn setup_pin(&mut self, pin: u32) -> Result<(), InputError> {
        let number = pin + self.offset;
        let pin_dir = self.root.join(format!("gpio{}", number));

        if !pin_dir.exists() {
            fs::write(self.root.join("export"), number.to_string()).map_err(|source| {
                InputError::Io {
                    pin,
                    op: "export",
                    source,
                }
            })?;
            self.exported.push(number);
            debug!(pin, number, "exported GPIO");
        }

        fs::write(pin_dir.join("direction"), "in").map_err(|source| InputError::Io {
            pin,
            op: "set direction",
            source,
        })?;

        self.value_files.insert(pin, pin_dir.join("value"));
        Ok(())
    }
}

impl InputSource for SysfsGpio {
    fn read_line(&mut self, line: &Line) -> Result<bool, InputError> {
        let path = self
            .value_files
            .get(&line.pin)
            .ok_or_else(|| InputError::UnknownLine(line.name.clone()))?;

        let raw = fs::read_to_string(path).map_err(|source| InputError::Io {
            pin: line.pin,
            op: "read",
            source,
        })?;

        match raw.trim() {
            "0" => Ok(false),
            "1" => Ok(true),
            other => Err(InputError::Garbled {
                pin: line.pin,
                value: other.to_string(),
            }),
        }
    }

    fn release(&mut self) {
        for number in self.exported.drain(..) {
            if let Err(e) = fs::write(self.root.join("unexport"), number.to_string()) {
                warn!(number, error = %e, "failed to unexport GPIO");
            }
        }
        self.value_files.clear();
    }
}

impl Drop for SysfsGpio {
    fn drop(&mut self) {
        self.release();
    }
}

/// In-memory input whose levels are driven through cloned handles.
///
/// Lines that were never set read high, the idle level of a pulled-up input.
#[derive(Debug, Clone, Default)]
pub struct SharedInput {
    levels: Arc<Mutex<HashMap<String, bool>>>,
    failing: Arc<Mutex<Option<String>>>,
}

impl SharedInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drive a line by name.
    pub fn set(&self, name: &str, level: bool) {
        self.levels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(name.to_string(), level);
    }

    /// Make reads of `name` fail until cleared with `None`.
    pub fn fail_line(&self, name: Option<&str>) {
        *self
            .failing
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = name.map(str::to_string);
    }
}

impl InputSource for SharedInput {
    fn read_line(&mut self, line: &Line) -> Result<bool, InputError> {
        let failing = self
            .failing
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if failing.as_deref() == Some(line.name.as_str()) {
            return Err(InputError::Io {
                pin: line.pin,
                op: "read",
                source: io::Error::new(io::ErrorKind::Other, "simulated failure"),
            });
        }
        drop(failing);

        Ok(self
            .levels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&line.name)
            .copied()
            .unwrap_or(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::LineId;

    fn table() -> LineTable {
        LineTable::from_config(&tallyconf::default_lines()).unwrap()
    }

    /// Fake sysfs tree with pre-created pin directories.
    fn fake_sysfs(table: &LineTable, offset: u32) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for line in table.iter() {
            let pin_dir = dir.path().join(format!("gpio{}", line.pin + offset));
            fs::create_dir_all(&pin_dir).unwrap();
            fs::write(pin_dir.join("value"), "1\n").unwrap();
        }
        dir
    }

    #[test]
    fn test_sysfs_reads_levels() {
        let table = table();
        let dir = fake_sysfs(&table, 512);
        let mut gpio = SysfsGpio::open(dir.path(), 512, &table).unwrap();

        let relay = table.silence_relay();
        assert!(gpio.read_line(relay).unwrap());

        fs::write(dir.path().join("gpio522/value"), "0\n").unwrap();
        assert!(!gpio.read_line(relay).unwrap());

        let direction = fs::read_to_string(dir.path().join("gpio522/direction")).unwrap();
        assert_eq!(direction, "in");
    }

    #[test]
    fn test_sysfs_garbled_value() {
        let table = table();
        let dir = fake_sysfs(&table, 0);
        let mut gpio = SysfsGpio::open(dir.path(), 0, &table).unwrap();

        fs::write(dir.path().join("gpio17/value"), "x").unwrap();
        let err = gpio.read_line(table.get(LineId(1)).unwrap()).unwrap_err();
        assert!(matches!(err, InputError::Garbled { pin: 17, .. }));
    }

    #[test]
    fn test_sysfs_export_failure() {
        let table = table();
        let dir = tempfile::tempdir().unwrap();
        // Root does not exist, so the export write fails
        let err = SysfsGpio::open(&dir.path().join("missing"), 0, &table).unwrap_err();
        assert!(matches!(err, InputError::Io { op: "export", .. }));
    }

    #[test]
    fn test_shared_input_defaults_high() {
        let table = table();
        let mut input = SharedInput::new();
        let handle = input.clone();

        let relay = table.silence_relay();
        assert!(input.read_line(relay).unwrap());

        handle.set("silence_detector", false);
        assert!(!input.read_line(relay).unwrap());
    }

    #[test]
    fn test_shared_input_failure() {
        let table = table();
        let mut input = SharedInput::new();
        input.fail_line(Some("studio_a_on_air"));
        assert!(input.read_line(table.get(LineId(1)).unwrap()).is_err());
        input.fail_line(None);
        assert!(input.read_line(table.get(LineId(1)).unwrap()).is_ok());
    }
}
